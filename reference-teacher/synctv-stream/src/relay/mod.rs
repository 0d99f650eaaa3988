// Stream relay module for multi-replica coordination
pub mod publisher;
pub mod puller;
pub mod registry;
pub mod publisher_manager;

pub use publisher::Publisher;
pub use puller::Puller;
pub use registry::{StreamRegistry, PublisherInfo};
pub use publisher_manager::PublisherManager;
