pub mod server;
pub mod session;
pub mod handler;
pub mod auth;

pub use server::RtmpStreamingServer;
pub use auth::{RtmpAuthCallback, Channel, NoAuthCallback};
