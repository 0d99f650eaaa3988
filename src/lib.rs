//! Media thumbnailing and adaptive-streaming derivation engine.
//!
//! Modules are ordered leaves-first: storage and staging primitives at the
//! bottom, the derivation kernel and stream worker in the middle, the HTTP
//! and AMQP front-ends and process bootstrap at the top.

pub mod amqp;
pub mod config;
pub mod derive;
pub mod error;
pub mod hls;
pub mod http;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod stage;
pub mod state;
pub mod store;
pub mod tools;
pub mod worker;

pub use error::{Result, VithError};
pub use state::AppState;
