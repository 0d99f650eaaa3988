pub mod auth;
pub mod user;
pub mod room;
pub mod rate_limit;
pub mod content_filter;
pub mod provider_instance_manager;
pub mod providers_manager;

pub use auth::{hash_password, verify_password, JwtService, TokenType, Claims};
pub use user::UserService;
pub use room::RoomService;
pub use rate_limit::{RateLimiter, RateLimitConfig, RateLimitError};
pub use content_filter::{ContentFilter, ContentFilterError};
pub use provider_instance_manager::{ConnectedProviderInstance, ProviderInstanceManager};
pub use providers_manager::ProvidersManager;
