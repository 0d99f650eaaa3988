pub mod bloom_filter;
pub mod username_cache;
pub mod user_cache;
pub mod room_cache;
// pub mod manager; // Temporarily disabled due to incomplete implementation

pub use bloom_filter::{BloomFilter, BloomConfig, ProtectedCache, ProtectedCacheStats};
pub use username_cache::UsernameCache;
pub use user_cache::UserCache;
pub use room_cache::RoomCache;
// pub use manager::{CacheManager, AggregatedCacheStats};
