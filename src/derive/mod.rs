pub mod stream;
pub mod thumbnail;

pub use stream::derive_stream;
pub use thumbnail::derive_thumbnail;
