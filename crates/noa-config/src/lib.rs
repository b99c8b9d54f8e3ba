pub mod client;
pub mod loader;
pub mod websocket;

pub use client::{ApiConfig, BufferConfig, ClientConfig, LoggingConfig, StorageConfig};
pub use loader::ConfigLoader;
pub use websocket::{ReconnectConfig, WebSocketConfig};
