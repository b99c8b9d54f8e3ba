pub mod client;
pub mod error;
pub mod session;
pub mod types;

pub use client::ApiClient;
pub use error::{ApiError, Result};
pub use session::{Claims, Session};
pub use types::{RegisterResponse, RemoteDevice, UserProfile};
