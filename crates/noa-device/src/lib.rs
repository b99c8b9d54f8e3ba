pub mod cache;
pub mod error;
pub mod store;

pub use cache::{DeviceBackend, DeviceCache};
pub use error::{DeviceError, Result};
pub use store::{LocalState, LocalStore};
