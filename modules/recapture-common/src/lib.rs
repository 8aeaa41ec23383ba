pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ListeningConfig};
pub use error::RecaptureError;
pub use types::*;
