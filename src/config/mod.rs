//! Configuration management

mod params;
mod settings;

pub use params::StartupParams;
pub use settings::{KioskConfig, NotificationConfig};
