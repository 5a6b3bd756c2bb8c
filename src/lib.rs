//! rg-Kiosk: An always-on display that rotates self-contained content modules
//!
//! This library provides the application layer of rg-Kiosk:
//! - Configuration file and start-up parameters
//! - The composition root wiring modules, display session and notifications
//! - Console commands for driving a headless display

pub mod app;
pub mod config;
pub mod console;

// Re-export commonly used types
pub use app::KioskApp;
pub use config::{KioskConfig, StartupParams};
