//! rg-kiosk-types: Shared data types for the rg-Kiosk display.
//!
//! This crate contains pure data types (module descriptors, display state,
//! timing configuration, notifications and fetch status) shared across all
//! rg-Kiosk crates. These types carry no runtime dependencies, making them
//! suitable as a foundation layer.

pub mod display;
pub mod fetch;
pub mod module;
pub mod notification;

// Re-export commonly used types at the crate root for convenience
pub use display::{DisplayState, DisplayTiming, DESIGN_HEIGHT, DESIGN_WIDTH};
pub use fetch::{FetchState, ModuleStatus};
pub use module::{normalize_module_name, ModuleInfo, ModuleSettings, ModuleView, ViewStatus};
pub use notification::Notification;
