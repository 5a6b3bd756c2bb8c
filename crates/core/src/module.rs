//! Content module trait and related types

use crate::credential::Credential;
use anyhow::Result;
use rg_kiosk_types::{ModuleInfo, ModuleView};
use std::sync::Arc;

/// Start-up context handed to every module
///
/// Built once from the start-up parameters; modules never read ambient
/// process state themselves.
#[derive(Debug, Clone, Default)]
pub struct ModuleContext {
    /// Credential for modules that call authenticated services
    pub credential: Option<Credential>,
    /// Fixed "HH:MM" time for modules that render a clock
    pub time_override: Option<String>,
}

impl ModuleContext {
    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }
}

/// Trait for all content modules
///
/// A module owns its data and its refresh schedule. The display controller
/// only reads `info()`; the host calls `render()` for the visible module.
pub trait ContentModule: Send + Sync {
    /// Identity, display name and credential requirement
    fn info(&self) -> &ModuleInfo;

    /// Produce the on-screen representation of the current data
    fn render(&self) -> ModuleView;

    /// Start background refreshing. Must be called inside a tokio runtime.
    ///
    /// Modules without live data can use the default, which does nothing.
    fn start(&self, _context: &ModuleContext) -> Result<()> {
        Ok(())
    }

    /// Stop background refreshing
    fn stop(&self) {}
}

/// Shared content module for dynamic dispatch
pub type BoxedModule = Arc<dyn ContentModule>;
