//! Ordered registry of content modules
//!
//! The registry is filled once at start-up by an explicit loader (see the
//! modules crate's `register_all`). The display controller consumes the
//! resulting ordered list and never discovers modules on its own.

use crate::constants::PINNED_FIRST_MODULE;
use crate::module::{BoxedModule, ModuleContext};
use anyhow::{anyhow, Result};
use log::{debug, warn};
use rg_kiosk_types::{ModuleInfo, ModuleView};
use std::cmp::Ordering;

/// Ordered list of registered modules
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<BoxedModule>,
}

impl ModuleRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module at the end of the list.
    ///
    /// Fails if another module already uses the same key.
    pub fn register(&mut self, module: BoxedModule) -> Result<()> {
        let key = module.info().key.clone();
        if self.modules.iter().any(|m| m.info().key == key) {
            return Err(anyhow!("Module already registered: {}", key));
        }
        debug!("Registered module {} ({})", key, module.info().display_name);
        self.modules.push(module);
        Ok(())
    }

    /// Sort for display: the clock first, everything else alphabetically
    pub fn sort_for_display(&mut self) {
        self.modules
            .sort_by(|a, b| display_order(&a.info().display_name, &b.info().display_name));
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&BoxedModule> {
        self.modules.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoxedModule> {
        self.modules.iter()
    }

    /// Descriptors in display order, as consumed by the display controller
    pub fn infos(&self) -> Vec<ModuleInfo> {
        self.modules.iter().map(|m| m.info().clone()).collect()
    }

    /// Find a module index by name (case and whitespace insensitive)
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.modules.iter().position(|m| m.info().matches_name(name))
    }

    /// Render the module at `index`
    ///
    /// A module that requires a credential renders the missing-credential
    /// view when none is configured, without being asked to fetch anything.
    pub fn render(&self, index: usize, has_credential: bool) -> Option<ModuleView> {
        let module = self.modules.get(index)?;
        let info = module.info();
        if info.requires_credential && !has_credential {
            return Some(ModuleView::missing_credential(&info.display_name));
        }
        Some(module.render())
    }

    /// Start every module's background refresh.
    ///
    /// Modules requiring a credential are not started without one. A module
    /// that fails to start is logged and skipped so the rest still run.
    pub fn start_all(&self, context: &ModuleContext) {
        for module in &self.modules {
            let info = module.info();
            if info.requires_credential && !context.has_credential() {
                debug!("Not starting {}: credential missing", info.key);
                continue;
            }
            if let Err(e) = module.start(context) {
                warn!("Failed to start module {}: {:#}", info.key, e);
            }
        }
    }

    /// Stop every module's background refresh
    pub fn stop_all(&self) {
        for module in &self.modules {
            module.stop();
        }
    }
}

fn display_order(a: &str, b: &str) -> Ordering {
    match (a == PINNED_FIRST_MODULE, b == PINNED_FIRST_MODULE) {
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        _ => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ContentModule;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Arc;

    struct FakeModule {
        info: ModuleInfo,
        starts: AtomicUsize,
    }

    impl FakeModule {
        fn new(key: &str, name: &str) -> Arc<Self> {
            Arc::new(Self {
                info: ModuleInfo::new(key, name),
                starts: AtomicUsize::new(0),
            })
        }

        fn with_credential(key: &str, name: &str) -> Arc<Self> {
            Arc::new(Self {
                info: ModuleInfo::new(key, name).with_credential(),
                starts: AtomicUsize::new(0),
            })
        }
    }

    impl ContentModule for FakeModule {
        fn info(&self) -> &ModuleInfo {
            &self.info
        }

        fn render(&self) -> ModuleView {
            ModuleView::ready(&self.info.display_name, vec![])
        }

        fn start(&self, _context: &ModuleContext) -> Result<()> {
            self.starts.fetch_add(1, AtomicOrdering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = ModuleRegistry::new();
        registry.register(FakeModule::new("a", "A")).unwrap();
        assert!(registry.register(FakeModule::new("a", "Other")).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_sort_keeps_clock_first() {
        let mut registry = ModuleRegistry::new();
        registry.register(FakeModule::new("weather", "Weather")).unwrap();
        registry.register(FakeModule::new("cat_facts", "Cat Facts")).unwrap();
        registry.register(FakeModule::new("clock", "Clock")).unwrap();
        registry.register(FakeModule::new("birthdays", "Birthdays")).unwrap();
        registry.sort_for_display();

        let names: Vec<_> = registry.infos().into_iter().map(|i| i.display_name).collect();
        assert_eq!(names, vec!["Clock", "Birthdays", "Cat Facts", "Weather"]);
    }

    #[test]
    fn test_find_by_name() {
        let mut registry = ModuleRegistry::new();
        registry.register(FakeModule::new("clock", "Clock")).unwrap();
        registry.register(FakeModule::new("cat_facts", "Cat Facts")).unwrap();

        assert_eq!(registry.find_by_name("catfacts"), Some(1));
        assert_eq!(registry.find_by_name("CAT FACTS"), Some(1));
        assert_eq!(registry.find_by_name("weather"), None);
    }

    #[test]
    fn test_render_gates_credential() {
        let mut registry = ModuleRegistry::new();
        registry.register(FakeModule::with_credential("flights", "Flights")).unwrap();

        let view = registry.render(0, false).unwrap();
        assert_eq!(view.status, rg_kiosk_types::ViewStatus::MissingCredential);
        let view = registry.render(0, true).unwrap();
        assert_eq!(view.status, rg_kiosk_types::ViewStatus::Ready);
        assert!(registry.render(5, true).is_none());
    }

    #[test]
    fn test_start_all_skips_credential_modules() {
        let plain = FakeModule::new("clock", "Clock");
        let gated = FakeModule::with_credential("flights", "Flights");
        let mut registry = ModuleRegistry::new();
        registry.register(plain.clone()).unwrap();
        registry.register(gated.clone()).unwrap();

        registry.start_all(&ModuleContext::default());
        assert_eq!(plain.starts.load(AtomicOrdering::SeqCst), 1);
        assert_eq!(gated.starts.load(AtomicOrdering::SeqCst), 0);
    }
}
