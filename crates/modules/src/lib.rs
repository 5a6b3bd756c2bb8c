//! rg-kiosk-modules: Built-in content modules for rg-Kiosk.

mod clock;
mod random_number;
mod static_text;
mod this_or_that;

pub use clock::{format_time, parse_time_override, ClockModule};
pub use random_number::{RandomNumberConfig, RandomNumberModule};
pub use static_text::{StaticTextConfig, StaticTextModule};
pub use this_or_that::{ThisOrThatConfig, ThisOrThatModule};

use anyhow::Result;
use log::{info, warn};
use rg_kiosk_core::{BoxedModule, ModuleRegistry};
use rg_kiosk_types::ModuleSettings;
use std::collections::HashMap;
use std::sync::Arc;

type ModuleFactory = fn(&ModuleSettings) -> Result<BoxedModule>;

/// Built-in modules, by key
const BUILTIN_MODULES: &[(&str, ModuleFactory)] = &[
    ("clock", create_clock),
    ("random_number", create_random_number),
    ("static_text", create_static_text),
    ("this_or_that", create_this_or_that),
];

fn create_clock(settings: &ModuleSettings) -> Result<BoxedModule> {
    Ok(Arc::new(ClockModule::from_settings(settings)))
}

fn create_random_number(settings: &ModuleSettings) -> Result<BoxedModule> {
    Ok(Arc::new(RandomNumberModule::from_settings(settings)?))
}

fn create_static_text(settings: &ModuleSettings) -> Result<BoxedModule> {
    Ok(Arc::new(StaticTextModule::from_settings(settings)))
}

fn create_this_or_that(settings: &ModuleSettings) -> Result<BoxedModule> {
    Ok(Arc::new(ThisOrThatModule::from_settings(settings)?))
}

/// Keys of every built-in module
pub fn builtin_keys() -> Vec<&'static str> {
    BUILTIN_MODULES.iter().map(|(key, _)| *key).collect()
}

/// Register all enabled built-in modules and sort them for display.
///
/// Modules without settings use their defaults. A module whose settings are
/// invalid is logged and left out so the rest of the display still works.
pub fn register_all(
    registry: &mut ModuleRegistry,
    settings: &HashMap<String, ModuleSettings>,
) -> Result<()> {
    let defaults = ModuleSettings::default();

    for (key, create) in BUILTIN_MODULES {
        let module_settings = settings.get(*key).unwrap_or(&defaults);
        if !module_settings.enabled {
            info!("Module {} disabled by configuration", key);
            continue;
        }
        match create(module_settings) {
            Ok(module) => registry.register(module)?,
            Err(e) => warn!("Skipping module {}: {:#}", key, e),
        }
    }

    for key in settings.keys() {
        if !BUILTIN_MODULES.iter().any(|(builtin, _)| *builtin == key.as_str()) {
            warn!("Settings for unknown module {} ignored", key);
        }
    }

    registry.sort_for_display();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn display_names(registry: &ModuleRegistry) -> Vec<String> {
        registry
            .infos()
            .into_iter()
            .map(|info| info.display_name)
            .collect()
    }

    #[test]
    fn test_register_all_defaults() {
        let mut registry = ModuleRegistry::new();
        register_all(&mut registry, &HashMap::new()).unwrap();

        assert_eq!(
            display_names(&registry),
            vec!["Clock", "Message Board", "Random Number", "This Or That"]
        );
        let credential_modules: Vec<_> = registry
            .infos()
            .into_iter()
            .filter(|info| info.requires_credential)
            .map(|info| info.key)
            .collect();
        assert_eq!(credential_modules, vec!["this_or_that"]);
    }

    #[test]
    fn test_disabled_and_invalid_modules_are_skipped() {
        let mut settings = HashMap::new();
        settings.insert(
            "static_text".to_string(),
            ModuleSettings {
                enabled: false,
                ..Default::default()
            },
        );
        settings.insert(
            "random_number".to_string(),
            ModuleSettings {
                options: json!({"min": 5, "max": 1}),
                ..Default::default()
            },
        );

        let mut registry = ModuleRegistry::new();
        register_all(&mut registry, &settings).unwrap();
        assert_eq!(display_names(&registry), vec!["Clock", "This Or That"]);
    }

    #[test]
    fn test_builtin_keys() {
        assert_eq!(
            builtin_keys(),
            vec!["clock", "random_number", "static_text", "this_or_that"]
        );
    }
}
