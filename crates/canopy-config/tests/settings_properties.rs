//! Property-based tests for engine settings
//!
//! Defaults, validation and the TOML/YAML surfaces.

use canopy_config::*;
use proptest::prelude::*;

#[test]
fn test_engine_settings_default() {
    let settings = EngineSettings::default();
    assert_eq!(settings.desktop.max_inactive_secs, 3600);
    assert_eq!(settings.desktop.max_per_session, 10);
    assert_eq!(settings.session.max_inactive_secs, 0);
    assert_eq!(settings.threads.max_spare, 100);
    assert_eq!(settings.threads.max_suspended, None);
    assert_eq!(settings.request.max_upload_size_kb, 5120);
    assert_eq!(settings.request.max_process_time_ms, 3000);
    assert_eq!(settings.client.processing_prompt_delay_ms, 900);
    assert_eq!(settings.client.tooltip_delay_ms, 800);
    assert_eq!(settings.request.response_charset, "UTF-8");
    assert_eq!(settings.richlet_load_timeout().as_secs(), 300);
    assert!(settings.threads.event_thread_enabled);
    assert!(settings.desktop.disable_behind_modal);
    assert!(!settings.desktop.keep_across_visits);
}

#[test]
fn test_default_client_error_reloads() {
    let codes: Vec<u16> = ClientSettings::default()
        .error_reloads
        .iter()
        .map(|r| r.code)
        .collect();
    assert_eq!(codes, vec![302, 401, 403]);
}

#[test]
fn test_yaml_export_parses_back() {
    let mut settings = EngineSettings::default();
    settings.listeners.push("audit".to_string());
    let yaml = settings.to_yaml().unwrap();
    let parsed = SettingsLoader::parse_yaml(&yaml).unwrap();
    assert_eq!(parsed.listeners, vec!["audit"]);
}

fn path_segment() -> impl Strategy<Value = String> {
    "[a-z]{1,8}".prop_map(|s| s.to_string())
}

proptest! {
    /// Absolute mapping paths to a defined richlet always validate.
    #[test]
    fn prop_absolute_mapping_paths_validate(
        segments in prop::collection::vec(path_segment(), 0..4),
        wildcard in any::<bool>(),
    ) {
        let mut path = segments.iter().map(|s| format!("/{}", s)).collect::<String>();
        if wildcard {
            path.push_str("/*");
        }

        let mut settings = EngineSettings::default();
        settings.richlets.push(RichletSpec {
            name: "main".to_string(),
            class: "demo.Main".to_string(),
            params: vec![],
        });
        settings.richlet_mappings.push(RichletMappingSpec {
            name: "main".to_string(),
            path,
        });

        prop_assert!(SettingsValidator::validate(&settings).is_ok());
    }

    /// Relative mapping paths never validate.
    #[test]
    fn prop_relative_mapping_paths_rejected(first in path_segment()) {
        let mut settings = EngineSettings::default();
        settings.richlets.push(RichletSpec {
            name: "main".to_string(),
            class: "demo.Main".to_string(),
            params: vec![],
        });
        settings.richlet_mappings.push(RichletMappingSpec {
            name: "main".to_string(),
            path: first,
        });

        prop_assert!(SettingsValidator::validate(&settings).is_err());
    }

    /// Any non-zero timeout survives a TOML round trip through the loader.
    #[test]
    fn prop_timeout_survives_toml(secs in 1u64..100_000) {
        let mut settings = EngineSettings::default();
        settings.richlet_load_timeout_secs = secs;
        let toml = settings.to_toml().unwrap();
        let parsed = SettingsLoader::parse_toml(&toml).unwrap();
        prop_assert_eq!(parsed.richlet_load_timeout_secs, secs);
    }
}
