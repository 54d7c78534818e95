//! Settings validation
//!
//! Catches settings that would otherwise fail late, at registration or
//! dispatch time, with a message naming the offending entry.

use std::collections::HashSet;

use crate::{
    error::{ConfigError, Result},
    types::{EngineSettings, ErrorPageSpec, RichletMappingSpec},
};

/// Validates [`EngineSettings`]
///
/// Rules:
/// - timeouts and limits that the engine divides by or waits on are non-zero
/// - charsets are non-empty
/// - richlet names are unique and non-empty
/// - richlet mappings name a defined richlet and use an absolute path
/// - error pages carry a device, an error class and a location
pub struct SettingsValidator;

impl SettingsValidator {
    /// Validate a complete settings value
    pub fn validate(settings: &EngineSettings) -> Result<()> {
        Self::validate_limits(settings)?;
        Self::validate_charsets(settings)?;

        let mut defined = HashSet::new();
        for richlet in &settings.richlets {
            if richlet.name.is_empty() || richlet.class.is_empty() {
                return Err(ConfigError::Validation(
                    "Richlet name and class cannot be empty".to_string(),
                ));
            }
            if !defined.insert(richlet.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Richlet defined twice: {}",
                    richlet.name
                )));
            }
        }

        for mapping in &settings.richlet_mappings {
            Self::validate_mapping(mapping, &defined)?;
        }

        for page in &settings.error_pages {
            Self::validate_error_page(page)?;
        }

        if settings.listeners.iter().any(String::is_empty) {
            return Err(ConfigError::Validation(
                "Listener name cannot be empty".to_string(),
            ));
        }

        if settings
            .theme_uris
            .iter()
            .chain(&settings.disabled_theme_uris)
            .any(String::is_empty)
        {
            return Err(ConfigError::Validation(
                "Theme URI cannot be empty".to_string(),
            ));
        }

        if settings.preferences.iter().any(|p| p.name.is_empty()) {
            return Err(ConfigError::Validation(
                "Preference name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    fn validate_limits(settings: &EngineSettings) -> Result<()> {
        let checks = [
            (settings.richlet_load_timeout_secs, "richlet_load_timeout_secs"),
            (
                u64::from(settings.request.max_process_time_ms),
                "request.max_process_time_ms",
            ),
            (
                u64::from(settings.desktop.max_per_session),
                "desktop.max_per_session",
            ),
            (
                u64::from(settings.desktop.max_inactive_secs),
                "desktop.max_inactive_secs",
            ),
        ];

        for (value, name) in checks {
            if value == 0 {
                return Err(ConfigError::Validation(format!(
                    "{} must be greater than 0",
                    name
                )));
            }
        }
        Ok(())
    }

    fn validate_charsets(settings: &EngineSettings) -> Result<()> {
        if settings.request.response_charset.is_empty()
            || settings.request.upload_charset.is_empty()
        {
            return Err(ConfigError::Validation(
                "Charsets cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_mapping(mapping: &RichletMappingSpec, defined: &HashSet<&str>) -> Result<()> {
        if !defined.contains(mapping.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Richlet not defined: {}",
                mapping.name
            )));
        }

        let path = mapping.path.as_str();
        if !path.is_empty() && !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "Richlet path must start with '/', not {}",
                path
            )));
        }
        Ok(())
    }

    fn validate_error_page(page: &ErrorPageSpec) -> Result<()> {
        if page.device.is_empty() || page.error.is_empty() || page.location.is_empty() {
            return Err(ConfigError::Validation(format!(
                "Error page for '{}' needs a device, an error class and a location",
                page.error
            )));
        }
        if page.error.split('.').any(str::is_empty) {
            return Err(ConfigError::Validation(format!(
                "Invalid error class: '{}'",
                page.error
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RichletSpec;

    fn with_richlet(name: &str) -> EngineSettings {
        let mut settings = EngineSettings::default();
        settings.richlets.push(RichletSpec {
            name: name.to_string(),
            class: "demo.Richlet".to_string(),
            params: vec![],
        });
        settings
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(SettingsValidator::validate(&EngineSettings::default()).is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut settings = EngineSettings::default();
        settings.richlet_load_timeout_secs = 0;
        assert!(SettingsValidator::validate(&settings).is_err());
    }

    #[test]
    fn test_empty_charset_rejected() {
        let mut settings = EngineSettings::default();
        settings.request.upload_charset.clear();
        assert!(SettingsValidator::validate(&settings).is_err());
    }

    #[test]
    fn test_duplicate_richlet_rejected() {
        let mut settings = with_richlet("main");
        settings.richlets.push(settings.richlets[0].clone());
        assert!(SettingsValidator::validate(&settings).is_err());
    }

    #[test]
    fn test_mapping_to_undefined_richlet_rejected() {
        let mut settings = with_richlet("main");
        settings.richlet_mappings.push(RichletMappingSpec {
            name: "other".to_string(),
            path: "/other".to_string(),
        });
        assert!(SettingsValidator::validate(&settings).is_err());
    }

    #[test]
    fn test_relative_mapping_path_rejected() {
        let mut settings = with_richlet("main");
        settings.richlet_mappings.push(RichletMappingSpec {
            name: "main".to_string(),
            path: "main/*".to_string(),
        });
        assert!(SettingsValidator::validate(&settings).is_err());
    }

    #[test]
    fn test_root_mapping_accepted() {
        for path in ["", "/", "/*"] {
            let mut settings = with_richlet("main");
            settings.richlet_mappings.push(RichletMappingSpec {
                name: "main".to_string(),
                path: path.to_string(),
            });
            assert!(SettingsValidator::validate(&settings).is_ok(), "path {:?}", path);
        }
    }

    #[test]
    fn test_malformed_error_class_rejected() {
        let mut settings = EngineSettings::default();
        settings.error_pages.push(ErrorPageSpec {
            device: "ajax".to_string(),
            error: "engine..veto".to_string(),
            location: "/err".to_string(),
        });
        assert!(SettingsValidator::validate(&settings).is_err());
    }
}
