//! Settings loader
//!
//! Settings are layered: built-in defaults, then an optional settings file
//! (TOML or YAML, picked by extension), then environment variables.
//! Environment variables use the `CANOPY_` prefix and `__` between nested
//! keys, e.g. `CANOPY_REQUEST__MAX_PROCESS_TIME_MS=5000`.

use std::path::{Path, PathBuf};

use config::{Config, Environment, File, FileFormat};
use tracing::debug;

use crate::{
    error::{ConfigError, Result},
    types::EngineSettings,
    validator::SettingsValidator,
};

const DEFAULT_ENV_PREFIX: &str = "CANOPY";

/// Loads [`EngineSettings`] from a file and the environment
pub struct SettingsLoader {
    /// Settings file path
    path: PathBuf,
    /// Environment prefix; `None` skips the environment layer
    env_prefix: Option<String>,
}

impl SettingsLoader {
    /// Create a loader for the default settings path
    pub fn new() -> Self {
        Self::with_path(Self::default_path())
    }

    /// Create with custom settings path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env_prefix: Some(DEFAULT_ENV_PREFIX.to_string()),
        }
    }

    /// Use a different environment prefix
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Ignore the environment entirely
    pub fn without_env(mut self) -> Self {
        self.env_prefix = None;
        self
    }

    /// Path this loader reads
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get default settings path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("canopy")
            .join("engine.toml")
    }

    /// Load and validate settings
    ///
    /// A missing file is not an error; defaults and the environment still apply.
    pub fn load(&self) -> Result<EngineSettings> {
        let mut builder =
            Config::builder().add_source(File::from(self.path.clone()).required(false));

        if let Some(prefix) = &self.env_prefix {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let settings: EngineSettings = builder.build()?.try_deserialize()?;
        SettingsValidator::validate(&settings)?;

        debug!(
            path = %self.path.display(),
            listeners = settings.listeners.len(),
            richlets = settings.richlets.len(),
            "Loaded engine settings"
        );
        Ok(settings)
    }

    /// Load settings from a file that must exist
    pub fn load_required(&self) -> Result<EngineSettings> {
        if !self.path.exists() {
            return Err(ConfigError::NotFound(self.path.display().to_string()));
        }
        self.load()
    }

    /// Save settings as TOML, creating parent directories as needed
    pub fn save(&self, settings: &EngineSettings) -> Result<()> {
        SettingsValidator::validate(settings)?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, settings.to_toml()?)?;
        Ok(())
    }

    /// Parse TOML content
    pub fn parse_toml(content: &str) -> Result<EngineSettings> {
        Self::parse(content, FileFormat::Toml)
    }

    /// Parse YAML content
    pub fn parse_yaml(content: &str) -> Result<EngineSettings> {
        Self::parse(content, FileFormat::Yaml)
    }

    fn parse(content: &str, format: FileFormat) -> Result<EngineSettings> {
        let settings: EngineSettings = Config::builder()
            .add_source(File::from_str(content, format))
            .build()?
            .try_deserialize()?;
        SettingsValidator::validate(&settings)?;
        Ok(settings)
    }
}

impl Default for SettingsLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let loader = SettingsLoader::with_path("/nonexistent/canopy/engine.toml").without_env();
        let settings = loader.load().unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[test]
    fn test_load_required_missing_file() {
        let loader = SettingsLoader::with_path("/nonexistent/canopy/engine.toml").without_env();
        assert!(matches!(
            loader.load_required(),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
listeners = ["audit", "timing"]
richlet_load_timeout_secs = 30

[request]
max_process_time_ms = 5000

[[richlets]]
name = "hello"
class = "demo.Hello"

[[richlet_mappings]]
name = "hello"
path = "/hello/*"
"#
        )
        .unwrap();

        let settings = SettingsLoader::with_path(file.path())
            .without_env()
            .load()
            .unwrap();

        assert_eq!(settings.listeners, vec!["audit", "timing"]);
        assert_eq!(settings.request.max_process_time_ms, 5000);
        assert_eq!(settings.request.max_upload_size_kb, 5120);
        assert_eq!(settings.richlet_load_timeout().as_secs(), 30);
        assert_eq!(settings.richlets[0].class, "demo.Hello");
        assert_eq!(settings.richlet_mappings[0].path, "/hello/*");
    }

    #[test]
    fn test_parse_yaml() {
        let settings = SettingsLoader::parse_yaml(
            r#"
error_pages:
  - error: engine.veto
    location: /errors/veto.zul
preferences:
  - name: MixedCase.Key
    value: kept
"#,
        )
        .unwrap();

        assert_eq!(settings.error_pages[0].device, "ajax");
        assert_eq!(settings.preferences[0].name, "MixedCase.Key");
    }

    #[test]
    fn test_parse_rejects_invalid_settings() {
        let result = SettingsLoader::parse_toml("richlet_load_timeout_secs = 0");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_env_overrides_file() {
        let prefix = "CANOPY_LOADER_TEST";
        std::env::set_var("CANOPY_LOADER_TEST_DESKTOP__MAX_PER_SESSION", "4");

        let settings = SettingsLoader::with_path("/nonexistent/engine.toml")
            .env_prefix(prefix)
            .load()
            .unwrap();

        std::env::remove_var("CANOPY_LOADER_TEST_DESKTOP__MAX_PER_SESSION");
        assert_eq!(settings.desktop.max_per_session, 4);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let loader = SettingsLoader::with_path(dir.path().join("nested/engine.toml")).without_env();

        let mut settings = EngineSettings::default();
        settings.theme_uris.push("/css/app.css".to_string());
        settings.threads.max_suspended = Some(8);
        loader.save(&settings).unwrap();

        let reloaded = loader.load_required().unwrap();
        assert_eq!(reloaded, settings);
    }
}
