//! Core settings types and data structures

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Main engine settings
///
/// Every field has a default, so a settings file only needs to name what it
/// overrides. Tunables are read by the engine, never computed by it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Desktop (browser tab) settings
    pub desktop: DesktopSettings,
    /// Session settings
    pub session: SessionSettings,
    /// Event processing thread settings
    pub threads: ThreadSettings,
    /// Request handling settings
    pub request: RequestSettings,
    /// Client-side behaviour pushed to the browser
    pub client: ClientSettings,
    /// How long a caller waits for another thread to finish loading a richlet
    pub richlet_load_timeout_secs: u64,
    /// Listener names, resolved through the engine's type catalog in order
    pub listeners: Vec<String>,
    /// Richlet definitions
    pub richlets: Vec<RichletSpec>,
    /// Richlet URL mappings
    pub richlet_mappings: Vec<RichletMappingSpec>,
    /// Error page mappings
    pub error_pages: Vec<ErrorPageSpec>,
    /// Free-form preferences
    pub preferences: Vec<PreferenceSpec>,
    /// Theme stylesheet URIs, in load order
    pub theme_uris: Vec<String>,
    /// Theme URIs that must not be loaded
    pub disabled_theme_uris: Vec<String>,
}

impl EngineSettings {
    /// Richlet load wait bound as a [`Duration`]
    pub fn richlet_load_timeout(&self) -> Duration {
        Duration::from_secs(self.richlet_load_timeout_secs)
    }

    /// Serialize to TOML
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string(self)?)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            desktop: DesktopSettings::default(),
            session: SessionSettings::default(),
            threads: ThreadSettings::default(),
            request: RequestSettings::default(),
            client: ClientSettings::default(),
            richlet_load_timeout_secs: 300,
            listeners: Vec::new(),
            richlets: Vec::new(),
            richlet_mappings: Vec::new(),
            error_pages: Vec::new(),
            preferences: Vec::new(),
            theme_uris: Vec::new(),
            disabled_theme_uris: Vec::new(),
        }
    }
}

/// Desktop-specific settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DesktopSettings {
    /// Seconds a desktop may stay idle before it is invalidated
    pub max_inactive_secs: u32,
    /// Maximum number of desktops per session
    pub max_per_session: u32,
    /// Keep the desktop when the user navigates away and back
    pub keep_across_visits: bool,
    /// Disable components that do not belong to the topmost modal window
    pub disable_behind_modal: bool,
}

impl Default for DesktopSettings {
    fn default() -> Self {
        Self {
            max_inactive_secs: 3600,
            max_per_session: 10,
            keep_across_visits: false,
            disable_behind_modal: true,
        }
    }
}

/// Session-specific settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SessionSettings {
    /// Seconds a session may stay idle; 0 keeps the container default
    pub max_inactive_secs: u32,
    /// Whether timer events keep the session alive
    pub timer_keep_alive: bool,
}

/// Event processing thread settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ThreadSettings {
    /// Process events on dedicated event threads
    pub event_thread_enabled: bool,
    /// Idle event threads kept around for reuse
    pub max_spare: u32,
    /// Maximum suspended event threads; `None` means unlimited
    pub max_suspended: Option<u32>,
}

impl Default for ThreadSettings {
    fn default() -> Self {
        Self {
            event_thread_enabled: true,
            max_spare: 100,
            max_suspended: None,
        }
    }
}

/// Request handling settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RequestSettings {
    /// Maximum upload size in kilobytes
    pub max_upload_size_kb: u32,
    /// Milliseconds spent processing events before the client is answered
    pub max_process_time_ms: u32,
    /// Charset of responses
    pub response_charset: String,
    /// Charset assumed for uploaded text
    pub upload_charset: String,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            max_upload_size_kb: 5120,
            max_process_time_ms: 3000,
            response_charset: "UTF-8".to_string(),
            upload_charset: "UTF-8".to_string(),
        }
    }
}

/// Client-side settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientSettings {
    /// Delay before the "processing" prompt shows up
    pub processing_prompt_delay_ms: u32,
    /// Delay before a tooltip shows up
    pub tooltip_delay_ms: u32,
    /// URIs the client reloads when the server answers with an error code
    pub error_reloads: Vec<ClientErrorReload>,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            processing_prompt_delay_ms: 900,
            tooltip_delay_ms: 800,
            error_reloads: [302, 401, 403]
                .into_iter()
                .map(|code| ClientErrorReload {
                    code,
                    uri: String::new(),
                })
                .collect(),
        }
    }
}

/// Reload target for one HTTP error code; an empty URI reloads the current page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientErrorReload {
    pub code: u16,
    pub uri: String,
}

/// Declarative richlet definition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RichletSpec {
    /// Logical richlet name
    pub name: String,
    /// Type name resolved through the engine's type catalog
    pub class: String,
    /// Init parameters handed to the richlet
    #[serde(default)]
    pub params: Vec<PreferenceSpec>,
}

/// Binds a richlet to a URL path; a trailing `/*` makes it a wildcard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RichletMappingSpec {
    pub name: String,
    pub path: String,
}

/// Maps an error class to a page location for one device type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPageSpec {
    #[serde(default = "default_device")]
    pub device: String,
    /// Dotted error class path, e.g. `engine.veto`
    pub error: String,
    pub location: String,
}

/// A name/value pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreferenceSpec {
    pub name: String,
    pub value: String,
}

fn default_device() -> String {
    "ajax".to_string()
}
