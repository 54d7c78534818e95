//! Canopy engine settings
//!
//! This crate holds the declarative side of the Canopy UI engine: the typed
//! settings model, layered loading (file, then environment) and validation.
//! The engine crate reads these values; nothing here computes them.
//!
//! # Settings File Format
//!
//! ```toml
//! listeners = ["audit"]
//! richlet_load_timeout_secs = 300
//!
//! [request]
//! max_process_time_ms = 3000
//!
//! [[richlets]]
//! name = "hello"
//! class = "demo.Hello"
//!
//! [[richlet_mappings]]
//! name = "hello"
//! path = "/hello/*"
//!
//! [[error_pages]]
//! error = "engine.veto"
//! location = "/errors/denied.zul"
//! ```

pub mod error;
pub mod loader;
pub mod types;
pub mod validator;

pub use error::{ConfigError, Result};
pub use loader::SettingsLoader;
pub use types::{
    ClientErrorReload, ClientSettings, DesktopSettings, EngineSettings, ErrorPageSpec,
    PreferenceSpec, RequestSettings, RichletMappingSpec, RichletSpec, SessionSettings,
    ThreadSettings,
};
pub use validator::SettingsValidator;
