//! Running application

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::{configuration::Configuration, error::Result};

/// An application bound to its configuration
///
/// Binding consumes the configuration, so one configuration serves exactly
/// one application.
pub struct WebApp {
    name: String,
    config: Configuration,
    started: AtomicBool,
}

impl WebApp {
    /// Bind `config` to a new application named `name`
    pub fn bind(name: impl Into<String>, config: Configuration) -> Result<Self> {
        let name = name.into();
        config.bind_app_name(&name)?;
        Ok(Self {
            name,
            config,
            started: AtomicBool::new(false),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Run the app-init listeners; later calls do nothing
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            warn!(app = %self.name, "Application already started");
            return;
        }
        self.config.on_app_init(self);
        info!(app = %self.name, "Application started");
    }

    /// Run the app-cleanup listeners, then destroy every richlet
    pub fn shutdown(self) {
        self.config.on_app_cleanup(&self);
        self.config.destroy_richlets();
        info!(app = %self.name, "Application stopped");
    }
}
