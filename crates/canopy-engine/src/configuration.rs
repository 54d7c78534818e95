//! The per-application configuration
//!
//! [`Configuration`] owns every registry the engine dispatches from. It is
//! shared by all request threads; each registry inside it is locked on its
//! own so unrelated activity does not serialise.
//!
//! # Examples
//!
//! ```ignore
//! let config = Configuration::new();
//! config.add_listener(&ListenerType::of::<Audit>().session_init().build())?;
//! config.add_richlet("hello", RichletSource::of::<Hello>(), BTreeMap::new())?;
//! config.add_richlet_mapping("hello", "/hello/*")?;
//!
//! let app = WebApp::bind("demo", config)?;
//! app.start();
//! ```

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, OnceLock},
};

use canopy_config::{EngineSettings, SettingsValidator};
use parking_lot::RwLock;
use tracing::{debug, error, info};

use crate::{
    catalog::TypeCatalog,
    context::{Desktop, Event, Execution, Session},
    error::{EngineError, HandlerResult, Result},
    error_page::{ErrorClass, ErrorPage, ErrorPages},
    kind::HookKind,
    listener::{ListenerId, ListenerType, Monitor, PerformanceMeter},
    registry::ListenerRegistry,
    richlet::{LoadContext, Richlet, RichletMappings, RichletResolver, RichletSource},
};

/// Listener registries, richlets, error pages and settings of one application
pub struct Configuration {
    pub(crate) listeners: ListenerRegistry,
    richlets: RichletResolver,
    richlet_mappings: RichletMappings,
    error_pages: ErrorPages,
    preferences: RwLock<HashMap<String, String>>,
    theme_uris: RwLock<Arc<Vec<String>>>,
    disabled_theme_uris: RwLock<Arc<Vec<String>>>,
    client_error_reloads: RwLock<BTreeMap<u16, String>>,
    settings: RwLock<EngineSettings>,
    catalog: RwLock<Arc<TypeCatalog>>,
    app_name: OnceLock<String>,
}

impl Configuration {
    /// Empty configuration with default settings
    pub fn new() -> Self {
        Self::with_settings(EngineSettings::default())
    }

    /// Empty registries with the given tunables
    ///
    /// Only the scalar settings and client error reloads are applied; use
    /// [`Configuration::from_settings`] to apply the declarative sections.
    pub fn with_settings(settings: EngineSettings) -> Self {
        let client_error_reloads = settings
            .client
            .error_reloads
            .iter()
            .map(|r| (r.code, r.uri.clone()))
            .collect();
        Self {
            listeners: ListenerRegistry::new(),
            richlets: RichletResolver::new(),
            richlet_mappings: RichletMappings::new(),
            error_pages: ErrorPages::new(),
            preferences: RwLock::new(HashMap::new()),
            theme_uris: RwLock::new(Arc::new(Vec::new())),
            disabled_theme_uris: RwLock::new(Arc::new(Vec::new())),
            client_error_reloads: RwLock::new(client_error_reloads),
            settings: RwLock::new(settings),
            catalog: RwLock::new(Arc::new(TypeCatalog::new())),
            app_name: OnceLock::new(),
        }
    }

    /// Build a configuration from validated settings
    ///
    /// Listeners are looked up in `catalog` and registered in file order;
    /// richlet classes are resolved through it when first loaded.
    pub fn from_settings(settings: &EngineSettings, catalog: Arc<TypeCatalog>) -> Result<Self> {
        SettingsValidator::validate(settings)?;
        let config = Self::with_settings(settings.clone());

        for name in &settings.listeners {
            config.add_listener(catalog.listener(name)?)?;
        }
        for spec in &settings.richlets {
            let params = spec
                .params
                .iter()
                .map(|p| (p.name.clone(), p.value.clone()))
                .collect();
            config.add_richlet(&spec.name, RichletSource::named(&spec.class), params)?;
        }
        for spec in &settings.richlet_mappings {
            config.add_richlet_mapping(&spec.name, &spec.path)?;
        }
        for spec in &settings.error_pages {
            config.add_error_page(&spec.device, ErrorClass::new(&spec.error), &spec.location)?;
        }
        for pref in &settings.preferences {
            config.set_preference(&pref.name, &pref.value)?;
        }
        for uri in &settings.theme_uris {
            config.add_theme_uri(uri)?;
        }
        for uri in &settings.disabled_theme_uris {
            config.add_disabled_theme_uri(uri)?;
        }
        *config.catalog.write() = catalog;

        info!(
            listeners = settings.listeners.len(),
            richlets = settings.richlets.len(),
            error_pages = settings.error_pages.len(),
            "Configuration built from settings"
        );
        Ok(config)
    }

    // Listeners

    /// Register a listener type under every kind it declares
    ///
    /// See [`ListenerRegistry::register`].
    pub fn add_listener(&self, listener: &ListenerType) -> Result<Vec<HookKind>> {
        self.listeners.register(listener)
    }

    /// Remove a listener type everywhere except the singleton slots
    pub fn remove_listener(&self, id: &ListenerId) -> Vec<HookKind> {
        self.listeners.unregister(id)
    }

    /// Remove the listener type built by [`ListenerType::of`] for `T`
    pub fn remove_listener_of<T: 'static>(&self) -> Vec<HookKind> {
        self.listeners.unregister(&ListenerId::of::<T>())
    }

    /// Kinds `id` is currently registered under
    pub fn listener_kinds(&self, id: &ListenerId) -> Vec<HookKind> {
        self.listeners.kinds_of(id)
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    pub fn monitor(&self) -> Option<Arc<dyn Monitor>> {
        self.listeners.monitor()
    }

    /// Replace the monitor, returning the previous one
    pub fn set_monitor(&self, monitor: Option<Arc<dyn Monitor>>) -> Option<Arc<dyn Monitor>> {
        self.listeners
            .set_monitor(ListenerId::new("monitor"), monitor)
    }

    pub fn performance_meter(&self) -> Option<Arc<dyn PerformanceMeter>> {
        self.listeners.performance_meter()
    }

    /// Replace the performance meter, returning the previous one
    pub fn set_performance_meter(
        &self,
        meter: Option<Arc<dyn PerformanceMeter>>,
    ) -> Option<Arc<dyn PerformanceMeter>> {
        self.listeners
            .set_performance_meter(ListenerId::new("performance-meter"), meter)
    }

    /// Forward a notification to the monitor, if any
    ///
    /// Monitor failures never fail the caller.
    pub fn notify_monitor<F>(&self, what: &str, notify: F)
    where
        F: FnOnce(&dyn Monitor) -> HandlerResult<()>,
    {
        if let Some(monitor) = self.monitor() {
            if let Err(e) = notify(monitor.as_ref()) {
                error!(hook = %HookKind::Monitor, notification = what, error = %e, "Monitor failed");
            }
        }
    }

    /// Forward timing to the performance meter, if any
    pub fn notify_performance_meter<F>(&self, what: &str, notify: F)
    where
        F: FnOnce(&dyn PerformanceMeter) -> HandlerResult<()>,
    {
        if let Some(meter) = self.performance_meter() {
            if let Err(e) = notify(meter.as_ref()) {
                error!(
                    hook = %HookKind::PerformanceMeter,
                    notification = what,
                    error = %e,
                    "Performance meter failed"
                );
            }
        }
    }

    pub fn notify_session_created(&self, session: &Session) {
        self.notify_monitor("session-created", |m| m.session_created(session));
    }

    pub fn notify_session_destroyed(&self, session: &Session) {
        self.notify_monitor("session-destroyed", |m| m.session_destroyed(session));
    }

    pub fn notify_desktop_created(&self, desktop: &Desktop) {
        self.notify_monitor("desktop-created", |m| m.desktop_created(desktop));
    }

    pub fn notify_desktop_destroyed(&self, desktop: &Desktop) {
        self.notify_monitor("desktop-destroyed", |m| m.desktop_destroyed(desktop));
    }

    pub fn notify_before_update(&self, desktop: &Desktop, requests: usize) {
        self.notify_monitor("before-update", |m| m.before_update(desktop, requests));
    }

    pub fn notify_after_update(&self, desktop: &Desktop) {
        self.notify_monitor("after-update", |m| m.after_update(desktop));
    }

    pub fn notify_request_start_at_server(&self, request_id: &str, exec: &Execution) {
        let now = chrono::Utc::now().timestamp_millis();
        self.notify_performance_meter("request-start-at-server", |p| {
            p.request_start_at_server(request_id, exec, now)
        });
    }

    pub fn notify_request_complete_at_server(&self, request_id: &str, exec: &Execution) {
        let now = chrono::Utc::now().timestamp_millis();
        self.notify_performance_meter("request-complete-at-server", |p| {
            p.request_complete_at_server(request_id, exec, now)
        });
    }

    // Event interceptors

    /// Run the interceptors before `event` is sent to the client
    pub fn before_send_event(&self, event: Event) -> Result<Event> {
        self.listeners.event_interceptors.before_send_event(event)
    }

    /// Run the interceptors before `event` is queued for processing
    pub fn before_post_event(&self, event: Event) -> Result<Event> {
        self.listeners.event_interceptors.before_post_event(event)
    }

    /// Run the interceptors before `event`'s handler
    pub fn before_process_event(&self, event: Event) -> Result<Event> {
        self.listeners.event_interceptors.before_process_event(event)
    }

    /// Notify the interceptors that `event` was processed
    pub fn after_process_event(&self, event: &Event) {
        self.listeners.event_interceptors.after_process_event(event)
    }

    // Richlets

    /// Define or redefine a richlet, returning the previous source
    pub fn add_richlet(
        &self,
        name: &str,
        source: RichletSource,
        params: BTreeMap<String, String>,
    ) -> Result<Option<RichletSource>> {
        let previous = self.richlets.add(name, source, params)?;
        debug!(richlet = name, replaced = previous.is_some(), "Richlet defined");
        Ok(previous)
    }

    /// Map `path` to a defined richlet
    ///
    /// `path` must start with `/` unless it is empty; a trailing `/*` maps
    /// every path below it.
    pub fn add_richlet_mapping(&self, name: &str, path: &str) -> Result<()> {
        if !self.richlets.contains(name) {
            return Err(EngineError::RichletNotDefined(name.to_string()));
        }
        self.richlet_mappings.add(name, path)
    }

    /// The richlet named `name`, loading it on first use
    pub fn richlet(&self, name: &str) -> Result<Arc<dyn Richlet>> {
        let catalog = Arc::clone(&self.catalog.read());
        let timeout = self.settings.read().richlet_load_timeout();
        let ctx = LoadContext {
            app_name: self.app_name.get().map(String::as_str),
            catalog: &catalog,
            timeout,
        };
        self.richlets.resolve(name, &ctx)
    }

    /// The richlet serving `path`, if any mapping covers it
    pub fn richlet_by_path(&self, path: &str) -> Result<Option<Arc<dyn Richlet>>> {
        for name in self.richlet_mappings.candidates(path) {
            match self.richlet(&name) {
                Ok(richlet) => return Ok(Some(richlet)),
                Err(EngineError::RichletNotDefined(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    pub fn richlet_names(&self) -> Vec<String> {
        self.richlets.names()
    }

    /// Destroy every loaded richlet and drop all definitions
    pub fn destroy_richlets(&self) {
        self.richlets.destroy_all();
    }

    /// Replace the catalog used to resolve named richlet classes
    pub fn set_catalog(&self, catalog: Arc<TypeCatalog>) {
        *self.catalog.write() = catalog;
    }

    // Error pages

    /// Map an error class to a page for `device`; returns the previous location
    pub fn add_error_page(
        &self,
        device: &str,
        class: ErrorClass,
        location: &str,
    ) -> Result<Option<String>> {
        self.error_pages.add(device, class, location)
    }

    /// Page for an error of `class` on `device`
    pub fn error_page(&self, device: &str, class: &ErrorClass) -> Option<String> {
        self.error_pages.lookup(device, class)
    }

    /// Page for an error of `class` on the default device type
    pub fn default_error_page(&self, class: &ErrorClass) -> Option<String> {
        self.error_pages.lookup_default(class)
    }

    /// Page for `err` on `device`
    pub fn error_page_for(&self, device: &str, err: &EngineError) -> Option<String> {
        self.error_pages.lookup(device, &err.class())
    }

    pub fn error_pages(&self, device: &str) -> Vec<ErrorPage> {
        self.error_pages.pages(device)
    }

    // Themes

    /// Append a theme URI
    pub fn add_theme_uri(&self, uri: &str) -> Result<()> {
        push_uri(&self.theme_uris, uri)
    }

    /// Theme URIs in load order
    pub fn theme_uris(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.theme_uris.read())
    }

    /// Append a theme URI that must not be loaded
    pub fn add_disabled_theme_uri(&self, uri: &str) -> Result<()> {
        push_uri(&self.disabled_theme_uris, uri)
    }

    pub fn disabled_theme_uris(&self) -> Arc<Vec<String>> {
        Arc::clone(&self.disabled_theme_uris.read())
    }

    // Preferences

    /// Set a preference, returning the previous value
    pub fn set_preference(&self, name: &str, value: &str) -> Result<Option<String>> {
        if name.is_empty() {
            return Err(EngineError::InvalidArgument("empty preference name".to_string()));
        }
        Ok(self
            .preferences
            .write()
            .insert(name.to_string(), value.to_string()))
    }

    /// Preference `name`, or `default` when unset
    pub fn preference(&self, name: &str, default: Option<&str>) -> Option<String> {
        self.preferences
            .read()
            .get(name)
            .cloned()
            .or_else(|| default.map(str::to_string))
    }

    pub fn preference_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.preferences.read().keys().cloned().collect();
        names.sort();
        names
    }

    // Client error reloads

    /// Set or clear the URI the client reloads on HTTP `code`
    ///
    /// An empty URI reloads the current page. Returns the previous URI.
    pub fn add_client_error_reload(&self, code: u16, uri: Option<&str>) -> Option<String> {
        let mut reloads = self.client_error_reloads.write();
        match uri {
            Some(uri) => reloads.insert(code, uri.to_string()),
            None => reloads.remove(&code),
        }
    }

    pub fn client_error_reload(&self, code: u16) -> Option<String> {
        self.client_error_reloads.read().get(&code).cloned()
    }

    pub fn client_error_reload_codes(&self) -> Vec<u16> {
        self.client_error_reloads.read().keys().copied().collect()
    }

    // Settings

    /// Copy of the current settings
    pub fn settings(&self) -> EngineSettings {
        self.settings.read().clone()
    }

    /// Change tunables in place
    pub fn update_settings<F: FnOnce(&mut EngineSettings)>(&self, update: F) {
        update(&mut self.settings.write());
    }

    /// Name of the application this configuration is bound to
    pub fn app_name(&self) -> Option<&str> {
        self.app_name.get().map(String::as_str)
    }

    pub(crate) fn bind_app_name(&self, name: &str) -> Result<()> {
        self.app_name.set(name.to_string()).map_err(|_| {
            EngineError::Configuration(format!(
                "Configuration already bound to {}",
                self.app_name().unwrap_or_default()
            ))
        })
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

fn push_uri(list: &RwLock<Arc<Vec<String>>>, uri: &str) -> Result<()> {
    if uri.is_empty() {
        return Err(EngineError::InvalidArgument("empty theme URI".to_string()));
    }
    let mut uris = list.write();
    Arc::make_mut(&mut uris).push(uri.to_string());
    Ok(())
}
