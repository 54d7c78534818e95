//! Listener registry
//!
//! Holds one ordered list per hook kind plus the two singleton slots. Each
//! list is guarded independently and read through snapshots, so registration
//! never blocks an unrelated dispatch and a dispatch never observes a list
//! mid-mutation.
//!
//! Per-invocation kinds store the factory; the lifecycle invoker builds fresh
//! handlers from it on every dispatch. Monitor, performance meter and the
//! three interceptor kinds are constructed once, here, at registration.
//!
//! # Examples
//!
//! ```ignore
//! let registry = ListenerRegistry::new();
//! let audit = ListenerType::of::<Audit>().session_init().session_cleanup().build();
//!
//! registry.register(&audit)?;
//! assert!(registry.kinds_of(audit.id()).contains(&HookKind::SessionInit));
//!
//! registry.unregister(audit.id());
//! registry.unregister(audit.id()); // absent: no-op
//! ```

mod hook_list;

pub(crate) use hook_list::{HookList, Registered};

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info};

use crate::{
    dispatcher::EventInterceptorChain,
    error::{EngineError, Result},
    kind::HookKind,
    listener::{
        DesktopCleanup, DesktopInit, EventThreadCleanup, EventThreadInit, EventThreadResume,
        EventThreadSuspend, ExecutionCleanup, ExecutionInit, Factory, ListenerId, ListenerType,
        Monitor, PerformanceMeter, RequestInterceptor, SessionCleanup, SessionInit,
        SharedFactory, UriInterceptor, WebAppCleanup, WebAppInit,
    },
};

/// Registered listeners of one configuration
pub struct ListenerRegistry {
    /// Serialises register/unregister so singleton checks and list updates
    /// form one step
    writer: Mutex<()>,
    monitor: RwLock<Option<Registered<Arc<dyn Monitor>>>>,
    performance_meter: RwLock<Option<Registered<Arc<dyn PerformanceMeter>>>>,
    pub(crate) event_thread_inits: HookList<Factory<dyn EventThreadInit>>,
    pub(crate) event_thread_cleanups: HookList<Factory<dyn EventThreadCleanup>>,
    pub(crate) event_thread_suspends: HookList<Factory<dyn EventThreadSuspend>>,
    pub(crate) event_thread_resumes: HookList<Factory<dyn EventThreadResume>>,
    pub(crate) web_app_inits: HookList<Factory<dyn WebAppInit>>,
    pub(crate) web_app_cleanups: HookList<Factory<dyn WebAppCleanup>>,
    pub(crate) session_inits: HookList<Factory<dyn SessionInit>>,
    pub(crate) session_cleanups: HookList<Factory<dyn SessionCleanup>>,
    pub(crate) desktop_inits: HookList<Factory<dyn DesktopInit>>,
    pub(crate) desktop_cleanups: HookList<Factory<dyn DesktopCleanup>>,
    pub(crate) execution_inits: HookList<Factory<dyn ExecutionInit>>,
    pub(crate) execution_cleanups: HookList<Factory<dyn ExecutionCleanup>>,
    pub(crate) uri_interceptors: HookList<Arc<dyn UriInterceptor>>,
    pub(crate) request_interceptors: HookList<Arc<dyn RequestInterceptor>>,
    pub(crate) event_interceptors: EventInterceptorChain,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(()),
            monitor: RwLock::new(None),
            performance_meter: RwLock::new(None),
            event_thread_inits: HookList::new(),
            event_thread_cleanups: HookList::new(),
            event_thread_suspends: HookList::new(),
            event_thread_resumes: HookList::new(),
            web_app_inits: HookList::new(),
            web_app_cleanups: HookList::new(),
            session_inits: HookList::new(),
            session_cleanups: HookList::new(),
            desktop_inits: HookList::new(),
            desktop_cleanups: HookList::new(),
            execution_inits: HookList::new(),
            execution_cleanups: HookList::new(),
            uri_interceptors: HookList::new(),
            request_interceptors: HookList::new(),
            event_interceptors: EventInterceptorChain::new(),
        }
    }

    /// Register a listener type under every kind it declares
    ///
    /// Returns the kinds it was newly added to. Kinds already holding the
    /// same id are skipped.
    ///
    /// # Errors
    ///
    /// [`EngineError::Configuration`] if the type declares no capability, if
    /// it is a monitor or performance meter while one is already set, or if
    /// constructing the singleton fails. The registry is unchanged in each
    /// case.
    pub fn register(&self, listener: &ListenerType) -> Result<Vec<HookKind>> {
        let id = listener.id();
        let caps = listener.capabilities();
        if caps.kinds().is_empty() {
            return Err(EngineError::Configuration(format!(
                "{} implements no listener capability",
                id
            )));
        }

        let _writer = self.writer.lock();

        let monitor = match &caps.monitor {
            Some(factory) => Some(self.build_singleton(
                HookKind::Monitor,
                id,
                self.monitor.read().as_ref().map(|m| m.id.clone()),
                factory,
            )?),
            None => None,
        };
        let meter = match &caps.performance_meter {
            Some(factory) => Some(self.build_singleton(
                HookKind::PerformanceMeter,
                id,
                self.performance_meter.read().as_ref().map(|m| m.id.clone()),
                factory,
            )?),
            None => None,
        };

        let mut added = Vec::new();
        if let Some(item) = monitor {
            *self.monitor.write() = Some(Registered {
                id: id.clone(),
                item,
            });
            added.push(HookKind::Monitor);
        }
        if let Some(item) = meter {
            *self.performance_meter.write() = Some(Registered {
                id: id.clone(),
                item,
            });
            added.push(HookKind::PerformanceMeter);
        }

        macro_rules! per_invocation {
            ($($field:ident => $list:ident, $kind:expr;)*) => {$(
                if let Some(factory) = &caps.$field {
                    if self.$list.push_unique(id, Arc::clone(factory)) {
                        added.push($kind);
                    }
                }
            )*};
        }
        per_invocation! {
            event_thread_init => event_thread_inits, HookKind::EventThreadInit;
            event_thread_cleanup => event_thread_cleanups, HookKind::EventThreadCleanup;
            event_thread_suspend => event_thread_suspends, HookKind::EventThreadSuspend;
            event_thread_resume => event_thread_resumes, HookKind::EventThreadResume;
            web_app_init => web_app_inits, HookKind::WebAppInit;
            web_app_cleanup => web_app_cleanups, HookKind::WebAppCleanup;
            session_init => session_inits, HookKind::SessionInit;
            session_cleanup => session_cleanups, HookKind::SessionCleanup;
            desktop_init => desktop_inits, HookKind::DesktopInit;
            desktop_cleanup => desktop_cleanups, HookKind::DesktopCleanup;
            execution_init => execution_inits, HookKind::ExecutionInit;
            execution_cleanup => execution_cleanups, HookKind::ExecutionCleanup;
        }

        if let Some(factory) = &caps.uri_interceptor {
            if !self.uri_interceptors.contains(id) {
                if let Some(item) = construct(HookKind::UriInterceptor, id, factory) {
                    self.uri_interceptors.push_unique(id, item);
                    added.push(HookKind::UriInterceptor);
                }
            }
        }
        if let Some(factory) = &caps.request_interceptor {
            if !self.request_interceptors.contains(id) {
                if let Some(item) = construct(HookKind::RequestInterceptor, id, factory) {
                    self.request_interceptors.push_unique(id, item);
                    added.push(HookKind::RequestInterceptor);
                }
            }
        }
        if let Some(factory) = &caps.event_interceptor {
            if !self.event_interceptors.contains(id) {
                if let Some(item) = construct(HookKind::EventInterceptor, id, factory) {
                    self.event_interceptors.add(id, item);
                    added.push(HookKind::EventInterceptor);
                }
            }
        }

        info!(listener = %id, kinds = ?added, "Registered listener");
        Ok(added)
    }

    fn build_singleton<D: ?Sized>(
        &self,
        kind: HookKind,
        id: &ListenerId,
        current: Option<ListenerId>,
        factory: &SharedFactory<D>,
    ) -> Result<Arc<D>> {
        if let Some(current) = current {
            return Err(EngineError::Configuration(format!(
                "Unable to register {} as {}: {} is already set",
                id, kind, current
            )));
        }
        factory().map_err(|e| {
            EngineError::Configuration(format!("Unable to construct {} {}: {}", kind, id, e))
        })
    }

    /// Remove a listener type from every list and the interceptor chain
    ///
    /// Returns the kinds it was removed from; absent ids are a no-op. The
    /// monitor and performance meter are not touched; replace them with
    /// [`ListenerRegistry::set_monitor`] and
    /// [`ListenerRegistry::set_performance_meter`].
    pub fn unregister(&self, id: &ListenerId) -> Vec<HookKind> {
        let _writer = self.writer.lock();
        let mut removed = Vec::new();

        macro_rules! remove_from {
            ($($list:ident, $kind:expr;)*) => {$(
                if self.$list.remove(id) {
                    removed.push($kind);
                }
            )*};
        }
        remove_from! {
            event_thread_inits, HookKind::EventThreadInit;
            event_thread_cleanups, HookKind::EventThreadCleanup;
            event_thread_suspends, HookKind::EventThreadSuspend;
            event_thread_resumes, HookKind::EventThreadResume;
            web_app_inits, HookKind::WebAppInit;
            web_app_cleanups, HookKind::WebAppCleanup;
            session_inits, HookKind::SessionInit;
            session_cleanups, HookKind::SessionCleanup;
            desktop_inits, HookKind::DesktopInit;
            desktop_cleanups, HookKind::DesktopCleanup;
            execution_inits, HookKind::ExecutionInit;
            execution_cleanups, HookKind::ExecutionCleanup;
            uri_interceptors, HookKind::UriInterceptor;
            request_interceptors, HookKind::RequestInterceptor;
        }
        if self.event_interceptors.remove(id) {
            removed.push(HookKind::EventInterceptor);
        }

        if removed.is_empty() {
            debug!(listener = %id, "Listener not registered, nothing to remove");
        } else {
            info!(listener = %id, kinds = ?removed, "Unregistered listener");
        }
        removed
    }

    /// Kinds `id` is currently registered under
    pub fn kinds_of(&self, id: &ListenerId) -> Vec<HookKind> {
        HookKind::ALL
            .into_iter()
            .filter(|kind| self.ids(*kind).contains(id))
            .collect()
    }

    /// Ids registered under `kind`, in invocation order
    pub fn ids(&self, kind: HookKind) -> Vec<ListenerId> {
        match kind {
            HookKind::Monitor => self.monitor.read().iter().map(|m| m.id.clone()).collect(),
            HookKind::PerformanceMeter => self
                .performance_meter
                .read()
                .iter()
                .map(|m| m.id.clone())
                .collect(),
            HookKind::EventThreadInit => self.event_thread_inits.ids(),
            HookKind::EventThreadCleanup => self.event_thread_cleanups.ids(),
            HookKind::EventThreadSuspend => self.event_thread_suspends.ids(),
            HookKind::EventThreadResume => self.event_thread_resumes.ids(),
            HookKind::WebAppInit => self.web_app_inits.ids(),
            HookKind::WebAppCleanup => self.web_app_cleanups.ids(),
            HookKind::SessionInit => self.session_inits.ids(),
            HookKind::SessionCleanup => self.session_cleanups.ids(),
            HookKind::DesktopInit => self.desktop_inits.ids(),
            HookKind::DesktopCleanup => self.desktop_cleanups.ids(),
            HookKind::ExecutionInit => self.execution_inits.ids(),
            HookKind::ExecutionCleanup => self.execution_cleanups.ids(),
            HookKind::UriInterceptor => self.uri_interceptors.ids(),
            HookKind::RequestInterceptor => self.request_interceptors.ids(),
            HookKind::EventInterceptor => self.event_interceptors.ids(),
        }
    }

    pub fn event_interceptors(&self) -> &EventInterceptorChain {
        &self.event_interceptors
    }

    pub fn monitor(&self) -> Option<Arc<dyn Monitor>> {
        self.monitor.read().as_ref().map(|m| Arc::clone(&m.item))
    }

    pub fn performance_meter(&self) -> Option<Arc<dyn PerformanceMeter>> {
        self.performance_meter
            .read()
            .as_ref()
            .map(|m| Arc::clone(&m.item))
    }

    /// Replace the monitor, returning the previous one
    pub fn set_monitor(
        &self,
        id: ListenerId,
        monitor: Option<Arc<dyn Monitor>>,
    ) -> Option<Arc<dyn Monitor>> {
        let _writer = self.writer.lock();
        let next = monitor.map(|item| Registered { id, item });
        std::mem::replace(&mut *self.monitor.write(), next).map(|m| m.item)
    }

    /// Replace the performance meter, returning the previous one
    pub fn set_performance_meter(
        &self,
        id: ListenerId,
        meter: Option<Arc<dyn PerformanceMeter>>,
    ) -> Option<Arc<dyn PerformanceMeter>> {
        let _writer = self.writer.lock();
        let next = meter.map(|item| Registered { id, item });
        std::mem::replace(&mut *self.performance_meter.write(), next).map(|m| m.item)
    }
}

impl Default for ListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a construct-now interceptor, logging and skipping on failure
fn construct<D: ?Sized>(
    kind: HookKind,
    id: &ListenerId,
    factory: &SharedFactory<D>,
) -> Option<Arc<D>> {
    match factory() {
        Ok(item) => Some(item),
        Err(e) => {
            error!(hook = %kind, listener = %id, error = %e, "Unable to construct listener, skipped");
            None
        }
    }
}
