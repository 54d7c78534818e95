//! Listener type descriptors
//!
//! A [`ListenerType`] is the registry's view of a handler type: a stable id
//! plus one factory per capability the type declared. Capabilities are added
//! through builder methods whose trait bounds are checked at compile time.

use std::{fmt, sync::Arc};

use super::{
    DesktopCleanup, DesktopInit, EventInterceptor, EventThreadCleanup, EventThreadInit,
    EventThreadResume, EventThreadSuspend, ExecutionCleanup, ExecutionInit, Monitor,
    PerformanceMeter, RequestInterceptor, SessionCleanup, SessionInit, UriInterceptor,
    WebAppCleanup, WebAppInit,
};
use crate::{error::HandlerResult, kind::HookKind};

/// Builds a fresh handler for one invocation
pub(crate) type Factory<D> = Arc<dyn Fn() -> HandlerResult<Box<D>> + Send + Sync>;

/// Builds the shared handler kept by the registry
pub(crate) type SharedFactory<D> = Arc<dyn Fn() -> HandlerResult<Arc<D>> + Send + Sync>;

type Make<T> = Arc<dyn Fn() -> HandlerResult<T> + Send + Sync>;

/// Stable identity of a listener type
///
/// Registration and removal are keyed by this id, so registering the same
/// type twice under one kind is detected and removal needs no instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(Arc<str>);

impl ListenerId {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Id derived from a Rust type, as used by [`ListenerType::of`]
    pub fn of<T: 'static>() -> Self {
        Self(Arc::from(std::any::type_name::<T>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One factory slot per hook kind
#[derive(Clone, Default)]
pub(crate) struct Capabilities {
    pub monitor: Option<SharedFactory<dyn Monitor>>,
    pub performance_meter: Option<SharedFactory<dyn PerformanceMeter>>,
    pub event_thread_init: Option<Factory<dyn EventThreadInit>>,
    pub event_thread_cleanup: Option<Factory<dyn EventThreadCleanup>>,
    pub event_thread_suspend: Option<Factory<dyn EventThreadSuspend>>,
    pub event_thread_resume: Option<Factory<dyn EventThreadResume>>,
    pub web_app_init: Option<Factory<dyn WebAppInit>>,
    pub web_app_cleanup: Option<Factory<dyn WebAppCleanup>>,
    pub session_init: Option<Factory<dyn SessionInit>>,
    pub session_cleanup: Option<Factory<dyn SessionCleanup>>,
    pub desktop_init: Option<Factory<dyn DesktopInit>>,
    pub desktop_cleanup: Option<Factory<dyn DesktopCleanup>>,
    pub execution_init: Option<Factory<dyn ExecutionInit>>,
    pub execution_cleanup: Option<Factory<dyn ExecutionCleanup>>,
    pub uri_interceptor: Option<SharedFactory<dyn UriInterceptor>>,
    pub request_interceptor: Option<SharedFactory<dyn RequestInterceptor>>,
    pub event_interceptor: Option<SharedFactory<dyn EventInterceptor>>,
}

impl Capabilities {
    pub fn supports(&self, kind: HookKind) -> bool {
        match kind {
            HookKind::Monitor => self.monitor.is_some(),
            HookKind::PerformanceMeter => self.performance_meter.is_some(),
            HookKind::EventThreadInit => self.event_thread_init.is_some(),
            HookKind::EventThreadCleanup => self.event_thread_cleanup.is_some(),
            HookKind::EventThreadSuspend => self.event_thread_suspend.is_some(),
            HookKind::EventThreadResume => self.event_thread_resume.is_some(),
            HookKind::WebAppInit => self.web_app_init.is_some(),
            HookKind::WebAppCleanup => self.web_app_cleanup.is_some(),
            HookKind::SessionInit => self.session_init.is_some(),
            HookKind::SessionCleanup => self.session_cleanup.is_some(),
            HookKind::DesktopInit => self.desktop_init.is_some(),
            HookKind::DesktopCleanup => self.desktop_cleanup.is_some(),
            HookKind::ExecutionInit => self.execution_init.is_some(),
            HookKind::ExecutionCleanup => self.execution_cleanup.is_some(),
            HookKind::UriInterceptor => self.uri_interceptor.is_some(),
            HookKind::RequestInterceptor => self.request_interceptor.is_some(),
            HookKind::EventInterceptor => self.event_interceptor.is_some(),
        }
    }

    pub fn kinds(&self) -> Vec<HookKind> {
        HookKind::ALL
            .into_iter()
            .filter(|kind| self.supports(*kind))
            .collect()
    }
}

/// A registrable handler type
///
/// Cheap to clone; the capability table is shared.
#[derive(Clone)]
pub struct ListenerType {
    id: ListenerId,
    caps: Arc<Capabilities>,
}

impl ListenerType {
    /// Describe `T`, constructed with `T::default()`
    pub fn of<T>() -> ListenerTypeBuilder<T>
    where
        T: Default + 'static,
    {
        ListenerTypeBuilder {
            id: ListenerId::of::<T>(),
            make: Arc::new(|| Ok(T::default())),
            caps: Capabilities::default(),
        }
    }

    /// Describe `T` under an explicit name with a fallible constructor
    pub fn with_factory<T, F>(name: impl Into<Arc<str>>, factory: F) -> ListenerTypeBuilder<T>
    where
        T: 'static,
        F: Fn() -> HandlerResult<T> + Send + Sync + 'static,
    {
        ListenerTypeBuilder {
            id: ListenerId::new(name),
            make: Arc::new(factory),
            caps: Capabilities::default(),
        }
    }

    pub fn id(&self) -> &ListenerId {
        &self.id
    }

    /// Declared hook kinds, in [`HookKind::ALL`] order
    pub fn kinds(&self) -> Vec<HookKind> {
        self.caps.kinds()
    }

    pub fn supports(&self, kind: HookKind) -> bool {
        self.caps.supports(kind)
    }

    pub(crate) fn capabilities(&self) -> &Capabilities {
        &self.caps
    }
}

impl fmt::Debug for ListenerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerType")
            .field("id", &self.id)
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Declares the capabilities of a listener type
///
/// Each method is only available when `T` implements the matching trait.
pub struct ListenerTypeBuilder<T> {
    id: ListenerId,
    make: Make<T>,
    caps: Capabilities,
}

impl<T: 'static> ListenerTypeBuilder<T> {
    fn boxed<D: ?Sized + 'static>(&self, cast: fn(T) -> Box<D>) -> Factory<D> {
        let make = Arc::clone(&self.make);
        Arc::new(move || make().map(cast))
    }

    fn shared<D: ?Sized + 'static>(&self, cast: fn(T) -> Arc<D>) -> SharedFactory<D> {
        let make = Arc::clone(&self.make);
        Arc::new(move || make().map(cast))
    }

    pub fn monitor(mut self) -> Self
    where
        T: Monitor,
    {
        self.caps.monitor = Some(self.shared(|t| Arc::new(t) as Arc<dyn Monitor>));
        self
    }

    pub fn performance_meter(mut self) -> Self
    where
        T: PerformanceMeter,
    {
        self.caps.performance_meter =
            Some(self.shared(|t| Arc::new(t) as Arc<dyn PerformanceMeter>));
        self
    }

    pub fn event_thread_init(mut self) -> Self
    where
        T: EventThreadInit,
    {
        self.caps.event_thread_init = Some(self.boxed(|t| Box::new(t) as Box<dyn EventThreadInit>));
        self
    }

    pub fn event_thread_cleanup(mut self) -> Self
    where
        T: EventThreadCleanup,
    {
        self.caps.event_thread_cleanup =
            Some(self.boxed(|t| Box::new(t) as Box<dyn EventThreadCleanup>));
        self
    }

    pub fn event_thread_suspend(mut self) -> Self
    where
        T: EventThreadSuspend,
    {
        self.caps.event_thread_suspend =
            Some(self.boxed(|t| Box::new(t) as Box<dyn EventThreadSuspend>));
        self
    }

    pub fn event_thread_resume(mut self) -> Self
    where
        T: EventThreadResume,
    {
        self.caps.event_thread_resume =
            Some(self.boxed(|t| Box::new(t) as Box<dyn EventThreadResume>));
        self
    }

    pub fn web_app_init(mut self) -> Self
    where
        T: WebAppInit,
    {
        self.caps.web_app_init = Some(self.boxed(|t| Box::new(t) as Box<dyn WebAppInit>));
        self
    }

    pub fn web_app_cleanup(mut self) -> Self
    where
        T: WebAppCleanup,
    {
        self.caps.web_app_cleanup = Some(self.boxed(|t| Box::new(t) as Box<dyn WebAppCleanup>));
        self
    }

    pub fn session_init(mut self) -> Self
    where
        T: SessionInit,
    {
        self.caps.session_init = Some(self.boxed(|t| Box::new(t) as Box<dyn SessionInit>));
        self
    }

    pub fn session_cleanup(mut self) -> Self
    where
        T: SessionCleanup,
    {
        self.caps.session_cleanup = Some(self.boxed(|t| Box::new(t) as Box<dyn SessionCleanup>));
        self
    }

    pub fn desktop_init(mut self) -> Self
    where
        T: DesktopInit,
    {
        self.caps.desktop_init = Some(self.boxed(|t| Box::new(t) as Box<dyn DesktopInit>));
        self
    }

    pub fn desktop_cleanup(mut self) -> Self
    where
        T: DesktopCleanup,
    {
        self.caps.desktop_cleanup = Some(self.boxed(|t| Box::new(t) as Box<dyn DesktopCleanup>));
        self
    }

    pub fn execution_init(mut self) -> Self
    where
        T: ExecutionInit,
    {
        self.caps.execution_init = Some(self.boxed(|t| Box::new(t) as Box<dyn ExecutionInit>));
        self
    }

    pub fn execution_cleanup(mut self) -> Self
    where
        T: ExecutionCleanup,
    {
        self.caps.execution_cleanup =
            Some(self.boxed(|t| Box::new(t) as Box<dyn ExecutionCleanup>));
        self
    }

    pub fn uri_interceptor(mut self) -> Self
    where
        T: UriInterceptor,
    {
        self.caps.uri_interceptor = Some(self.shared(|t| Arc::new(t) as Arc<dyn UriInterceptor>));
        self
    }

    pub fn request_interceptor(mut self) -> Self
    where
        T: RequestInterceptor,
    {
        self.caps.request_interceptor =
            Some(self.shared(|t| Arc::new(t) as Arc<dyn RequestInterceptor>));
        self
    }

    pub fn event_interceptor(mut self) -> Self
    where
        T: EventInterceptor,
    {
        self.caps.event_interceptor =
            Some(self.shared(|t| Arc::new(t) as Arc<dyn EventInterceptor>));
        self
    }

    /// Finish the descriptor
    ///
    /// A descriptor with no capability is still built; the registry rejects
    /// it at registration.
    pub fn build(self) -> ListenerType {
        ListenerType {
            id: self.id,
            caps: Arc::new(self.caps),
        }
    }
}
