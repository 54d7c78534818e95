//! Event interceptor chain

use std::{fmt, sync::Arc};

use tracing::{debug, error};

use crate::{
    context::Event,
    error::{HandlerResult, Result, VetoError},
    kind::HookKind,
    listener::{EventInterceptor, ListenerId},
    registry::HookList,
};

/// The four points at which interceptors see an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterceptPoint {
    BeforeSend,
    BeforePost,
    BeforeProcess,
    AfterProcess,
}

impl fmt::Display for InterceptPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InterceptPoint::BeforeSend => "before-send",
            InterceptPoint::BeforePost => "before-post",
            InterceptPoint::BeforeProcess => "before-process",
            InterceptPoint::AfterProcess => "after-process",
        })
    }
}

/// Ordered event interceptors
///
/// All four points walk the same snapshot order. In the "before" points each
/// interceptor receives the event returned by the previous one.
pub struct EventInterceptorChain {
    interceptors: HookList<Arc<dyn EventInterceptor>>,
}

impl EventInterceptorChain {
    pub(crate) fn new() -> Self {
        Self {
            interceptors: HookList::new(),
        }
    }

    pub(crate) fn add(&self, id: &ListenerId, interceptor: Arc<dyn EventInterceptor>) -> bool {
        self.interceptors.push_unique(id, interceptor)
    }

    pub(crate) fn remove(&self, id: &ListenerId) -> bool {
        self.interceptors.remove(id)
    }

    pub(crate) fn contains(&self, id: &ListenerId) -> bool {
        self.interceptors.contains(id)
    }

    pub fn ids(&self) -> Vec<ListenerId> {
        self.interceptors.ids()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    pub fn before_send_event(&self, event: Event) -> Result<Event> {
        self.thread(InterceptPoint::BeforeSend, event, |i, e| i.before_send_event(e))
    }

    pub fn before_post_event(&self, event: Event) -> Result<Event> {
        self.thread(InterceptPoint::BeforePost, event, |i, e| i.before_post_event(e))
    }

    pub fn before_process_event(&self, event: Event) -> Result<Event> {
        self.thread(InterceptPoint::BeforeProcess, event, |i, e| {
            i.before_process_event(e)
        })
    }

    /// Notify every interceptor; failures are logged and skipped
    pub fn after_process_event(&self, event: &Event) {
        for entry in self.interceptors.snapshot().iter() {
            if let Err(e) = entry.item.after_process_event(event) {
                error!(
                    hook = %HookKind::EventInterceptor,
                    listener = %entry.id,
                    point = %InterceptPoint::AfterProcess,
                    event = %event.name,
                    error = %e,
                    "Event interceptor failed"
                );
            }
        }
    }

    fn thread<F>(&self, point: InterceptPoint, mut event: Event, call: F) -> Result<Event>
    where
        F: Fn(&dyn EventInterceptor, Event) -> HandlerResult<Event>,
    {
        for entry in self.interceptors.snapshot().iter() {
            let name = event.name.clone();
            event = call(entry.item.as_ref(), event).map_err(|e| {
                debug!(listener = %entry.id, %point, event = %name, "Event intercepted");
                VetoError {
                    hook: HookKind::EventInterceptor,
                    listener: entry.id.clone(),
                    reason: format!("{}: {}", point, e),
                }
            })?;
        }
        Ok(event)
    }
}

impl Default for EventInterceptorChain {
    fn default() -> Self {
        Self::new()
    }
}
