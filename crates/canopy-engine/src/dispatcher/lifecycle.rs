//! Lifecycle hook invocation
//!
//! Three dispatch policies:
//!
//! - **veto**: thread start, suspend, resume and the session, desktop and
//!   execution init hooks. The first failing handler aborts the whole call
//!   with [`EngineError::Veto`]; no later phase runs.
//! - **best effort**: every cleanup hook, app init and the second phases of
//!   suspend and abort. Each failure is logged, optionally appended to the
//!   caller's [`ErrorSink`], and the next handler still runs.
//! - **first failure**: URI and request interceptors, which reject the
//!   request on the first error.
//!
//! Handlers are built fresh for each call from the factory registered for
//! their type. The instances built for a paired hook travel with the value
//! returned from the first phase, so the second phase sees the same objects.

use std::{any::Any, fmt};

use thiserror::Error;
use tracing::{debug, error};

use crate::{
    app::WebApp,
    configuration::Configuration,
    context::{Component, Desktop, Event, Execution, Request, Response, Session},
    error::{EngineError, ErrorSink, HandlerError, HandlerFailure, HandlerResult, Result, VetoError},
    kind::HookKind,
    listener::{
        EventThreadCleanup, EventThreadInit, EventThreadResume, EventThreadSuspend, Factory,
        ListenerId,
    },
    registry::HookList,
};

type Built<D> = Vec<(ListenerId, Box<D>)>;

/// Handlers that accepted an event thread; see [`Configuration::on_thread_start`]
pub struct EventThreadInits {
    handlers: Built<dyn EventThreadInit>,
}

impl EventThreadInits {
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the commit phase
    ///
    /// Returns `Ok(false)` as soon as a handler asks to ignore the event; the
    /// remaining handlers are not called.
    pub fn init(mut self, comp: &Component, event: &Event) -> Result<bool> {
        for (id, handler) in self.handlers.iter_mut() {
            match handler.init(comp, event) {
                Ok(true) => {}
                Ok(false) => {
                    debug!(listener = %id, event = %event.name, "Event ignored by thread init");
                    return Ok(false);
                }
                Err(e) => return Err(veto(HookKind::EventThreadInit, id, &e)),
            }
        }
        Ok(true)
    }
}

/// Handlers that cleaned up after an event thread
pub struct EventThreadCleanups {
    handlers: Built<dyn EventThreadCleanup>,
}

impl EventThreadCleanups {
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run `complete` on every handler; failures go to `errs`
    pub fn complete(mut self, comp: &Component, event: &Event, errs: &mut ErrorSink) {
        for (id, handler) in self.handlers.iter_mut() {
            if let Err(e) = handler.complete(comp, event) {
                contain(HookKind::EventThreadCleanup, id, &e, Some(&mut *errs));
            }
        }
    }
}

/// A suspended event thread
///
/// Owns the handlers that approved the suspension. Consumed by exactly one of
/// [`Configuration::on_resume`] or [`Configuration::on_resume_abort`].
pub struct Suspension {
    handlers: Built<dyn EventThreadSuspend>,
    notified: bool,
}

impl Suspension {
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Suspension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suspension")
            .field("listeners", &ids(&self.handlers))
            .field("notified", &self.notified)
            .finish()
    }
}

/// A resumed event thread awaiting [`Configuration::on_resumed`]
pub struct Resumption {
    handlers: Built<dyn EventThreadResume>,
}

impl Resumption {
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl fmt::Debug for Resumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resumption")
            .field("listeners", &ids(&self.handlers))
            .finish()
    }
}

/// A resume was vetoed; the thread stays suspended
///
/// The suspension is handed back so the caller can retry or abort it.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ResumeRejected {
    #[source]
    pub error: EngineError,
    pub suspension: Suspension,
}

impl Configuration {
    /// Prepare every thread-init handler for `event`
    ///
    /// Returns the prepared handlers; call [`EventThreadInits::init`] before
    /// processing the event.
    pub fn on_thread_start(&self, comp: &Component, event: &Event) -> Result<EventThreadInits> {
        let handlers = prepare(
            HookKind::EventThreadInit,
            &self.listeners.event_thread_inits,
            |h| h.prepare(comp, event),
        )?;
        Ok(EventThreadInits { handlers })
    }

    /// Run every thread-cleanup handler, collecting failures into `errs`
    pub fn on_thread_cleanup(
        &self,
        comp: &Component,
        event: &Event,
        errs: &mut ErrorSink,
    ) -> EventThreadCleanups {
        let mut handlers = Vec::new();
        for entry in self.listeners.event_thread_cleanups.snapshot().iter() {
            let outcome = (entry.item)().and_then(|mut h| {
                h.cleanup(comp, event, &mut *errs)?;
                Ok(h)
            });
            match outcome {
                Ok(h) => handlers.push((entry.id.clone(), h)),
                Err(e) => {
                    contain(HookKind::EventThreadCleanup, &entry.id, &e, Some(&mut *errs))
                }
            }
        }
        EventThreadCleanups { handlers }
    }

    /// Ask every suspend handler whether the thread may park on `wait_on`
    pub fn on_suspend(
        &self,
        comp: &Component,
        event: &Event,
        wait_on: &(dyn Any + Send + Sync),
    ) -> Result<Suspension> {
        let handlers = prepare(
            HookKind::EventThreadSuspend,
            &self.listeners.event_thread_suspends,
            |h| h.before_suspend(comp, event, wait_on),
        )?;
        Ok(Suspension {
            handlers,
            notified: false,
        })
    }

    /// Tell the suspend handlers the thread is parked
    ///
    /// Runs at most once per suspension.
    pub fn on_suspended(&self, suspension: &mut Suspension, comp: &Component, event: &Event) {
        if std::mem::replace(&mut suspension.notified, true) {
            return;
        }
        for (id, handler) in suspension.handlers.iter_mut() {
            if let Err(e) = handler.after_suspend(comp, event) {
                contain(HookKind::EventThreadSuspend, id, &e, None);
            }
        }
    }

    /// Ask every resume handler whether the thread may wake
    pub fn on_resume(
        &self,
        suspension: Suspension,
        comp: &Component,
        event: &Event,
    ) -> std::result::Result<Resumption, ResumeRejected> {
        match prepare(
            HookKind::EventThreadResume,
            &self.listeners.event_thread_resumes,
            |h| h.before_resume(comp, event),
        ) {
            Ok(handlers) => Ok(Resumption { handlers }),
            Err(error) => Err(ResumeRejected { error, suspension }),
        }
    }

    /// Run `after_resume` on the handlers that approved the resume
    ///
    /// The first failure stops the call.
    pub fn on_resumed(
        &self,
        mut resumption: Resumption,
        comp: &Component,
        event: &Event,
    ) -> Result<()> {
        for (id, handler) in resumption.handlers.iter_mut() {
            handler
                .after_resume(comp, event)
                .map_err(|e| EngineError::HandlerFailed {
                    hook: HookKind::EventThreadResume,
                    listener: id.clone(),
                    message: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Abandon a suspension instead of resuming it
    pub fn on_resume_abort(&self, suspension: Suspension, comp: &Component, event: &Event) {
        debug!(
            listeners = suspension.len(),
            event = %event.name,
            "Aborting suspended event thread"
        );
        drop(suspension);
        best_effort(
            HookKind::EventThreadResume,
            &self.listeners.event_thread_resumes,
            None,
            |h, _| h.abort_resume(comp, event),
        );
    }

    pub(crate) fn on_app_init(&self, app: &WebApp) {
        best_effort(HookKind::WebAppInit, &self.listeners.web_app_inits, None, |h, _| {
            h.init(app)
        });
    }

    pub(crate) fn on_app_cleanup(&self, app: &WebApp) {
        best_effort(
            HookKind::WebAppCleanup,
            &self.listeners.web_app_cleanups,
            None,
            |h, _| h.cleanup(app),
        );
    }

    /// An error prevents the session from being created
    pub fn on_session_init(&self, session: &Session) -> Result<()> {
        veto_all(HookKind::SessionInit, &self.listeners.session_inits, |h| {
            h.init(session)
        })
    }

    pub fn on_session_cleanup(&self, session: &Session) {
        best_effort(
            HookKind::SessionCleanup,
            &self.listeners.session_cleanups,
            None,
            |h, _| h.cleanup(session),
        );
    }

    /// An error prevents the desktop from being created
    pub fn on_desktop_init(&self, desktop: &Desktop) -> Result<()> {
        veto_all(HookKind::DesktopInit, &self.listeners.desktop_inits, |h| {
            h.init(desktop)
        })
    }

    pub fn on_desktop_cleanup(&self, desktop: &Desktop) {
        best_effort(
            HookKind::DesktopCleanup,
            &self.listeners.desktop_cleanups,
            None,
            |h, _| h.cleanup(desktop),
        );
    }

    /// An error prevents the execution from starting
    pub fn on_execution_init(&self, exec: &Execution, parent: Option<&Execution>) -> Result<()> {
        veto_all(HookKind::ExecutionInit, &self.listeners.execution_inits, |h| {
            h.init(exec, parent)
        })
    }

    /// Run every execution-cleanup handler
    ///
    /// Failures are appended to `errs` when given, and logged either way.
    pub fn on_execution_cleanup(
        &self,
        exec: &Execution,
        parent: Option<&Execution>,
        errs: Option<&mut ErrorSink>,
    ) {
        best_effort(
            HookKind::ExecutionCleanup,
            &self.listeners.execution_cleanups,
            errs,
            |h, sink| h.cleanup(exec, parent, sink),
        );
    }

    /// Run the URI interceptors; the first failure rejects `uri`
    pub fn on_uri_request(&self, uri: &str) -> Result<()> {
        for entry in self.listeners.uri_interceptors.snapshot().iter() {
            entry
                .item
                .request(uri)
                .map_err(|e| veto(HookKind::UriInterceptor, &entry.id, &e))?;
        }
        Ok(())
    }

    /// Run the request interceptors; the first failure rejects the request
    pub fn on_request(
        &self,
        session: &Session,
        request: &Request,
        response: &mut Response,
    ) -> Result<()> {
        for entry in self.listeners.request_interceptors.snapshot().iter() {
            entry
                .item
                .request(session, request, response)
                .map_err(|e| veto(HookKind::RequestInterceptor, &entry.id, &e))?;
        }
        Ok(())
    }
}

fn ids<D: ?Sized>(handlers: &Built<D>) -> Vec<&ListenerId> {
    handlers.iter().map(|(id, _)| id).collect()
}

fn veto(kind: HookKind, id: &ListenerId, err: &HandlerError) -> EngineError {
    debug!(hook = %kind, listener = %id, reason = %err, "Listener vetoed");
    VetoError::new(kind, id, err).into()
}

/// Log a contained failure and record it once in `errs`
fn contain(kind: HookKind, id: &ListenerId, err: &HandlerError, errs: Option<&mut ErrorSink>) {
    error!(hook = %kind, listener = %id, error = %err, "Listener failed");
    if let Some(errs) = errs {
        errs.push(HandlerFailure::new(kind, id, err));
    }
}

/// Build and run the first phase of every handler, keeping the instances
fn prepare<D: ?Sized>(
    kind: HookKind,
    list: &HookList<Factory<D>>,
    mut call: impl FnMut(&mut D) -> HandlerResult<()>,
) -> Result<Built<D>> {
    let snapshot = list.snapshot();
    let mut built = Vec::with_capacity(snapshot.len());
    for entry in snapshot.iter() {
        let handler = (entry.item)().and_then(|mut h| {
            call(&mut *h)?;
            Ok(h)
        });
        match handler {
            Ok(h) => built.push((entry.id.clone(), h)),
            Err(e) => return Err(veto(kind, &entry.id, &e)),
        }
    }
    Ok(built)
}

fn veto_all<D: ?Sized>(
    kind: HookKind,
    list: &HookList<Factory<D>>,
    call: impl FnMut(&mut D) -> HandlerResult<()>,
) -> Result<()> {
    prepare(kind, list, call).map(|_| ())
}

fn best_effort<D: ?Sized>(
    kind: HookKind,
    list: &HookList<Factory<D>>,
    errs: Option<&mut ErrorSink>,
    mut call: impl FnMut(&mut D, &mut ErrorSink) -> HandlerResult<()>,
) {
    let mut scratch = ErrorSink::new();
    let keep = errs.is_some();
    let sink = match errs {
        Some(errs) => errs,
        None => &mut scratch,
    };
    for entry in list.snapshot().iter() {
        let outcome = (entry.item)().and_then(|mut h| call(&mut *h, &mut *sink));
        if let Err(e) = outcome {
            contain(kind, &entry.id, &e, keep.then_some(&mut *sink));
        }
    }
}
