//! Listener capabilities
//!
//! One trait per hook kind. A listener type implements any subset of them and
//! declares that subset when its [`ListenerType`] is built, so the registry
//! never has to probe a type at runtime.
//!
//! Per-invocation capabilities (`EventThreadInit`, `SessionCleanup`, ...) take
//! `&mut self`: the engine builds a fresh instance for every dispatch.
//! Shared capabilities (interceptors, monitor, performance meter) take `&self`
//! because one instance is built at registration and called concurrently.
//!
//! # Examples
//!
//! ```ignore
//! #[derive(Default)]
//! struct NoNestedExecutions;
//!
//! impl ExecutionInit for NoNestedExecutions {
//!     fn init(&mut self, _exec: &Execution, parent: Option<&Execution>) -> HandlerResult<()> {
//!         match parent {
//!             Some(_) => Err("nested executions are not allowed".into()),
//!             None => Ok(()),
//!         }
//!     }
//! }
//!
//! let listener = ListenerType::of::<NoNestedExecutions>().execution_init().build();
//! config.add_listener(&listener)?;
//! ```

mod descriptor;

pub use descriptor::{ListenerId, ListenerType, ListenerTypeBuilder};
pub(crate) use descriptor::{Capabilities, Factory, SharedFactory};

use std::any::Any;

use crate::{
    app::WebApp,
    context::{Component, Desktop, Event, Execution, Request, Response, Session},
    error::{ErrorSink, HandlerResult},
};

/// Runs before an event is processed on an event thread
pub trait EventThreadInit: Send {
    /// First phase; an error prevents the event from being processed
    fn prepare(&mut self, comp: &Component, event: &Event) -> HandlerResult<()>;

    /// Second phase; returning `false` drops the event without error
    fn init(&mut self, _comp: &Component, _event: &Event) -> HandlerResult<bool> {
        Ok(true)
    }
}

/// Runs after an event thread finished processing an event
pub trait EventThreadCleanup: Send {
    /// `errs` holds failures collected so far; listeners may inspect or clear it
    fn cleanup(&mut self, comp: &Component, event: &Event, errs: &mut ErrorSink)
        -> HandlerResult<()>;

    /// Called once every cleanup has run
    fn complete(&mut self, _comp: &Component, _event: &Event) -> HandlerResult<()> {
        Ok(())
    }
}

/// Surrounds the suspension of an event thread
pub trait EventThreadSuspend: Send {
    /// Runs on the event thread about to park; an error prevents suspension
    fn before_suspend(
        &mut self,
        comp: &Component,
        event: &Event,
        wait_on: &(dyn Any + Send + Sync),
    ) -> HandlerResult<()>;

    /// Runs on the thread that observed the suspension
    fn after_suspend(&mut self, _comp: &Component, _event: &Event) -> HandlerResult<()> {
        Ok(())
    }
}

/// Surrounds the resumption of a suspended event thread
pub trait EventThreadResume: Send {
    /// An error keeps the thread suspended
    fn before_resume(&mut self, comp: &Component, event: &Event) -> HandlerResult<()>;

    fn after_resume(&mut self, _comp: &Component, _event: &Event) -> HandlerResult<()> {
        Ok(())
    }

    /// The suspended operation was abandoned instead of resumed
    fn abort_resume(&mut self, _comp: &Component, _event: &Event) -> HandlerResult<()> {
        Ok(())
    }
}

pub trait WebAppInit: Send {
    fn init(&mut self, app: &WebApp) -> HandlerResult<()>;
}

pub trait WebAppCleanup: Send {
    fn cleanup(&mut self, app: &WebApp) -> HandlerResult<()>;
}

/// An error prevents the session from being created
pub trait SessionInit: Send {
    fn init(&mut self, session: &Session) -> HandlerResult<()>;
}

pub trait SessionCleanup: Send {
    fn cleanup(&mut self, session: &Session) -> HandlerResult<()>;
}

/// An error prevents the desktop from being created
pub trait DesktopInit: Send {
    fn init(&mut self, desktop: &Desktop) -> HandlerResult<()>;
}

pub trait DesktopCleanup: Send {
    fn cleanup(&mut self, desktop: &Desktop) -> HandlerResult<()>;
}

/// An error prevents the execution from starting
pub trait ExecutionInit: Send {
    /// `parent` is set when the execution is nested inside another one
    fn init(&mut self, exec: &Execution, parent: Option<&Execution>) -> HandlerResult<()>;
}

pub trait ExecutionCleanup: Send {
    fn cleanup(
        &mut self,
        exec: &Execution,
        parent: Option<&Execution>,
        errs: &mut ErrorSink,
    ) -> HandlerResult<()>;
}

/// Inspects every URI served; an error rejects the request
pub trait UriInterceptor: Send + Sync {
    fn request(&self, uri: &str) -> HandlerResult<()>;
}

/// Inspects every request; an error rejects it
pub trait RequestInterceptor: Send + Sync {
    fn request(
        &self,
        session: &Session,
        request: &Request,
        response: &mut Response,
    ) -> HandlerResult<()>;
}

/// Intercepts events at four points of their life
///
/// The three "before" points may replace the event; the chain hands the
/// replacement to the next interceptor. An error aborts the chain and the
/// triggering send, post or process.
pub trait EventInterceptor: Send + Sync {
    /// Before the event is queued for the remote peer
    fn before_send_event(&self, event: Event) -> HandlerResult<Event> {
        Ok(event)
    }

    /// Before the event is queued for local asynchronous processing
    fn before_post_event(&self, event: Event) -> HandlerResult<Event> {
        Ok(event)
    }

    /// Before the event's handler runs
    fn before_process_event(&self, event: Event) -> HandlerResult<Event> {
        Ok(event)
    }

    /// After the event's handler ran; notification only
    fn after_process_event(&self, _event: &Event) -> HandlerResult<()> {
        Ok(())
    }
}

/// Observes sessions, desktops and updates
pub trait Monitor: Send + Sync {
    fn session_created(&self, _session: &Session) -> HandlerResult<()> {
        Ok(())
    }

    fn session_destroyed(&self, _session: &Session) -> HandlerResult<()> {
        Ok(())
    }

    fn desktop_created(&self, _desktop: &Desktop) -> HandlerResult<()> {
        Ok(())
    }

    fn desktop_destroyed(&self, _desktop: &Desktop) -> HandlerResult<()> {
        Ok(())
    }

    /// `requests` is the number of client requests in this update
    fn before_update(&self, _desktop: &Desktop, _requests: usize) -> HandlerResult<()> {
        Ok(())
    }

    fn after_update(&self, _desktop: &Desktop) -> HandlerResult<()> {
        Ok(())
    }
}

/// Receives request timing, in milliseconds since the epoch
pub trait PerformanceMeter: Send + Sync {
    fn request_start_at_client(
        &self,
        _request_id: &str,
        _exec: &Execution,
        _time: i64,
    ) -> HandlerResult<()> {
        Ok(())
    }

    fn request_start_at_server(
        &self,
        _request_id: &str,
        _exec: &Execution,
        _time: i64,
    ) -> HandlerResult<()> {
        Ok(())
    }

    fn request_complete_at_server(
        &self,
        _request_id: &str,
        _exec: &Execution,
        _time: i64,
    ) -> HandlerResult<()> {
        Ok(())
    }

    fn request_received_at_client(
        &self,
        _request_id: &str,
        _exec: &Execution,
        _time: i64,
    ) -> HandlerResult<()> {
        Ok(())
    }

    fn request_complete_at_client(
        &self,
        _request_id: &str,
        _exec: &Execution,
        _time: i64,
    ) -> HandlerResult<()> {
        Ok(())
    }
}
