//! Error types for the dispatch engine
//!
//! The engine separates two kinds of failure:
//!
//! 1. **Surfaced errors** ([`EngineError`]): invalid registrations, vetoes raised
//!    by paired "before" hooks and init hooks, interceptor rejections and richlet
//!    load problems. These always reach the caller, which must abandon the
//!    guarded transition.
//!
//! 2. **Contained failures** ([`HandlerFailure`]): a best-effort hook (cleanup,
//!    after-suspend, abort) raised an error. The failure is logged, optionally
//!    appended to the caller's [`ErrorSink`], and dispatch moves on to the next
//!    handler.
//!
//! # Examples
//!
//! ```ignore
//! match config.on_execution_init(&exec, None) {
//!     Ok(()) => run(exec),
//!     Err(EngineError::Veto(veto)) => deny(veto.reason),
//!     Err(e) => return Err(e),
//! }
//! ```

use std::{fmt, time::Duration};

use canopy_config::ConfigError;
use thiserror::Error;

use crate::{error_page::ErrorClass, kind::HookKind, listener::ListenerId};

/// Error raised by handler code
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type returned by handler code
pub type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// Collects contained failures from best-effort hooks
///
/// Callers own the sink and may inspect, filter or clear it after dispatch.
pub type ErrorSink = Vec<HandlerFailure>;

/// Errors surfaced by the engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid registration or definition
    ///
    /// Raised for listener types with no recognised capability, a second
    /// monitor or performance meter, or a listener that cannot be resolved by
    /// name. Never retried.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A paired "before" hook or an init hook rejected the transition
    #[error(transparent)]
    Veto(#[from] VetoError),

    /// A handler failed where failures are not contained
    #[error("Listener {listener} failed in {hook}: {message}")]
    HandlerFailed {
        hook: HookKind,
        listener: ListenerId,
        message: String,
    },

    /// Waiting for another thread to load a richlet took too long
    ///
    /// This almost always points at a richlet whose initialisation re-enters
    /// the engine and waits on itself.
    #[error("Unable to load richlet {name}: waited {waited:?} for another loader")]
    DeadlockSuspected { name: String, waited: Duration },

    /// Instantiating or initialising a richlet failed
    #[error("Unable to load richlet {name}: {reason}")]
    RichletLoad { name: String, reason: String },

    /// No richlet is defined under this name
    #[error("Richlet not defined: {0}")]
    RichletNotDefined(String),

    /// An argument was out of range or empty
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Settings could not be loaded or validated
    #[error("Settings error: {0}")]
    Settings(#[from] ConfigError),
}

impl EngineError {
    /// Error class used for error-page lookup
    pub fn class(&self) -> ErrorClass {
        let path = match self {
            EngineError::Configuration(_) => "engine.configuration",
            EngineError::Veto(_) => "engine.veto",
            EngineError::HandlerFailed { .. } => "engine.handler",
            EngineError::DeadlockSuspected { .. } => "engine.richlet.deadlock",
            EngineError::RichletLoad { .. } => "engine.richlet.load",
            EngineError::RichletNotDefined(_) => "engine.configuration.richlet",
            EngineError::InvalidArgument(_) => "engine.argument",
            EngineError::Settings(_) => "engine.configuration.settings",
        };
        ErrorClass::new(path)
    }

    /// Whether this is a veto
    pub fn is_veto(&self) -> bool {
        matches!(self, EngineError::Veto(_))
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// A guarded transition was rejected by a listener
///
/// Vetoes are an expected outcome: thread start, suspension, resumption and
/// session/desktop/execution creation may all be denied by a listener.
#[derive(Debug, Clone, Error)]
#[error("{listener} vetoed {hook}: {reason}")]
pub struct VetoError {
    /// Hook kind that raised the veto
    pub hook: HookKind,
    /// Listener that raised it
    pub listener: ListenerId,
    /// Message of the underlying handler error
    pub reason: String,
}

impl VetoError {
    pub(crate) fn new(hook: HookKind, listener: &ListenerId, err: &HandlerError) -> Self {
        Self {
            hook,
            listener: listener.clone(),
            reason: err.to_string(),
        }
    }
}

/// One contained failure of a best-effort hook
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerFailure {
    /// Hook kind being dispatched
    pub hook: HookKind,
    /// Listener that failed
    pub listener: ListenerId,
    /// Rendered handler error
    pub message: String,
    /// Class of the handler error, for error-page lookup
    pub class: ErrorClass,
}

impl HandlerFailure {
    pub(crate) fn new(hook: HookKind, listener: &ListenerId, err: &HandlerError) -> Self {
        let class = match err.downcast_ref::<EngineError>() {
            Some(engine) => engine.class(),
            None => ErrorClass::new("handler"),
        };
        Self {
            hook,
            listener: listener.clone(),
            message: err.to_string(),
            class,
        }
    }
}

impl fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed in {}: {}", self.listener, self.hook, self.message)
    }
}
