//! Canopy Dispatch Engine
//!
//! The listener and lifecycle engine of the Canopy UI server.
//!
//! # Overview
//!
//! Applications extend the server by registering listener types against a
//! fixed set of hook kinds: event thread init, cleanup, suspend and resume,
//! application, session, desktop and execution init and cleanup, URI and
//! request interception, event interception, plus a single monitor and
//! performance meter. The engine keeps one ordered list per kind and invokes
//! it at the matching point of a request's life.
//!
//! # Architecture
//!
//! 1. **Listener Registry** (`registry`): per-kind ordered lists of listener
//!    factories, guarded independently and read through snapshots
//! 2. **Lifecycle Invoker** (`dispatcher::lifecycle`): builds fresh handlers
//!    per call and applies each hook's error policy
//! 3. **Event Interceptor Chain** (`dispatcher::interceptor`): threads an
//!    event through every interceptor at four points of its life
//! 4. **Richlet Resolver** (`richlet`): load-once cache of URL-bound
//!    controllers
//!
//! [`Configuration`] owns all of them; [`WebApp::bind`] ties it to one
//! running application.
//!
//! # Quick Start
//!
//! ```ignore
//! use canopy_engine::{Configuration, ExecutionInit, Execution, HandlerResult, ListenerType};
//!
//! #[derive(Default)]
//! struct TopLevelOnly;
//!
//! impl ExecutionInit for TopLevelOnly {
//!     fn init(&mut self, _exec: &Execution, parent: Option<&Execution>) -> HandlerResult<()> {
//!         match parent {
//!             Some(_) => Err("nested execution".into()),
//!             None => Ok(()),
//!         }
//!     }
//! }
//!
//! let config = Configuration::new();
//! config.add_listener(&ListenerType::of::<TopLevelOnly>().execution_init().build())?;
//!
//! config.on_execution_init(&exec, None)?;               // accepted
//! assert!(config.on_execution_init(&exec, Some(&parent)).is_err()); // vetoed
//! ```
//!
//! # Error Handling
//!
//! Vetoes and configuration errors surface as [`EngineError`]. Failures of
//! cleanup-style hooks are contained: logged through `tracing` and, where the
//! caller passes one, recorded in an [`ErrorSink`].
//!
//! # Thread Safety
//!
//! [`Configuration`] is `Send + Sync` and meant to be shared by every request
//! thread of an application.

pub mod app;
pub mod catalog;
pub mod configuration;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod error_page;
pub mod kind;
pub mod listener;
pub mod registry;
pub mod richlet;

pub use app::WebApp;
pub use catalog::TypeCatalog;
pub use configuration::Configuration;
pub use context::{
    Component, Desktop, Event, Execution, Request, Response, Session, DEFAULT_DEVICE,
};
pub use dispatcher::{
    EventInterceptorChain, EventThreadCleanups, EventThreadInits, InterceptPoint, ResumeRejected,
    Resumption, Suspension,
};
pub use error::{
    EngineError, ErrorSink, HandlerError, HandlerFailure, HandlerResult, Result, VetoError,
};
pub use error_page::{ErrorClass, ErrorPage, ErrorPages};
pub use kind::HookKind;
pub use listener::{
    DesktopCleanup, DesktopInit, EventInterceptor, EventThreadCleanup, EventThreadInit,
    EventThreadResume, EventThreadSuspend, ExecutionCleanup, ExecutionInit, ListenerId,
    ListenerType, ListenerTypeBuilder, Monitor, PerformanceMeter, RequestInterceptor,
    SessionCleanup, SessionInit, UriInterceptor, WebAppCleanup, WebAppInit,
};
pub use registry::ListenerRegistry;
pub use richlet::{Richlet, RichletConfig, RichletFactory, RichletMappings, RichletSource};
