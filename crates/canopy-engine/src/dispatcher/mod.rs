//! Hook dispatch
//!
//! [`lifecycle`] invokes the per-kind listener lists of a [`Configuration`]
//! under each hook's error policy; [`interceptor`] threads events through the
//! event interceptor chain.
//!
//! [`Configuration`]: crate::Configuration

pub mod interceptor;
pub mod lifecycle;

pub use interceptor::{EventInterceptorChain, InterceptPoint};
pub use lifecycle::{EventThreadCleanups, EventThreadInits, ResumeRejected, Resumption, Suspension};
