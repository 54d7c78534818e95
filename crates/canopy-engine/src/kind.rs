//! Hook kinds
//!
//! Every extension point of the engine is one [`HookKind`]. A listener type
//! declares which kinds it supports when it is built; the registry keeps one
//! ordered list per kind.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A lifecycle extension point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HookKind {
    /// Singleton observer of sessions, desktops and updates
    Monitor,
    /// Singleton receiver of request timing
    PerformanceMeter,
    EventThreadInit,
    EventThreadCleanup,
    EventThreadSuspend,
    EventThreadResume,
    WebAppInit,
    WebAppCleanup,
    SessionInit,
    SessionCleanup,
    DesktopInit,
    DesktopCleanup,
    ExecutionInit,
    ExecutionCleanup,
    UriInterceptor,
    RequestInterceptor,
    EventInterceptor,
}

impl HookKind {
    /// All kinds, in registration-check order
    pub const ALL: [HookKind; 17] = [
        HookKind::Monitor,
        HookKind::PerformanceMeter,
        HookKind::EventThreadInit,
        HookKind::EventThreadCleanup,
        HookKind::EventThreadSuspend,
        HookKind::EventThreadResume,
        HookKind::WebAppInit,
        HookKind::WebAppCleanup,
        HookKind::SessionInit,
        HookKind::SessionCleanup,
        HookKind::DesktopInit,
        HookKind::DesktopCleanup,
        HookKind::ExecutionInit,
        HookKind::ExecutionCleanup,
        HookKind::UriInterceptor,
        HookKind::RequestInterceptor,
        HookKind::EventInterceptor,
    ];

    /// Kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Monitor => "monitor",
            HookKind::PerformanceMeter => "performance-meter",
            HookKind::EventThreadInit => "event-thread-init",
            HookKind::EventThreadCleanup => "event-thread-cleanup",
            HookKind::EventThreadSuspend => "event-thread-suspend",
            HookKind::EventThreadResume => "event-thread-resume",
            HookKind::WebAppInit => "web-app-init",
            HookKind::WebAppCleanup => "web-app-cleanup",
            HookKind::SessionInit => "session-init",
            HookKind::SessionCleanup => "session-cleanup",
            HookKind::DesktopInit => "desktop-init",
            HookKind::DesktopCleanup => "desktop-cleanup",
            HookKind::ExecutionInit => "execution-init",
            HookKind::ExecutionCleanup => "execution-cleanup",
            HookKind::UriInterceptor => "uri-interceptor",
            HookKind::RequestInterceptor => "request-interceptor",
            HookKind::EventInterceptor => "event-interceptor",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_names_are_unique() {
        let names: HashSet<_> = HookKind::ALL.iter().map(HookKind::as_str).collect();
        assert_eq!(names.len(), HookKind::ALL.len());
    }

    #[test]
    fn test_serde_matches_display() {
        for kind in HookKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }
}
