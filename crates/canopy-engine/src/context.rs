//! Values handed to listeners
//!
//! The engine does not model the component tree; these are the thin
//! descriptors that identify what a hook is being invoked for.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Device type used when none is given
pub const DEFAULT_DEVICE: &str = "ajax";

/// The component an event targets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    /// Unique id within its desktop
    pub uuid: String,
    /// Widget name, e.g. `button`
    pub widget: String,
}

impl Component {
    pub fn new(uuid: impl Into<String>, widget: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            widget: widget.into(),
        }
    }
}

/// A server-side event
///
/// Interceptors may replace an event wholesale before it is sent, posted or
/// processed, so events are plain owned values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event name, e.g. `onClick`
    pub name: String,
    /// Uuid of the target component, if any
    pub target: Option<String>,
    /// Event payload
    pub data: serde_json::Value,
    /// When the event was created
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create an event with an empty payload
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            data: serde_json::Value::Null,
            timestamp: Utc::now(),
        }
    }

    /// Target a component
    pub fn with_target(mut self, target: &Component) -> Self {
        self.target = Some(target.uuid.clone());
        self
    }

    /// Attach a payload
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Rename a payload field, keeping its value
    ///
    /// Returns whether the field existed.
    pub fn rename_field(&mut self, from: &str, to: &str) -> bool {
        match self.data.as_object_mut() {
            Some(map) => match map.remove(from) {
                Some(value) => {
                    map.insert(to.to_string(), value);
                    true
                }
                None => false,
            },
            None => false,
        }
    }
}

/// A user session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    /// Address of the remote peer, if known
    pub remote_addr: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            remote_addr: None,
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Server-side state for one browser tab
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Desktop {
    pub id: Uuid,
    pub session_id: Uuid,
    /// Device type, e.g. `ajax`
    pub device_type: String,
    /// Request path that created the desktop
    pub request_path: String,
}

impl Desktop {
    pub fn new(session: &Session, request_path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id: session.id,
            device_type: DEFAULT_DEVICE.to_string(),
            request_path: request_path.into(),
        }
    }
}

/// One server-side processing cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Execution {
    pub id: Uuid,
    pub desktop_id: Uuid,
    /// Whether this cycle serves an asynchronous update rather than a page load
    pub async_update: bool,
}

impl Execution {
    pub fn new(desktop: &Desktop) -> Self {
        Self {
            id: Uuid::new_v4(),
            desktop_id: desktop.id,
            async_update: false,
        }
    }
}

/// Incoming request as seen by request interceptors
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub uri: String,
    pub headers: BTreeMap<String, String>,
}

impl Request {
    pub fn get(uri: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            uri: uri.into(),
            headers: BTreeMap::new(),
        }
    }
}

/// Outgoing response that request interceptors may decorate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
}

impl Default for Response {
    fn default() -> Self {
        Self {
            status: 200,
            headers: BTreeMap::new(),
        }
    }
}
