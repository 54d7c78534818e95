//! Error pages
//!
//! Maps error classes to the location rendered when such an error escapes a
//! request. Entries are kept per device type, in registration order.

use std::{collections::HashMap, fmt, sync::Arc};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    context::DEFAULT_DEVICE,
    error::{EngineError, Result},
};

/// Hierarchical error class such as `engine.richlet.load`
///
/// A class covers itself and every class nested under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorClass(String);

impl ErrorClass {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether an error of class `other` is covered by this class
    ///
    /// The empty class covers everything.
    pub fn is_assignable_from(&self, other: &ErrorClass) -> bool {
        if self.0.is_empty() {
            return true;
        }
        let mut mine = self.0.split('.');
        let mut theirs = other.0.split('.');
        loop {
            match (mine.next(), theirs.next()) {
                (None, _) => return true,
                (Some(a), Some(b)) if a == b => continue,
                _ => return false,
            }
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ErrorClass {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorPage {
    pub class: ErrorClass,
    pub location: String,
}

type PageList = Arc<RwLock<Vec<ErrorPage>>>;

/// Error pages of every device type
#[derive(Default)]
pub struct ErrorPages {
    devices: RwLock<HashMap<String, PageList>>,
}

impl ErrorPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `class` to `location` for `device`
    ///
    /// Returns the location previously mapped to the same class; that entry
    /// is dropped and the new one goes to the end of the list.
    pub fn add(&self, device: &str, class: ErrorClass, location: &str) -> Result<Option<String>> {
        if device.is_empty() {
            return Err(EngineError::InvalidArgument("empty device type".to_string()));
        }
        if location.is_empty() {
            return Err(EngineError::InvalidArgument(format!(
                "empty error page location for {}",
                class
            )));
        }

        let list = self.list_or_create(device);
        let mut pages = list.write();
        let existing = pages.iter().position(|p| p.class == class);
        let previous = existing.map(|i| pages.remove(i).location);
        debug!(device, class = %class, location, "Error page added");
        pages.push(ErrorPage {
            class,
            location: location.to_string(),
        });
        Ok(previous)
    }

    /// First location in `device`'s list whose class covers `class`
    pub fn lookup(&self, device: &str, class: &ErrorClass) -> Option<String> {
        let list = self.list(device)?;
        let pages = list.read();
        pages
            .iter()
            .find(|p| p.class.is_assignable_from(class))
            .map(|p| p.location.clone())
    }

    /// Lookup for the default device type
    pub fn lookup_default(&self, class: &ErrorClass) -> Option<String> {
        self.lookup(DEFAULT_DEVICE, class)
    }

    /// Entries of `device`, in lookup order
    pub fn pages(&self, device: &str) -> Vec<ErrorPage> {
        self.list(device)
            .map(|list| list.read().clone())
            .unwrap_or_default()
    }

    fn list(&self, device: &str) -> Option<PageList> {
        self.devices.read().get(device).map(Arc::clone)
    }

    fn list_or_create(&self, device: &str) -> PageList {
        if let Some(list) = self.list(device) {
            return list;
        }
        let mut devices = self.devices.write();
        Arc::clone(devices.entry(device.to_string()).or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assignable_by_segment_prefix() {
        let engine = ErrorClass::new("engine");
        assert!(engine.is_assignable_from(&ErrorClass::new("engine")));
        assert!(engine.is_assignable_from(&ErrorClass::new("engine.veto")));
        assert!(!engine.is_assignable_from(&ErrorClass::new("engineering")));
        assert!(!ErrorClass::new("engine.veto").is_assignable_from(&engine));
        assert!(ErrorClass::new("").is_assignable_from(&engine));
    }

    #[test]
    fn test_first_match_wins() {
        let pages = ErrorPages::new();
        pages.add("ajax", "engine".into(), "/engine.zul").unwrap();
        pages.add("ajax", "engine.veto".into(), "/veto.zul").unwrap();

        assert_eq!(
            pages.lookup("ajax", &"engine.veto".into()),
            Some("/engine.zul".to_string())
        );
    }

    #[test]
    fn test_readd_replaces_and_moves_to_end() {
        let pages = ErrorPages::new();
        pages.add("ajax", "engine".into(), "/a.zul").unwrap();
        pages.add("ajax", "engine.veto".into(), "/veto.zul").unwrap();
        let previous = pages.add("ajax", "engine".into(), "/b.zul").unwrap();

        assert_eq!(previous, Some("/a.zul".to_string()));
        assert_eq!(
            pages.lookup("ajax", &"engine.veto".into()),
            Some("/veto.zul".to_string())
        );
        assert_eq!(
            pages.lookup("ajax", &"engine.argument".into()),
            Some("/b.zul".to_string())
        );
    }

    #[test]
    fn test_devices_are_separate() {
        let pages = ErrorPages::new();
        pages.add("ajax", "engine".into(), "/a.zul").unwrap();
        assert_eq!(pages.lookup("mil", &"engine".into()), None);
        assert!(pages.pages("mil").is_empty());
    }

    #[test]
    fn test_empty_arguments_rejected() {
        let pages = ErrorPages::new();
        assert!(pages.add("", "engine".into(), "/a.zul").is_err());
        assert!(pages.add("ajax", "engine".into(), "").is_err());
    }
}
