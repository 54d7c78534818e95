//! Richlet path mappings

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Mapping {
    richlet: String,
    wildcard: bool,
}

/// URL patterns mapped to richlet names
///
/// A pattern is either exact (`/app/main`) or a wildcard (`/app/*`), which
/// also matches every path below it. `""` and `"/"` both denote the root.
#[derive(Default)]
pub struct RichletMappings {
    paths: RwLock<HashMap<String, Mapping>>,
}

impl RichletMappings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `pattern` to `richlet`, replacing an existing mapping
    pub fn add(&self, richlet: &str, pattern: &str) -> Result<()> {
        let (path, wildcard) = parse_pattern(pattern)?;
        debug!(richlet, path = %path, wildcard, "Richlet mapped");
        self.paths.write().insert(
            path,
            Mapping {
                richlet: richlet.to_string(),
                wildcard,
            },
        );
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.paths.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.read().is_empty()
    }

    /// Richlet names that may serve `path`, best match first
    ///
    /// The exact path comes first, then each shorter `/` prefix down to the
    /// root, where only wildcard mappings count.
    pub fn candidates(&self, path: &str) -> Vec<String> {
        let path = normalize_path(path);
        let paths = self.paths.read();
        let mut found = Vec::new();
        let len = path.len();
        let mut end = len;
        loop {
            if let Some(mapping) = paths.get(&path[..end]) {
                if end == len || mapping.wildcard {
                    found.push(mapping.richlet.clone());
                }
            }
            if end == 0 {
                break;
            }
            end = path[..end].rfind('/').unwrap_or(0);
        }
        found
    }
}

fn parse_pattern(pattern: &str) -> Result<(String, bool)> {
    if pattern.is_empty() || pattern == "/" {
        return Ok((String::new(), false));
    }
    if !pattern.starts_with('/') {
        return Err(EngineError::InvalidArgument(format!(
            "richlet path must start with '/', not {}",
            pattern
        )));
    }
    match pattern.strip_suffix("/*") {
        Some(prefix) => Ok((prefix.to_string(), true)),
        None => Ok((pattern.to_string(), false)),
    }
}

fn normalize_path(path: &str) -> String {
    if path.is_empty() || path == "/" {
        String::new()
    } else if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}
