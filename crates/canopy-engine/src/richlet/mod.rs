//! Richlets
//!
//! A richlet is a server-side controller bound to a URL path. Richlets are
//! defined by name, loaded on first use, and mapped to paths.

mod mapping;
mod resolver;

pub use mapping::RichletMappings;
pub(crate) use resolver::LoadContext;
pub use resolver::RichletResolver;

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::error::HandlerResult;

/// A controller serving the paths it is mapped to
pub trait Richlet: Send + Sync {
    /// Called once, after construction and before first use
    fn init(&self, _config: &RichletConfig) -> HandlerResult<()> {
        Ok(())
    }

    /// Called when the richlet is replaced or the application shuts down
    fn destroy(&self) -> HandlerResult<()> {
        Ok(())
    }
}

/// Settings handed to [`Richlet::init`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichletConfig {
    /// Richlet name
    pub name: String,
    /// Name of the bound application, if any
    pub app_name: Option<String>,
    /// Initialisation parameters
    pub params: BTreeMap<String, String>,
}

impl RichletConfig {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Builds a richlet instance
pub type RichletFactory = Arc<dyn Fn() -> HandlerResult<Arc<dyn Richlet>> + Send + Sync>;

/// Where a richlet definition gets its instance from
#[derive(Clone)]
pub enum RichletSource {
    /// Build with the given factory
    Factory(RichletFactory),
    /// Build the type registered under this name in the [`TypeCatalog`]
    ///
    /// Resolved only when the richlet is first loaded.
    ///
    /// [`TypeCatalog`]: crate::TypeCatalog
    Named(String),
}

impl RichletSource {
    /// Source building `R::default()`
    pub fn of<R: Richlet + Default + 'static>() -> Self {
        RichletSource::Factory(Arc::new(|| Ok(Arc::new(R::default()) as Arc<dyn Richlet>)))
    }

    pub fn named(class: impl Into<String>) -> Self {
        RichletSource::Named(class.into())
    }
}

impl fmt::Debug for RichletSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RichletSource::Factory(_) => f.write_str("Factory(..)"),
            RichletSource::Named(class) => f.debug_tuple("Named").field(class).finish(),
        }
    }
}

impl fmt::Display for RichletSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RichletSource::Factory(_) => f.write_str("<factory>"),
            RichletSource::Named(class) => f.write_str(class),
        }
    }
}
