//! Named type catalog
//!
//! Settings files refer to listeners and richlets by name. The catalog maps
//! those names to something that can build an instance, standing in for
//! runtime class loading.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::{EngineError, Result},
    listener::ListenerType,
    richlet::{Richlet, RichletFactory},
};

/// Types that can be instantiated by name
#[derive(Default, Clone)]
pub struct TypeCatalog {
    listeners: HashMap<String, ListenerType>,
    richlets: HashMap<String, RichletFactory>,
}

impl TypeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `listener` available under `name`
    pub fn add_listener(&mut self, name: impl Into<String>, listener: ListenerType) -> &mut Self {
        self.listeners.insert(name.into(), listener);
        self
    }

    /// Make `R::default()` available under `class`
    pub fn add_richlet<R>(&mut self, class: impl Into<String>) -> &mut Self
    where
        R: Richlet + Default + 'static,
    {
        self.add_richlet_factory(
            class,
            Arc::new(|| Ok(Arc::new(R::default()) as Arc<dyn Richlet>)),
        )
    }

    pub fn add_richlet_factory(
        &mut self,
        class: impl Into<String>,
        factory: RichletFactory,
    ) -> &mut Self {
        self.richlets.insert(class.into(), factory);
        self
    }

    /// Listener type registered under `name`
    pub fn listener(&self, name: &str) -> Result<&ListenerType> {
        self.listeners.get(name).ok_or_else(|| {
            EngineError::Configuration(format!("Unknown listener type: {}", name))
        })
    }

    /// Build a new instance of the richlet class `class`
    pub fn instantiate_richlet(&self, class: &str) -> Result<Arc<dyn Richlet>> {
        let factory = self.richlets.get(class).ok_or_else(|| {
            EngineError::Configuration(format!("Unknown richlet class: {}", class))
        })?;
        factory().map_err(|e| EngineError::RichletLoad {
            name: class.to_string(),
            reason: e.to_string(),
        })
    }
}
