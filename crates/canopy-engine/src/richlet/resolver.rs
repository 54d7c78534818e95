//! Load-once richlet cache
//!
//! Each name moves `Unloaded -> Loading -> Loaded`, or back to `Unloaded`
//! when the load fails so the next resolve retries. The thread that claims
//! an unloaded slot builds and initialises the richlet without holding the
//! map lock; every other resolver of that name waits on the slot's
//! load signal for at most the configured timeout.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info, warn};

use super::{Richlet, RichletConfig, RichletSource};
use crate::{
    catalog::TypeCatalog,
    error::{EngineError, Result},
};

/// What a load needs besides the definition
pub(crate) struct LoadContext<'a> {
    pub app_name: Option<&'a str>,
    pub catalog: &'a TypeCatalog,
    pub timeout: Duration,
}

struct Definition {
    source: RichletSource,
    params: BTreeMap<String, String>,
}

type Outcome = std::result::Result<Arc<dyn Richlet>, String>;

/// Completion signal of one load
struct LoadWait {
    outcome: Mutex<Option<Outcome>>,
    done: Condvar,
}

impl LoadWait {
    fn new() -> Self {
        Self {
            outcome: Mutex::new(None),
            done: Condvar::new(),
        }
    }

    fn publish(&self, outcome: Outcome) {
        *self.outcome.lock() = Some(outcome);
        self.done.notify_all();
    }

    /// `None` on timeout
    ///
    /// A timeout too large to express as a deadline waits without bound.
    fn wait(&self, timeout: Duration) -> Option<Outcome> {
        let deadline = Instant::now().checked_add(timeout);
        let mut outcome = self.outcome.lock();
        while outcome.is_none() {
            match deadline {
                Some(deadline) => {
                    if self.done.wait_until(&mut outcome, deadline).timed_out() {
                        break;
                    }
                }
                None => self.done.wait(&mut outcome),
            }
        }
        outcome.clone()
    }
}

enum Slot {
    Unloaded(Arc<Definition>),
    Loading(Arc<LoadWait>, Arc<Definition>),
    Loaded(Arc<dyn Richlet>, Arc<Definition>),
}

impl Slot {
    fn definition(&self) -> &Arc<Definition> {
        match self {
            Slot::Unloaded(def) | Slot::Loading(_, def) | Slot::Loaded(_, def) => def,
        }
    }
}

/// Richlet definitions and their loaded instances
#[derive(Default)]
pub struct RichletResolver {
    slots: Mutex<HashMap<String, Slot>>,
}

impl RichletResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define or redefine `name`
    ///
    /// Returns the previous source. A previously loaded instance is
    /// destroyed; a load in progress finishes for its callers but is not
    /// cached.
    pub fn add(
        &self,
        name: &str,
        source: RichletSource,
        params: BTreeMap<String, String>,
    ) -> Result<Option<RichletSource>> {
        if name.is_empty() {
            return Err(EngineError::InvalidArgument("empty richlet name".to_string()));
        }
        let definition = Arc::new(Definition { source, params });
        let previous = self
            .slots
            .lock()
            .insert(name.to_string(), Slot::Unloaded(definition));

        Ok(previous.map(|slot| {
            if let Slot::Loaded(richlet, _) = &slot {
                destroy(name, richlet.as_ref());
            }
            slot.definition().source.clone()
        }))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.lock().contains_key(name)
    }

    /// Whether `name` holds a loaded instance
    pub fn is_loaded(&self, name: &str) -> bool {
        matches!(self.slots.lock().get(name), Some(Slot::Loaded(..)))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.slots.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// The instance of `name`, loading it on first use
    ///
    /// # Errors
    ///
    /// - [`EngineError::RichletNotDefined`] if `name` is unknown
    /// - [`EngineError::RichletLoad`] if building or initialising it failed,
    ///   here or in the thread this call waited on
    /// - [`EngineError::DeadlockSuspected`] if another thread's load did not
    ///   finish within the timeout
    pub(crate) fn resolve(&self, name: &str, ctx: &LoadContext<'_>) -> Result<Arc<dyn Richlet>> {
        let claim = {
            let mut slots = self.slots.lock();
            let current = match slots.get(name) {
                None => return Err(EngineError::RichletNotDefined(name.to_string())),
                Some(Slot::Loaded(richlet, _)) => return Ok(Arc::clone(richlet)),
                Some(Slot::Loading(wait, _)) => Err(Arc::clone(wait)),
                Some(Slot::Unloaded(def)) => Ok(Arc::clone(def)),
            };
            current.map(|def| {
                let wait = Arc::new(LoadWait::new());
                slots.insert(
                    name.to_string(),
                    Slot::Loading(Arc::clone(&wait), Arc::clone(&def)),
                );
                (wait, def)
            })
        };

        match claim {
            Ok((wait, definition)) => {
                let mut guard = LoadGuard {
                    resolver: self,
                    name,
                    wait,
                    definition,
                    finished: false,
                };
                let outcome = load(name, &guard.definition, ctx);
                guard.finish(outcome.clone());
                outcome.map_err(|reason| EngineError::RichletLoad {
                    name: name.to_string(),
                    reason,
                })
            }
            Err(wait) => {
                debug!(richlet = name, "Waiting for richlet load by another thread");
                match wait.wait(ctx.timeout) {
                    Some(outcome) => outcome.map_err(|reason| EngineError::RichletLoad {
                        name: name.to_string(),
                        reason,
                    }),
                    None => {
                        warn!(
                            richlet = name,
                            waited_secs = ctx.timeout.as_secs(),
                            "Richlet load did not finish in time, possible deadlock"
                        );
                        Err(EngineError::DeadlockSuspected {
                            name: name.to_string(),
                            waited: ctx.timeout,
                        })
                    }
                }
            }
        }
    }

    /// Destroy every loaded instance and drop all definitions
    pub fn destroy_all(&self) {
        let slots = std::mem::take(&mut *self.slots.lock());
        for (name, slot) in slots {
            if let Slot::Loaded(richlet, _) = slot {
                destroy(&name, richlet.as_ref());
            }
        }
    }

    /// Store the outcome of a load unless the definition changed meanwhile
    fn commit(
        &self,
        name: &str,
        wait: &Arc<LoadWait>,
        definition: &Arc<Definition>,
        loaded: Option<Arc<dyn Richlet>>,
    ) {
        let mut slots = self.slots.lock();
        let ours = matches!(
            slots.get(name),
            Some(Slot::Loading(current, _)) if Arc::ptr_eq(current, wait)
        );
        if !ours {
            debug!(richlet = name, "Richlet redefined while loading, result not cached");
            return;
        }
        let next = match loaded {
            Some(richlet) => Slot::Loaded(richlet, Arc::clone(definition)),
            None => Slot::Unloaded(Arc::clone(definition)),
        };
        slots.insert(name.to_string(), next);
    }
}

/// Releases waiters even if the loader unwinds
struct LoadGuard<'a> {
    resolver: &'a RichletResolver,
    name: &'a str,
    wait: Arc<LoadWait>,
    definition: Arc<Definition>,
    finished: bool,
}

impl LoadGuard<'_> {
    fn finish(&mut self, outcome: Outcome) {
        self.resolver.commit(
            self.name,
            &self.wait,
            &self.definition,
            outcome.as_ref().ok().cloned(),
        );
        self.wait.publish(outcome);
        self.finished = true;
    }
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.resolver
                .commit(self.name, &self.wait, &self.definition, None);
            self.wait.publish(Err("loader panicked".to_string()));
        }
    }
}

fn load(name: &str, definition: &Definition, ctx: &LoadContext<'_>) -> Outcome {
    let built = match &definition.source {
        RichletSource::Factory(factory) => factory().map_err(|e| e.to_string()),
        RichletSource::Named(class) => ctx
            .catalog
            .instantiate_richlet(class)
            .map_err(|e| e.to_string()),
    };
    let richlet = match built {
        Ok(richlet) => richlet,
        Err(e) => {
            error!(richlet = name, error = %e, "Unable to create richlet");
            return Err(e);
        }
    };
    let config = RichletConfig {
        name: name.to_string(),
        app_name: ctx.app_name.map(str::to_string),
        params: definition.params.clone(),
    };
    if let Err(e) = richlet.init(&config) {
        error!(richlet = name, error = %e, "Unable to initialise richlet");
        return Err(format!("init failed: {}", e));
    }
    info!(richlet = name, source = %definition.source, "Richlet loaded");
    Ok(richlet)
}

fn destroy(name: &str, richlet: &dyn Richlet) {
    if let Err(e) = richlet.destroy() {
        error!(richlet = name, error = %e, "Unable to destroy richlet");
    }
}
