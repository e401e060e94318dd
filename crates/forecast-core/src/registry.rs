use std::collections::BTreeMap;

use crate::error::{PipelineError, PipelineResult};
use crate::traits::Forecaster;

type ForecasterFactory = Box<dyn Fn() -> PipelineResult<Box<dyn Forecaster>> + Send + Sync>;

/// Registry mapping model identifiers to forecaster factories.
///
/// Models are instantiated on demand; a name that was never registered is an
/// explicit `UnknownModel` error and an empty registry is `NoModelsAvailable`
/// rather than any silent first-available fallback.
#[derive(Default)]
pub struct ModelRegistry {
    factories: BTreeMap<String, ForecasterFactory>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> PipelineResult<Box<dyn Forecaster>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Instantiate the model registered under `name`.
    pub fn create(&self, name: &str) -> PipelineResult<Box<dyn Forecaster>> {
        if self.factories.is_empty() {
            return Err(PipelineError::NoModelsAvailable);
        }
        match self.factories.get(name) {
            Some(factory) => factory(),
            None => Err(PipelineError::UnknownModel(name.to_string())),
        }
    }

    /// All registered model names, in stable sorted order.
    pub fn available_models(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.available_models())
            .finish()
    }
}
