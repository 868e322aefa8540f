//! Component loading.
//!
//! The coordinator resolves component names through a [`ComponentLoader`];
//! where instances come from is not its concern. [`Registry`] is the
//! in-process implementation: a name-to-factory map populated at setup.

use crate::component::Component;
use crate::error::ComponentError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory producing a fresh component instance per node.
///
/// The argument is the node's metadata from the graph definition.
pub type ComponentFactory = Arc<dyn Fn(&Value) -> Box<dyn Component> + Send + Sync>;

/// Resolves component names to instances.
#[async_trait]
pub trait ComponentLoader: Send + Sync {
    /// Loads a fresh instance of the named component.
    ///
    /// # Errors
    ///
    /// [`ComponentError::UnknownComponent`] when the name resolves to
    /// nothing; implementations may fail for their own reasons (I/O,
    /// compilation) and those errors propagate verbatim.
    async fn load(&self, name: &str, metadata: &Value) -> Result<Box<dyn Component>, ComponentError>;
}

/// In-process name-to-factory registry.
///
/// # Example
///
/// ```
/// use weir_component::{Registry, testing::Repeat};
///
/// let mut registry = Registry::new();
/// registry.register("Repeat", || Box::new(Repeat::new()));
/// assert!(registry.contains("Repeat"));
/// ```
#[derive(Default, Clone)]
pub struct Registry {
    factories: HashMap<String, ComponentFactory>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory that ignores node metadata. Chainable.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Component> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.into(), Arc::new(move |_metadata| factory()));
        self
    }

    /// Registers a metadata-aware factory. Chainable.
    pub fn register_with_metadata(
        &mut self,
        name: impl Into<String>,
        factory: ComponentFactory,
    ) -> &mut Self {
        self.factories.insert(name.into(), factory);
        self
    }

    /// Returns `true` if the name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Returns registered names in arbitrary order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[async_trait]
impl ComponentLoader for Registry {
    async fn load(&self, name: &str, metadata: &Value) -> Result<Box<dyn Component>, ComponentError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ComponentError::UnknownComponent(name.to_string()))?;
        Ok(factory(metadata))
    }
}
