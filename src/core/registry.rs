use crate::core::error::AppError;
use crate::core::helper::{Helper, HelperMetadata};
use crate::core::helpers;
use crate::core::schema::ConfigSchema;
use crate::core::types::ErrorCategory;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Zero-argument constructor producing a fresh helper instance.
pub type HelperFactory = Arc<dyn Fn() -> Box<dyn Helper> + Send + Sync>;

/// Catalog entry returned by [`HelperRegistry::list_helper_info`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelperInfo {
    #[serde(flatten)]
    pub metadata: HelperMetadata,
    pub config_schema: ConfigSchema,
}

/// Builder used to register helpers before the registry is frozen.
///
/// Registering a type that already exists replaces its factory but keeps its original
/// position in listing order, so repeating a registration is harmless.
pub struct HelperRegistryBuilder {
    factories: IndexMap<String, HelperFactory>,
}

impl Default for HelperRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HelperRegistryBuilder {
    pub fn new() -> Self {
        Self {
            factories: IndexMap::new(),
        }
    }

    /// Register `factory` under `helper_type`, which must equal the type the factory's
    /// helpers report for themselves.
    pub fn register<F>(&mut self, helper_type: &str, factory: F) -> &mut Self
    where
        F: Fn() -> Box<dyn Helper> + Send + Sync + 'static,
    {
        debug_assert_eq!(
            factory().helper_type(),
            helper_type,
            "factory registered under a different helper type"
        );
        if self
            .factories
            .insert(helper_type.to_string(), Arc::new(factory))
            .is_some()
        {
            tracing::debug!(helper_type, "replaced existing helper registration");
        }
        self
    }

    /// Register `H` under the type it reports for itself.
    pub fn register_helper<H>(&mut self) -> &mut Self
    where
        H: Helper + Default,
    {
        let helper_type = H::default().helper_type();
        self.register(helper_type, || Box::new(H::default()))
    }

    pub fn is_registered(&self, helper_type: &str) -> bool {
        self.factories.contains_key(helper_type)
    }

    pub fn build(self) -> HelperRegistry {
        HelperRegistry {
            inner: Arc::new(self.factories),
        }
    }
}

/// Immutable registry shared by every execution. Cloning is cheap.
#[derive(Clone)]
pub struct HelperRegistry {
    inner: Arc<IndexMap<String, HelperFactory>>,
}

impl Default for HelperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HelperRegistry {
    pub fn new() -> Self {
        HelperRegistryBuilder::new().build()
    }

    pub fn builder() -> HelperRegistryBuilder {
        HelperRegistryBuilder::new()
    }

    /// Registry populated with every built-in helper.
    pub fn with_builtins() -> Self {
        let mut builder = HelperRegistryBuilder::new();
        helpers::register_builtins(&mut builder);
        builder.build()
    }

    pub fn is_registered(&self, helper_type: &str) -> bool {
        self.inner.contains_key(helper_type)
    }

    #[allow(clippy::result_large_err)]
    pub fn new_helper(&self, helper_type: &str) -> Result<Box<dyn Helper>, AppError> {
        let factory = self.inner.get(helper_type).ok_or_else(|| {
            let mut err = AppError::new(
                ErrorCategory::NotRegistered,
                format!("helper type '{}' is not registered", helper_type),
            )
            .with_code("HLP-REG-001");
            err.add_context("helper_type", helper_type);
            err
        })?;
        Ok(factory())
    }

    /// Metadata and schema for every registered helper, in registration order.
    pub fn list_helper_info(&self) -> Vec<HelperInfo> {
        self.inner
            .values()
            .map(|factory| {
                let helper = factory();
                HelperInfo {
                    metadata: helper.metadata(),
                    config_schema: helper.config_schema(),
                }
            })
            .collect()
    }

    pub fn helper_types(&self) -> Vec<String> {
        self.inner.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
