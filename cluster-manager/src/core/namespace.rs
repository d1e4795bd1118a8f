//! Management namespace
//!
//! An explicitly constructed directory of registries addressable by
//! [`ObjectName`]. Clones share the same bindings, so one namespace created at
//! startup can be handed to the launcher, the management listener and tests.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use shared::{process_debug, ProcessId};

use crate::core::object_name::ObjectName;
use crate::core::registry::TestClusterManager;
use crate::error::SetupError;
use crate::traits::NodeRegistry;

#[derive(Clone, Default)]
pub struct ManagementNamespace {
    bindings: Arc<RwLock<HashMap<ObjectName, Arc<dyn NodeRegistry>>>>,
}

impl ManagementNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `registry` under `name`
    ///
    /// Fails with [`SetupError::AlreadyBound`] if the name is taken; the
    /// existing binding is left untouched.
    pub async fn bind(&self, name: ObjectName, registry: Arc<dyn NodeRegistry>) -> Result<(), SetupError> {
        let mut bindings = self.bindings.write().await;
        if bindings.contains_key(&name) {
            return Err(SetupError::AlreadyBound { name: name.to_string() });
        }
        process_debug!(ProcessId::current(), "🔗 Bound registry under {}", name);
        bindings.insert(name, registry);
        Ok(())
    }

    pub async fn lookup(&self, name: &ObjectName) -> Option<Arc<dyn NodeRegistry>> {
        self.bindings.read().await.get(name).cloned()
    }

    pub async fn is_bound(&self, name: &ObjectName) -> bool {
        self.bindings.read().await.contains_key(name)
    }

    pub async fn unbind(&self, name: &ObjectName) -> bool {
        self.bindings.write().await.remove(name).is_some()
    }

    /// Create the test cluster manager and bind it under its well-known name
    ///
    /// This is the single bootstrap step for the registry. A second call on the
    /// same namespace fails with [`SetupError::AlreadyBound`].
    pub async fn create_test_cluster_manager(&self) -> Result<TestClusterManager, SetupError> {
        let manager = TestClusterManager::new();
        self.bind(ObjectName::test_cluster_manager(), Arc::new(manager.clone()))
            .await?;
        Ok(manager)
    }

    /// The registry bound under the well-known test cluster manager name, if any
    pub async fn test_cluster_manager(&self) -> Option<Arc<dyn NodeRegistry>> {
        self.lookup(&ObjectName::test_cluster_manager()).await
    }
}

impl std::fmt::Debug for ManagementNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagementNamespace").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockNodeRegistry;

    #[tokio::test]
    async fn test_empty_namespace_has_no_manager() {
        let namespace = ManagementNamespace::new();
        assert!(namespace.test_cluster_manager().await.is_none());
    }

    #[tokio::test]
    async fn test_unbind_frees_the_name() {
        let namespace = ManagementNamespace::new();
        let name = ObjectName::parse("broker:type=Other").unwrap();

        namespace
            .bind(name.clone(), Arc::new(MockNodeRegistry::new()))
            .await
            .unwrap();
        assert!(namespace.is_bound(&name).await);

        assert!(namespace.unbind(&name).await);
        assert!(!namespace.is_bound(&name).await);
        assert!(!namespace.unbind(&name).await);
    }

    #[tokio::test]
    async fn test_clones_share_bindings() {
        let namespace = ManagementNamespace::new();
        let other = namespace.clone();

        namespace.create_test_cluster_manager().await.unwrap();
        assert!(other.test_cluster_manager().await.is_some());
    }
}
