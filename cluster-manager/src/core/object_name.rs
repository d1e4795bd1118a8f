//! Management object names
//!
//! Names have the form `domain:key=value[,key=value]*`. Two names are equal
//! when their domains match and they carry the same key set, regardless of
//! the order the keys were written in.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::SetupError;

/// Well-known name the test cluster manager is bound under
pub const TEST_CLUSTER_MANAGER_NAME: &str = "broker:module=test,type=TestClusterManager";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectName {
    domain: String,
    properties: BTreeMap<String, String>,
}

impl ObjectName {
    pub fn parse(name: &str) -> Result<Self, SetupError> {
        let invalid = |reason: &str| SetupError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let (domain, keys) = name.split_once(':').ok_or_else(|| invalid("missing ':' separator"))?;
        let domain = domain.trim();
        if domain.is_empty() {
            return Err(invalid("empty domain"));
        }
        if keys.trim().is_empty() {
            return Err(invalid("no key properties"));
        }

        let mut properties = BTreeMap::new();
        for pair in keys.split(',') {
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| invalid(&format!("property '{pair}' has no '='")))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(invalid("empty property key"));
            }
            if properties.insert(key.to_string(), value.trim().to_string()).is_some() {
                return Err(invalid(&format!("duplicate key '{key}'")));
            }
        }

        Ok(Self {
            domain: domain.to_string(),
            properties,
        })
    }

    /// Name of the test cluster manager
    pub fn test_cluster_manager() -> Self {
        Self {
            domain: "broker".to_string(),
            properties: BTreeMap::from([
                ("module".to_string(), "test".to_string()),
                ("type".to_string(), "TestClusterManager".to_string()),
            ]),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

impl FromStr for ObjectName {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Canonical form: keys sorted
impl fmt::Display for ObjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.domain)?;
        let mut first = true;
        for (key, value) in &self.properties {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{key}={value}")?;
            first = false;
        }
        Ok(())
    }
}
