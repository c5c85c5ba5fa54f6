//! Execution targets and their registry.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ExecError;
use crate::Result;

/// Namespace used when a target name carries none.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Names a remote process endpoint as `namespace/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExecutionTarget {
    pub namespace: String,
    pub name: String,
}

impl ExecutionTarget {
    /// Create a target from namespace and name.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

impl FromStr for ExecutionTarget {
    type Err = ExecError;

    /// Parse `namespace/name`, or a bare `name` in the default namespace.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (namespace, name) = match s.split_once('/') {
            Some((ns, name)) => (ns, name),
            None => (DEFAULT_NAMESPACE, s),
        };

        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ExecError::TargetNotFound(s.to_string()));
        }

        Ok(Self::new(namespace, name))
    }
}

/// How the local transport reaches a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetSpec {
    /// Working directory for the spawned process.
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables.
    pub env: HashMap<String, String>,
    /// Tokens prepended to every command, e.g.
    /// `["kubectl", "exec", "-i", "-n", "default", "web-0", "--"]`.
    pub launcher: Vec<String>,
}

impl TargetSpec {
    /// Spec with a launcher prefix.
    pub fn with_launcher<I, S>(launcher: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            launcher: launcher.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// A target that exists, with the details a transport needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub target: ExecutionTarget,
    pub spec: TargetSpec,
}

/// Thread-safe lookup of known targets.
pub struct TargetRegistry {
    targets: RwLock<HashMap<ExecutionTarget, TargetSpec>>,
}

impl TargetRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            targets: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) a target.
    pub fn register(&self, target: ExecutionTarget, spec: TargetSpec) {
        debug!("registering target {}", target);
        self.targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(target, spec);
    }

    /// Remove a target, returning its spec.
    pub fn remove(&self, target: &ExecutionTarget) -> Option<TargetSpec> {
        self.targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(target)
    }

    /// Look up a target by `namespace/name` (or bare name).
    pub fn resolve(&self, name: &str) -> Result<ResolvedTarget> {
        let target: ExecutionTarget = name.parse()?;
        let targets = self.targets.read().unwrap_or_else(PoisonError::into_inner);

        targets
            .get(&target)
            .cloned()
            .map(|spec| ResolvedTarget {
                target: target.clone(),
                spec,
            })
            .ok_or_else(|| ExecError::TargetNotFound(target.to_string()))
    }

    /// Check if a target is registered.
    pub fn contains(&self, target: &ExecutionTarget) -> bool {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(target)
    }

    /// Number of registered targets.
    pub fn count(&self) -> usize {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for TargetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<(ExecutionTarget, TargetSpec)> for TargetRegistry {
    fn from_iter<I: IntoIterator<Item = (ExecutionTarget, TargetSpec)>>(iter: I) -> Self {
        Self {
            targets: RwLock::new(iter.into_iter().collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_qualified() {
        let target: ExecutionTarget = "kube-system/coredns-0".parse().unwrap();
        assert_eq!(target.namespace, "kube-system");
        assert_eq!(target.name, "coredns-0");
        assert_eq!(target.to_string(), "kube-system/coredns-0");
    }

    #[test]
    fn test_parse_bare_name_uses_default_namespace() {
        let target: ExecutionTarget = "web-0".parse().unwrap();
        assert_eq!(target, ExecutionTarget::new(DEFAULT_NAMESPACE, "web-0"));
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<ExecutionTarget>().is_err());
        assert!("ns/".parse::<ExecutionTarget>().is_err());
        assert!("/name".parse::<ExecutionTarget>().is_err());
        assert!("a/b/c".parse::<ExecutionTarget>().is_err());
    }

    #[test]
    fn test_resolve_registered() {
        let registry = TargetRegistry::new();
        let spec = TargetSpec::with_launcher(["docker", "exec", "-i", "web"]);
        registry.register(ExecutionTarget::new("default", "web"), spec.clone());

        let resolved = registry.resolve("web").unwrap();
        assert_eq!(resolved.target.to_string(), "default/web");
        assert_eq!(resolved.spec, spec);
    }

    #[test]
    fn test_resolve_missing() {
        let registry = TargetRegistry::new();
        let err = registry.resolve("default/ghost").unwrap_err();
        assert!(matches!(err, ExecError::TargetNotFound(ref t) if t == "default/ghost"));
    }

    #[test]
    fn test_remove_and_count() {
        let registry: TargetRegistry = [
            (ExecutionTarget::new("b", "two"), TargetSpec::default()),
            (ExecutionTarget::new("a", "one"), TargetSpec::default()),
        ]
        .into_iter()
        .collect();

        assert_eq!(registry.count(), 2);
        assert!(registry.resolve("a/one").is_ok());

        let one = ExecutionTarget::new("a", "one");
        assert!(registry.remove(&one).is_some());
        assert!(!registry.contains(&one));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_concurrent_registration() {
        use std::sync::Arc;
        use std::thread;

        let registry = Arc::new(TargetRegistry::new());
        let handles: Vec<_> = (0..50)
            .map(|i| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || {
                    registry.register(
                        ExecutionTarget::new("default", format!("pod-{i}")),
                        TargetSpec::default(),
                    )
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(registry.count(), 50);
    }

    #[test]
    fn test_spec_deserialize_partial() {
        let spec: TargetSpec = serde_json::from_str(r#"{"launcher": ["ssh", "host"]}"#).unwrap();
        assert_eq!(spec.launcher, vec!["ssh", "host"]);
        assert!(spec.working_dir.is_none());
        assert!(spec.env.is_empty());
    }
}
