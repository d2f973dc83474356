//! Lexical scopes for FEEL evaluation.
//!
//! An environment is a stack of scopes: the bottom scope holds the built-in
//! functions, above it sit the user-supplied variables, and iteration or
//! context-literal evaluation push transient scopes on top. Scopes are
//! immutable once wrapped in an `Arc`, and chain to their parent by shared
//! reference, so function values can capture their defining environment
//! without copying it.

use std::collections::HashMap;
use std::sync::Arc;

use super::Value;

/// One frame of the lexical environment.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    bindings: HashMap<String, Value>,
    parent: Option<Arc<Scope>>,
}

impl Scope {
    /// Create an empty root scope.
    pub fn root() -> Self {
        Self::default()
    }

    /// Create a scope nested inside `parent`.
    pub fn nested(parent: Arc<Scope>) -> Self {
        Self {
            bindings: HashMap::new(),
            parent: Some(parent),
        }
    }

    /// Bind a name in this scope, shadowing any outer binding.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    /// Resolve a name, walking from this scope outward.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.bindings.get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Check whether a name is bound anywhere in the chain.
    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
            || self.parent.as_ref().is_some_and(|p| p.has(name))
    }

    /// Build a child scope of `parent` holding the given bindings.
    pub fn child_with(
        parent: &Arc<Scope>,
        bindings: impl IntoIterator<Item = (String, Value)>,
    ) -> Arc<Scope> {
        let mut scope = Scope::nested(parent.clone());
        for (name, value) in bindings {
            scope.bind(name, value);
        }
        Arc::new(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_the_chain() {
        let mut root = Scope::root();
        root.bind("x", Value::from(1));
        root.bind("y", Value::from(2));
        let root = Arc::new(root);

        let child = Scope::child_with(&root, [("x".to_string(), Value::from(10))]);

        // Local binding shadows the parent
        assert_eq!(child.lookup("x"), Some(Value::from(10)));
        // Parent binding is still reachable
        assert_eq!(child.lookup("y"), Some(Value::from(2)));
        // Unknown names resolve to None
        assert_eq!(child.lookup("z"), None);
    }

    #[test]
    fn has_checks_the_whole_chain() {
        let mut root = Scope::root();
        root.bind("x", Value::Null);
        let root = Arc::new(root);
        let child = Arc::new(Scope::nested(root));

        assert!(child.has("x"));
        assert!(!child.has("y"));
    }

    #[test]
    fn captured_chain_outlives_the_frame() {
        // A scope chain captured by a closure stays valid after the caller
        // has moved on to other scopes.
        let mut root = Scope::root();
        root.bind("n", Value::from(41));
        let root = Arc::new(root);

        let captured = Scope::child_with(&root, [("m".to_string(), Value::from(1))]);
        drop(root);

        assert_eq!(captured.lookup("n"), Some(Value::from(41)));
        assert_eq!(captured.lookup("m"), Some(Value::from(1)));
    }
}
