use std::collections::BTreeMap;

use super::error::ConvertError;
use super::policy::Policy;

/// The per-device mapping from policy name to compiled policy.
///
/// Single source of truth for cross-policy calls: mutated only by
/// insert-if-absent, nothing is ever removed or overwritten, and a
/// duplicate insertion is a programming defect. One registry per device
/// conversion run; iteration order is the name order, so identical input
/// yields byte-identical contents.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PolicyRegistry {
    policies: BTreeMap<String, Policy>,
}

impl PolicyRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a policy under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`ConvertError::DuplicatePolicy`] if the name is already
    /// taken; names are unique by construction, so a collision means the
    /// compiler is broken, not the configuration.
    pub fn define(&mut self, policy: Policy) -> Result<(), ConvertError> {
        if self.policies.contains_key(&policy.name) {
            return Err(ConvertError::DuplicatePolicy { name: policy.name });
        }
        self.policies.insert(policy.name.clone(), policy);
        Ok(())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Policy> {
        self.policies.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.policies.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Policy> {
        self.policies.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}
