use std::fmt;

use super::statement::Statement;

/// An immutable, uniquely named unit of compiled policy logic.
///
/// Created exactly once by whichever compilation step first needs it,
/// then inserted into the [`PolicyRegistry`](super::registry::PolicyRegistry)
/// and referenced only by name from other policies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub name: String,
    pub statements: Vec<Statement>,
}

impl Policy {
    #[must_use]
    pub fn new(name: impl Into<String>, statements: Vec<Statement>) -> Self {
        Self {
            name: name.into(),
            statements,
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Policy({}, {} statements)",
            self.name,
            self.statements.len()
        )
    }
}
