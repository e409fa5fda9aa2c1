use std::fmt;

/// Free-text diagnostics collected during one device's conversion.
///
/// Passed `&mut` through every compilation call rather than held as a
/// global, so an outer driver can convert many devices concurrently with
/// one sink per device. Append-only; recording a warning never fails and
/// never interrupts compilation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Warnings {
    entries: Vec<String>,
}

impl Warnings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        let text = text.into();
        tracing::warn!(warning = %text, "conversion warning");
        self.entries.push(text);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Count of warnings mentioning `needle`. Convenience for tests and
    /// for callers aggregating per-object diagnostics.
    #[must_use]
    pub fn count_matching(&self, needle: &str) -> usize {
        self.entries.iter().filter(|e| e.contains(needle)).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "warning: {entry}")?;
        }
        Ok(())
    }
}
