//! First-non-absent resolution across configuration override layers.
//!
//! Vendor configurations resolve many attributes through an inheritance
//! chain (neighbor, then peer group, then address-family or global
//! defaults). Instead of modeling the chain with trait objects, callers
//! list the layers most-specific-first and take the first present value.

/// First present value among the layers, or `None` when all are absent.
#[must_use]
pub fn first_of<T>(layers: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    layers.into_iter().flatten().next()
}

/// First present value among the layers, falling back to an ultimate
/// default.
#[must_use]
pub fn first_of_or<T>(layers: impl IntoIterator<Item = Option<T>>, default: T) -> T {
    first_of(layers).unwrap_or(default)
}
