use thiserror::Error;

/// Programming-defect failures.
///
/// Configuration defects never surface here; they degrade locally and go
/// to the [`Warnings`](super::warning::Warnings) sink. A `ConvertError`
/// means the compiler itself violated one of its own invariants, and it
/// aborts the conversion of the single device being compiled.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("policy '{name}' defined twice in one device registry")]
    DuplicatePolicy { name: String },

    #[error("policy '{name}' was referenced before being reserved by construction")]
    MissingReservedPolicy { name: String },
}
