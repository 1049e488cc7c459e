//! Shared primitives: canvas geometry, hashing, atomic file helpers and the error taxonomy.

pub(crate) mod core;
pub(crate) mod error;
pub(crate) mod fs;
pub(crate) mod math;
