//! Source-image storage and decoding.

pub(crate) mod decode;
pub(crate) mod store;
