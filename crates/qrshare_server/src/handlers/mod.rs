//! HTTP request handlers.

pub(crate) mod negotiate;
pub(crate) mod origin;
/// Share publish and retrieval endpoints.
pub mod share;
