//! Data models for share persistence and the HTTP API.

/// Share records and request/response payloads.
pub mod share;
