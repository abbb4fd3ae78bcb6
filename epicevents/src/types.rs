//! Common type definitions.
//!
//! Entity IDs are plain `i64` row ids wrapped in type aliases for readability:
//!
//! - [`CollaboratorId`]: staff account identifier
//! - [`ClientId`]: client identifier
//! - [`ContractId`]: contract identifier
//! - [`EventId`]: event identifier

// Type aliases for IDs
pub type CollaboratorId = i64;
pub type ClientId = i64;
pub type ContractId = i64;
pub type EventId = i64;
