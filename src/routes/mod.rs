//! Router Module Index
//!
//! Organizes routing into access-segregated modules. Guarded handlers receive
//! their actor through a guard extractor, so a route cannot be exposed by
//! forgetting a layer.

/// Routes accessible to every visitor, with or without a session.
pub mod public;

/// Routes that need a resolved session but no particular role.
pub mod authenticated;

/// Routes restricted to the 'admin' role.
pub mod admin;
