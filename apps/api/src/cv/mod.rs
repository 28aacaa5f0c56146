//! CV documents: the typed data model and the transforms over it (validation,
//! defaults, merge, duplication, sharing), plus persistence and HTTP handlers.

pub mod completeness;
pub mod data;
pub mod defaults;
pub mod duplicate;
pub mod handlers;
pub mod merge;
pub mod render;
pub mod share;
pub mod templates;
pub mod validation;
pub mod versioning;
