//! Core data types for modsolve: semantic versions, version ranges, the
//! release index format and resolver configuration.

pub mod config;
pub mod index;
pub mod range;
pub mod version;
