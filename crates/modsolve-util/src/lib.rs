//! Shared utilities for modsolve.
//!
//! This crate holds the cross-cutting error type used by the version model,
//! the release sources and the resolver.

pub mod errors;
