use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all modsolve operations.
#[derive(Debug, Error, Diagnostic)]
pub enum ModError {
    /// A version string failed the semantic version grammar.
    #[error("Invalid version '{input}': {reason}")]
    MalformedVersion { input: String, reason: String },

    /// A version range expression could not be parsed.
    #[error("Unparsable version range: {input:?}")]
    #[diagnostic(help(
        "Use forms like `1.2.3`, `1.x`, `>=1.0.0 <2.0.0`, `~1.2`, `^1.2.3` or `1.0.0 - 1.3.9`"
    ))]
    MalformedRange { input: String },

    /// No consistent set of releases satisfies the requested modules.
    #[error("Could not find satisfying releases for {}", .modules.join(", "))]
    Unsatisfiable {
        /// The root modules of the failed request.
        modules: Vec<String>,
        /// The module whose candidates ran out most recently.
        unsatisfied: Option<String>,
        /// Requirement chain that produced the empty candidate set.
        #[help]
        detail: Option<String>,
    },

    /// A release source failed to produce releases.
    #[error("Source '{source_label}' failed: {message}")]
    Source {
        source_label: String,
        message: String,
    },

    /// A release index document is invalid.
    #[error("Invalid release index: {message}")]
    Index { message: String },

    /// Resolver configuration could not be loaded.
    #[error("Configuration error: {message}")]
    #[diagnostic(help("Check the resolver configuration file for syntax errors"))]
    Config { message: String },
}

/// Convenience alias for `miette::Result<T>`.
pub type ModResult<T> = miette::Result<T>;
