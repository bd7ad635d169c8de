// src/error.rs

//! Crate-wide error type for planning operations.

use crate::spec::{FeatureSpec, PackageSpec};
use thiserror::Error;

/// Result type used throughout the planner
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a plan
#[derive(Error, Debug)]
pub enum Error {
    /// A build dependency resolves to a port or feature that does not exist
    #[error("unable to satisfy dependency {dependency} of {requester}")]
    UnsatisfiableDependency {
        dependency: FeatureSpec,
        requester: FeatureSpec,
    },

    /// A user-requested package has no port in the catalog
    #[error("no port found for {0}")]
    MissingRootPort(PackageSpec),

    /// A requested feature is not defined by the target port
    #[error("port {spec} has no feature named '{feature}'")]
    FeatureNotFound { spec: PackageSpec, feature: String },

    /// Upgrade was requested for a package that is not installed
    #[error("{0} is not installed")]
    NotInstalled(PackageSpec),

    /// Export was requested for a package with neither a binary nor a port
    #[error("could not find a binary package or port for {0}")]
    NothingToExport(PackageSpec),

    /// The flag-less install surface produced a plan containing removals
    #[error("the install plan requires rebuilding installed packages; use the feature-aware planner")]
    PlanRequiresRebuild,

    /// The final plan removes packages but the recursion flag was not given
    #[error("the plan rebuilds installed packages; re-run the command with --recurse to proceed")]
    RebuildsRequireRecurse,

    /// Topological sort found a cycle
    #[error("circular dependency detected involving {0}")]
    CircularDependency(String),

    /// A port metadata file could not be parsed
    #[error("failed to parse port '{name}': {message}")]
    Parse { name: String, message: String },

    /// IO error while reading port metadata
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invariant violation inside the planner
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an internal-invariant error with a message
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
