// src/status.rs

//! Installed-state records.
//!
//! The status database is the planner's read-only view of what is currently
//! installed. Each installed feature of a package contributes one record;
//! the core of a package contributes a record with no feature name.

use serde::{Deserialize, Serialize};

use crate::spec::{PackageSpec, CORE_FEATURE};

/// One installed feature (or core) of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub spec: PackageSpec,
    /// `None` marks the core record.
    pub feature: Option<String>,
    /// Raw feature references (`name` or `name[feature]`) this record
    /// depends on, as captured at install time.
    pub depends: Vec<String>,
}

impl InstalledRecord {
    pub fn new(spec: PackageSpec, feature: Option<String>, depends: Vec<String>) -> Self {
        Self {
            spec,
            feature,
            depends,
        }
    }

    /// The feature name, with the core record resolved to `"core"`.
    pub fn feature_name(&self) -> &str {
        match &self.feature {
            Some(feature) if !feature.is_empty() => feature,
            _ => CORE_FEATURE,
        }
    }
}

/// Read-only collection of installed records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusDatabase {
    records: Vec<InstalledRecord>,
}

impl StatusDatabase {
    pub fn new(records: Vec<InstalledRecord>) -> Self {
        Self { records }
    }

    /// All installed records, in database order.
    pub fn records(&self) -> impl Iterator<Item = &InstalledRecord> {
        self.records.iter()
    }

    /// The records of one package, in database order.
    pub fn find_installed<'a>(
        &'a self,
        spec: &'a PackageSpec,
    ) -> impl Iterator<Item = &'a InstalledRecord> + 'a {
        self.records.iter().filter(move |r| &r.spec == spec)
    }

    /// True when the package has at least one installed record.
    pub fn is_installed(&self, spec: &PackageSpec) -> bool {
        self.records.iter().any(|r| &r.spec == spec)
    }
}
