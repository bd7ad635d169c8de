// src/port.rs

//! Port and binary-package metadata.
//!
//! A port is a named package recipe. Its descriptor lists the dependencies
//! of the implicit `core` feature and of each optional feature. Descriptors
//! carry unresolved dependencies; the planner resolves them against a
//! cluster's triplet with [`filter_dependencies`].

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::spec::{DependencySpec, FeatureSpec, PackageSpec};

/// Metadata for one port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortDescriptor {
    pub name: String,
    /// Dependencies of the core feature, in declaration order.
    pub depends: Vec<DependencySpec>,
    /// Optional features, in declaration order.
    pub features: Vec<PortFeature>,
}

impl PortDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            depends: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Look up a feature paragraph by name.
    pub fn find_feature(&self, name: &str) -> Option<&PortFeature> {
        self.features.iter().find(|f| f.name == name)
    }
}

/// An optional named build variant of a port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortFeature {
    pub name: String,
    pub depends: Vec<DependencySpec>,
}

/// Resolve a declared dependency list against a triplet.
///
/// Platform-qualified dependencies that do not apply on the triplet are
/// dropped; the rest keep their declaration order.
pub fn filter_dependencies(depends: &[DependencySpec], triplet: &str) -> Vec<FeatureSpec> {
    depends
        .iter()
        .filter(|dep| dep.matches_triplet(triplet))
        .map(|dep| dep.to_feature_spec(triplet))
        .collect()
}

/// A prebuilt package available from the binary cache.
///
/// `depends` holds the package-level dependency names recorded when the
/// binary was built, flattened across the features it was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryDescriptor {
    pub name: String,
    pub depends: Vec<String>,
}

/// Source of prebuilt packages, keyed by spec.
pub trait BinaryCache {
    fn get_binary(&self, spec: &PackageSpec) -> Option<BinaryDescriptor>;
}

/// In-memory binary cache backed by a map.
#[derive(Debug, Default)]
pub struct MapBinaryCache {
    binaries: HashMap<PackageSpec, BinaryDescriptor>,
}

impl MapBinaryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: PackageSpec, binary: BinaryDescriptor) {
        self.binaries.insert(spec, binary);
    }
}

impl BinaryCache for MapBinaryCache {
    fn get_binary(&self, spec: &PackageSpec) -> Option<BinaryDescriptor> {
        self.binaries.get(spec).cloned()
    }
}
