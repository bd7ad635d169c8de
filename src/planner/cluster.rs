// src/planner/cluster.rs

//! The working graph of clusters.
//!
//! A [`Cluster`] is the planner's node for one `(package, triplet)` pair,
//! merging what the catalog says the port could be with what the status
//! database says is installed. Clusters live in a [`ClusterGraph`] arena and
//! are addressed by [`ClusterId`] handles; the plan subgraphs store handles,
//! never owned nodes.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::debug;

use crate::catalog::PortCatalog;
use crate::error::Result;
use crate::planner::plan::RequestType;
use crate::port::{filter_dependencies, PortDescriptor};
use crate::spec::{DependencySpec, FeatureSpec, PackageSpec, CORE_FEATURE};
use crate::status::{InstalledRecord, StatusDatabase};

/// Handle to a cluster inside a [`ClusterGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterId(usize);

impl ClusterId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }
}

/// Per-feature edge sets of a cluster.
///
/// `build_edges` come from the port descriptor and point at dependencies;
/// `remove_edges` are the reverse index over installed records and point at
/// dependents. `plus` is the mark engine's memoization flag.
#[derive(Debug, Clone, Default)]
pub struct FeatureEdges {
    pub build_edges: Vec<FeatureSpec>,
    pub remove_edges: Vec<FeatureSpec>,
    pub plus: bool,
}

/// Insertion-ordered map of feature name to [`FeatureEdges`].
///
/// Ports declare their features in a meaningful order and the mark engine
/// walks a cluster's edges in that order, so iteration must follow insertion
/// rather than any sorted order. Feature counts are small; lookups are
/// linear.
#[derive(Debug, Default)]
pub struct FeatureEdgeMap {
    entries: Vec<(String, FeatureEdges)>,
}

impl FeatureEdgeMap {
    pub fn get(&self, name: &str) -> Option<&FeatureEdges> {
        self.entries
            .iter()
            .find(|(entry, _)| entry == name)
            .map(|(_, edges)| edges)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FeatureEdges> {
        self.entries
            .iter_mut()
            .find(|(entry, _)| entry == name)
            .map(|(_, edges)| edges)
    }

    /// The entry for a feature, appended empty if missing.
    pub fn entry(&mut self, name: &str) -> &mut FeatureEdges {
        let index = match self.entries.iter().position(|(entry, _)| entry == name) {
            Some(index) => index,
            None => {
                self.entries
                    .push((name.to_string(), FeatureEdges::default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index].1
    }

    /// Edge sets in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &FeatureEdges> {
        self.entries.iter().map(|(_, edges)| edges)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Working node for one `(package, triplet)` pair.
#[derive(Debug)]
pub struct Cluster {
    pub spec: PackageSpec,
    /// Absent when the package is installed but its port has been dropped
    /// from the catalog.
    pub port: Option<Arc<PortDescriptor>>,
    pub installed_records: Vec<InstalledRecord>,
    /// One entry per feature, in insertion order: `core` first, declared
    /// features as the port lists them, then any entries created while
    /// indexing remove edges.
    pub edges: FeatureEdgeMap,
    /// Features currently installed, `"core"` included.
    pub original_features: BTreeSet<String>,
    /// Features the mark phase chose to install.
    pub to_install_features: BTreeSet<String>,
    pub will_remove: bool,
    /// True while the cluster is not satisfying all of its original
    /// features: uninstalled packages start true, installed packages start
    /// false, and marking a removal flips it back to true.
    pub transient_uninstalled: bool,
    pub request_type: RequestType,
}

impl Cluster {
    fn new(spec: PackageSpec) -> Self {
        Self {
            spec,
            port: None,
            installed_records: Vec::new(),
            edges: FeatureEdgeMap::default(),
            original_features: BTreeSet::new(),
            to_install_features: BTreeSet::new(),
            will_remove: false,
            transient_uninstalled: true,
            request_type: RequestType::AutoSelected,
        }
    }
}

/// Arena of clusters, materialized lazily from the catalog.
pub struct ClusterGraph<'a> {
    catalog: &'a dyn PortCatalog,
    clusters: Vec<Cluster>,
    index: HashMap<PackageSpec, ClusterId>,
}

impl<'a> ClusterGraph<'a> {
    /// Build the working graph, seeded with every installed package.
    ///
    /// Seeding runs in two passes: first every installed record gets its
    /// cluster and original features, then the reverse remove-edges are
    /// indexed. Remove edges can only be built once every installed cluster
    /// exists, so the passes cannot be fused.
    pub fn new(catalog: &'a dyn PortCatalog, status_db: &StatusDatabase) -> Result<Self> {
        let mut graph = Self {
            catalog,
            clusters: Vec::new(),
            index: HashMap::new(),
        };

        for record in status_db.records() {
            let id = graph.get(&record.spec);
            let cluster = graph.cluster_mut(id);
            cluster.transient_uninstalled = false;
            cluster.installed_records.push(record.clone());
            cluster
                .original_features
                .insert(record.feature_name().to_string());
        }

        for record in status_db.records() {
            let dependent = FeatureSpec::new(record.spec.clone(), record.feature_name());
            for raw in &record.depends {
                let dependency =
                    DependencySpec::parse(raw)?.to_feature_spec(record.spec.triplet());
                let dep_id = graph.get(dependency.spec());
                graph
                    .cluster_mut(dep_id)
                    .edges
                    .entry(dependency.feature_or_core())
                    .remove_edges
                    .push(dependent.clone());
            }
        }

        Ok(graph)
    }

    /// Get the cluster for a spec, creating and populating it on first use.
    /// Repeated calls return the same handle.
    pub fn get(&mut self, spec: &PackageSpec) -> ClusterId {
        if let Some(&id) = self.index.get(spec) {
            return id;
        }

        let mut cluster = Cluster::new(spec.clone());
        if let Some(port) = self.catalog.get_control_file(spec.name()) {
            populate_from_port(&mut cluster, &port);
            cluster.port = Some(port);
        } else {
            debug!("no port in catalog for {}", spec);
        }

        let id = ClusterId::new(self.clusters.len());
        self.clusters.push(cluster);
        self.index.insert(spec.clone(), id);
        id
    }

    pub fn cluster(&self, id: ClusterId) -> &Cluster {
        &self.clusters[id.0]
    }

    pub fn cluster_mut(&mut self, id: ClusterId) -> &mut Cluster {
        &mut self.clusters[id.0]
    }
}

/// Materialize the catalog-derived build edges: one entry for `core`, one
/// per declared feature, each filtered to the cluster's triplet.
fn populate_from_port(cluster: &mut Cluster, port: &PortDescriptor) {
    let triplet = cluster.spec.triplet();

    let core = cluster.edges.entry(CORE_FEATURE);
    core.build_edges = filter_dependencies(&port.depends, triplet);

    for feature in &port.features {
        let entry = cluster.edges.entry(&feature.name);
        entry.build_edges = filter_dependencies(&feature.depends, triplet);
    }
}
