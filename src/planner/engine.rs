// src/planner/engine.rs

//! The mark engine and plan serializer.
//!
//! [`PackageGraph`] accumulates install and upgrade intents by mutating the
//! cluster graph through a pair of mutually recursive marking operations,
//! then serializes the accumulated subgraphs into one ordered action list.
//!
//! `mark_plus` records the intent to have a feature installed; `mark_minus`
//! records that a package must be removed and re-installed, re-marking its
//! original features so they survive the rebuild. Each cluster's `plus` and
//! `will_remove` flags are set at most once, which bounds the recursion even
//! though the two operations call each other.

use tracing::{debug, warn};

use crate::catalog::PortCatalog;
use crate::error::{Error, Result};
use crate::planner::cluster::{ClusterGraph, ClusterId};
use crate::planner::graph::PlanGraph;
use crate::planner::plan::{
    AnyAction, InstallPlanAction, RemovePlanAction, RemovePlanType, RequestType,
};
use crate::spec::{FeatureSpec, PackageSpec, CORE_FEATURE};
use crate::status::StatusDatabase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MarkPlusResult {
    FeatureNotFound,
    Success,
}

/// The two plan subgraphs the mark engine writes into.
#[derive(Default)]
struct GraphPlan {
    remove_graph: PlanGraph,
    install_graph: PlanGraph,
}

/// Feature-aware planner over one catalog and one installed world.
pub struct PackageGraph<'a> {
    graph: ClusterGraph<'a>,
    plan: GraphPlan,
}

impl<'a> PackageGraph<'a> {
    pub fn new(catalog: &'a dyn PortCatalog, status_db: &StatusDatabase) -> Result<Self> {
        Ok(Self {
            graph: ClusterGraph::new(catalog, status_db)?,
            plan: GraphPlan::default(),
        })
    }

    /// Register a user intent to have the given feature installed.
    ///
    /// The feature may be empty (core), a concrete name, or `"*"` for every
    /// feature the port declares.
    pub fn install(&mut self, fspec: &FeatureSpec) -> Result<()> {
        let id = self.graph.get(fspec.spec());
        self.graph.cluster_mut(id).request_type = RequestType::UserRequested;

        if fspec.feature() == "*" {
            let port = self
                .graph
                .cluster(id)
                .port
                .clone()
                .ok_or_else(|| Error::MissingRootPort(fspec.spec().clone()))?;

            for feature in &port.features {
                if self.mark_plus(&feature.name, id)? == MarkPlusResult::FeatureNotFound {
                    return Err(Error::FeatureNotFound {
                        spec: fspec.spec().clone(),
                        feature: feature.name.clone(),
                    });
                }
            }
            if self.mark_plus(CORE_FEATURE, id)? == MarkPlusResult::FeatureNotFound {
                return Err(Error::internal(format!(
                    "port {} has no core entry",
                    fspec.spec()
                )));
            }
        } else {
            let feature = fspec.feature_or_core();
            if self.mark_plus(feature, id)? == MarkPlusResult::FeatureNotFound {
                let cluster = self.graph.cluster(id);
                if cluster.port.is_some() {
                    return Err(Error::FeatureNotFound {
                        spec: fspec.spec().clone(),
                        feature: feature.to_string(),
                    });
                }
                // The port is gone from the catalog. The request is still
                // satisfied if the feature is installed; anything else is
                // unresolvable.
                if !cluster.original_features.contains(feature) {
                    return Err(Error::MissingRootPort(fspec.spec().clone()));
                }
                debug!("{} already satisfied by installed records", fspec);
            }
        }

        self.plan.install_graph.add_vertex(id);
        Ok(())
    }

    /// Register a user intent to fully rebuild the given package.
    pub fn upgrade(&mut self, spec: &PackageSpec) -> Result<()> {
        let id = self.graph.get(spec);

        let cluster = self.graph.cluster_mut(id);
        if cluster.installed_records.is_empty() {
            return Err(Error::NotInstalled(spec.clone()));
        }
        cluster.request_type = RequestType::UserRequested;

        self.mark_minus(id)
    }

    fn mark_plus(&mut self, feature: &str, id: ClusterId) -> Result<MarkPlusResult> {
        // An empty name means core was not spelled out in the reference.
        if feature.is_empty() {
            return self.mark_plus(CORE_FEATURE, id);
        }

        let cluster = self.graph.cluster_mut(id);
        let Some(feature_edges) = cluster.edges.get_mut(feature) else {
            return Ok(MarkPlusResult::FeatureNotFound);
        };
        if feature_edges.plus {
            return Ok(MarkPlusResult::Success);
        }

        // Installing a feature that is not present forces the package
        // through a remove-and-reinstall cycle.
        if !cluster.original_features.contains(feature) {
            cluster.transient_uninstalled = true;
        }
        if !cluster.transient_uninstalled {
            // Already installed and nothing disturbed it.
            return Ok(MarkPlusResult::Success);
        }
        feature_edges.plus = true;

        let build_edges = feature_edges.build_edges.clone();
        let spec = cluster.spec.clone();
        let has_original_features = !cluster.original_features.is_empty();
        debug!("mark + {}", FeatureSpec::new(spec.clone(), feature));

        if has_original_features {
            self.mark_minus(id)?;
        }

        self.plan.install_graph.add_vertex(id);
        self.graph
            .cluster_mut(id)
            .to_install_features
            .insert(feature.to_string());

        if feature != CORE_FEATURE {
            // Every feature implicitly depends on its own core.
            if self.mark_plus(CORE_FEATURE, id)? == MarkPlusResult::FeatureNotFound {
                return Err(Error::internal(format!("port {} has no core entry", spec)));
            }
        }

        for dependency in build_edges {
            let dep_id = self.graph.get(dependency.spec());
            if self.mark_plus(dependency.feature(), dep_id)? == MarkPlusResult::FeatureNotFound {
                return Err(Error::UnsatisfiableDependency {
                    dependency,
                    requester: FeatureSpec::new(spec.clone(), feature),
                });
            }

            // A sibling-feature dependency resolves to this same cluster;
            // recording it would put a self-loop in the install graph.
            if dep_id != id {
                self.plan.install_graph.add_edge(id, dep_id);
            }
        }

        Ok(MarkPlusResult::Success)
    }

    fn mark_minus(&mut self, id: ClusterId) -> Result<()> {
        {
            let cluster = self.graph.cluster_mut(id);
            if cluster.will_remove {
                return Ok(());
            }
            cluster.will_remove = true;
            debug!("mark - {}", cluster.spec);
        }
        self.plan.remove_graph.add_vertex(id);

        // Everything that depends on this cluster has to come out first.
        let dependents: Vec<FeatureSpec> = self
            .graph
            .cluster(id)
            .edges
            .values()
            .flat_map(|edges| edges.remove_edges.iter().cloned())
            .collect();
        for dependent in dependents {
            let dep_id = self.graph.get(dependent.spec());
            self.plan.remove_graph.add_edge(id, dep_id);
            self.mark_minus(dep_id)?;
        }

        let (spec, original_features) = {
            let cluster = self.graph.cluster_mut(id);
            cluster.transient_uninstalled = true;
            (
                cluster.spec.clone(),
                cluster
                    .original_features
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>(),
            )
        };

        // Re-mark everything that was installed so the rebuild preserves the
        // feature set. A feature the port no longer defines degrades to a
        // warning rather than aborting the whole plan.
        for original in original_features {
            if self.mark_plus(&original, id)? == MarkPlusResult::FeatureNotFound {
                warn!(
                    "could not reinstall feature {}",
                    FeatureSpec::new(spec.clone(), original)
                );
            }
        }

        Ok(())
    }

    /// Serialize the accumulated subgraphs into one ordered action list:
    /// removals (dependents before dependencies), then installations
    /// (dependencies before dependents).
    pub fn serialize(&self) -> Result<Vec<AnyAction>> {
        let remove_order = self
            .plan
            .remove_graph
            .topological_sort(|id| self.graph.cluster(id).spec.to_string())?;
        let install_order = self
            .plan
            .install_graph
            .topological_sort(|id| self.graph.cluster(id).spec.to_string())?;

        let mut plan = Vec::with_capacity(remove_order.len() + install_order.len());

        for id in remove_order {
            let cluster = self.graph.cluster(id);
            plan.push(AnyAction::Remove(RemovePlanAction::new(
                cluster.spec.clone(),
                RemovePlanType::Remove,
                cluster.request_type,
            )));
        }

        for id in install_order {
            let cluster = self.graph.cluster(id);
            if cluster.transient_uninstalled {
                let port = cluster.port.clone().ok_or_else(|| {
                    Error::internal(format!(
                        "no port available to build {}",
                        cluster.spec
                    ))
                })?;
                plan.push(AnyAction::Install(InstallPlanAction::build_and_install(
                    cluster.spec.clone(),
                    port,
                    cluster.to_install_features.clone(),
                    cluster.request_type,
                )));
            } else {
                // Still installed as-is; only surface it when the user asked
                // for it by name.
                if cluster.request_type != RequestType::UserRequested {
                    continue;
                }
                plan.push(AnyAction::Install(InstallPlanAction::already_installed(
                    cluster.spec.clone(),
                    cluster.original_features.clone(),
                    cluster.request_type,
                )));
            }
        }

        Ok(plan)
    }
}
