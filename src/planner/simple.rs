// src/planner/simple.rs

//! Top-level planning entry points.
//!
//! `create_feature_install_plan` is the full feature-aware planner. The
//! remove and export planners are deliberately simpler: they work over
//! package-level dependency edges and discover their graphs during the
//! topological sort itself.

use std::collections::HashSet;

use crate::catalog::PortCatalog;
use crate::error::{Error, Result};
use crate::planner::engine::PackageGraph;
use crate::planner::graph::{topological_sort, AdjacencyProvider};
use crate::planner::plan::{
    AnyAction, ExportPlanAction, InstallPlanAction, RemovePlanAction, RemovePlanType, RequestType,
};
use crate::port::{filter_dependencies, BinaryCache};
use crate::spec::{DependencySpec, FeatureSpec, PackageSpec};
use crate::status::StatusDatabase;

/// Plan the installation of the given feature references.
pub fn create_feature_install_plan(
    catalog: &dyn PortCatalog,
    specs: &[FeatureSpec],
    status_db: &StatusDatabase,
) -> Result<Vec<AnyAction>> {
    let mut graph = PackageGraph::new(catalog, status_db)?;
    for spec in specs {
        graph.install(spec)?;
    }
    graph.serialize()
}

/// Plan the installation of whole packages (implicit core features).
///
/// This surface cannot express rebuilds; a plan that would remove anything
/// is an error.
pub fn create_install_plan(
    catalog: &dyn PortCatalog,
    specs: &[PackageSpec],
    status_db: &StatusDatabase,
) -> Result<Vec<InstallPlanAction>> {
    let fspecs: Vec<FeatureSpec> = specs
        .iter()
        .map(|spec| FeatureSpec::new(spec.clone(), ""))
        .collect();

    create_feature_install_plan(catalog, &fspecs, status_db)?
        .into_iter()
        .map(|action| match action {
            AnyAction::Install(install) => Ok(install),
            AnyAction::Remove(_) => Err(Error::PlanRequiresRebuild),
        })
        .collect()
}

/// Plan the removal of the given packages.
///
/// Works purely from the installed world: adjacency is the reverse of the
/// raw package-level `depends` lists, restricted to the same triplet. The
/// port catalog is never consulted.
pub fn create_remove_plan(
    specs: &[PackageSpec],
    status_db: &StatusDatabase,
) -> Result<Vec<RemovePlanAction>> {
    struct RemoveAdjacency<'a> {
        status_db: &'a StatusDatabase,
        requested: HashSet<PackageSpec>,
    }

    impl AdjacencyProvider for RemoveAdjacency<'_> {
        type Key = PackageSpec;
        type Vertex = RemovePlanAction;

        fn load_vertex(&self, spec: &PackageSpec) -> Result<RemovePlanAction> {
            let request_type = if self.requested.contains(spec) {
                RequestType::UserRequested
            } else {
                RequestType::AutoSelected
            };
            let plan_type = if self.status_db.is_installed(spec) {
                RemovePlanType::Remove
            } else {
                RemovePlanType::NotInstalled
            };
            Ok(RemovePlanAction::new(spec.clone(), plan_type, request_type))
        }

        fn adjacency_list(&self, plan: &RemovePlanAction) -> Vec<PackageSpec> {
            if plan.plan_type == RemovePlanType::NotInstalled {
                return Vec::new();
            }
            self.status_db
                .records()
                .filter(|record| record.spec.triplet() == plan.spec.triplet())
                .filter(|record| {
                    record
                        .depends
                        .iter()
                        .any(|raw| DependencySpec::name_of(raw) == plan.spec.name())
                })
                .map(|record| record.spec.clone())
                .collect()
        }

        fn describe(&self, spec: &PackageSpec) -> String {
            spec.to_string()
        }
    }

    let provider = RemoveAdjacency {
        status_db,
        requested: specs.iter().cloned().collect(),
    };
    topological_sort(specs, &provider)
}

/// Plan the export of the given packages.
///
/// Each package must have either a prebuilt binary or a port; adjacency
/// follows the dependency names the chosen source records.
pub fn create_export_plan(
    catalog: &dyn PortCatalog,
    binaries: &dyn BinaryCache,
    specs: &[PackageSpec],
) -> Result<Vec<ExportPlanAction>> {
    struct ExportAdjacency<'a> {
        catalog: &'a dyn PortCatalog,
        binaries: &'a dyn BinaryCache,
        requested: HashSet<PackageSpec>,
    }

    impl AdjacencyProvider for ExportAdjacency<'_> {
        type Key = PackageSpec;
        type Vertex = ExportPlanAction;

        fn load_vertex(&self, spec: &PackageSpec) -> Result<ExportPlanAction> {
            let request_type = if self.requested.contains(spec) {
                RequestType::UserRequested
            } else {
                RequestType::AutoSelected
            };

            if let Some(binary) = self.binaries.get_binary(spec) {
                return Ok(ExportPlanAction::from_binary(
                    spec.clone(),
                    binary,
                    request_type,
                ));
            }
            if let Some(port) = self.catalog.get_control_file(spec.name()) {
                return Ok(ExportPlanAction::from_port(spec.clone(), port, request_type));
            }
            Err(Error::NothingToExport(spec.clone()))
        }

        fn adjacency_list(&self, plan: &ExportPlanAction) -> Vec<PackageSpec> {
            let triplet = plan.spec.triplet();
            if let Some(binary) = &plan.binary {
                return binary
                    .depends
                    .iter()
                    .map(|raw| PackageSpec::new(DependencySpec::name_of(raw), triplet))
                    .collect();
            }
            if let Some(port) = &plan.port {
                return filter_dependencies(&port.depends, triplet)
                    .iter()
                    .map(|fspec| fspec.spec().clone())
                    .collect();
            }
            Vec::new()
        }

        fn describe(&self, spec: &PackageSpec) -> String {
            spec.to_string()
        }
    }

    let provider = ExportAdjacency {
        catalog,
        binaries,
        requested: specs.iter().cloned().collect(),
    };
    topological_sort(specs, &provider)
}
