// src/planner/mod.rs

//! Feature-aware dependency planning.
//!
//! This module turns a set of requested package features, the installed
//! world, and the port catalog into a totally ordered action list:
//! removals first, then installations, such that executing the list
//! sequentially satisfies every request while preserving the features of
//! every package the plan touches.
//!
//! The working state is a lazily materialized graph of clusters, one per
//! `(package, triplet)` pair. A marking phase mutates the clusters and
//! records intents into two plan subgraphs, which are then topologically
//! sorted into the final list.

mod cluster;
mod display;
mod engine;
mod graph;
mod plan;
mod simple;

pub use display::{group_plan, print_plan, PlanDisplay};
pub use engine::PackageGraph;
pub use plan::{
    AnyAction, BuildOptions, ExportPlanAction, ExportPlanType, InstallPlanAction, InstallPlanType,
    RemovePlanAction, RemovePlanType, RequestType,
};
pub use simple::{
    create_export_plan, create_feature_install_plan, create_install_plan, create_remove_plan,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MapPortCatalog;
    use crate::error::Error;
    use crate::port::{BinaryDescriptor, MapBinaryCache, PortDescriptor, PortFeature};
    use crate::spec::{DependencySpec, FeatureSpec, PackageSpec};
    use crate::status::{InstalledRecord, StatusDatabase};

    fn port(name: &str, core: &[&str], features: &[(&str, &[&str])]) -> PortDescriptor {
        let mut port = PortDescriptor::new(name);
        port.depends = core
            .iter()
            .map(|raw| DependencySpec::parse(raw).unwrap())
            .collect();
        for (feature, depends) in features {
            port.features.push(PortFeature {
                name: feature.to_string(),
                depends: depends
                    .iter()
                    .map(|raw| DependencySpec::parse(raw).unwrap())
                    .collect(),
            });
        }
        port
    }

    fn installed(name: &str, feature: Option<&str>, depends: &[&str]) -> InstalledRecord {
        InstalledRecord::new(
            PackageSpec::new(name, "t"),
            feature.map(String::from),
            depends.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn request(name: &str, feature: &str) -> FeatureSpec {
        FeatureSpec::new(PackageSpec::new(name, "t"), feature)
    }

    fn feature_list(action: &InstallPlanAction) -> Vec<&str> {
        action.features.iter().map(String::as_str).collect()
    }

    fn expect_install(action: &AnyAction) -> &InstallPlanAction {
        action.install().expect("expected an install action")
    }

    fn expect_remove(action: &AnyAction) -> &RemovePlanAction {
        action.remove().expect("expected a remove action")
    }

    #[test]
    fn test_fresh_install_of_leaf() {
        let catalog: MapPortCatalog = [port("a", &[], &[])].into_iter().collect();
        let status = StatusDatabase::default();

        let plan =
            create_feature_install_plan(&catalog, &[request("a", "")], &status).unwrap();

        assert_eq!(plan.len(), 1);
        let action = expect_install(&plan[0]);
        assert_eq!(action.plan_type, InstallPlanType::BuildAndInstall);
        assert_eq!(action.request_type, RequestType::UserRequested);
        assert_eq!(feature_list(action), vec!["core"]);
        assert!(action.port.is_some());
    }

    #[test]
    fn test_transitive_install_orders_dependencies_first() {
        let catalog: MapPortCatalog =
            [port("a", &["b"], &[]), port("b", &[], &[])].into_iter().collect();
        let status = StatusDatabase::default();

        let plan =
            create_feature_install_plan(&catalog, &[request("a", "")], &status).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(expect_install(&plan[0]).spec.name(), "b");
        assert_eq!(expect_install(&plan[1]).spec.name(), "a");
        assert_eq!(
            expect_install(&plan[0]).request_type,
            RequestType::AutoSelected
        );
    }

    #[test]
    fn test_already_installed_is_a_no_op() {
        let catalog: MapPortCatalog = [port("a", &[], &[])].into_iter().collect();
        let status = StatusDatabase::new(vec![installed("a", None, &[])]);

        let plan =
            create_feature_install_plan(&catalog, &[request("a", "")], &status).unwrap();

        assert_eq!(plan.len(), 1);
        let action = expect_install(&plan[0]);
        assert_eq!(action.plan_type, InstallPlanType::AlreadyInstalled);
        assert_eq!(action.request_type, RequestType::UserRequested);
        assert_eq!(feature_list(action), vec!["core"]);
    }

    #[test]
    fn test_new_feature_forces_rebuild_preserving_features() {
        let catalog: MapPortCatalog =
            [port("a", &[], &[("f1", &[]), ("f2", &[])])].into_iter().collect();
        let status = StatusDatabase::new(vec![
            installed("a", None, &[]),
            installed("a", Some("f1"), &[]),
        ]);

        let plan =
            create_feature_install_plan(&catalog, &[request("a", "f2")], &status).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(expect_remove(&plan[0]).spec.name(), "a");
        let action = expect_install(&plan[1]);
        assert_eq!(action.plan_type, InstallPlanType::BuildAndInstall);
        assert_eq!(feature_list(action), vec!["core", "f1", "f2"]);
    }

    #[test]
    fn test_upgrade_cascades_through_dependents() {
        let catalog: MapPortCatalog =
            [port("a", &[], &[]), port("b", &["a"], &[])].into_iter().collect();
        let status = StatusDatabase::new(vec![
            installed("a", None, &[]),
            installed("b", None, &["a"]),
        ]);

        let mut graph = PackageGraph::new(&catalog, &status).unwrap();
        graph.upgrade(&PackageSpec::new("a", "t")).unwrap();
        let plan = graph.serialize().unwrap();

        assert_eq!(plan.len(), 4);
        assert_eq!(expect_remove(&plan[0]).spec.name(), "b");
        assert_eq!(expect_remove(&plan[1]).spec.name(), "a");
        assert_eq!(expect_install(&plan[2]).spec.name(), "a");
        assert_eq!(expect_install(&plan[3]).spec.name(), "b");

        // The removals keep the dependent first; the installs reverse it.
        assert_eq!(
            expect_install(&plan[2]).plan_type,
            InstallPlanType::BuildAndInstall
        );
    }

    #[test]
    fn test_remove_ties_follow_feature_declaration_order() {
        // "zeta" is declared before "alpha"; the dependents indexed under
        // them must be visited in that order, not alphabetically, so the
        // removal of dz precedes the removal of da.
        let catalog: MapPortCatalog = [
            port("p", &[], &[("zeta", &[]), ("alpha", &[])]),
            port("dz", &["p[zeta]"], &[]),
            port("da", &["p[alpha]"], &[]),
        ]
        .into_iter()
        .collect();
        let status = StatusDatabase::new(vec![
            installed("p", None, &[]),
            installed("p", Some("zeta"), &[]),
            installed("p", Some("alpha"), &[]),
            installed("dz", None, &["p[zeta]"]),
            installed("da", None, &["p[alpha]"]),
        ]);

        let mut graph = PackageGraph::new(&catalog, &status).unwrap();
        graph.upgrade(&PackageSpec::new("p", "t")).unwrap();
        let plan = graph.serialize().unwrap();

        let removes: Vec<&str> = plan
            .iter()
            .filter_map(|action| action.remove().map(|r| r.spec.name()))
            .collect();
        assert_eq!(removes, vec!["dz", "da", "p"]);
    }

    #[test]
    fn test_star_expands_all_features() {
        let catalog: MapPortCatalog =
            [port("a", &[], &[("f1", &[]), ("f2", &[])])].into_iter().collect();
        let status = StatusDatabase::default();

        let plan =
            create_feature_install_plan(&catalog, &[request("a", "*")], &status).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(feature_list(expect_install(&plan[0])), vec!["core", "f1", "f2"]);
    }

    #[test]
    fn test_missing_dependency_is_fatal() {
        let catalog: MapPortCatalog = [port("a", &["b"], &[])].into_iter().collect();
        let status = StatusDatabase::default();

        let err =
            create_feature_install_plan(&catalog, &[request("a", "")], &status).unwrap_err();
        match err {
            Error::UnsatisfiableDependency {
                dependency,
                requester,
            } => {
                assert_eq!(dependency.spec().name(), "b");
                assert_eq!(requester.spec().name(), "a");
            }
            other => panic!("expected UnsatisfiableDependency, got {other}"),
        }
    }

    #[test]
    fn test_unknown_feature_is_fatal() {
        let catalog: MapPortCatalog = [port("a", &[], &[])].into_iter().collect();
        let status = StatusDatabase::default();

        let err =
            create_feature_install_plan(&catalog, &[request("a", "nope")], &status).unwrap_err();
        assert!(matches!(err, Error::FeatureNotFound { .. }));
    }

    #[test]
    fn test_missing_root_port_is_fatal() {
        let catalog = MapPortCatalog::new();
        let status = StatusDatabase::default();

        let err =
            create_feature_install_plan(&catalog, &[request("ghost", "")], &status).unwrap_err();
        assert!(matches!(err, Error::MissingRootPort(_)));

        let err =
            create_feature_install_plan(&catalog, &[request("ghost", "*")], &status).unwrap_err();
        assert!(matches!(err, Error::MissingRootPort(_)));
    }

    #[test]
    fn test_installed_package_without_port_still_satisfies_request() {
        // The port was dropped from the catalog but the package is still
        // installed; requesting what is already present must not fail.
        let catalog = MapPortCatalog::new();
        let status = StatusDatabase::new(vec![installed("a", None, &[])]);

        let plan =
            create_feature_install_plan(&catalog, &[request("a", "")], &status).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(
            expect_install(&plan[0]).plan_type,
            InstallPlanType::AlreadyInstalled
        );
    }

    #[test]
    fn test_stale_installed_feature_is_dropped_with_warning() {
        // "f1" is installed but the port no longer defines it; the rebuild
        // proceeds without it.
        let catalog: MapPortCatalog = [port("a", &[], &[])].into_iter().collect();
        let status = StatusDatabase::new(vec![
            installed("a", None, &[]),
            installed("a", Some("f1"), &[]),
        ]);

        let mut graph = PackageGraph::new(&catalog, &status).unwrap();
        graph.upgrade(&PackageSpec::new("a", "t")).unwrap();
        let plan = graph.serialize().unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(feature_list(expect_install(&plan[1])), vec!["core"]);
    }

    #[test]
    fn test_upgrade_of_uninstalled_package_is_an_error() {
        let catalog: MapPortCatalog = [port("a", &[], &[])].into_iter().collect();
        let status = StatusDatabase::default();

        let mut graph = PackageGraph::new(&catalog, &status).unwrap();
        let err = graph.upgrade(&PackageSpec::new("a", "t")).unwrap_err();
        assert!(matches!(err, Error::NotInstalled(_)));
    }

    #[test]
    fn test_sibling_feature_dependency_coalesces() {
        // Feature f1 depends on a sibling feature of the same port; both
        // coalesce into one install action without a self-loop.
        let catalog: MapPortCatalog =
            [port("a", &[], &[("f1", &["a[f2]"]), ("f2", &[])])].into_iter().collect();
        let status = StatusDatabase::default();

        let plan =
            create_feature_install_plan(&catalog, &[request("a", "f1")], &status).unwrap();

        assert_eq!(plan.len(), 1);
        assert_eq!(feature_list(expect_install(&plan[0])), vec!["core", "f1", "f2"]);
    }

    #[test]
    fn test_shared_dependency_not_duplicated() {
        let catalog: MapPortCatalog = [
            port("a", &["c"], &[]),
            port("b", &["c"], &[]),
            port("c", &[], &[]),
        ]
        .into_iter()
        .collect();
        let status = StatusDatabase::default();

        let plan = create_feature_install_plan(
            &catalog,
            &[request("a", ""), request("b", "")],
            &status,
        )
        .unwrap();

        let names: Vec<&str> = plan
            .iter()
            .map(|action| expect_install(action).spec.name())
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_plans_are_deterministic() {
        let catalog: MapPortCatalog = [
            port("a", &["b", "c"], &[("x", &["d"])]),
            port("b", &[], &[]),
            port("c", &["b"], &[]),
            port("d", &[], &[]),
        ]
        .into_iter()
        .collect();
        let status = StatusDatabase::new(vec![installed("b", None, &[])]);
        let requests = [request("a", "*")];

        let first = create_feature_install_plan(&catalog, &requests, &status).unwrap();
        let second = create_feature_install_plan(&catalog, &requests, &status).unwrap();
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }

    #[test]
    fn test_build_actions_always_include_core() {
        let catalog: MapPortCatalog = [
            port("a", &["b[x]"], &[]),
            port("b", &[], &[("x", &[])]),
        ]
        .into_iter()
        .collect();
        let status = StatusDatabase::default();

        let plan =
            create_feature_install_plan(&catalog, &[request("a", "")], &status).unwrap();

        for action in &plan {
            let install = expect_install(action);
            assert!(
                install.features.contains("core"),
                "{} is missing core",
                install.spec
            );
        }
    }

    #[test]
    fn test_platform_qualified_dependency_filtered() {
        let catalog: MapPortCatalog = [
            port("a", &["b (other-triplet)"], &[]),
            port("b", &[], &[]),
        ]
        .into_iter()
        .collect();
        let status = StatusDatabase::default();

        let plan =
            create_feature_install_plan(&catalog, &[request("a", "")], &status).unwrap();

        // The qualified dependency does not apply on triplet "t".
        assert_eq!(plan.len(), 1);
        assert_eq!(expect_install(&plan[0]).spec.name(), "a");
    }

    #[test]
    fn test_create_install_plan_rejects_rebuilds() {
        let catalog: MapPortCatalog = [
            port("d", &["a[x]"], &[]),
            port("a", &[], &[("x", &[])]),
        ]
        .into_iter()
        .collect();
        let status = StatusDatabase::new(vec![installed("a", None, &[])]);
        let specs = [PackageSpec::new("d", "t")];

        let err = create_install_plan(&catalog, &specs, &status).unwrap_err();
        assert!(matches!(err, Error::PlanRequiresRebuild));

        // The feature-aware planner accepts the same request.
        let fspecs = [request("d", "")];
        let plan = create_feature_install_plan(&catalog, &fspecs, &status).unwrap();
        assert!(plan.iter().any(|action| action.remove().is_some()));
    }

    #[test]
    fn test_create_install_plan_happy_path() {
        let catalog: MapPortCatalog =
            [port("a", &["b"], &[]), port("b", &[], &[])].into_iter().collect();
        let status = StatusDatabase::default();
        let specs = [PackageSpec::new("a", "t")];

        let plan = create_install_plan(&catalog, &specs, &status).unwrap();
        let names: Vec<&str> = plan.iter().map(|action| action.spec.name()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_remove_plan_orders_dependents_first() {
        let status = StatusDatabase::new(vec![
            installed("a", None, &[]),
            installed("b", None, &["a"]),
            installed("c", None, &["b"]),
        ]);
        let specs = [PackageSpec::new("a", "t")];

        let plan = create_remove_plan(&specs, &status).unwrap();

        let names: Vec<&str> = plan.iter().map(|action| action.spec.name()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
        assert_eq!(plan[0].request_type, RequestType::AutoSelected);
        assert_eq!(plan[2].request_type, RequestType::UserRequested);
        assert!(plan.iter().all(|a| a.plan_type == RemovePlanType::Remove));
    }

    #[test]
    fn test_remove_plan_not_installed() {
        let status = StatusDatabase::default();
        let specs = [PackageSpec::new("ghost", "t")];

        let plan = create_remove_plan(&specs, &status).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].plan_type, RemovePlanType::NotInstalled);
    }

    #[test]
    fn test_remove_plan_ignores_other_triplets() {
        let status = StatusDatabase::new(vec![
            installed("a", None, &[]),
            InstalledRecord::new(
                PackageSpec::new("b", "other"),
                None,
                vec!["a".to_string()],
            ),
        ]);
        let specs = [PackageSpec::new("a", "t")];

        let plan = create_remove_plan(&specs, &status).unwrap();
        let names: Vec<&str> = plan.iter().map(|action| action.spec.name()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn test_export_plan_prefers_binaries() {
        let catalog: MapPortCatalog =
            [port("a", &["zlib"], &[]), port("zlib", &[], &[])].into_iter().collect();
        let mut binaries = MapBinaryCache::new();
        binaries.insert(
            PackageSpec::new("zlib", "t"),
            BinaryDescriptor {
                name: "zlib".to_string(),
                depends: vec![],
            },
        );
        let specs = [PackageSpec::new("a", "t")];

        let plan = create_export_plan(&catalog, &binaries, &specs).unwrap();

        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].spec.name(), "zlib");
        assert_eq!(plan[0].plan_type, ExportPlanType::AlreadyBuilt);
        assert_eq!(plan[0].request_type, RequestType::AutoSelected);
        assert_eq!(plan[1].spec.name(), "a");
        assert_eq!(plan[1].plan_type, ExportPlanType::PortAvailableButNotBuilt);
        assert_eq!(plan[1].request_type, RequestType::UserRequested);
    }

    #[test]
    fn test_export_plan_requires_binary_or_port() {
        let catalog = MapPortCatalog::new();
        let binaries = MapBinaryCache::new();
        let specs = [PackageSpec::new("ghost", "t")];

        let err = create_export_plan(&catalog, &binaries, &specs).unwrap_err();
        assert!(matches!(err, Error::NothingToExport(_)));
    }

    #[test]
    fn test_export_plan_follows_binary_depends() {
        let catalog: MapPortCatalog = [port("base", &[], &[])].into_iter().collect();
        let mut binaries = MapBinaryCache::new();
        binaries.insert(
            PackageSpec::new("app", "t"),
            BinaryDescriptor {
                name: "app".to_string(),
                depends: vec!["base".to_string()],
            },
        );
        let specs = [PackageSpec::new("app", "t")];

        let plan = create_export_plan(&catalog, &binaries, &specs).unwrap();
        let names: Vec<&str> = plan.iter().map(|action| action.spec.name()).collect();
        assert_eq!(names, vec!["base", "app"]);
    }
}
