// src/lib.rs

//! Harbor Package Manager dependency planning core
//!
//! Harbor is a source-based package manager built around ports: named
//! package recipes installed per target triplet, with optional named
//! features. This crate is the planning core: given requested package
//! features, the installed world, and the port catalog, it produces one
//! ordered action list (removals, then installations) that satisfies every
//! request and preserves the features of every package it touches.
//!
//! # Architecture
//!
//! - Feature-granular: dependency edges connect features, not packages
//! - Lazy: clusters materialize from the catalog as planning reaches them
//! - Differential: installed packages are rebuilt only when disturbed
//! - Deterministic: identical inputs serialize to identical plans

pub mod catalog;
mod error;
pub mod planner;
pub mod port;
pub mod spec;
pub mod status;

pub use catalog::{DiskPortCatalog, MapPortCatalog, PortCatalog};
pub use error::{Error, Result};
pub use planner::{
    create_export_plan, create_feature_install_plan, create_install_plan, create_remove_plan,
    group_plan, print_plan, AnyAction, BuildOptions, ExportPlanAction, ExportPlanType,
    InstallPlanAction, InstallPlanType, PackageGraph, PlanDisplay, RemovePlanAction,
    RemovePlanType, RequestType,
};
pub use port::{
    filter_dependencies, BinaryCache, BinaryDescriptor, MapBinaryCache, PortDescriptor,
    PortFeature,
};
pub use spec::{DependencySpec, FeatureSpec, PackageSpec, CORE_FEATURE};
pub use status::{InstalledRecord, StatusDatabase};
