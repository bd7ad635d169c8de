// src/planner/plan.rs

//! Plan action types.
//!
//! A finished plan is an ordered list of [`AnyAction`]: removals first, then
//! installations. Each action records how it entered the plan (its plan
//! type) and whether the user asked for it directly.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::port::{BinaryDescriptor, PortDescriptor};
use crate::spec::PackageSpec;

/// Origin of an install or remove intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    UserRequested,
    AutoSelected,
}

/// How an install action reached the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallPlanType {
    /// Install a prebuilt package.
    Install,
    /// Build from the port, then install.
    BuildAndInstall,
    /// Nothing to do; surfaced for user-requested packages only.
    AlreadyInstalled,
    /// Excluded from the operation by the caller.
    Excluded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovePlanType {
    Remove,
    NotInstalled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportPlanType {
    /// A prebuilt package exists in the binary cache.
    AlreadyBuilt,
    /// The port is known but has not been built yet.
    PortAvailableButNotBuilt,
}

/// Per-action build options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildOptions {
    /// Build from the port's HEAD sources instead of the pinned version.
    pub use_head_version: bool,
}

/// One installation step of a plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallPlanAction {
    pub spec: PackageSpec,
    pub plan_type: InstallPlanType,
    pub request_type: RequestType,
    /// For `BuildAndInstall`, the features chosen to install; for
    /// `AlreadyInstalled`, the features currently present.
    pub features: BTreeSet<String>,
    /// Present for `BuildAndInstall` actions.
    pub port: Option<Arc<PortDescriptor>>,
    pub build_options: BuildOptions,
}

impl InstallPlanAction {
    pub fn build_and_install(
        spec: PackageSpec,
        port: Arc<PortDescriptor>,
        features: BTreeSet<String>,
        request_type: RequestType,
    ) -> Self {
        Self {
            spec,
            plan_type: InstallPlanType::BuildAndInstall,
            request_type,
            features,
            port: Some(port),
            build_options: BuildOptions::default(),
        }
    }

    pub fn already_installed(
        spec: PackageSpec,
        features: BTreeSet<String>,
        request_type: RequestType,
    ) -> Self {
        Self {
            spec,
            plan_type: InstallPlanType::AlreadyInstalled,
            request_type,
            features,
            port: None,
            build_options: BuildOptions::default(),
        }
    }

    pub fn excluded(spec: PackageSpec, request_type: RequestType) -> Self {
        Self {
            spec,
            plan_type: InstallPlanType::Excluded,
            request_type,
            features: BTreeSet::new(),
            port: None,
            build_options: BuildOptions::default(),
        }
    }

    /// `name[f1,f2]:triplet`, or `name:triplet` when no features are listed.
    pub fn display_name(&self) -> String {
        if self.features.is_empty() {
            return self.spec.to_string();
        }
        let features: Vec<&str> = self.features.iter().map(String::as_str).collect();
        format!(
            "{}[{}]:{}",
            self.spec.name(),
            features.join(","),
            self.spec.triplet()
        )
    }
}

/// One removal step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovePlanAction {
    pub spec: PackageSpec,
    pub plan_type: RemovePlanType,
    pub request_type: RequestType,
}

impl RemovePlanAction {
    pub fn new(spec: PackageSpec, plan_type: RemovePlanType, request_type: RequestType) -> Self {
        Self {
            spec,
            plan_type,
            request_type,
        }
    }
}

/// One step of an export plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportPlanAction {
    pub spec: PackageSpec,
    pub plan_type: ExportPlanType,
    pub request_type: RequestType,
    /// The prebuilt package, for `AlreadyBuilt`.
    pub binary: Option<BinaryDescriptor>,
    /// The port descriptor, for `PortAvailableButNotBuilt`.
    pub port: Option<Arc<PortDescriptor>>,
}

impl ExportPlanAction {
    pub fn from_binary(
        spec: PackageSpec,
        binary: BinaryDescriptor,
        request_type: RequestType,
    ) -> Self {
        Self {
            spec,
            plan_type: ExportPlanType::AlreadyBuilt,
            request_type,
            binary: Some(binary),
            port: None,
        }
    }

    pub fn from_port(
        spec: PackageSpec,
        port: Arc<PortDescriptor>,
        request_type: RequestType,
    ) -> Self {
        Self {
            spec,
            plan_type: ExportPlanType::PortAvailableButNotBuilt,
            request_type,
            binary: None,
            port: Some(port),
        }
    }
}

/// A single plan step: an installation or a removal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AnyAction {
    Install(InstallPlanAction),
    Remove(RemovePlanAction),
}

impl AnyAction {
    pub fn spec(&self) -> &PackageSpec {
        match self {
            AnyAction::Install(action) => &action.spec,
            AnyAction::Remove(action) => &action.spec,
        }
    }

    pub fn install(&self) -> Option<&InstallPlanAction> {
        match self {
            AnyAction::Install(action) => Some(action),
            AnyAction::Remove(_) => None,
        }
    }

    pub fn remove(&self) -> Option<&RemovePlanAction> {
        match self {
            AnyAction::Remove(action) => Some(action),
            AnyAction::Install(_) => None,
        }
    }
}
