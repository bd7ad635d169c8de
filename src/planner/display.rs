// src/planner/display.rs

//! Grouping and rendering of a finished plan for human review.
//!
//! Actions are bucketized by how they entered the plan, each bucket sorted
//! by package name, and rendered as one report. Rendering also hosts the
//! safety gate: a plan that removes packages is refused unless the caller
//! passed the recursion flag.

use tracing::warn;

use crate::error::{Error, Result};
use crate::planner::plan::{
    AnyAction, InstallPlanAction, InstallPlanType, RemovePlanAction, RequestType,
};

/// The final plan, bucketized for presentation.
#[derive(Debug, Default)]
pub struct PlanDisplay<'a> {
    pub removed: Vec<&'a RemovePlanAction>,
    /// Installs preceded by a removal of the same spec.
    pub rebuilt: Vec<&'a InstallPlanAction>,
    /// Prebuilt packages to install directly.
    pub only_install: Vec<&'a InstallPlanAction>,
    /// Packages to build and install for the first time.
    pub newly_built: Vec<&'a InstallPlanAction>,
    /// User-requested packages that are already present.
    pub already_installed: Vec<&'a InstallPlanAction>,
    pub excluded: Vec<&'a InstallPlanAction>,
    /// True when any action was pulled in as a dependency rather than
    /// requested by name.
    pub has_auto_selected: bool,
}

/// Bucketize an action list.
///
/// Removals always precede installs in a serialized plan, so an install
/// whose spec already appeared among the removals is a rebuild.
pub fn group_plan(actions: &[AnyAction]) -> PlanDisplay<'_> {
    let mut display = PlanDisplay::default();

    for action in actions {
        match action {
            AnyAction::Remove(remove) => display.removed.push(remove),
            AnyAction::Install(install) => {
                display.has_auto_selected |= install.request_type == RequestType::AutoSelected;

                if display.removed.iter().any(|r| r.spec == install.spec) {
                    display.rebuilt.push(install);
                    continue;
                }
                match install.plan_type {
                    InstallPlanType::Install => display.only_install.push(install),
                    InstallPlanType::BuildAndInstall => display.newly_built.push(install),
                    InstallPlanType::AlreadyInstalled => {
                        if install.request_type == RequestType::UserRequested {
                            display.already_installed.push(install);
                        }
                    }
                    InstallPlanType::Excluded => display.excluded.push(install),
                }
            }
        }
    }

    display.removed.sort_by(|a, b| a.spec.name().cmp(b.spec.name()));
    for bucket in [
        &mut display.rebuilt,
        &mut display.only_install,
        &mut display.newly_built,
        &mut display.already_installed,
        &mut display.excluded,
    ] {
        bucket.sort_by(|a, b| a.spec.name().cmp(b.spec.name()));
    }

    display
}

/// One report row: request marker, display name, HEAD suffix.
fn to_output_string(action: &InstallPlanAction) -> String {
    let marker = match action.request_type {
        RequestType::AutoSelected => "  * ",
        RequestType::UserRequested => "    ",
    };
    let from_head = if action.build_options.use_head_version {
        " (from HEAD)"
    } else {
        ""
    };
    format!("{}{}{}", marker, action.display_name(), from_head)
}

impl PlanDisplay<'_> {
    /// Render the report, one section per non-empty bucket.
    pub fn render(&self) -> String {
        let mut out = String::new();

        let mut section = |heading: &str, bucket: &[&InstallPlanAction]| {
            if bucket.is_empty() {
                return;
            }
            out.push_str(heading);
            out.push('\n');
            for action in bucket {
                out.push_str(&to_output_string(action));
                out.push('\n');
            }
        };

        section("The following packages are excluded:", &self.excluded);
        section(
            "The following packages are already installed:",
            &self.already_installed,
        );
        section("The following packages will be rebuilt:", &self.rebuilt);
        section(
            "The following packages will be built and installed:",
            &self.newly_built,
        );
        section(
            "The following packages will be directly installed:",
            &self.only_install,
        );

        if self.has_auto_selected {
            out.push_str("Additional packages (*) will be modified to complete this operation.\n");
        }

        out
    }
}

/// Render the plan to stdout and enforce the rebuild safety gate.
///
/// A plan containing removals is only allowed to proceed when the caller
/// passed the recursion flag; otherwise the user is pointed at it and the
/// operation fails.
pub fn print_plan(actions: &[AnyAction], is_recursive: bool) -> Result<()> {
    let display = group_plan(actions);
    print!("{}", display.render());

    if !display.removed.is_empty() && !is_recursive {
        warn!("rebuilding the above packages requires the --recurse option");
        return Err(Error::RebuildsRequireRecurse);
    }

    Ok(())
}
