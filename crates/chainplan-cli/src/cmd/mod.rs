pub mod init;
pub mod run;
pub mod status;
pub mod validate;

use anyhow::Context;
use chainplan_core::{config::Config, paths, DeploymentPlan};
use std::path::{Path, PathBuf};

/// Load the plan named on the command line, or the one config.yaml points at.
pub(crate) fn load_plan(
    root: &Path,
    config: &Config,
    plan: Option<&Path>,
) -> anyhow::Result<(PathBuf, DeploymentPlan)> {
    let path = paths::plan_path(root, plan.unwrap_or(&config.plan));
    let plan = DeploymentPlan::load(&path)
        .with_context(|| format!("failed to load plan {}", path.display()))?;
    Ok((path, plan))
}
