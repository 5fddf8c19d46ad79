use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const CHAINPLAN_DIR: &str = ".chainplan";
pub const RECORDS_DIR: &str = ".chainplan/records";

pub const CONFIG_FILE: &str = ".chainplan/config.yaml";
pub const DEFAULT_PLAN_FILE: &str = "deploy.yaml";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn chainplan_dir(root: &Path) -> PathBuf {
    root.join(CHAINPLAN_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn records_dir(root: &Path) -> PathBuf {
    root.join(RECORDS_DIR)
}

/// One record per network, so a testnet rehearsal never shadows mainnet progress.
pub fn record_path(root: &Path, network: &str) -> PathBuf {
    records_dir(root).join(format!("{network}.yaml"))
}

/// Resolve a plan path relative to the project root unless already absolute.
pub fn plan_path(root: &Path, plan: &Path) -> PathBuf {
    if plan.is_absolute() {
        plan.to_path_buf()
    } else {
        root.join(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_path_is_per_network() {
        let root = Path::new("/proj");
        assert_eq!(
            record_path(root, "bsc_testnet"),
            PathBuf::from("/proj/.chainplan/records/bsc_testnet.yaml")
        );
    }

    #[test]
    fn plan_path_keeps_absolute() {
        let root = Path::new("/proj");
        assert_eq!(
            plan_path(root, Path::new("/elsewhere/plan.yaml")),
            PathBuf::from("/elsewhere/plan.yaml")
        );
        assert_eq!(
            plan_path(root, Path::new("deploy.yaml")),
            PathBuf::from("/proj/deploy.yaml")
        );
    }
}
