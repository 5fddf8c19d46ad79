use anyhow::Context;
use chainplan_core::{config::Config, io, paths};
use std::path::Path;

const STARTER_PLAN: &str = r#"# Units deploy top to bottom, then wiring steps run top to bottom.
# Arguments are literals (address, uint, bool, bytes32) or `ref: <unit>`,
# which resolves to that unit's deployed address. A unit may only `ref`
# units listed above it; wiring may `ref` any unit.
units:
  - name: token
    contract: Token
    args:
      - uint: "1000000000000000000000000"
  - name: vault
    contract: Vault
    args:
      - ref: token
wiring:
  - target: token
    method: approve(address,uint256)
    args:
      - ref: vault
      - uint: max
"#;

pub fn run(root: &Path) -> anyhow::Result<()> {
    let project_name = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string());

    println!("Initializing chainplan in: {}", root.display());

    for dir in [paths::chainplan_dir(root), paths::records_dir(root)] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let config_path = paths::config_path(root);
    let config = if config_path.exists() {
        println!("  exists:  {}", paths::CONFIG_FILE);
        Config::load(root).context("failed to read config.yaml")?
    } else {
        let cfg = Config::new(&project_name);
        cfg.save(root).context("failed to write config.yaml")?;
        println!("  created: {}", paths::CONFIG_FILE);
        cfg
    };

    let plan_path = paths::plan_path(root, &config.plan);
    let created = io::write_if_missing(&plan_path, STARTER_PLAN.as_bytes())
        .with_context(|| format!("failed to write {}", plan_path.display()))?;
    let verb = if created { "created:" } else { "exists: " };
    println!("  {verb} {}", config.plan.display());

    for warning in config.validate(root) {
        eprintln!("warning: {}", warning.message);
    }

    println!("\nNext: edit the plan, then `chainplan validate` and `chainplan run --network development`.");
    Ok(())
}
