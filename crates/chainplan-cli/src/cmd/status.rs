use crate::output::{print_json, print_table};
use anyhow::Context;
use chainplan_core::{
    config::Config,
    orchestrator::{progress, ProgressItem},
    record, FileRecordStore,
};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct StatusOutput<'a> {
    network: &'a str,
    last_completed_step: Option<usize>,
    complete: bool,
    items: Vec<ProgressItem>,
}

pub fn run(root: &Path, network: &str, plan: Option<&Path>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(root).context("failed to load config")?;
    config.network(network)?;
    let (plan_path, plan) = super::load_plan(root, &config, plan)?;

    let store = FileRecordStore::for_network(root, network);
    let record = record::load_or_new(&store, network)
        .with_context(|| format!("failed to read {}", store.path().display()))?;
    let items = progress(&plan, &record)
        .with_context(|| format!("{} is invalid", plan_path.display()))?;
    let done = items
        .iter()
        .filter(|i| i.status == "deployed" || i.status == "applied")
        .count();

    if json {
        return print_json(&StatusOutput {
            network,
            last_completed_step: record.last_completed_step,
            complete: done == items.len(),
            items,
        });
    }

    println!("{network}: {done}/{} steps complete", items.len());
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| {
            let detail = match (&item.address, &item.error) {
                (_, Some(err)) => err.clone(),
                (Some(addr), None) => addr.to_string(),
                (None, None) => String::new(),
            };
            vec![
                item.position.to_string(),
                item.label.clone(),
                item.status.clone(),
                detail,
            ]
        })
        .collect();
    if !rows.is_empty() {
        println!();
        print_table(&["#", "ITEM", "STATUS", "DETAIL"], &rows);
    }
    Ok(())
}
