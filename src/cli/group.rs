//! Group command - manage analysis groups.

use anyhow::{Context, Result};
use tracing::info;
use uuid::Uuid;

use crate::cli::GroupAction;
use crate::config::Config;
use crate::model::AnalysisGroup;
use crate::store::{JsonMetricStore, MetricStore};

/// Run a group command.
pub fn run(config: &Config, action: GroupAction) -> Result<()> {
    let store = JsonMetricStore::open(&config.store.root)?;

    match action {
        GroupAction::Create { name } => create(&store, &name),
        GroupAction::Add { group, plate } => add_plate(&store, &group, &plate),
        GroupAction::Associate { group, reprocess } => associate(&store, config, &group, &reprocess),
        GroupAction::List => list(&store),
        GroupAction::Deactivate { group } => deactivate(&store, &group),
    }
}

fn load_group(store: &dyn MetricStore, id: &str) -> Result<AnalysisGroup> {
    let id: Uuid = id.parse().with_context(|| format!("Invalid group id: {}", id))?;
    Ok(store.group(&id)?)
}

fn create(store: &dyn MetricStore, name: &str) -> Result<()> {
    let group = AnalysisGroup::new(name);
    store.save_group(&group)?;
    info!(group = %group.id, name, "Created analysis group");
    println!("Created group '{}': {}", group.name, group.id);
    Ok(())
}

fn add_plate(store: &dyn MetricStore, group_id: &str, plate_id: &str) -> Result<()> {
    let mut group = load_group(store, group_id)?;
    store
        .plate(plate_id)
        .with_context(|| format!("Plate {} is not in the store", plate_id))?;

    if group.add_plate(plate_id) {
        store.save_group(&group)?;
        println!("Added plate {} to group '{}'.", plate_id, group.name);
    } else {
        println!("Plate {} is already in group '{}'.", plate_id, group.name);
    }
    Ok(())
}

fn associate(store: &dyn MetricStore, config: &Config, group_id: &str, code: &str) -> Result<()> {
    let mut group = load_group(store, group_id)?;
    let rc = config
        .reprocess_config(code)
        .with_context(|| format!("Unknown reprocess config '{}'", code))?;

    if !group.reprocess_config_ids.contains(&rc.id) {
        group.reprocess_config_ids.push(rc.id);
        store.save_group(&group)?;
    }
    println!("Group '{}' is associated with reprocess config {}.", group.name, rc.code);
    Ok(())
}

fn list(store: &dyn MetricStore) -> Result<()> {
    let groups = store.groups()?;
    if groups.is_empty() {
        println!("No analysis groups.");
        return Ok(());
    }

    println!("Analysis groups ({}):", groups.len());
    println!("{}", "-".repeat(80));
    for group in groups {
        println!("Id:      {}", group.id);
        println!("Name:    {}", group.name);
        println!("Active:  {}", if group.active { "yes" } else { "no" });
        println!("Plates:  {}", group.plate_ids.len());
        if !group.reprocess_config_ids.is_empty() {
            let ids: Vec<String> = group.reprocess_config_ids.iter().map(|id| id.to_string()).collect();
            println!("Reprocess configs: {}", ids.join(", "));
        }
        println!("{}", "-".repeat(80));
    }
    Ok(())
}

fn deactivate(store: &dyn MetricStore, group_id: &str) -> Result<()> {
    let mut group = load_group(store, group_id)?;
    if !group.active {
        println!("Group '{}' is already inactive.", group.name);
        return Ok(());
    }
    group.active = false;
    store.save_group(&group)?;
    println!("Deactivated group '{}'.", group.name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::fixtures::record;
    use tempfile::TempDir;

    #[test]
    fn test_group_lifecycle() {
        let dir = TempDir::new().unwrap();
        let store = JsonMetricStore::open(dir.path()).unwrap();
        store.save_plate(&record("p1", None, 1)).unwrap();

        let group = AnalysisGroup::new("run 7");
        store.save_group(&group).unwrap();
        let id = group.id.to_string();

        add_plate(&store, &id, "p1").unwrap();
        add_plate(&store, &id, "p1").unwrap();
        assert!(add_plate(&store, &id, "missing").is_err());
        assert_eq!(store.group(&group.id).unwrap().plate_ids, vec!["p1".to_string()]);

        deactivate(&store, &id).unwrap();
        assert!(!store.group(&group.id).unwrap().active);
        assert!(load_group(&store, "not-a-uuid").is_err());
    }

    #[test]
    fn test_associate_requires_known_config() {
        let dir = TempDir::new().unwrap();
        let store = JsonMetricStore::open(dir.path()).unwrap();
        let group = AnalysisGroup::new("g");
        store.save_group(&group).unwrap();

        let config = Config::default();
        assert!(associate(&store, &config, &group.id.to_string(), "rc2").is_err());
    }
}
