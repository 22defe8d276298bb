use std::fs::read_to_string;

use serde_json::{json, Value};

use cluster_repair::registry::MemRegistry;
use cluster_repair::repair::{
    ExecutorSettings, RepairExecutor, RepairOperation, TransactionTranslator,
};

fn load<T: serde::de::DeserializeOwned>(path: &str) -> T {
    serde_json::from_str(&read_to_string(path).unwrap()).unwrap()
}

#[tokio::test]
async fn test_demo_plan_repairs_demo_registry() {
    let plan: Vec<RepairOperation> = load("demos/plan.json");
    let state: Value = load("demos/registry.json");

    let settings = ExecutorSettings::builder().wait_for_jobs(false).build();
    let executor = RepairExecutor::new(
        MemRegistry::new(state),
        TransactionTranslator::default(),
        settings,
    );

    let report = executor.run(&plan).await.unwrap();
    assert_eq!(report.applied.len(), 3);

    let snapshot = executor.registry().snapshot();
    assert_eq!(
        snapshot["Plan"]["Collections"]["shop"]["100"],
        json!({
            "distributeShardsLike": "99",
            "replicationFactor": 3,
            "shards": {"s100": ["PRMR-1", "PRMR-3", "PRMR-2"]},
        })
    );
}

#[test]
fn test_demo_plan_renders_every_operation() {
    let plan: Vec<RepairOperation> = load("demos/plan.json");

    let rendered: Vec<String> = plan.iter().map(|op| op.to_string()).collect();
    assert!(rendered[0].starts_with("BeginRepairsOperation\n{ database: shop\n"));
    assert!(rendered[1].contains(", protoFollowers: [PRMR-3, PRMR-2]\n"));
    assert!(rendered[2].contains("dbServers: [PRMR-1, PRMR-3, PRMR-2]"));
}
