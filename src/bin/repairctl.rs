use std::fs::read_to_string;
use std::path::Path;

use anyhow::Result;
use clap::Parser;
use serde_json::Value;
use tracing::{error, info};

use cluster_repair::config::{init_config, CONFIG};
use cluster_repair::registry::MemRegistry;
use cluster_repair::repair::{
    to_document, ExecutorSettings, RepairExecutor, RepairOperation, TransactionTranslator,
};

fn load_plan(path: impl AsRef<Path>) -> Result<Vec<RepairOperation>> {
    let raw = read_to_string(path.as_ref())?;
    let plan: Vec<RepairOperation> = serde_json::from_str(&raw)?;
    info!("loaded {} repair operations from {:?}", plan.len(), path.as_ref());

    Ok(plan)
}

fn load_snapshot(path: impl AsRef<Path>) -> Result<Value> {
    let raw = read_to_string(path.as_ref())?;
    Ok(serde_json::from_str(&raw)?)
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long)]
    plan: String,
    #[arg(short, long)]
    config: Option<String>,
    /// Apply the plan to this registry state instead of printing transactions.
    #[arg(short, long)]
    snapshot: Option<String>,
    /// Print operator status documents instead of transactions.
    #[arg(short, long, default_value_t = false)]
    audit: bool,
    #[arg(long)]
    name: Option<String>,
}

fn dry_run(plan: &[RepairOperation], audit: bool) -> Result<()> {
    let translator = TransactionTranslator::default();

    for op in plan.iter() {
        if audit {
            println!("{}", serde_json::to_string_pretty(&to_document(op)?)?);
            continue;
        }

        let translation = translator.translate(op)?;
        println!("{op}");
        println!(
            "{}",
            serde_json::to_string_pretty(&translation.transaction.to_wire())?
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    if let Some(config) = args.config.as_ref() {
        init_config(config).inspect_err(|e| error!("failed to initialize configuration, err: {e}"))?;
    }

    if let Some(name) = args.name {
        info!("overriding name from command line argument: {}", name);
        CONFIG.write().name = name;
    }

    let plan = load_plan(&args.plan).inspect_err(|e| error!("failed to load plan, err: {e}"))?;

    let Some(snapshot) = args.snapshot else {
        dry_run(&plan, args.audit)?;
        return Ok(());
    };

    let state = load_snapshot(&snapshot)
        .inspect_err(|e| error!("failed to load registry snapshot {snapshot}, err: {e}"))?;

    // no job runner behind a snapshot
    let mut settings = ExecutorSettings::from(&*CONFIG.read());
    settings.wait_for_jobs = false;

    let executor = RepairExecutor::new(
        MemRegistry::new(state),
        TransactionTranslator::default(),
        settings,
    );
    let report = executor.run(&plan).await?;
    info!("repair finished: {:?}", report);

    println!(
        "{}",
        serde_json::to_string_pretty(&executor.registry().snapshot())?
    );

    Ok(())
}
