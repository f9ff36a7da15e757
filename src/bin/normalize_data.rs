use anyhow::{Context, Result};
use clap::Parser;
use resto_backoffice::normalize::DataNormalizer;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Normalizes legacy data files in place, keeping a timestamped backup of each one.
#[derive(Parser)]
#[command(name = "normalize-data")]
#[command(about = "One-off cleanup of the restaurant back-office data files")]
struct Cli {
    /// Directory holding empleados.json, tareas.json, pedidos.json and insumos.json.
    #[arg(long, env = "DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Report what would change without writing anything.
    #[arg(long)]
    dry_run: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let report = DataNormalizer::new(&cli.data_dir)
        .dry_run(cli.dry_run)
        .run()
        .with_context(|| format!("failed to normalize data in {}", cli.data_dir.display()))?;

    println!("Supplies changed: {}", report.supplies_changed);
    println!("Orders changed:   {}", report.orders_changed);
    println!("Tasks changed:    {}", report.tasks_changed);
    if report.inventory_task_added {
        println!("Added a control_inventario task.");
    }
    if report.dry_run {
        println!("Dry run: no files were written.");
    } else {
        for backup in &report.backups {
            println!("Backup: {}", backup.display());
        }
    }
    Ok(())
}
