mod capture;
mod db;
mod error;
mod pipeline;
mod predict;
mod record;
mod settings;
mod supabase;
mod transform;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::capture::CaptureForm;
use crate::predict::LinearModel;
use crate::record::Applicant;
use crate::settings::Settings;

#[derive(Parser)]
#[command(
    name = "insurance_etl",
    about = "Health insurance cost demo: Supabase → SQLite pipeline and capture form"
)]
struct Cli {
    /// Settings file (default: ./insurance_etl.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the warehouse and capture tables
    Init,
    /// Fetch the Supabase users table and report what came back
    Extract,
    /// Extract, transform (id - 2) and load into the warehouse
    Run,
    /// Price one applicant and store the submission
    Capture {
        #[command(flatten)]
        form: CaptureForm,
        /// Also insert the submission into the Supabase users table
        #[arg(long)]
        publish: bool,
    },
    /// Row counts for both local stores
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    info!(?settings, "Settings loaded");

    let result = match cli.command {
        Commands::Init => {
            let warehouse = db::connect(&settings.warehouse_db)?;
            db::init_warehouse_schema(&warehouse)?;
            let captured = db::connect(&settings.capture_db)?;
            db::init_capture_schema(&captured)?;
            println!(
                "Schemas ready: {} (warehouse), {} (capture)",
                settings.warehouse_db.display(),
                settings.capture_db.display()
            );
            Ok(())
        }
        Commands::Extract => {
            let records = pipeline::extract(&settings)
                .await
                .context("Extract step failed")?;
            println!("Extracted {} records", records.len());
            Ok(())
        }
        Commands::Run => {
            let report = pipeline::run(&settings).await.context("Pipeline run failed")?;
            println!(
                "Loaded {} of {} records ({} already present)",
                report.inserted,
                report.received,
                report.skipped()
            );
            Ok(())
        }
        Commands::Capture { form, publish } => {
            let applicant: Applicant = form.into();
            let model = LinearModel::load(settings.model_path.as_deref())
                .context("Failed to load prediction model")?;
            let conn = db::connect(&settings.capture_db)?;
            let submission = capture::submit(&conn, &model, &applicant)
                .context("Capture submission failed")?;
            drop(conn);

            let publisher = publish.then_some(|| pipeline::client(&settings));
            capture::report_and_publish(
                &mut std::io::stdout(),
                &submission,
                &applicant,
                publisher,
            )
            .await
            .context("Publishing to Supabase failed")?;
            Ok(())
        }
        Commands::Stats => {
            let warehouse = db::connect(&settings.warehouse_db)?;
            let captured = db::connect(&settings.capture_db)?;
            println!("Warehouse rows: {}", db::count_users(&warehouse)?);
            println!("Captured rows:  {}", db::count_users(&captured)?);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
