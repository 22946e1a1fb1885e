mod config;
mod error;
mod generator;
mod job;
mod progress;

use std::path::{Path, PathBuf};

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::generator::Generator;
use crate::job::Job;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let job_path = std::env::args().nth(1).map(PathBuf::from).ok_or(AppError::Usage)?;

    let config = AppConfig::load()?;
    let job = Job::load(&job_path).await?;
    let generator = Generator::new(&config)?;

    let cancel = generator.orchestrator().cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling outstanding work");
            cancel.cancel();
        }
    });

    let base_dir = job_path.parent().unwrap_or(Path::new("."));
    let report = generator.run(&job, base_dir).await?;

    for failure in &report.failures {
        warn!("{}", failure);
    }
    info!("Run finished in {}", report.run_dir.display());
    for path in &report.saved {
        println!("{}", path.display());
    }

    Ok(())
}
