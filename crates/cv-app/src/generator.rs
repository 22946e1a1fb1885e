use std::path::{Path, PathBuf};
use std::sync::Arc;

use cv_core::{
    BatchResult, BatchSpec, GenerationEndpoint, GenerationRequest, LineItemSpec, Orchestrator, Payload, SequentialRun,
    StaggerPolicy,
};
use cv_synth::SyntheticEndpoint;
use log::info;
use tokio::sync::watch;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::generator::backend::GenBackend;
use crate::generator::outputs::OutputStore;
use crate::job::{Job, JobMode};
use crate::progress;

pub mod backend;
pub mod outputs;

/// What a finished job left behind.
#[derive(Debug, Default)]
pub struct JobReport {
    pub run_dir: PathBuf,
    pub saved: Vec<PathBuf>,
    pub failures: Vec<String>,
}

pub struct Generator {
    orchestrator: Orchestrator,
    stagger: StaggerPolicy,
    output_root: PathBuf,
}

impl Generator {
    pub fn new(config: &AppConfig) -> Result<Self, AppError> {
        let endpoint: Arc<dyn GenerationEndpoint> = if config.offline {
            info!("Offline mode, rendering placeholders locally");
            Arc::new(SyntheticEndpoint::new())
        } else {
            Arc::new(GenBackend::new(config.backend.clone())?)
        };

        Ok(Self::with_endpoint(endpoint, config))
    }

    pub fn with_endpoint(endpoint: Arc<dyn GenerationEndpoint>, config: &AppConfig) -> Self {
        Self {
            orchestrator: Orchestrator::new(endpoint, config.orchestrator.clone()),
            stagger: config.stagger,
            output_root: config.output_dir.clone(),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Runs one job; input paths resolve against `base_dir`.
    pub async fn run(&self, job: &Job, base_dir: &Path) -> Result<JobReport, AppError> {
        let request = job.build_request(base_dir).await?;
        info!("Running {:?} job: {}", job.mode, job.instruction);

        match job.mode {
            JobMode::Batch => self.run_batch(job, request).await,
            JobMode::Sequential => self.run_sequential(job, request).await,
            JobMode::Caption => {
                let caption = self
                    .orchestrator
                    .generate_text(&request)
                    .await
                    .map_err(AppError::Generation)?
                    .ok_or(AppError::NothingGenerated)?;
                self.save_all(vec![(Payload::text(caption), Some("caption".to_string()))], Vec::new())
                    .await
            }
            JobMode::Video => {
                let video = self
                    .orchestrator
                    .generate_video(&request)
                    .await
                    .map_err(AppError::Generation)?
                    .ok_or(AppError::NothingGenerated)?;
                self.save_all(vec![(video, None)], Vec::new()).await
            }
        }
    }

    async fn run_batch(&self, job: &Job, request: GenerationRequest) -> Result<JobReport, AppError> {
        let spec = BatchSpec::new(request)
            .with_width(job.width)
            .with_stagger(self.stagger);

        let (tx, mut rx) = watch::channel(BatchResult::pending(job.width));
        let printer = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let line = progress::render_slots(rx.borrow_and_update().slots());
                info!("{}", line);
            }
        });

        let outcome = self.orchestrator.run_batch_observed(&spec, &tx).await;
        drop(tx);
        printer.await?;
        let batch = outcome?;

        let failures = batch
            .slots()
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                slot.failure()
                    .map(|failure| format!("variation {}: {} ({})", index + 1, failure.message, failure.kind))
            })
            .collect();

        let outputs = batch
            .into_successes()
            .into_iter()
            .enumerate()
            .map(|(index, payload)| (payload, Some(format!("variation-{}", index + 1))))
            .collect();

        self.save_all(outputs, failures).await
    }

    async fn run_sequential(&self, job: &Job, request: GenerationRequest) -> Result<JobReport, AppError> {
        let mut spec = LineItemSpec::new(request, job.items.iter().cloned());
        if let Some(template) = &job.template {
            spec = spec.with_template(template.clone());
        }

        let SequentialRun { mut updates, handle } = self.orchestrator.spawn_sequential(spec)?;
        while updates.changed().await.is_ok() {
            let line = progress::render_strip(&updates.borrow_and_update());
            info!("{}", line);
        }
        let items = handle.await??;

        let failures = progress::failure_lines(&items);
        let outputs = items
            .into_iter()
            .filter_map(|item| {
                let name = item.instruction;
                item.result.into_succeeded().map(|payload| (payload, Some(name)))
            })
            .collect();

        self.save_all(outputs, failures).await
    }

    /// The run directory is only created once there is something to put in it.
    async fn save_all(
        &self,
        outputs: Vec<(Payload, Option<String>)>,
        failures: Vec<String>,
    ) -> Result<JobReport, AppError> {
        if outputs.is_empty() {
            return Err(AppError::NothingGenerated);
        }

        let store = OutputStore::create(&self.output_root).await?;
        let mut saved = Vec::with_capacity(outputs.len());
        for (payload, stem) in &outputs {
            saved.push(store.save(payload, stem.as_deref()).await?);
        }

        info!("Saved {} outputs to {}", saved.len(), store.run_dir().display());
        Ok(JobReport {
            run_dir: store.run_dir().to_path_buf(),
            saved,
            failures,
        })
    }
}
