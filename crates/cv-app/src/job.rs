use std::path::{Path, PathBuf};

use cv_core::{GenerationRequest, InputPayload, OutputShape};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Several variations of one request, fired concurrently.
    #[default]
    Batch,
    /// One image per item, strictly one after another.
    Sequential,
    Caption,
    Video,
}

fn default_width() -> usize {
    cv_core::request::DEFAULT_BATCH_WIDTH
}

/// A generation recipe read from disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    #[serde(default)]
    pub mode: JobMode,
    pub instruction: String,
    /// Image files, relative to the job file. Order is significant.
    #[serde(default)]
    pub inputs: Vec<PathBuf>,
    #[serde(default)]
    pub items: Vec<String>,
    #[serde(default)]
    pub template: Option<String>,
    #[serde(flatten)]
    pub shape: OutputShape,
    #[serde(default = "default_width")]
    pub width: usize,
}

impl Job {
    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|source| AppError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub async fn build_request(&self, base_dir: &Path) -> Result<GenerationRequest, AppError> {
        let mut inputs = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let path = base_dir.join(input);
            let data = tokio::fs::read(&path)
                .await
                .map_err(|source| AppError::Read { path: path.clone(), source })?;
            inputs.push(InputPayload::new(mime_for(&path), data));
        }

        let request = GenerationRequest::new(self.instruction.clone())
            .with_inputs(inputs)
            .with_shape(self.shape);
        request.validate()?;
        Ok(request)
    }
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}
