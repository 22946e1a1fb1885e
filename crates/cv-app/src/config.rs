use std::env;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use cv_core::{GenModel, OrchestratorConfig, PartKind, PollPolicy, RetryPolicy, StaggerPolicy};

use crate::error::AppError;
use crate::generator::backend::config::GenBackendConfig;

pub type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend: GenBackendConfig,
    pub orchestrator: OrchestratorConfig,
    pub stagger: StaggerPolicy,
    pub output_dir: PathBuf,
    pub offline: bool,
}

impl AppConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> Result<Self, AppError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(AppError::Config(format!(".env: {e}")));
            }
        }

        Self::from_lookup(&|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: &Lookup<'_>) -> Result<Self, AppError> {
        let offline = parse_flag(lookup, "CV_OFFLINE")?;
        let backend = GenBackendConfig::from_lookup(lookup)?;
        if !offline && backend.api_key.is_none() {
            return Err(AppError::MissingApiKey);
        }

        let defaults = OrchestratorConfig::default();
        let retry = RetryPolicy::new(
            parse_or(lookup, "CV_MAX_RETRIES", defaults.retry.max_retries)?,
            Duration::from_millis(parse_or(lookup, "CV_BASE_DELAY_MS", defaults.retry.base_delay.as_millis() as u64)?),
        );

        let request_timeout = match parse_or(lookup, "CV_REQUEST_TIMEOUT_SECS", 0u64)? {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        let poll = PollPolicy {
            interval: Duration::from_secs(parse_or(lookup, "CV_POLL_INTERVAL_SECS", defaults.poll.interval.as_secs())?),
            deadline: match parse_or(lookup, "CV_POLL_DEADLINE_SECS", 600u64)? {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
        };

        let orchestrator = OrchestratorConfig {
            retry,
            request_timeout,
            poll,
            image_model: model_or(lookup, "CV_IMAGE_MODEL", defaults.image_model)?,
            text_model: model_or(lookup, "CV_TEXT_MODEL", defaults.text_model)?,
            video_model: model_or(lookup, "CV_VIDEO_MODEL", defaults.video_model)?,
        };

        let stagger = StaggerPolicy::new(Duration::from_millis(parse_or(
            lookup,
            "CV_STAGGER_MS",
            StaggerPolicy::default().increment.as_millis() as u64,
        )?));

        let output_dir = lookup("CV_OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("outputs"));

        Ok(Self {
            backend,
            orchestrator,
            stagger,
            output_dir,
            offline,
        })
    }
}

pub(crate) fn parse_or<T>(lookup: &Lookup<'_>, key: &str, default: T) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AppError::Config(format!("{key}={raw}: {e}"))),
        None => Ok(default),
    }
}

fn parse_flag(lookup: &Lookup<'_>, key: &str) -> Result<bool, AppError> {
    match lookup(key).as_deref().map(str::trim) {
        None | Some("") | Some("0") | Some("false") => Ok(false),
        Some("1") | Some("true") => Ok(true),
        Some(other) => Err(AppError::Config(format!("{key}={other}: expected 0/1/true/false"))),
    }
}

/// Models must exist in the catalog and produce the kind of output their slot expects.
fn model_or(lookup: &Lookup<'_>, key: &str, default: GenModel) -> Result<GenModel, AppError> {
    let Some(id) = lookup(key) else {
        return Ok(default);
    };

    let model = GenModel::from_id(id.trim()).ok_or_else(|| AppError::Config(format!("{key}: unknown model '{id}'")))?;
    if model.output_kind() != default.output_kind() {
        return Err(AppError::Config(format!(
            "{key}: {} produces {:?}, expected {:?}",
            model.id(),
            model.output_kind(),
            default.output_kind()
        )));
    }
    if model.output_kind() == PartKind::Video && !model.is_long_running() {
        return Err(AppError::Config(format!("{key}: {} cannot be polled", model.id())));
    }
    Ok(model)
}
