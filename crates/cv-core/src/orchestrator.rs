use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::endpoint::GenerationEndpoint;
use crate::model_types::GenModel;
use crate::poll::PollPolicy;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub retry: RetryPolicy,
    /// Upper bound for a single endpoint attempt. `None` leaves it to the transport.
    pub request_timeout: Option<Duration>,
    pub poll: PollPolicy,
    pub image_model: GenModel,
    pub text_model: GenModel,
    pub video_model: GenModel,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            request_timeout: None,
            poll: PollPolicy::default(),
            image_model: GenModel::FlashImage,
            text_model: GenModel::FlashText,
            video_model: GenModel::Veo,
        }
    }
}

/// Fans generation requests out to an endpoint and assembles ordered results.
///
/// Cheap to clone; clones share the endpoint and the cancellation token, so
/// cancelling one cancels every run started from any clone.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) endpoint: Arc<dyn GenerationEndpoint>,
    pub(crate) config: OrchestratorConfig,
    pub(crate) cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(endpoint: Arc<dyn GenerationEndpoint>, config: OrchestratorConfig) -> Self {
        Self {
            endpoint,
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// A handle that cancels this orchestrator and every clone of it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Every in-flight slot settles as cancelled at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
