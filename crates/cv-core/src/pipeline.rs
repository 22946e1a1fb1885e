use std::future::Future;

use tracing::{debug, warn};

use crate::endpoint::{GenerationResponse, PartKind, ResponsePart};
use crate::error::GenError;
use crate::model_types::GenModel;
use crate::orchestrator::Orchestrator;
use crate::payload::Payload;
use crate::request::GenerationRequest;
use crate::retry::retry_with_backoff;
use crate::slot::SlotFailure;

/// First part of the wanted kind, in response order.
pub fn select_first(response: GenerationResponse, kind: PartKind) -> Option<Payload> {
    response
        .parts
        .into_iter()
        .find(|part| kind.matches(part))
        .map(ResponsePart::into_payload)
}

impl Orchestrator {
    /// Applies the per-attempt timeout to one endpoint call.
    pub(crate) async fn bounded<T>(&self, call: impl Future<Output = Result<T, GenError>>) -> Result<T, GenError> {
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| GenError::timeout(limit))?,
            None => call.await,
        }
    }

    /// Races `work` against the cancellation token.
    pub(crate) async fn cancellable<T>(&self, work: impl Future<Output = Result<T, GenError>>) -> Result<T, GenError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(GenError::cancelled()),
            result = work => result,
        }
    }

    /// Runs one retry-wrapped request and decodes the first part of the model's output
    /// kind. `Ok(None)` means the endpoint answered with nothing usable; failures come
    /// back as values and never escape the slot.
    pub async fn generate_slot(
        &self,
        model: GenModel,
        request: &GenerationRequest,
    ) -> Result<Option<Payload>, SlotFailure> {
        if self.cancel.is_cancelled() {
            return Err(SlotFailure::cancelled());
        }

        let policy = self.config.retry;
        let response = self
            .cancellable(retry_with_backoff(&policy, || {
                self.bounded(self.endpoint.generate(model, request))
            }))
            .await;

        match response {
            Ok(response) => {
                let payload = select_first(response, model.output_kind());
                if payload.is_none() {
                    debug!(model = model.id(), "response carried no {:?} part", model.output_kind());
                }
                Ok(payload)
            }
            Err(err) => {
                warn!(model = model.id(), kind = %err.kind, "slot failed: {}", err.message);
                Err(err.into())
            }
        }
    }

    /// Image generation with failures folded into "nothing to show".
    pub async fn generate_image(&self, request: &GenerationRequest) -> Option<Payload> {
        self.generate_slot(self.config.image_model, request)
            .await
            .ok()
            .flatten()
    }

    /// Caption and copy writing against the text model.
    pub async fn generate_text(&self, request: &GenerationRequest) -> Result<Option<String>, SlotFailure> {
        let payload = self.generate_slot(self.config.text_model, request).await?;
        Ok(payload.map(|payload| match payload {
            Payload::Text(text) => text,
            other => other.as_str().to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::orchestrator::OrchestratorConfig;
    use crate::retry::RetryPolicy;
    use crate::testing::{ScriptedEndpoint, Step};

    fn orchestrator(endpoint: Arc<ScriptedEndpoint>) -> Orchestrator {
        Orchestrator::new(endpoint, OrchestratorConfig::default())
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new("swap the background for a beach")
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_matching_part_wins() {
        let endpoint = Arc::new(ScriptedEndpoint::new(|_, _| {
            Step::respond(vec![
                ResponsePart::Text("Here is your edit".into()),
                ResponsePart::inline("image/png", vec![1]),
                ResponsePart::inline("image/png", vec![2]),
            ])
        }));

        let payload = orchestrator(endpoint).generate_slot(GenModel::FlashImage, &request()).await;

        assert_eq!(payload, Ok(Some(Payload::data_uri("image/png", &[1]))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_matching_part_is_not_an_error() {
        let endpoint = Arc::new(ScriptedEndpoint::new(|_, _| {
            Step::respond(vec![ResponsePart::Text("I can't edit that photo".into())])
        }));

        let orchestrator = orchestrator(endpoint.clone());
        let payload = orchestrator.generate_slot(GenModel::FlashImage, &request()).await;

        assert_eq!(payload, Ok(None));
        assert_eq!(endpoint.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_become_a_value() {
        let endpoint = Arc::new(ScriptedEndpoint::new(|_, _| Step::fail(ErrorKind::ServerError)));

        let orchestrator = orchestrator(endpoint.clone());
        let failure = orchestrator.generate_slot(GenModel::FlashImage, &request()).await.unwrap_err();

        assert_eq!(failure.kind, ErrorKind::ServerError);
        assert_eq!(endpoint.call_count(), 3);
        assert_eq!(orchestrator.generate_image(&request()).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_terminal() {
        let endpoint = Arc::new(ScriptedEndpoint::new(|_, _| {
            Step::respond(vec![ResponsePart::inline("image/png", vec![1])]).after(Duration::from_secs(30))
        }));
        let config = OrchestratorConfig {
            request_timeout: Some(Duration::from_secs(5)),
            ..OrchestratorConfig::default()
        };

        let failure = Orchestrator::new(endpoint.clone(), config)
            .generate_slot(GenModel::FlashImage, &request())
            .await
            .unwrap_err();

        assert_eq!(failure.kind, ErrorKind::Timeout);
        assert_eq!(endpoint.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_backoff() {
        let endpoint = Arc::new(ScriptedEndpoint::new(|_, _| Step::fail(ErrorKind::RateLimited)));
        let config = OrchestratorConfig {
            retry: RetryPolicy::new(5, Duration::from_secs(10)),
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::new(endpoint.clone(), config);

        let canceller = orchestrator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let failure = orchestrator.generate_slot(GenModel::FlashImage, &request()).await.unwrap_err();

        assert_eq!(failure.kind, ErrorKind::Cancelled);
        assert_eq!(endpoint.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_generation_returns_caption() {
        let endpoint = Arc::new(ScriptedEndpoint::new(|_, _| {
            Step::ok(GenerationResponse::new(vec![
                ResponsePart::Text("Sunset mood. #goldenhour".into()),
                ResponsePart::Text("second candidate".into()),
            ]))
        }));

        let caption = orchestrator(endpoint.clone()).generate_text(&request()).await;

        assert_eq!(caption, Ok(Some("Sunset mood. #goldenhour".to_string())));
        assert_eq!(endpoint.calls()[0].model, GenModel::FlashText);
    }
}
