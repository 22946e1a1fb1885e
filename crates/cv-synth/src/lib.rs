//! Offline stand-in for the hosted generation service.
//!
//! Renders placeholder images locally so the orchestration layer can be driven end to end
//! without network access or an API key. Swap in a real endpoint for actual results.

pub mod placeholder;

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use cv_core::{
    ErrorKind, GenError, GenModel, GenerationEndpoint, GenerationRequest, GenerationResponse, PartKind, ResponsePart,
};
use log::{debug, info};

use crate::placeholder::{color_from_prompt, encode_png, render_variation};

const DEFAULT_LONG_EDGE: u32 = 256;

pub struct SyntheticEndpoint {
    long_edge: u32,
    flaky_every: Option<usize>,
    calls: AtomicUsize,
}

impl SyntheticEndpoint {
    pub fn new() -> Self {
        Self {
            long_edge: DEFAULT_LONG_EDGE,
            flaky_every: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_long_edge(mut self, long_edge: u32) -> Self {
        self.long_edge = long_edge.max(1);
        self
    }

    /// Every `n`-th call answers "service unavailable", to watch the retry loop at work.
    pub fn with_flaky_every(mut self, n: usize) -> Self {
        self.flaky_every = (n > 0).then_some(n);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn render(&self, call: usize, request: &GenerationRequest) -> Result<Vec<u8>, GenError> {
        let dimensions = request.shape().dimensions(self.long_edge);
        let color = color_from_prompt(request.instruction());
        let img = render_variation(call, color, dimensions);

        encode_png(&img).map_err(|e| GenError::new(ErrorKind::Decode, format!("failed to encode placeholder: {e}")))
    }
}

impl Default for SyntheticEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationEndpoint for SyntheticEndpoint {
    async fn generate(
        &self,
        model: GenModel,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(n) = self.flaky_every {
            if (call + 1) % n == 0 {
                debug!("Synthetic outage on call {}", call);
                return Err(GenError::new(ErrorKind::ServiceUnavailable, "synthetic outage"));
            }
        }

        match model.output_kind() {
            PartKind::Image => {
                info!("Rendering placeholder for '{}' ({} inputs)", request.instruction(), request.inputs().len());
                let png = self.render(call, request)?;
                Ok(GenerationResponse::new(vec![
                    ResponsePart::Text("Placeholder render".to_string()),
                    ResponsePart::inline("image/png", png),
                ]))
            }
            PartKind::Text => Ok(GenerationResponse::new(vec![ResponsePart::Text(format!(
                "Placeholder caption for: {}",
                request.instruction()
            ))])),
            PartKind::Video => Err(GenError::unsupported("video synthesis")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use cv_core::{
        AspectRatio, BatchSpec, ImageSize, Orchestrator, OrchestratorConfig, OutputShape, RetryPolicy, StaggerPolicy,
    };

    use super::*;

    #[tokio::test]
    async fn test_image_response_has_png_part() {
        let endpoint = SyntheticEndpoint::new().with_long_edge(64);
        let request = GenerationRequest::new("a red sneaker")
            .with_shape(OutputShape::new(AspectRatio::Widescreen, ImageSize::OneK));

        let response = endpoint.generate(GenModel::FlashImage, &request).await.unwrap();

        let ResponsePart::Inline { mime_type, data } = response.first_of(PartKind::Image).unwrap() else {
            panic!("expected an inline image part");
        };
        assert_eq!(mime_type, "image/png");
        let decoded = image::load_from_memory(data).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 36));
    }

    #[tokio::test]
    async fn test_text_and_video() {
        let endpoint = SyntheticEndpoint::new();
        let request = GenerationRequest::new("beach day");

        let caption = endpoint.generate(GenModel::FlashText, &request).await.unwrap();
        assert_eq!(caption.parts, vec![ResponsePart::Text("Placeholder caption for: beach day".into())]);

        let video = endpoint.generate(GenModel::Veo, &request).await.unwrap_err();
        assert_eq!(video.kind, ErrorKind::InvalidRequest);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flaky_calls_are_absorbed_by_retries() {
        let endpoint = Arc::new(SyntheticEndpoint::new().with_long_edge(16).with_flaky_every(2));
        let config = OrchestratorConfig {
            retry: RetryPolicy::default(),
            ..OrchestratorConfig::default()
        };
        let orchestrator = Orchestrator::new(endpoint.clone(), config);
        let spec = BatchSpec::new(GenerationRequest::new("green mug")).with_stagger(StaggerPolicy::none());

        let payloads = orchestrator.run_batch(&spec).await.unwrap();

        assert_eq!(payloads.len(), 4);
        assert!(payloads.iter().all(|p| p.mime_type() == Some("image/png")));
        assert!(endpoint.call_count() > 4);
    }
}
