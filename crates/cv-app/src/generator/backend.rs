pub mod config;
mod schemas;

use async_trait::async_trait;
use cv_core::{
    ErrorKind, GenError, GenModel, GenerationEndpoint, GenerationRequest, GenerationResponse, OperationHandle,
    OperationStatus, ResponsePart,
};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::AppError;
use crate::generator::backend::config::GenBackendConfig;
use crate::generator::backend::schemas::{
    ApiErrorBody, GenerateContentRequest, GenerateContentResponse, OperationResponse, PredictRequest,
};

const API_VERSION: &str = "v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// HTTP client for the hosted generation API.
pub struct GenBackend {
    config: GenBackendConfig,
    client: Client,
}

impl GenBackend {
    pub fn new(config: GenBackendConfig) -> Result<Self, AppError> {
        let client = Client::builder().connect_timeout(config.connect_timeout).build()?;

        info!("Generation backend at {}", config.base_url);

        Ok(Self { config, client })
    }

    fn model_url(&self, model: GenModel, method: &str) -> String {
        format!("{}/{API_VERSION}/models/{}:{method}", self.config.base_url, model.id())
    }

    fn operation_url(&self, handle: &OperationHandle) -> String {
        format!("{}/{API_VERSION}/{}", self.config.base_url, handle.name.trim_start_matches('/'))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header(API_KEY_HEADER, key),
            None => builder,
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, GenError> {
        let response = self.authorize(builder).send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        response.json().await.map_err(transport_error)
    }

    async fn download(&self, uri: &str) -> Result<Vec<u8>, GenError> {
        debug!("Downloading {}", uri);
        let response = self.authorize(self.client.get(uri)).send().await.map_err(transport_error)?;
        let response = check_status(response).await?;
        let bytes = response.bytes().await.map_err(transport_error)?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl GenerationEndpoint for GenBackend {
    async fn generate(
        &self,
        model: GenModel,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenError> {
        let body = GenerateContentRequest::from_request(request, model.output_kind());
        debug!("generateContent on {} with {} inputs", model.id(), request.inputs().len());

        let response: GenerateContentResponse = self
            .send_json(self.client.post(self.model_url(model, "generateContent")).json(&body))
            .await?;

        Ok(GenerationResponse::new(response.into_parts()))
    }

    async fn start_operation(
        &self,
        model: GenModel,
        request: &GenerationRequest,
    ) -> Result<OperationHandle, GenError> {
        if !model.is_long_running() {
            return Err(GenError::unsupported(&format!("long-running {}", model.name())));
        }

        let body = PredictRequest::from_request(request);
        let operation: OperationResponse = self
            .send_json(self.client.post(self.model_url(model, "predictLongRunning")).json(&body))
            .await?;

        info!("Started operation {}", operation.name);
        Ok(OperationHandle { name: operation.name })
    }

    async fn poll_operation(&self, handle: &OperationHandle) -> Result<OperationStatus, GenError> {
        let operation: OperationResponse = self.send_json(self.client.get(self.operation_url(handle))).await?;

        if !operation.done {
            debug!("Operation {} still running", handle.name);
            return Ok(OperationStatus::Running);
        }

        if let Some(detail) = operation.error.clone() {
            warn!("Operation {} failed: {}", handle.name, detail.message);
            return Ok(OperationStatus::Failed(detail.into()));
        }

        let parts = match operation.video_uri() {
            Some(uri) => vec![ResponsePart::inline("video/mp4", self.download(uri).await?)],
            None => Vec::new(),
        };
        Ok(OperationStatus::Done(GenerationResponse::new(parts)))
    }
}

async fn check_status(response: Response) -> Result<Response, GenError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(error_from_body(status.as_u16(), &body))
}

/// Prefers the API's own error envelope. The HTTP status decides whenever the envelope
/// is missing or says nothing classifiable.
fn error_from_body(status: u16, body: &str) -> GenError {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(envelope) => {
            let mut err = GenError::from(envelope.error);
            if err.kind == ErrorKind::Other {
                err.kind = ErrorKind::from_status(status);
            }
            err
        }
        Err(_) => GenError::new(ErrorKind::from_status(status), format!("HTTP {status}: {}", body.trim())),
    }
}

fn transport_error(err: reqwest::Error) -> GenError {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_decode() {
        ErrorKind::Decode
    } else if let Some(status) = err.status() {
        ErrorKind::from_status(status.as_u16())
    } else {
        ErrorKind::Transport
    };
    GenError::new(kind, err.to_string())
}
