use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use cv_core::{AspectRatio, ErrorKind, GenError, GenerationRequest, PartKind, ResponsePart};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: u16,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictRequest {
    pub instances: Vec<VideoInstance>,
    pub parameters: VideoParameters,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VideoInstance {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<VideoImage>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoImage {
    pub bytes_base64_encoded: String,
    pub mime_type: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VideoParameters {
    pub aspect_ratio: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OperationResponse {
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<ApiErrorDetail>,
    #[serde(default)]
    pub response: Option<OperationResult>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub generate_video_response: Option<GenerateVideoResponse>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateVideoResponse {
    #[serde(default)]
    pub generated_samples: Vec<GeneratedSample>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GeneratedSample {
    pub video: VideoRef,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VideoRef {
    pub uri: String,
}

impl GenerateContentRequest {
    /// Inputs go first in request order, the instruction last.
    pub fn from_request(request: &GenerationRequest, output: PartKind) -> Self {
        let mut parts: Vec<Part> = request
            .inputs()
            .iter()
            .map(|input| Part {
                text: None,
                inline_data: Some(InlineData {
                    mime_type: input.mime_type.clone(),
                    data: input.to_base64(),
                }),
            })
            .collect();
        parts.push(Part {
            text: Some(request.instruction().to_string()),
            inline_data: None,
        });

        let generation_config = match output {
            PartKind::Image => Some(GenerationConfig {
                response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
                image_config: Some(ImageConfig {
                    aspect_ratio: request.shape().aspect_ratio.as_str().to_string(),
                    image_size: request.shape().image_size.as_str().to_string(),
                }),
            }),
            PartKind::Text | PartKind::Video => None,
        };

        Self {
            contents: vec![Content { parts }],
            generation_config,
        }
    }
}

impl GenerateContentResponse {
    /// Flattens every candidate's parts in order. Parts that fail to decode are dropped
    /// rather than failing the whole response.
    pub fn into_parts(self) -> Vec<ResponsePart> {
        self.candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| match (part.inline_data, part.text) {
                (Some(inline), _) => STANDARD
                    .decode(inline.data.as_bytes())
                    .ok()
                    .map(|data| ResponsePart::inline(inline.mime_type, data)),
                (None, Some(text)) => Some(ResponsePart::Text(text)),
                (None, None) => None,
            })
            .collect()
    }
}

impl PredictRequest {
    pub fn from_request(request: &GenerationRequest) -> Self {
        let image = request.inputs().first().map(|input| VideoImage {
            bytes_base64_encoded: input.to_base64(),
            mime_type: input.mime_type.clone(),
        });

        // the video model only offers landscape and portrait framing
        let aspect_ratio = match request.shape().aspect_ratio {
            AspectRatio::Portrait | AspectRatio::Story => AspectRatio::Story,
            _ => AspectRatio::Widescreen,
        };

        Self {
            instances: vec![VideoInstance {
                prompt: request.instruction().to_string(),
                image,
            }],
            parameters: VideoParameters {
                aspect_ratio: aspect_ratio.as_str().to_string(),
            },
        }
    }
}

impl OperationResponse {
    pub fn video_uri(&self) -> Option<&str> {
        self.response
            .as_ref()?
            .generate_video_response
            .as_ref()?
            .generated_samples
            .first()
            .map(|sample| sample.video.uri.as_str())
    }
}

impl From<ApiErrorDetail> for GenError {
    fn from(detail: ApiErrorDetail) -> Self {
        let kind = match detail.status.as_deref() {
            Some("RESOURCE_EXHAUSTED") => ErrorKind::RateLimited,
            Some("UNAVAILABLE") => ErrorKind::ServiceUnavailable,
            Some("INTERNAL") => ErrorKind::ServerError,
            Some("DEADLINE_EXCEEDED") => ErrorKind::Timeout,
            Some("PERMISSION_DENIED") | Some("UNAUTHENTICATED") => ErrorKind::Unauthorized,
            Some("INVALID_ARGUMENT") | Some("FAILED_PRECONDITION") => ErrorKind::InvalidRequest,
            _ if detail.code > 0 => ErrorKind::from_status(detail.code),
            _ => ErrorKind::Other,
        };
        GenError::new(kind, detail.message)
    }
}
