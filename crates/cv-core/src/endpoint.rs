use async_trait::async_trait;

use crate::error::GenError;
use crate::model_types::GenModel;
use crate::payload::Payload;
use crate::request::GenerationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartKind {
    Image,
    Video,
    Text,
}

impl PartKind {
    pub fn matches(&self, part: &ResponsePart) -> bool {
        part.kind() == Some(*self)
    }
}

/// One typed part of an endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponsePart {
    Inline { mime_type: String, data: Vec<u8> },
    Text(String),
}

impl ResponsePart {
    pub fn inline(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self::Inline {
            mime_type: mime_type.into(),
            data,
        }
    }

    pub fn kind(&self) -> Option<PartKind> {
        match self {
            Self::Inline { mime_type, .. } if mime_type.starts_with("image/") => Some(PartKind::Image),
            Self::Inline { mime_type, .. } if mime_type.starts_with("video/") => Some(PartKind::Video),
            Self::Inline { .. } => None,
            Self::Text(_) => Some(PartKind::Text),
        }
    }

    pub fn into_payload(self) -> Payload {
        match self {
            Self::Inline { mime_type, data } => Payload::data_uri(&mime_type, &data),
            Self::Text(text) => Payload::Text(text),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub parts: Vec<ResponsePart>,
}

impl GenerationResponse {
    pub fn new(parts: Vec<ResponsePart>) -> Self {
        Self { parts }
    }

    pub fn first_of(&self, kind: PartKind) -> Option<&ResponsePart> {
        self.parts.iter().find(|part| kind.matches(part))
    }
}

/// Reference to a long-running job on the endpoint side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Running,
    Done(GenerationResponse),
    Failed(GenError),
}

impl OperationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// The hosted synthesis service. Implementations classify every failure so the
/// retry loop can tell transient conditions from terminal ones.
#[async_trait]
pub trait GenerationEndpoint: Send + Sync {
    async fn generate(
        &self,
        model: GenModel,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenError>;

    async fn start_operation(
        &self,
        model: GenModel,
        _request: &GenerationRequest,
    ) -> Result<OperationHandle, GenError> {
        Err(GenError::unsupported(&format!("long-running {}", model.name())))
    }

    async fn poll_operation(&self, _handle: &OperationHandle) -> Result<OperationStatus, GenError> {
        Err(GenError::unsupported("operation polling"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_kinds() {
        assert_eq!(ResponsePart::inline("image/webp", vec![1]).kind(), Some(PartKind::Image));
        assert_eq!(ResponsePart::inline("video/mp4", vec![1]).kind(), Some(PartKind::Video));
        assert_eq!(ResponsePart::inline("application/pdf", vec![1]).kind(), None);
        assert_eq!(ResponsePart::Text("hi".into()).kind(), Some(PartKind::Text));
    }

    #[test]
    fn test_first_of_skips_other_kinds() {
        let response = GenerationResponse::new(vec![
            ResponsePart::Text("here you go".into()),
            ResponsePart::inline("image/png", vec![1]),
            ResponsePart::inline("image/png", vec![2]),
        ]);
        assert_eq!(response.first_of(PartKind::Image), Some(&ResponsePart::inline("image/png", vec![1])));
        assert_eq!(response.first_of(PartKind::Video), None);
    }
}
