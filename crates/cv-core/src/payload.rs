use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("not a data URI")]
    NotDataUri,

    #[error("data URI is not base64 encoded")]
    NotBase64,

    #[error("invalid base64 content: {0}")]
    InvalidBase64(String),

    #[error("payload is text, not binary data")]
    NotBinary,
}

/// One input blob handed to the endpoint. Position within a request carries meaning
/// (subject first, then references, then background).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPayload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl InputPayload {
    pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            mime_type: mime_type.into(),
            data,
        }
    }

    /// Accepts the `data:<mime>;base64,<content>` strings a view layer usually holds.
    pub fn from_data_uri(uri: &str) -> Result<Self, PayloadError> {
        let (mime_type, data) = decode_data_uri(uri)?;
        Ok(Self { mime_type, data })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.data)
    }
}

/// A self-contained result a renderer can use as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Payload {
    DataUri(String),
    Text(String),
}

impl Payload {
    pub fn data_uri(mime_type: &str, data: &[u8]) -> Self {
        Self::DataUri(format!("data:{mime_type};base64,{}", STANDARD.encode(data)))
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::DataUri(uri) => uri,
            Self::Text(text) => text,
        }
    }

    pub fn mime_type(&self) -> Option<&str> {
        match self {
            Self::DataUri(uri) => uri
                .strip_prefix("data:")
                .and_then(|rest| rest.split_once(';'))
                .map(|(mime, _)| mime),
            Self::Text(_) => None,
        }
    }

    /// Decodes a data URI payload back into its media type and bytes.
    pub fn decode(&self) -> Result<(String, Vec<u8>), PayloadError> {
        match self {
            Self::DataUri(uri) => decode_data_uri(uri),
            Self::Text(_) => Err(PayloadError::NotBinary),
        }
    }
}

fn decode_data_uri(uri: &str) -> Result<(String, Vec<u8>), PayloadError> {
    let rest = uri.strip_prefix("data:").ok_or(PayloadError::NotDataUri)?;
    let (header, content) = rest.split_once(',').ok_or(PayloadError::NotDataUri)?;
    let mime_type = header.strip_suffix(";base64").ok_or(PayloadError::NotBase64)?;

    let data = STANDARD
        .decode(content.trim())
        .map_err(|e| PayloadError::InvalidBase64(e.to_string()))?;

    Ok((mime_type.to_string(), data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri_encoding() {
        let payload = Payload::data_uri("image/png", b"png!");
        assert_eq!(payload.as_str(), "data:image/png;base64,cG5nIQ==");
        assert_eq!(payload.mime_type(), Some("image/png"));
        assert_eq!(payload.decode().unwrap(), ("image/png".to_string(), b"png!".to_vec()));
    }

    #[test]
    fn test_input_from_data_uri() {
        let input = InputPayload::from_data_uri("data:image/jpeg;base64,/9j/").unwrap();
        assert_eq!(input.mime_type, "image/jpeg");
        assert_eq!(input.data, vec![0xff, 0xd8, 0xff]);
        assert_eq!(input.to_base64(), "/9j/");
    }

    #[test]
    fn test_rejects_malformed_uris() {
        assert_eq!(InputPayload::from_data_uri("image/png;base64,AAAA"), Err(PayloadError::NotDataUri));
        assert_eq!(InputPayload::from_data_uri("data:text/plain,hello"), Err(PayloadError::NotBase64));
        assert!(matches!(
            InputPayload::from_data_uri("data:image/png;base64,@@@"),
            Err(PayloadError::InvalidBase64(_))
        ));
    }

    #[test]
    fn test_text_payload() {
        let caption = Payload::text("golden hour on the pier");
        assert_eq!(caption.mime_type(), None);
        assert_eq!(caption.decode(), Err(PayloadError::NotBinary));
        assert_eq!(
            serde_json::to_value(&caption).unwrap(),
            serde_json::json!({"type": "text", "value": "golden hour on the pier"})
        );
    }
}
