use crate::endpoint::PartKind;

/// Catalog of hosted models the studios talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenModel {
    #[default]
    FlashImage,
    ProImage,
    FlashText,
    Veo,
}

impl GenModel {
    /// Model name for display
    pub fn name(&self) -> &str {
        match self {
            Self::FlashImage => "Flash Image",
            Self::ProImage => "Pro Image",
            Self::FlashText => "Flash",
            Self::Veo => "Veo",
        }
    }

    /// Model ID for API communication
    pub fn id(&self) -> &str {
        match self {
            Self::FlashImage => "gemini-2.5-flash-image",
            Self::ProImage => "gemini-3-pro-image-preview",
            Self::FlashText => "gemini-2.5-flash",
            Self::Veo => "veo-3.1-fast-generate-preview",
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Self::FlashImage => "Fast image editing and composition",
            Self::ProImage => "Higher fidelity images, supports 2K and 4K output",
            Self::FlashText => "Captions and short copy",
            Self::Veo => "Short video clips from a still and a prompt",
        }
    }

    /// Kind of response part a request to this model is expected to yield
    pub fn output_kind(&self) -> PartKind {
        match self {
            Self::FlashImage | Self::ProImage => PartKind::Image,
            Self::FlashText => PartKind::Text,
            Self::Veo => PartKind::Video,
        }
    }

    /// Video models answer with an operation that has to be polled
    pub fn is_long_running(&self) -> bool {
        matches!(self, Self::Veo)
    }

    /// Estimated generation time in seconds
    pub fn estimated_time_secs(&self) -> u32 {
        match self {
            Self::FlashImage => 10,
            Self::ProImage => 25,
            Self::FlashText => 3,
            Self::Veo => 90,
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::all().into_iter().find(|model| model.id() == id)
    }

    /// All available models
    pub fn all() -> [GenModel; 4] {
        [Self::FlashImage, Self::ProImage, Self::FlashText, Self::Veo]
    }
}
