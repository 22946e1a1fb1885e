use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RequestError;
use crate::payload::InputPayload;

pub const DEFAULT_BATCH_WIDTH: usize = 4;
pub const DEFAULT_STAGGER: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "3:4")]
    Portrait,
    #[serde(rename = "4:3")]
    Landscape,
    #[serde(rename = "9:16")]
    Story,
    #[serde(rename = "16:9")]
    Widescreen,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Square => "1:1",
            Self::Portrait => "3:4",
            Self::Landscape => "4:3",
            Self::Story => "9:16",
            Self::Widescreen => "16:9",
        }
    }

    /// Width over height.
    pub fn ratio(&self) -> f32 {
        match self {
            Self::Square => 1.0,
            Self::Portrait => 3.0 / 4.0,
            Self::Landscape => 4.0 / 3.0,
            Self::Story => 9.0 / 16.0,
            Self::Widescreen => 16.0 / 9.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1K")]
    OneK,
    #[serde(rename = "2K")]
    TwoK,
    #[serde(rename = "4K")]
    FourK,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OneK => "1K",
            Self::TwoK => "2K",
            Self::FourK => "4K",
        }
    }

    /// Pixel length of the longer edge.
    pub fn long_edge(&self) -> u32 {
        match self {
            Self::OneK => 1024,
            Self::TwoK => 2048,
            Self::FourK => 4096,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputShape {
    #[serde(default)]
    pub aspect_ratio: AspectRatio,
    #[serde(default)]
    pub image_size: ImageSize,
}

impl OutputShape {
    pub fn new(aspect_ratio: AspectRatio, image_size: ImageSize) -> Self {
        Self {
            aspect_ratio,
            image_size,
        }
    }

    /// Pixel dimensions implied by the shape, longer edge first at `long_edge`.
    pub fn dimensions(&self, long_edge: u32) -> (u32, u32) {
        let ratio = self.aspect_ratio.ratio();
        if ratio >= 1.0 {
            (long_edge, ((long_edge as f32) / ratio).round() as u32)
        } else {
            (((long_edge as f32) * ratio).round() as u32, long_edge)
        }
    }
}

/// One unit of work: ordered inputs, an instruction and the requested output shape.
/// Built once by the caller and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    inputs: Vec<InputPayload>,
    instruction: String,
    shape: OutputShape,
}

impl GenerationRequest {
    pub fn new(instruction: impl Into<String>) -> Self {
        Self {
            inputs: Vec::new(),
            instruction: instruction.into(),
            shape: OutputShape::default(),
        }
    }

    pub fn with_input(mut self, input: InputPayload) -> Self {
        self.inputs.push(input);
        self
    }

    pub fn with_inputs(mut self, inputs: impl IntoIterator<Item = InputPayload>) -> Self {
        self.inputs.extend(inputs);
        self
    }

    pub fn with_shape(mut self, shape: OutputShape) -> Self {
        self.shape = shape;
        self
    }

    /// Same inputs and shape, different instruction.
    pub fn derive(&self, instruction: impl Into<String>) -> Self {
        Self {
            inputs: self.inputs.clone(),
            instruction: instruction.into(),
            shape: self.shape,
        }
    }

    pub fn inputs(&self) -> &[InputPayload] {
        &self.inputs
    }

    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn shape(&self) -> OutputShape {
        self.shape
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.instruction.trim().is_empty() {
            return Err(RequestError::EmptyInstruction);
        }

        for (index, input) in self.inputs.iter().enumerate() {
            if input.data.is_empty() {
                return Err(RequestError::EmptyInput { index });
            }
            if input.mime_type.trim().is_empty() {
                return Err(RequestError::MissingMediaType { index });
            }
        }

        Ok(())
    }
}

/// Delay applied before issuing later slots of a concurrent batch. Slot 0 never waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaggerPolicy {
    pub increment: Duration,
}

impl StaggerPolicy {
    pub fn new(increment: Duration) -> Self {
        Self { increment }
    }

    pub fn none() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay_for(&self, index: usize) -> Duration {
        self.increment * index as u32
    }
}

impl Default for StaggerPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_STAGGER)
    }
}

/// A request fanned out into `width` redundant slots.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSpec {
    pub request: GenerationRequest,
    pub width: usize,
    pub stagger: StaggerPolicy,
}

impl BatchSpec {
    pub fn new(request: GenerationRequest) -> Self {
        Self {
            request,
            width: DEFAULT_BATCH_WIDTH,
            stagger: StaggerPolicy::default(),
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }

    pub fn with_stagger(mut self, stagger: StaggerPolicy) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.width == 0 {
            return Err(RequestError::ZeroWidth);
        }
        self.request.validate()
    }
}
