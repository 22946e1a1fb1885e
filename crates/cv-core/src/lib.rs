pub mod error;
pub mod payload;
pub mod request;
pub mod slot;
pub mod endpoint;
pub mod retry;
pub mod poll;
pub mod orchestrator;
mod pipeline;
mod batch;
mod sequential;
mod video;
mod model_types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use endpoint::{GenerationEndpoint, GenerationResponse, OperationHandle, OperationStatus, PartKind, ResponsePart};
pub use error::{Classify, ErrorKind, GenError, RequestError, SlotError};
pub use model_types::GenModel;
pub use orchestrator::{Orchestrator, OrchestratorConfig};
pub use payload::{InputPayload, Payload, PayloadError};
pub use pipeline::select_first;
pub use poll::{PollError, PollPolicy, poll_until};
pub use request::{AspectRatio, BatchSpec, GenerationRequest, ImageSize, OutputShape, StaggerPolicy};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use sequential::{LineItemSpec, SequentialRun};
pub use slot::{BatchResult, LineItem, SlotFailure, SlotResult};
