use tracing::{info, warn};

use crate::endpoint::{OperationStatus, PartKind};
use crate::error::{ErrorKind, GenError};
use crate::orchestrator::Orchestrator;
use crate::payload::Payload;
use crate::pipeline::select_first;
use crate::poll::{PollError, poll_until};
use crate::request::GenerationRequest;
use crate::retry::retry_with_backoff;
use crate::slot::SlotFailure;

impl Orchestrator {
    /// Starts a long-running video job and polls it to completion. Same outcome contract as
    /// [`generate_slot`](Self::generate_slot): `Ok(None)` when the finished job carries no video.
    pub async fn generate_video(&self, request: &GenerationRequest) -> Result<Option<Payload>, SlotFailure> {
        let model = self.config.video_model;
        let policy = self.config.retry;

        let started = self
            .cancellable(retry_with_backoff(&policy, || {
                self.bounded(self.endpoint.start_operation(model, request))
            }))
            .await;
        let handle = started.map_err(|err| {
            warn!(model = model.id(), kind = %err.kind, "could not start video job: {}", err.message);
            SlotFailure::from(err)
        })?;
        info!(operation = %handle.name, "video job started");

        let (operation, retry) = (&handle, &policy);
        let status = poll_until(
            &self.config.poll,
            &self.cancel,
            move || {
                self.cancellable(retry_with_backoff(retry, move || {
                    self.bounded(self.endpoint.poll_operation(operation))
                }))
            },
            OperationStatus::is_terminal,
        )
        .await;

        match status {
            Ok(OperationStatus::Done(response)) => Ok(select_first(response, PartKind::Video)),
            Ok(OperationStatus::Failed(err)) | Err(PollError::Failed(err)) => {
                warn!(operation = %handle.name, kind = %err.kind, "video job failed: {}", err.message);
                Err(err.into())
            }
            Ok(OperationStatus::Running) => Err(SlotFailure::new(ErrorKind::Other, "operation still running")),
            Err(PollError::Cancelled) => Err(SlotFailure::cancelled()),
            Err(PollError::DeadlineExceeded(limit)) => Err(GenError::timeout(limit).into()),
        }
    }
}
