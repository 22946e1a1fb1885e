use futures::StreamExt;
use futures::future::join_all;
use futures::stream::FuturesUnordered;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::RequestError;
use crate::orchestrator::Orchestrator;
use crate::payload::Payload;
use crate::request::BatchSpec;
use crate::slot::{BatchResult, SlotFailure, SlotResult};

impl Orchestrator {
    /// Issues `spec.width` copies of the request concurrently and returns the successful
    /// payloads in slot order. Fewer successes than slots, including none at all, is not
    /// an error; whether an empty result deserves a message is up to the caller.
    pub async fn run_batch(&self, spec: &BatchSpec) -> Result<Vec<Payload>, RequestError> {
        spec.validate()?;

        let settled = join_all((0..spec.width).map(|index| self.run_slot(spec, index))).await;
        let payloads: Vec<Payload> = settled.into_iter().flatten().collect();

        info!(
            width = spec.width,
            succeeded = payloads.len(),
            "batch settled"
        );
        Ok(payloads)
    }

    /// Like [`run_batch`](Self::run_batch), but publishes the whole slot collection each
    /// time a slot settles. The first snapshot has every slot pending.
    pub async fn run_batch_observed(
        &self,
        spec: &BatchSpec,
        updates: &watch::Sender<BatchResult<Payload>>,
    ) -> Result<BatchResult<Payload>, RequestError> {
        spec.validate()?;

        let mut batch = BatchResult::pending(spec.width);
        updates.send_replace(batch.clone());

        let mut in_flight: FuturesUnordered<_> = (0..spec.width)
            .map(move |index| async move { (index, self.settle_slot(spec, index).await) })
            .collect();

        while let Some((index, outcome)) = in_flight.next().await {
            if let Err(err) = batch.settle(index, SlotResult::from(outcome)) {
                warn!("dropping slot update: {err}");
                continue;
            }
            debug!(index, settled = batch.settled_count(), width = batch.width(), "slot settled");
            updates.send_replace(batch.clone());
        }

        info!(
            width = batch.width(),
            succeeded = batch.succeeded_count(),
            failed = batch.failed_count(),
            "batch settled"
        );
        Ok(batch)
    }

    async fn run_slot(&self, spec: &BatchSpec, index: usize) -> Option<Payload> {
        self.settle_slot(spec, index).await.ok().flatten()
    }

    async fn settle_slot(&self, spec: &BatchSpec, index: usize) -> Result<Option<Payload>, SlotFailure> {
        let delay = spec.stagger.delay_for(index);
        if !delay.is_zero() {
            if self.cancel.is_cancelled() {
                return Err(SlotFailure::cancelled());
            }
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(SlotFailure::cancelled()),
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.generate_slot(self.config.image_model, &spec.request).await
    }
}
