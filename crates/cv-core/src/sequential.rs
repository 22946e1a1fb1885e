use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::error::RequestError;
use crate::orchestrator::Orchestrator;
use crate::request::GenerationRequest;
use crate::slot::{LineItem, SlotResult};

pub const DEFAULT_ITEM_TEMPLATE: &str = "{instruction}: {item}";

/// A list of distinct items rendered one after another against a shared base request.
#[derive(Debug, Clone, PartialEq)]
pub struct LineItemSpec {
    pub base: GenerationRequest,
    pub items: Vec<String>,
    /// `{instruction}` expands to the base instruction, `{item}` to the current item.
    pub template: String,
}

impl LineItemSpec {
    pub fn new(base: GenerationRequest, items: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            base,
            items: items.into_iter().map(Into::into).collect(),
            template: DEFAULT_ITEM_TEMPLATE.to_string(),
        }
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    pub fn request_for(&self, item: &str) -> GenerationRequest {
        let instruction = self
            .template
            .replace("{instruction}", self.base.instruction())
            .replace("{item}", item);
        self.base.derive(instruction)
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.items.is_empty() {
            return Err(RequestError::NoItems);
        }
        if let Some(index) = self.items.iter().position(|item| item.trim().is_empty()) {
            return Err(RequestError::BlankItem { index });
        }
        self.base.validate()
    }
}

/// Handle to a line-item run executing on its own task.
pub struct SequentialRun {
    pub updates: watch::Receiver<Vec<LineItem>>,
    pub handle: JoinHandle<Result<Vec<LineItem>, RequestError>>,
}

impl Orchestrator {
    /// Processes items strictly in order, one at a time. `publish` sees the full collection
    /// once with everything pending and again after every item settles. A failed item is
    /// recorded with its message and the run moves on to the next one.
    pub async fn run_sequential(
        &self,
        spec: &LineItemSpec,
        mut publish: impl FnMut(&[LineItem]),
    ) -> Result<Vec<LineItem>, RequestError> {
        spec.validate()?;

        let mut items: Vec<LineItem> = spec.items.iter().map(LineItem::pending).collect();
        publish(&items);

        for (index, name) in spec.items.iter().enumerate() {
            let request = spec.request_for(name);
            let result = SlotResult::from(self.generate_slot(self.config.image_model, &request).await);

            if let Some(failure) = result.failure() {
                warn!(index, item = %name, kind = %failure.kind, "line item failed: {}", failure.message);
            }
            items[index].result = result;
            publish(&items);
        }

        let succeeded = items.iter().filter(|item| item.result.succeeded().is_some()).count();
        info!(items = items.len(), succeeded, "line-item run settled");
        Ok(items)
    }

    /// Runs [`run_sequential`](Self::run_sequential) on a spawned task and hands back a
    /// watch receiver carrying every published snapshot.
    pub fn spawn_sequential(&self, spec: LineItemSpec) -> Result<SequentialRun, RequestError> {
        spec.validate()?;

        let initial: Vec<LineItem> = spec.items.iter().map(LineItem::pending).collect();
        let (tx, updates) = watch::channel(initial);
        let orchestrator = self.clone();

        let handle = tokio::spawn(async move {
            orchestrator
                .run_sequential(&spec, |items| {
                    tx.send_replace(items.to_vec());
                })
                .await
        });

        Ok(SequentialRun { updates, handle })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::error::ErrorKind;
    use crate::orchestrator::OrchestratorConfig;
    use crate::payload::{InputPayload, Payload};
    use crate::testing::{ScriptedEndpoint, Step};

    fn spec(items: &[&str]) -> LineItemSpec {
        let base = GenerationRequest::new("place the logo")
            .with_input(InputPayload::new("image/png", vec![9]));
        LineItemSpec::new(base, items.iter().copied()).with_template("{instruction} on a {item}")
    }

    fn scripted() -> Arc<ScriptedEndpoint> {
        Arc::new(ScriptedEndpoint::new(|_, request| {
            if request.instruction().ends_with(" B") {
                Step::fail(ErrorKind::InvalidRequest).after(Duration::from_millis(50))
            } else {
                let tag = request.instruction().as_bytes()[request.instruction().len() - 1];
                Step::image(vec![tag]).after(Duration::from_millis(100))
            }
        }))
    }

    #[test]
    fn test_template_expansion() {
        let spec = spec(&["mug"]);
        let request = spec.request_for("mug");
        assert_eq!(request.instruction(), "place the logo on a mug");
        assert_eq!(request.inputs(), spec.base.inputs());

        let default = LineItemSpec::new(GenerationRequest::new("mockup"), ["tote"]);
        assert_eq!(default.request_for("tote").instruction(), "mockup: tote");
    }

    #[test]
    fn test_validation() {
        assert_eq!(spec(&[]).validate(), Err(RequestError::NoItems));
        assert_eq!(spec(&["mug", " "]).validate(), Err(RequestError::BlankItem { index: 1 }));
        assert!(spec(&["mug"]).validate().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_is_isolated_and_order_is_strict() {
        let endpoint = scripted();
        let orchestrator = Orchestrator::new(endpoint.clone(), OrchestratorConfig::default());
        let mut snapshots: Vec<Vec<LineItem>> = Vec::new();

        let items = orchestrator
            .run_sequential(&spec(&["A", "B", "C"]), |items| snapshots.push(items.to_vec()))
            .await
            .unwrap();

        assert_eq!(items.len(), 3);
        assert_eq!(items[0].result, SlotResult::Succeeded(Payload::data_uri("image/png", b"A")));
        let failure = items[1].result.failure().unwrap();
        assert_eq!(failure.kind, ErrorKind::InvalidRequest);
        assert!(!failure.message.is_empty());
        assert_eq!(items[2].result, SlotResult::Succeeded(Payload::data_uri("image/png", b"C")));

        let calls = endpoint.calls();
        let order: Vec<&str> = calls.iter().map(|call| call.instruction.as_str()).collect();
        assert_eq!(order, vec!["place the logo on a A", "place the logo on a B", "place the logo on a C"]);
        assert!(calls[2].started_at >= calls[1].finished_at.unwrap());
        assert!(calls[1].started_at >= calls[0].finished_at.unwrap());

        // initial all-pending snapshot, then one per settled item, filling left to right
        let settled: Vec<usize> = snapshots
            .iter()
            .map(|snapshot| snapshot.iter().filter(|item| item.result.is_terminal()).count())
            .collect();
        assert_eq!(settled, vec![0, 1, 2, 3]);
        assert!(snapshots[2][2].result.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_run_streams_snapshots() {
        let orchestrator = Orchestrator::new(scripted(), OrchestratorConfig::default());

        let mut run = orchestrator.spawn_sequential(spec(&["A", "C"])).unwrap();
        assert!(run.updates.borrow().iter().all(|item| item.result.is_pending()));

        let items = run.handle.await.unwrap().unwrap();
        assert!(items.iter().all(|item| item.result.succeeded().is_some()));

        run.updates.changed().await.ok();
        assert_eq!(*run.updates.borrow(), items);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_rejects_invalid_spec() {
        let orchestrator = Orchestrator::new(scripted(), OrchestratorConfig::default());
        assert!(matches!(orchestrator.spawn_sequential(spec(&[])), Err(RequestError::NoItems)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_fails_remaining_items() {
        let endpoint = scripted();
        let orchestrator = Orchestrator::new(endpoint.clone(), OrchestratorConfig::default());

        let canceller = orchestrator.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(120)).await;
            canceller.cancel();
        });

        let items = orchestrator
            .run_sequential(&spec(&["A", "C", "D"]), |_| {})
            .await
            .unwrap();

        assert!(items[0].result.succeeded().is_some());
        assert_eq!(items[1].result.failure().map(|f| f.kind), Some(ErrorKind::Cancelled));
        assert_eq!(items[2].result.failure().map(|f| f.kind), Some(ErrorKind::Cancelled));
        assert_eq!(endpoint.call_count(), 2);
    }
}
