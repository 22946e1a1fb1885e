//! In-memory endpoint driven by a script, for exercising the orchestrator without a network.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::endpoint::{GenerationEndpoint, GenerationResponse, OperationHandle, OperationStatus, ResponsePart};
use crate::error::{ErrorKind, GenError};
use crate::model_types::GenModel;
use crate::request::GenerationRequest;

/// What the endpoint does for one call: wait, then answer.
#[derive(Debug, Clone)]
pub struct Step {
    pub delay: Duration,
    pub outcome: Result<GenerationResponse, GenError>,
}

impl Step {
    pub fn ok(response: GenerationResponse) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Ok(response),
        }
    }

    pub fn respond(parts: Vec<ResponsePart>) -> Self {
        Self::ok(GenerationResponse::new(parts))
    }

    /// A single PNG part holding `data`.
    pub fn image(data: Vec<u8>) -> Self {
        Self::respond(vec![ResponsePart::inline("image/png", data)])
    }

    pub fn fail(kind: ErrorKind) -> Self {
        Self {
            delay: Duration::ZERO,
            outcome: Err(GenError::new(kind, format!("scripted {kind}"))),
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub index: usize,
    pub model: GenModel,
    pub instruction: String,
    pub started_at: Instant,
    pub finished_at: Option<Instant>,
}

type Handler = dyn Fn(usize, &GenerationRequest) -> Step + Send + Sync;

pub struct ScriptedEndpoint {
    handler: Box<Handler>,
    calls: Mutex<Vec<CallRecord>>,
    operations: Mutex<VecDeque<OperationStatus>>,
    poll_error: Option<ErrorKind>,
    polls: Mutex<usize>,
}

impl ScriptedEndpoint {
    /// `handler` receives the zero-based call index and the request.
    pub fn new(handler: impl Fn(usize, &GenerationRequest) -> Step + Send + Sync + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            operations: Mutex::new(VecDeque::new()),
            poll_error: None,
            polls: Mutex::new(0),
        }
    }

    /// Statuses returned by successive polls. The last one repeats once the queue drains.
    pub fn with_operation(self, statuses: Vec<OperationStatus>) -> Self {
        *self.operations.lock().unwrap() = statuses.into();
        self
    }

    /// Every poll fails with `kind` instead of reporting a status.
    pub fn with_poll_error(mut self, kind: ErrorKind) -> Self {
        self.poll_error = Some(kind);
        self
    }

    pub fn calls(&self) -> Vec<CallRecord> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn poll_count(&self) -> usize {
        *self.polls.lock().unwrap()
    }
}

#[async_trait]
impl GenerationEndpoint for ScriptedEndpoint {
    async fn generate(
        &self,
        model: GenModel,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenError> {
        let index = {
            let mut calls = self.calls.lock().unwrap();
            let index = calls.len();
            calls.push(CallRecord {
                index,
                model,
                instruction: request.instruction().to_string(),
                started_at: Instant::now(),
                finished_at: None,
            });
            index
        };

        let step = (self.handler)(index, request);
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }

        self.calls.lock().unwrap()[index].finished_at = Some(Instant::now());
        step.outcome
    }

    async fn start_operation(
        &self,
        model: GenModel,
        request: &GenerationRequest,
    ) -> Result<OperationHandle, GenError> {
        let index = self.call_count();
        let step = (self.handler)(index, request);
        self.calls.lock().unwrap().push(CallRecord {
            index,
            model,
            instruction: request.instruction().to_string(),
            started_at: Instant::now(),
            finished_at: None,
        });

        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }

        self.calls.lock().unwrap()[index].finished_at = Some(Instant::now());
        step.outcome.map(|_| OperationHandle {
            name: "operations/scripted".to_string(),
        })
    }

    async fn poll_operation(&self, _handle: &OperationHandle) -> Result<OperationStatus, GenError> {
        *self.polls.lock().unwrap() += 1;
        if let Some(kind) = self.poll_error {
            return Err(GenError::new(kind, format!("scripted {kind}")));
        }

        let mut operations = self.operations.lock().unwrap();
        match operations.len() {
            0 => Err(GenError::new(ErrorKind::InvalidRequest, "no operation scripted")),
            1 => Ok(operations[0].clone()),
            _ => Ok(operations.pop_front().unwrap_or(OperationStatus::Running)),
        }
    }
}
