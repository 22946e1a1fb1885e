use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, GenError, SlotError};
use crate::payload::Payload;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl SlotFailure {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn empty_output() -> Self {
        Self::new(ErrorKind::EmptyOutput, "the model returned no usable output")
    }

    pub fn cancelled() -> Self {
        GenError::cancelled().into()
    }
}

impl From<GenError> for SlotFailure {
    fn from(err: GenError) -> Self {
        Self {
            kind: err.kind,
            message: err.message,
        }
    }
}

/// State of one slot. Moves from `Pending` to a terminal state exactly once.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum SlotResult<T> {
    #[default]
    Pending,
    Succeeded(T),
    Failed(SlotFailure),
}

impl<T> SlotResult<T> {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }

    pub fn succeeded(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&SlotFailure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    pub fn into_succeeded(self) -> Option<T> {
        match self {
            Self::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn icon(&self) -> &str {
        match self {
            Self::Pending => "⏳",
            Self::Succeeded(_) => "✅",
            Self::Failed(_) => "❌",
        }
    }
}

impl<T> From<Result<Option<T>, SlotFailure>> for SlotResult<T> {
    /// Empty output is a terminal failure once it has to be shown per slot.
    fn from(outcome: Result<Option<T>, SlotFailure>) -> Self {
        match outcome {
            Ok(Some(value)) => Self::Succeeded(value),
            Ok(None) => Self::Failed(SlotFailure::empty_output()),
            Err(failure) => Self::Failed(failure),
        }
    }
}

/// Ordered slots of one batch; index `i` always belongs to the `i`-th issued request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult<T> {
    slots: Vec<SlotResult<T>>,
}

impl<T> BatchResult<T> {
    pub fn pending(width: usize) -> Self {
        Self {
            slots: (0..width).map(|_| SlotResult::Pending).collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[SlotResult<T>] {
        &self.slots
    }

    pub fn get(&self, index: usize) -> Option<&SlotResult<T>> {
        self.slots.get(index)
    }

    /// Moves a pending slot into its terminal state. Settled slots never change again.
    pub fn settle(&mut self, index: usize, result: SlotResult<T>) -> Result<(), SlotError> {
        let width = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(SlotError::OutOfRange { index, width })?;

        if slot.is_terminal() {
            return Err(SlotError::AlreadySettled { index });
        }
        if result.is_pending() {
            return Err(SlotError::NotTerminal { index });
        }

        *slot = result;
        Ok(())
    }

    pub fn is_done(&self) -> bool {
        self.slots.iter().all(SlotResult::is_terminal)
    }

    pub fn settled_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_terminal()).count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.slots.iter().filter(|s| s.succeeded().is_some()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.slots.iter().filter(|s| s.failure().is_some()).count()
    }

    /// Successful values in slot order.
    pub fn successes(&self) -> Vec<&T> {
        self.slots.iter().filter_map(SlotResult::succeeded).collect()
    }

    pub fn into_successes(self) -> Vec<T> {
        self.slots.into_iter().filter_map(SlotResult::into_succeeded).collect()
    }
}

/// One named entry of a sequential run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub instruction: String,
    pub result: SlotResult<Payload>,
}

impl LineItem {
    pub fn pending(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            result: SlotResult::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_is_one_way() {
        let mut batch: BatchResult<u8> = BatchResult::pending(3);
        assert!(!batch.is_done());

        batch.settle(2, SlotResult::Succeeded(7)).unwrap();
        assert_eq!(
            batch.settle(2, SlotResult::Failed(SlotFailure::empty_output())),
            Err(SlotError::AlreadySettled { index: 2 })
        );
        assert_eq!(batch.get(2), Some(&SlotResult::Succeeded(7)));

        assert_eq!(batch.settle(0, SlotResult::Pending), Err(SlotError::NotTerminal { index: 0 }));
        assert_eq!(
            batch.settle(3, SlotResult::Succeeded(1)),
            Err(SlotError::OutOfRange { index: 3, width: 3 })
        );
    }

    #[test]
    fn test_counts_and_order() {
        let mut batch = BatchResult::pending(4);
        batch.settle(3, SlotResult::Succeeded("d")).unwrap();
        batch.settle(1, SlotResult::Failed(SlotFailure::new(ErrorKind::ServerError, "boom"))).unwrap();
        batch.settle(0, SlotResult::Succeeded("a")).unwrap();

        assert_eq!(batch.settled_count(), 3);
        assert_eq!(batch.succeeded_count(), 2);
        assert_eq!(batch.failed_count(), 1);
        assert_eq!(batch.successes(), vec![&"a", &"d"]);
        assert!(!batch.is_done());

        batch.settle(2, SlotResult::Failed(SlotFailure::empty_output())).unwrap();
        assert!(batch.is_done());
        assert_eq!(batch.into_successes(), vec!["a", "d"]);
    }

    #[test]
    fn test_outcome_conversion() {
        let ok: SlotResult<u8> = Ok(Some(1)).into();
        assert_eq!(ok, SlotResult::Succeeded(1));

        let empty: SlotResult<u8> = Ok(None).into();
        assert_eq!(empty.failure().map(|f| f.kind), Some(ErrorKind::EmptyOutput));

        let failed: SlotResult<u8> = Err(SlotFailure::cancelled()).into();
        assert_eq!(failed.failure().map(|f| f.kind), Some(ErrorKind::Cancelled));
        assert_eq!(failed.icon(), "❌");
    }

    #[test]
    fn test_line_item_serializes_for_the_view_layer() {
        let mut item = LineItem::pending("tote bag");
        assert_eq!(
            serde_json::to_value(&item).unwrap(),
            serde_json::json!({"instruction": "tote bag", "result": {"status": "pending"}})
        );

        item.result = SlotResult::Failed(SlotFailure::new(ErrorKind::RateLimited, "slow down"));
        assert_eq!(
            serde_json::to_value(&item).unwrap()["result"],
            serde_json::json!({"status": "failed", "detail": {"kind": "rate_limited", "message": "slow down"}})
        );
    }
}
