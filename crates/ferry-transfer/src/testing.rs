//! Shared fixtures for unit tests.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::resources::ResourceBatch;
use crate::sql::{Row, SqlParam};
use crate::transfer::{TransferSink, TransferState};

/// Sink that keeps every batch it receives.
#[derive(Default)]
pub struct RecordingSink {
    pub batches: Vec<ResourceBatch>,
}

#[async_trait]
impl TransferSink for RecordingSink {
    async fn on_batch(&mut self, batch: ResourceBatch, _state: &mut TransferState) -> Result<()> {
        self.batches.push(batch);
        Ok(())
    }
}

pub fn row(value: Value) -> Row {
    value.as_object().cloned().unwrap()
}

/// Applies `LIMIT $1 OFFSET $2` to `rows`.
pub fn page(rows: &[Row], params: &[SqlParam]) -> Vec<Row> {
    let int = |i: usize| match params.get(i) {
        Some(SqlParam::Int(n)) => usize::try_from(*n).unwrap(),
        other => panic!("expected integer parameter, got {:?}", other),
    };
    rows.iter().skip(int(1)).take(int(0)).cloned().collect()
}
