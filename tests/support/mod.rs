#![allow(dead_code)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use memomodel::{
    Criteria, MemoryAdapter, Result, Row, StorageAdapter, StorageContext, Value, WriteOutcome,
    async_trait,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(Value),
    GetBy(Criteria),
    All(Option<Criteria>),
    Insert(Row),
    Update(Value, Row),
    Delete(Value),
}

/// Wraps a `MemoryAdapter` and records every dispatched call.
pub struct RecordingAdapter {
    inner: MemoryAdapter,
    calls: Mutex<Vec<Call>>,
    reject_writes: AtomicBool,
    drop_ids: AtomicBool,
}

impl RecordingAdapter {
    pub fn new(collection: &str) -> Self {
        Self::with_inner(MemoryAdapter::new(collection))
    }

    pub fn with_inner(inner: MemoryAdapter) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            reject_writes: AtomicBool::new(false),
            drop_ids: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &MemoryAdapter {
        &self.inner
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Insert and update payloads, in dispatch order.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Insert(_) | Call::Update(_, _)))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Makes inserts and updates report `success = false`.
    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Makes inserts commit the row but report no identifier.
    pub fn drop_ids(&self, drop: bool) {
        self.drop_ids.store(drop, Ordering::SeqCst);
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StorageAdapter for RecordingAdapter {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn context(&self) -> Result<StorageContext> {
        self.inner.context().await
    }

    async fn get(&self, context: &StorageContext, id: &Value) -> Result<Option<Row>> {
        self.record(Call::Get(id.clone()));
        self.inner.get(context, id).await
    }

    async fn get_by(&self, context: &StorageContext, criteria: &Criteria) -> Result<Option<Row>> {
        self.record(Call::GetBy(criteria.clone()));
        self.inner.get_by(context, criteria).await
    }

    async fn all(&self, context: &StorageContext, criteria: Option<&Criteria>) -> Result<Vec<Row>> {
        self.record(Call::All(criteria.cloned()));
        self.inner.all(context, criteria).await
    }

    async fn insert(&self, context: &StorageContext, fields: &Row) -> Result<WriteOutcome> {
        self.record(Call::Insert(fields.clone()));
        if self.reject_writes.load(Ordering::SeqCst) {
            return Ok(WriteOutcome::failed(true));
        }
        let mut outcome = self.inner.insert(context, fields).await?;
        if self.drop_ids.load(Ordering::SeqCst) {
            outcome.id = None;
        }
        Ok(outcome)
    }

    async fn update(&self, context: &StorageContext, id: &Value, fields: &Row) -> Result<WriteOutcome> {
        self.record(Call::Update(id.clone(), fields.clone()));
        if self.reject_writes.load(Ordering::SeqCst) {
            return Ok(WriteOutcome::failed(false));
        }
        self.inner.update(context, id, fields).await
    }

    async fn delete(&self, context: &StorageContext, id: &Value) -> Result<bool> {
        self.record(Call::Delete(id.clone()));
        self.inner.delete(context, id).await
    }
}
