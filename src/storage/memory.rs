use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::config::{IdStrategy, MemoryAdapterConfig};
use super::context::ContextCache;
use super::query::Filter;
use super::snapshot::{CollectionSnapshot, SNAPSHOT_VERSION, SnapshotFile};
use super::{StorageAdapter, StorageContext, WriteOutcome};
use crate::core::{Criteria, ModelError, Result, Row, Value};

/// Backend handle exposed through [`StorageContext`].
#[derive(Debug, Clone)]
pub struct MemoryHandle {
    pub collection: String,
    pub opened_at: DateTime<Utc>,
}

/// Call counters, for observing what the engine dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryAdapterStats {
    pub reads: u64,
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
}

#[derive(Debug, Default)]
struct Counters {
    reads: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
}

/// Rows keyed by insertion sequence, plus an identifier index.
#[derive(Debug, Clone)]
struct Collection {
    next_seq: u64,
    next_id: i64,
    rows: BTreeMap<u64, Row>,
    index: HashMap<Value, u64>,
}

impl Collection {
    fn new() -> Self {
        Self {
            next_seq: 0,
            next_id: 1,
            rows: BTreeMap::new(),
            index: HashMap::new(),
        }
    }

    fn from_snapshot(snapshot: CollectionSnapshot, id_field: &str) -> Self {
        let mut collection = Self::new();
        collection.next_id = snapshot.next_id.max(1);
        for row in snapshot.rows {
            let id = row.get(id_field).cloned().unwrap_or_default();
            collection.push(id, row);
        }
        collection
    }

    fn to_snapshot(&self, name: &str) -> CollectionSnapshot {
        CollectionSnapshot {
            version: SNAPSHOT_VERSION,
            collection: name.to_string(),
            next_id: self.next_id,
            rows: self.rows.values().cloned().collect(),
        }
    }

    fn push(&mut self, id: Value, row: Row) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.rows.insert(seq, row);
        self.index.insert(id, seq);
    }

    fn get(&self, id: &Value) -> Option<&Row> {
        self.index.get(id).and_then(|seq| self.rows.get(seq))
    }

    fn get_mut(&mut self, id: &Value) -> Option<&mut Row> {
        let seq = *self.index.get(id)?;
        self.rows.get_mut(&seq)
    }

    fn remove(&mut self, id: &Value) -> bool {
        match self.index.remove(id) {
            Some(seq) => self.rows.remove(&seq).is_some(),
            None => false,
        }
    }

    fn matching(&self, filter: &Filter) -> Vec<Row> {
        self.rows
            .values()
            .filter(|row| filter.matches(row))
            .cloned()
            .collect()
    }
}

/// In-memory [`StorageAdapter`] holding one collection of rows.
///
/// With a snapshot path configured, the collection is loaded on
/// [`open`](Self::open) and rewritten after every successful write.
pub struct MemoryAdapter {
    config: MemoryAdapterConfig,
    collection: RwLock<Collection>,
    snapshot: Option<SnapshotFile>,
    context: ContextCache,
    counters: Counters,
}

impl MemoryAdapter {
    /// Creates an empty, unpersisted collection with default settings.
    pub fn new(collection: &str) -> Self {
        Self::with_collection(MemoryAdapterConfig::new(collection), Collection::new(), None)
    }

    pub async fn open(config: MemoryAdapterConfig) -> Result<Self> {
        config.validate().map_err(ModelError::InvalidConfig)?;

        let snapshot = config.snapshot_path.as_ref().map(SnapshotFile::new);
        let collection = match snapshot.as_ref().map(SnapshotFile::load).transpose()?.flatten() {
            Some(image) => {
                debug!(
                    "Loaded {} rows into '{}' from snapshot",
                    image.rows.len(),
                    config.collection
                );
                Collection::from_snapshot(image, &config.id_field)
            }
            None => Collection::new(),
        };

        Ok(Self::with_collection(config, collection, snapshot))
    }

    pub async fn from_url(url: &str) -> Result<Self> {
        let config = MemoryAdapterConfig::from_url(url).map_err(ModelError::InvalidConfig)?;
        Self::open(config).await
    }

    fn with_collection(
        config: MemoryAdapterConfig,
        collection: Collection,
        snapshot: Option<SnapshotFile>,
    ) -> Self {
        Self {
            config,
            collection: RwLock::new(collection),
            snapshot,
            context: ContextCache::new(),
            counters: Counters::default(),
        }
    }

    pub fn config(&self) -> &MemoryAdapterConfig {
        &self.config
    }

    pub fn stats(&self) -> MemoryAdapterStats {
        MemoryAdapterStats {
            reads: self.counters.reads.load(Ordering::Relaxed),
            inserts: self.counters.inserts.load(Ordering::Relaxed),
            updates: self.counters.updates.load(Ordering::Relaxed),
            deletes: self.counters.deletes.load(Ordering::Relaxed),
        }
    }

    pub async fn len(&self) -> usize {
        self.collection.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Raw stored row, bypassing any binding.
    pub async fn raw_row(&self, id: &Value) -> Option<Row> {
        self.collection.read().await.get(id).cloned()
    }

    /// Stores a row as-is, for seeding fixtures or columns no model writes.
    pub async fn insert_raw(&self, row: Row) -> Result<Value> {
        let mut collection = self.collection.write().await;
        self.commit(&mut collection, |staged| self.push_row(staged, &row))
    }

    /// Forgets the memoized context; the next operation opens a new one.
    pub async fn invalidate_context(&self) {
        self.context.invalidate().await;
    }

    pub fn context_initializations(&self) -> u64 {
        self.context.initializations()
    }

    fn assign_id(&self, collection: &mut Collection, row: &Row) -> Result<Value> {
        match row.get(&self.config.id_field) {
            Some(id) if !id.is_null() => {
                if collection.index.contains_key(id) {
                    return Err(anyhow::anyhow!(
                        "duplicate identifier {} in '{}'",
                        id,
                        self.config.collection
                    )
                    .into());
                }
                if let Value::Integer(n) = id {
                    collection.next_id = collection.next_id.max(n.saturating_add(1));
                }
                Ok(id.clone())
            }
            _ => Ok(match self.config.id_strategy {
                IdStrategy::Sequential => {
                    let id = collection.next_id;
                    collection.next_id += 1;
                    Value::Integer(id)
                }
                IdStrategy::Uuid => Value::Text(Uuid::new_v4().to_string()),
            }),
        }
    }

    fn push_row(&self, collection: &mut Collection, fields: &Row) -> Result<Value> {
        let id = self.assign_id(collection, fields)?;
        let mut row = fields.clone();
        row.insert(self.config.id_field.clone(), id.clone());
        collection.push(id.clone(), row);
        Ok(id)
    }

    /// Applies a write so that it lands in memory only if the snapshot (when
    /// configured) was written too.
    fn commit<T>(
        &self,
        collection: &mut Collection,
        apply: impl FnOnce(&mut Collection) -> Result<T>,
    ) -> Result<T> {
        let Some(snapshot) = &self.snapshot else {
            return apply(collection);
        };

        let mut staged = collection.clone();
        let result = apply(&mut staged)?;
        snapshot.save(&staged.to_snapshot(&self.config.collection))?;
        *collection = staged;
        Ok(result)
    }

    fn check_context(&self, context: &StorageContext) {
        if context.downcast::<MemoryHandle>().is_none() {
            warn!(
                "'{}' received a context it did not create",
                self.config.collection
            );
        }
    }
}

#[async_trait]
impl StorageAdapter for MemoryAdapter {
    fn name(&self) -> &str {
        &self.config.collection
    }

    async fn context(&self) -> Result<StorageContext> {
        self.context
            .get_or_init(|| async {
                debug!("Opening context for '{}'", self.config.collection);
                Ok(StorageContext::new(MemoryHandle {
                    collection: self.config.collection.clone(),
                    opened_at: Utc::now(),
                }))
            })
            .await
    }

    async fn get(&self, context: &StorageContext, id: &Value) -> Result<Option<Row>> {
        self.check_context(context);
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.collection.read().await.get(id).cloned())
    }

    async fn get_by(&self, context: &StorageContext, criteria: &Criteria) -> Result<Option<Row>> {
        self.check_context(context);
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let filter = Filter::compile(Some(criteria))?;
        let mut rows = self.collection.read().await.matching(&filter);
        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(ModelError::AmbiguousResult(n)),
        }
    }

    async fn all(&self, context: &StorageContext, criteria: Option<&Criteria>) -> Result<Vec<Row>> {
        self.check_context(context);
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let filter = Filter::compile(criteria)?;
        Ok(self.collection.read().await.matching(&filter))
    }

    async fn insert(&self, context: &StorageContext, fields: &Row) -> Result<WriteOutcome> {
        self.check_context(context);
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);

        let mut collection = self.collection.write().await;
        let id = self.commit(&mut collection, |staged| self.push_row(staged, fields))?;

        debug!("Inserted {} into '{}'", id, self.config.collection);
        Ok(WriteOutcome::inserted(id))
    }

    async fn update(&self, context: &StorageContext, id: &Value, fields: &Row) -> Result<WriteOutcome> {
        self.check_context(context);
        self.counters.updates.fetch_add(1, Ordering::Relaxed);

        let mut collection = self.collection.write().await;
        if collection.get(id).is_none() {
            debug!("Update of missing {} in '{}'", id, self.config.collection);
            return Ok(WriteOutcome::failed(false));
        }
        self.commit(&mut collection, |staged| {
            if let Some(row) = staged.get_mut(id) {
                for (field, value) in fields {
                    if *field != self.config.id_field {
                        row.insert(field.clone(), value.clone());
                    }
                }
            }
            Ok(())
        })?;

        Ok(WriteOutcome::updated(id.clone(), 1))
    }

    async fn delete(&self, context: &StorageContext, id: &Value) -> Result<bool> {
        self.check_context(context);
        self.counters.deletes.fetch_add(1, Ordering::Relaxed);

        let mut collection = self.collection.write().await;
        if collection.get(id).is_none() {
            return Ok(false);
        }
        self.commit(&mut collection, |staged| Ok(staged.remove(id)))
    }
}
