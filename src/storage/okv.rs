//! Ordered key-value store with a pluggable composite-key comparator.
//!
//! An [`OkvStore`] keeps its entries sorted in memory under a
//! [`CompositeComparator`] and persists them through a snapshot file plus a
//! checksummed write-ahead log. Mutations go through [`WriteBatch`]; a batch
//! is one WAL record, so it applies atomically: a record torn by a crash is
//! discarded wholesale on recovery, never half-applied.
//!
//! The comparator's identity name is persisted in the snapshot. Opening a
//! store with a different comparator fails, because the on-disk entry order
//! would no longer match the scan order the comparator promises.

use std::io::{Read, Write};
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SedgeError};
use crate::storage::comparator::{CompositeComparator, Direction};
use crate::storage::traits::Storage;

/// A single operation inside a write batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BatchOp {
    /// Insert or overwrite a key.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Remove a key. Removing an absent key is a no-op.
    Delete { key: Vec<u8> },
}

/// An ordered set of mutations applied as one atomic unit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        WriteBatch::default()
    }

    /// Queue a put.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
    }

    /// Queue a delete.
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete { key: key.into() });
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether the batch holds no operations.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Durable snapshot payload.
#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    comparator: String,
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

#[derive(Debug)]
struct OkvInner {
    /// Entries sorted by the store comparator.
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    /// Batches appended to the WAL since the last snapshot.
    wal_batches: usize,
}

/// A sorted, range-scannable, durable key-value table.
#[derive(Debug)]
pub struct OkvStore {
    name: String,
    storage: Arc<dyn Storage>,
    comparator: CompositeComparator,
    compaction_threshold: usize,
    inner: RwLock<OkvInner>,
}

impl OkvStore {
    /// Open (or create) the store named `name` inside `storage`.
    ///
    /// Recovery order: load the snapshot if present, then replay the WAL.
    /// Replay stops at the first incomplete or corrupt record; if one is
    /// found, the store is compacted immediately so the torn tail never
    /// survives a second restart.
    pub fn open(
        storage: Arc<dyn Storage>,
        name: &str,
        comparator: CompositeComparator,
        compaction_threshold: usize,
    ) -> Result<Self> {
        let store = OkvStore {
            name: name.to_string(),
            storage,
            comparator,
            compaction_threshold: compaction_threshold.max(1),
            inner: RwLock::new(OkvInner {
                entries: Vec::new(),
                wal_batches: 0,
            }),
        };

        let mut torn_tail = false;
        {
            let mut inner = store.inner.write();

            if store.storage.file_exists(&store.snapshot_file()) {
                let mut data = Vec::new();
                store
                    .storage
                    .open_input(&store.snapshot_file())?
                    .read_to_end(&mut data)?;
                let snapshot: Snapshot = bincode::deserialize(&data)
                    .map_err(|e| SedgeError::storage(format!("corrupt snapshot: {e}")))?;
                if snapshot.comparator != store.comparator.name() {
                    return Err(SedgeError::storage(format!(
                        "store '{}' was created with comparator {}, opened with {}",
                        store.name,
                        snapshot.comparator,
                        store.comparator.name()
                    )));
                }
                inner.entries = snapshot.entries;
            }

            if store.storage.file_exists(&store.wal_file()) {
                let mut data = Vec::new();
                store
                    .storage
                    .open_input(&store.wal_file())?
                    .read_to_end(&mut data)?;
                let (batches, clean) = decode_wal(&data);
                log::debug!(
                    "store '{}': replaying {} WAL batch(es)",
                    store.name,
                    batches.len()
                );
                for batch in &batches {
                    store.apply_to_entries(&mut inner.entries, batch);
                }
                inner.wal_batches = batches.len();
                torn_tail = !clean;
            }
        }

        if torn_tail {
            log::warn!(
                "store '{}': discarding torn WAL tail during recovery",
                store.name
            );
            store.compact(&mut store.inner.write())?;
        } else if !store.storage.file_exists(&store.snapshot_file()) {
            // First open: persist the comparator identity right away.
            store.compact(&mut store.inner.write())?;
        }

        Ok(store)
    }

    /// The comparator this store was opened with.
    pub fn comparator(&self) -> &CompositeComparator {
        &self.comparator
    }

    fn snapshot_file(&self) -> String {
        format!("{}.snap", self.name)
    }

    fn wal_file(&self) -> String {
        format!("{}.wal", self.name)
    }

    /// Look up a single key.
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        let inner = self.inner.read();
        match inner
            .entries
            .binary_search_by(|(k, _)| self.comparator.compare(k, key))
        {
            Ok(pos) => Some(inner.entries[pos].1.clone()),
            Err(_) => None,
        }
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Apply a batch atomically: one framed WAL record, then the in-memory
    /// table. Returns after the record is synced.
    pub fn apply(&self, batch: WriteBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let body = bincode::serialize(&batch.ops)
            .map_err(|e| SedgeError::serialization(format!("WAL record encoding: {e}")))?;
        let mut frame = [0u8; 8];
        LittleEndian::write_u32(&mut frame[0..4], body.len() as u32);
        LittleEndian::write_u32(&mut frame[4..8], crc32fast::hash(&body));

        let mut inner = self.inner.write();

        let mut wal = self.storage.create_output_append(&self.wal_file())?;
        wal.write_all(&frame)?;
        wal.write_all(&body)?;
        wal.flush_and_sync()?;

        self.apply_to_entries(&mut inner.entries, &batch);
        inner.wal_batches += 1;

        if inner.wal_batches >= self.compaction_threshold {
            self.compact(&mut inner)?;
        }
        Ok(())
    }

    /// Collect all entries whose key starts with the given complete
    /// segments, in store order. `prefix` is comma-joined segments without a
    /// trailing comma, e.g. `b"p,rust"` matches `p,rust,<id>`.
    ///
    /// Keys sharing complete leading segments are contiguous under the
    /// segment-wise comparator, so the run is found with two binary
    /// searches.
    pub fn scan_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.scan_prefix_bounded(prefix, 0, None)
    }

    /// Like [`OkvStore::scan_prefix`], but skips the first `offset` entries
    /// of the run and returns at most `count` of the rest. Only the returned
    /// window is cloned; the run is located with the same two binary
    /// searches regardless of its size.
    pub fn scan_prefix_bounded(
        &self,
        prefix: &[u8],
        offset: usize,
        count: Option<usize>,
    ) -> Vec<(Vec<u8>, Vec<u8>)> {
        let prefix_segs: Vec<&[u8]> = prefix.split(|&b| b == b',').collect();
        let inner = self.inner.read();

        let start = inner
            .entries
            .partition_point(|(k, _)| self.compare_to_prefix(k, &prefix_segs).is_lt());
        let end = inner
            .entries
            .partition_point(|(k, _)| !self.compare_to_prefix(k, &prefix_segs).is_gt());

        let start = start.saturating_add(offset).min(end);
        let end = match count {
            Some(count) => start.saturating_add(count).min(end),
            None => end,
        };
        inner.entries[start..end].to_vec()
    }

    /// Compare a key against complete prefix segments: equal means the key
    /// falls inside the prefix run.
    fn compare_to_prefix(&self, key: &[u8], prefix_segs: &[&[u8]]) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        let mut key_segs = key.split(|&b| b == b',');
        for (position, prefix_seg) in prefix_segs.iter().enumerate() {
            let ordering = match key_segs.next() {
                Some(key_seg) => key_seg.cmp(prefix_seg),
                None => Ordering::Less,
            };
            if ordering != Ordering::Equal {
                // Past the configured direction list defaults to ascending,
                // mirroring CompositeComparator.
                let direction = self
                    .comparator
                    .directions()
                    .get(position)
                    .copied()
                    .unwrap_or(Direction::Asc);
                return match direction {
                    Direction::Asc => ordering,
                    Direction::Desc => ordering.reverse(),
                };
            }
        }
        Ordering::Equal
    }

    fn apply_to_entries(&self, entries: &mut Vec<(Vec<u8>, Vec<u8>)>, batch: &WriteBatch) {
        for op in &batch.ops {
            match op {
                BatchOp::Put { key, value } => {
                    match entries.binary_search_by(|(k, _)| self.comparator.compare(k, key)) {
                        Ok(pos) => entries[pos].1 = value.clone(),
                        Err(pos) => entries.insert(pos, (key.clone(), value.clone())),
                    }
                }
                BatchOp::Delete { key } => {
                    if let Ok(pos) =
                        entries.binary_search_by(|(k, _)| self.comparator.compare(k, key))
                    {
                        entries.remove(pos);
                    }
                }
            }
        }
    }

    /// Rewrite the snapshot and truncate the WAL. Called under the write
    /// lock by `apply` and recovery.
    fn compact(&self, inner: &mut OkvInner) -> Result<()> {
        let snapshot = Snapshot {
            comparator: self.comparator.name().to_string(),
            entries: inner.entries.clone(),
        };
        let data = bincode::serialize(&snapshot)
            .map_err(|e| SedgeError::serialization(format!("snapshot encoding: {e}")))?;

        let temp_name = format!("{}.tmp", self.snapshot_file());
        {
            let mut out = self.storage.create_output(&temp_name)?;
            out.write_all(&data)?;
            out.flush_and_sync()?;
        }
        self.storage.rename_file(&temp_name, &self.snapshot_file())?;

        // An empty WAL after a durable snapshot: logged batches are folded in.
        self.storage.create_output(&self.wal_file())?.flush_and_sync()?;
        inner.wal_batches = 0;

        log::debug!(
            "store '{}': compacted snapshot with {} entries",
            self.name,
            inner.entries.len()
        );
        Ok(())
    }
}

/// Decode framed WAL records; returns the decoded batches and whether the
/// log ended cleanly (no truncated or corrupt tail).
fn decode_wal(data: &[u8]) -> (Vec<WriteBatch>, bool) {
    let mut batches = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        if data.len() - offset < 8 {
            return (batches, false);
        }
        let len = LittleEndian::read_u32(&data[offset..offset + 4]) as usize;
        let crc = LittleEndian::read_u32(&data[offset + 4..offset + 8]);
        offset += 8;

        if data.len() - offset < len {
            return (batches, false);
        }
        let body = &data[offset..offset + len];
        if crc32fast::hash(body) != crc {
            return (batches, false);
        }
        match bincode::deserialize::<Vec<BatchOp>>(body) {
            Ok(ops) => batches.push(WriteBatch { ops }),
            Err(_) => return (batches, false),
        }
        offset += len;
    }

    (batches, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::comparator::Direction;
    use crate::storage::memory::MemoryStorage;

    fn memory_store(comparator: CompositeComparator) -> (Arc<MemoryStorage>, OkvStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = OkvStore::open(storage.clone(), "test", comparator, 64).unwrap();
        (storage, store)
    }

    #[test]
    fn test_put_get_delete() -> Result<()> {
        let (_, store) = memory_store(CompositeComparator::ascending());

        let mut batch = WriteBatch::new();
        batch.put(b"alpha,1".as_slice(), b"one".as_slice());
        batch.put(b"alpha,2".as_slice(), b"two".as_slice());
        store.apply(batch)?;

        assert_eq!(store.get(b"alpha,1"), Some(b"one".to_vec()));
        assert_eq!(store.get(b"alpha,3"), None);

        let mut batch = WriteBatch::new();
        batch.delete(b"alpha,1".as_slice());
        store.apply(batch)?;
        assert_eq!(store.get(b"alpha,1"), None);
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn test_scan_prefix_contiguous_run() -> Result<()> {
        let (_, store) = memory_store(CompositeComparator::ascending());

        let mut batch = WriteBatch::new();
        batch.put(b"p,rust,10".as_slice(), b"a".as_slice());
        batch.put(b"p,rust,20".as_slice(), b"b".as_slice());
        batch.put(b"p,rustic,5".as_slice(), b"c".as_slice());
        batch.put(b"p,go,1".as_slice(), b"d".as_slice());
        batch.put(b"w,10".as_slice(), b"e".as_slice());
        store.apply(batch)?;

        let run = store.scan_prefix(b"p,rust");
        assert_eq!(run.len(), 2);
        assert_eq!(run[0].0, b"p,rust,10");
        assert_eq!(run[1].0, b"p,rust,20");

        assert!(store.scan_prefix(b"p,python").is_empty());
        Ok(())
    }

    #[test]
    fn test_scan_prefix_bounded_window() -> Result<()> {
        let (_, store) = memory_store(CompositeComparator::ascending());

        let mut batch = WriteBatch::new();
        for id in [10, 20, 30, 40] {
            batch.put(format!("t,{id}").into_bytes(), id.to_string().into_bytes());
        }
        batch.put(b"u,1".as_slice(), b"x".as_slice());
        store.apply(batch)?;

        let window = store.scan_prefix_bounded(b"t", 1, Some(2));
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].0, b"t,20");
        assert_eq!(window[1].0, b"t,30");

        // Offset past the run, and an over-long count, both clamp.
        assert!(store.scan_prefix_bounded(b"t", 9, None).is_empty());
        assert_eq!(store.scan_prefix_bounded(b"t", 3, Some(99)).len(), 1);
        Ok(())
    }

    #[test]
    fn test_scan_prefix_descending_ids_newest_first() -> Result<()> {
        let cmp = CompositeComparator::new(vec![Direction::Asc, Direction::Desc]);
        let (_, store) = memory_store(cmp);

        let mut batch = WriteBatch::new();
        batch.put(b"tag,10".as_slice(), b"10".as_slice());
        batch.put(b"tag,30".as_slice(), b"30".as_slice());
        batch.put(b"tag,20".as_slice(), b"20".as_slice());
        batch.put(b"zed,99".as_slice(), b"99".as_slice());
        store.apply(batch)?;

        let run = store.scan_prefix(b"tag");
        let ids: Vec<&[u8]> = run.iter().map(|(_, v)| v.as_slice()).collect();
        assert_eq!(ids, [b"30".as_slice(), b"20".as_slice(), b"10".as_slice()]);
        Ok(())
    }

    #[test]
    fn test_recovery_replays_wal() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        {
            let store = OkvStore::open(
                storage.clone(),
                "recov",
                CompositeComparator::ascending(),
                64,
            )?;
            let mut batch = WriteBatch::new();
            batch.put(b"k".as_slice(), b"v".as_slice());
            store.apply(batch)?;
            // No compaction: the entry only lives in the WAL here.
        }

        let store = OkvStore::open(
            storage,
            "recov",
            CompositeComparator::ascending(),
            64,
        )?;
        assert_eq!(store.get(b"k"), Some(b"v".to_vec()));
        Ok(())
    }

    #[test]
    fn test_torn_wal_tail_drops_whole_batch() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        {
            let store = OkvStore::open(
                storage.clone(),
                "torn",
                CompositeComparator::ascending(),
                64,
            )?;
            let mut batch = WriteBatch::new();
            batch.put(b"good".as_slice(), b"1".as_slice());
            store.apply(batch)?;
        }

        // Simulate a crash mid-append: garbage after the last full record.
        {
            let mut out = storage.create_output_append("torn.wal")?;
            out.write_all(&[7, 0, 0, 0, 1, 2])?;
            out.flush_and_sync()?;
        }

        let store = OkvStore::open(
            storage,
            "torn",
            CompositeComparator::ascending(),
            64,
        )?;
        assert_eq!(store.get(b"good"), Some(b"1".to_vec()));
        assert_eq!(store.len(), 1);
        Ok(())
    }

    #[test]
    fn test_comparator_mismatch_rejected() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        {
            OkvStore::open(
                storage.clone(),
                "mix",
                CompositeComparator::ascending(),
                64,
            )?;
        }
        let reopened = OkvStore::open(
            storage,
            "mix",
            CompositeComparator::new(vec![Direction::Desc]),
            64,
        );
        assert!(matches!(reopened, Err(SedgeError::Storage(_))));
        Ok(())
    }

    #[test]
    fn test_compaction_truncates_wal_and_survives_restart() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        {
            let store =
                OkvStore::open(storage.clone(), "cpt", CompositeComparator::ascending(), 2)?;
            for i in 0..5u8 {
                let mut batch = WriteBatch::new();
                batch.put(vec![b'k', b'0' + i], vec![i]);
                store.apply(batch)?;
            }
        }
        let store = OkvStore::open(storage, "cpt", CompositeComparator::ascending(), 2)?;
        assert_eq!(store.len(), 5);
        Ok(())
    }
}
