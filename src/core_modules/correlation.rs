// THEORY:
// The correlation index is the engine's working set: a concurrent mapping
// from content hash to the canonical `Area` observed under that hash plus
// every position it was seen at. Many rebuild workers concurrently discover
// occurrences of possibly-new or possibly-existing content; the structure
// guarantees no observation is ever lost.
//
// Key architectural principles:
// 1.  **Sharded Locking**: the hash space is split over a fixed array of
//     mutex-guarded maps, so unrelated inserts rarely contend. Insert-or-
//     append is atomic per shard.
// 2.  **Per-Entry Mutation**: each entry guards its own correlation map, so
//     revalidation can prune entries in parallel without touching shards.
//     The map only grows during rebuild and only shrinks during
//     revalidation/apply; the loop never runs those phases concurrently.
// 3.  **Monotonic Ids**: correlation ids are a per-entry monotonic counter,
//     never reused within the entry's lifetime. Snapshots are returned in id
//     order so apply sweeps are deterministic.
// 4.  **Lazy Scores**: the base score can be expensive, so it is computed
//     outside the shard lock and only when the hash is actually new. A
//     racing duplicate computation is harmless; one result wins, every
//     correlation survives.

use crate::core_modules::area::{Area, Dimensions};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// One recorded position where an area's content was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correlation {
    pub sprite_index: usize,
    pub x: u32,
    pub y: u32,
    pub dims: Dimensions,
}

impl Correlation {
    pub fn new(sprite_index: usize, x: u32, y: u32, dims: Dimensions) -> Self {
        Self {
            sprite_index,
            x,
            y,
            dims,
        }
    }
}

/// The canonical area for one content hash, its base score, and every
/// position it was observed at.
#[derive(Debug)]
pub struct AreaEntry {
    area: Area,
    score: i64,
    correlations: Mutex<HashMap<u32, Correlation>>,
    next_id: AtomicU32,
}

impl AreaEntry {
    pub fn new(area: Area, score: i64) -> Self {
        Self {
            area,
            score,
            correlations: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(0),
        }
    }

    pub fn area(&self) -> &Area {
        &self.area
    }

    pub fn score(&self) -> i64 {
        self.score
    }

    /// Appends a correlation under a fresh id and returns the id.
    pub fn record(&self, correlation: Correlation) -> u32 {
        let mut correlations = self.correlations.lock().unwrap();
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        correlations.insert(id, correlation);
        id
    }

    pub fn remove(&self, id: u32) -> Option<Correlation> {
        self.correlations.lock().unwrap().remove(&id)
    }

    pub fn correlation_count(&self) -> usize {
        self.correlations.lock().unwrap().len()
    }

    /// Current correlations in id order.
    pub fn snapshot(&self) -> Vec<(u32, Correlation)> {
        let mut entries: Vec<_> = self
            .correlations
            .lock()
            .unwrap()
            .iter()
            .map(|(&id, &c)| (id, c))
            .collect();
        entries.sort_by_key(|&(id, _)| id);
        entries
    }

    /// Ranking value: surviving correlation count × base score.
    pub fn priority(&self) -> i64 {
        self.correlation_count() as i64 * self.score
    }
}

const SHARD_COUNT: usize = 16;

/// Concurrent content-hash → `AreaEntry` map.
#[derive(Debug)]
pub struct CorrelationIndex {
    shards: Vec<Mutex<HashMap<u64, Arc<AreaEntry>>>>,
}

impl CorrelationIndex {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect(),
        }
    }

    fn shard_for(&self, hash: u64) -> &Mutex<HashMap<u64, Arc<AreaEntry>>> {
        &self.shards[hash as usize % SHARD_COUNT]
    }

    /// Atomic insert-or-append: records the correlation under the area's
    /// hash, creating the entry with `base_score(&area)` if the hash is new.
    /// Returns true when a new entry was created.
    pub fn merge_observation<F>(&self, area: Area, correlation: Correlation, base_score: F) -> bool
    where
        F: FnOnce(&Area) -> i64,
    {
        let hash = area.content_hash();

        // Fast path: existing entry, append under the shard lock only.
        {
            let shard = self.shard_for(hash).lock().unwrap();
            if let Some(entry) = shard.get(&hash) {
                entry.record(correlation);
                return false;
            }
        }

        // Score outside the lock; a racing insert may beat us, in which case
        // our score is discarded and the correlation lands on the winner.
        let score = base_score(&area);
        let mut shard = self.shard_for(hash).lock().unwrap();
        match shard.entry(hash) {
            std::collections::hash_map::Entry::Occupied(existing) => {
                existing.get().record(correlation);
                false
            }
            std::collections::hash_map::Entry::Vacant(vacant) => {
                vacant
                    .insert(Arc::new(AreaEntry::new(area, score)))
                    .record(correlation);
                true
            }
        }
    }

    pub fn get(&self, hash: u64) -> Option<Arc<AreaEntry>> {
        self.shard_for(hash).lock().unwrap().get(&hash).cloned()
    }

    /// Removes and returns the entry; an entry is consumed exactly once.
    pub fn remove(&self, hash: u64) -> Option<Arc<AreaEntry>> {
        self.shard_for(hash).lock().unwrap().remove(&hash)
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.lock().unwrap().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every entry, in shard order. Stable for the lifetime of one build of
    /// the index, which is what ranking tie-breaks rely on.
    pub fn entries(&self) -> Vec<(u64, Arc<AreaEntry>)> {
        let mut entries = Vec::new();
        for shard in &self.shards {
            let guard = shard.lock().unwrap();
            entries.extend(guard.iter().map(|(&hash, entry)| (hash, entry.clone())));
        }
        entries
    }
}

impl Default for CorrelationIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use rayon::prelude::*;
    use std::sync::atomic::AtomicUsize;

    fn opaque_area(shade: u8) -> Area {
        Area::new(
            Dimensions::new(2, 1),
            vec![Pixel::new(shade, 0, 0, 255), Pixel::new(0, shade, 0, 255)],
        )
    }

    #[test]
    fn merge_creates_then_appends() {
        let index = CorrelationIndex::new();
        let area = opaque_area(1);
        let dims = area.dimensions();

        let created = index.merge_observation(area.clone(), Correlation::new(0, 0, 0, dims), |_| 7);
        let appended =
            index.merge_observation(area.clone(), Correlation::new(0, 3, 1, dims), |_| {
                panic!("score must be computed once per distinct area")
            });
        assert!(created);
        assert!(!appended);

        let entry = index.get(area.content_hash()).unwrap();
        assert_eq!(entry.score(), 7);
        assert_eq!(entry.correlation_count(), 2);
        assert_eq!(entry.priority(), 14);
    }

    #[test]
    fn ids_are_monotonic_and_never_reused() {
        let entry = AreaEntry::new(opaque_area(2), 1);
        let dims = Dimensions::new(2, 1);
        let first = entry.record(Correlation::new(0, 0, 0, dims));
        let second = entry.record(Correlation::new(0, 1, 0, dims));
        assert_eq!((first, second), (0, 1));

        entry.remove(first);
        let third = entry.record(Correlation::new(0, 2, 0, dims));
        assert_eq!(third, 2);
        assert_eq!(entry.correlation_count(), 2);
    }

    #[test]
    fn snapshot_is_id_ordered() {
        let entry = AreaEntry::new(opaque_area(3), 1);
        let dims = Dimensions::new(2, 1);
        for x in 0..5 {
            entry.record(Correlation::new(0, x, 0, dims));
        }
        let ids: Vec<u32> = entry.snapshot().into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn concurrent_merge_loses_no_observation() {
        let index = CorrelationIndex::new();
        let scores = AtomicUsize::new(0);
        // 8 distinct areas, 64 observations each, merged from many workers.
        (0..512usize).into_par_iter().for_each(|i| {
            let area = opaque_area((i % 8) as u8);
            let dims = area.dimensions();
            index.merge_observation(area, Correlation::new(0, i as u32, 0, dims), |_| {
                scores.fetch_add(1, Ordering::Relaxed);
                1
            });
        });

        assert_eq!(index.len(), 8);
        let total: usize = index
            .entries()
            .iter()
            .map(|(_, entry)| entry.correlation_count())
            .sum();
        assert_eq!(total, 512);
    }

    #[test]
    fn remove_consumes_exactly_once() {
        let index = CorrelationIndex::new();
        let area = opaque_area(4);
        let hash = area.content_hash();
        index.merge_observation(area, Correlation::new(0, 0, 0, Dimensions::new(2, 1)), |_| 1);

        assert!(index.remove(hash).is_some());
        assert!(index.remove(hash).is_none());
        assert!(index.is_empty());
    }
}
