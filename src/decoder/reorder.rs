use std::collections::BTreeMap;

use super::types::{DecodeEvent, DecodedEntry};

/// Puts entries back into index order on the receiving side.
///
/// Entries arrive in completion order. Each one is held until every lower
/// index has either arrived or been marked with [`skip`](Self::skip), then
/// released as part of a contiguous run.
#[derive(Debug)]
pub struct Resequencer {
    next: u64,
    /// `None` marks an index that will never arrive.
    pending: BTreeMap<u64, Option<DecodedEntry>>,
}

impl Resequencer {
    pub fn new(start_index: u64) -> Self {
        Self {
            next: start_index,
            pending: BTreeMap::new(),
        }
    }

    /// Index of the next entry to be released.
    pub fn next_index(&self) -> u64 {
        self.next
    }

    /// Number of entries waiting on a lower index.
    pub fn pending(&self) -> usize {
        self.pending.values().filter(|slot| slot.is_some()).count()
    }

    pub fn push(&mut self, entry: DecodedEntry) -> Vec<DecodedEntry> {
        if entry.index < self.next {
            tracing::debug!(index = entry.index, "entry arrived after its slot was released");
            return Vec::new();
        }
        self.pending.insert(entry.index, Some(entry));
        self.release()
    }

    /// Mark `index` as never arriving, e.g. because it failed to decode.
    pub fn skip(&mut self, index: u64) -> Vec<DecodedEntry> {
        if index >= self.next {
            self.pending.entry(index).or_insert(None);
        }
        self.release()
    }

    /// Feed a decoder event, returning whatever became releasable.
    pub fn offer(&mut self, event: DecodeEvent) -> Vec<DecodedEntry> {
        match event {
            DecodeEvent::Entry(entry) => self.push(entry),
            DecodeEvent::EntryFailed(failure) => self.skip(failure.index),
            DecodeEvent::Failed(_) | DecodeEvent::Finished(_) => Vec::new(),
        }
    }

    /// Drain everything still held, in index order, ignoring gaps.
    pub fn finish(self) -> Vec<DecodedEntry> {
        self.pending.into_values().flatten().collect()
    }

    fn release(&mut self) -> Vec<DecodedEntry> {
        let mut ready = Vec::new();
        while let Some(slot) = self.pending.remove(&self.next) {
            ready.extend(slot);
            match self.next.checked_add(1) {
                Some(next) => self.next = next,
                None => break,
            }
        }
        ready
    }
}
