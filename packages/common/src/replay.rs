//! Progressive replay of a fetched batch through the merge.
//!
//! A large batch is split into chunks that start small and double up to a cap,
//! so the first aggregates become visible quickly. Callers may yield between
//! chunks; the merge itself stays synchronous.

use crate::aggregate::{AggregateSet, MergeMode};
use crate::attempt::DeliveryAttempt;
use crate::config::ReplayConfig;
use crate::decoder::{DecodeFailure, DocumentIdMap};

/// Iterator over progressively larger slices of a batch.
pub struct Chunks<'a> {
    rest: &'a [DeliveryAttempt],
    next_size: usize,
    max_size: usize,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a [DeliveryAttempt];

    fn next(&mut self) -> Option<Self::Item> {
        if self.rest.is_empty() {
            return None;
        }
        let size = self.next_size.min(self.rest.len());
        let (chunk, rest) = self.rest.split_at(size);
        self.rest = rest;
        self.next_size = self.next_size.saturating_mul(2).min(self.max_size);
        Some(chunk)
    }
}

/// Split `attempts` according to `config`.
pub fn chunks<'a>(attempts: &'a [DeliveryAttempt], config: &ReplayConfig) -> Chunks<'a> {
    let max_size = config.max_chunk.max(1);
    Chunks {
        rest: attempts,
        next_size: config.initial_chunk.clamp(1, max_size),
        max_size,
    }
}

/// Merge one chunk of a replay. The first chunk uses `mode`; the rest fold in
/// incrementally.
pub fn merge_chunk(
    set: &mut AggregateSet,
    index: usize,
    chunk: &[DeliveryAttempt],
    document_ids: &DocumentIdMap,
    parsing_errors: &[DecodeFailure],
    mode: MergeMode,
) {
    let mode = if index == 0 { mode } else { MergeMode::Incremental };
    set.merge(chunk, document_ids, parsing_errors, mode);
}

/// Replay a whole batch synchronously. Returns the number of chunks merged.
///
/// A `Replace` replay of an empty batch still clears the set.
pub fn replay(
    set: &mut AggregateSet,
    attempts: &[DeliveryAttempt],
    document_ids: &DocumentIdMap,
    parsing_errors: &[DecodeFailure],
    mode: MergeMode,
    config: &ReplayConfig,
) -> usize {
    if attempts.is_empty() {
        set.merge(&[], document_ids, parsing_errors, mode);
        return 0;
    }

    let mut merged = 0;
    for (index, chunk) in chunks(attempts, config).enumerate() {
        merge_chunk(set, index, chunk, document_ids, parsing_errors, mode);
        merged += 1;
    }
    merged
}
