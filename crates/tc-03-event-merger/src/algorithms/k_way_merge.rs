//! K-way merge over block-ordered event streams.
//!
//! # Algorithm
//!
//! 1. Pull the head of every stream into a min-heap keyed by [`MergeKey`]
//! 2. Pop the smallest head and emit it
//! 3. Refill the heap from the stream the popped event came from
//! 4. Stop when every stream is drained
//!
//! Each refill checks that the stream did not go backwards in block number.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use shared_types::{BlockNumber, ChainEvent};
use tracing::trace;

use crate::domain::{event_priority, MergeError, MergeKey, MergeResult};

/// Merge fully materialised streams.
pub fn merge_event_streams<S>(streams: impl IntoIterator<Item = S>) -> MergeResult<Vec<ChainEvent>>
where
    S: IntoIterator<Item = ChainEvent>,
{
    EventMerger::new(streams).collect()
}

struct Head {
    key: MergeKey,
    event: ChainEvent,
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Head {}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

struct Source<I> {
    events: I,
    position: usize,
    last_block: Option<BlockNumber>,
}

/// Streaming merger. Yields `Err` once on the first out-of-order stream,
/// then ends.
pub struct EventMerger<I> {
    sources: Vec<Source<I>>,
    heap: BinaryHeap<Reverse<Head>>,
    pending: Option<MergeError>,
    failed: bool,
}

impl<I> EventMerger<I>
where
    I: Iterator<Item = ChainEvent>,
{
    /// Prime the merger with the head of every stream.
    pub fn new<S>(streams: impl IntoIterator<Item = S>) -> Self
    where
        S: IntoIterator<Item = ChainEvent, IntoIter = I>,
    {
        let sources: Vec<Source<I>> = streams
            .into_iter()
            .map(|s| Source {
                events: s.into_iter(),
                position: 0,
                last_block: None,
            })
            .collect();

        let mut merger = Self {
            heap: BinaryHeap::with_capacity(sources.len()),
            sources,
            pending: None,
            failed: false,
        };
        for stream in 0..merger.sources.len() {
            if let Err(err) = merger.refill(stream) {
                merger.pending = Some(err);
                break;
            }
        }
        merger
    }

    /// Number of input streams.
    pub fn stream_count(&self) -> usize {
        self.sources.len()
    }

    fn refill(&mut self, stream: usize) -> MergeResult<()> {
        let source = &mut self.sources[stream];
        let Some(event) = source.events.next() else {
            return Ok(());
        };
        let block_number = event.block_number();
        if let Some(previous) = source.last_block {
            if block_number < previous {
                return Err(MergeError::UnorderedStream {
                    stream,
                    previous,
                    found: block_number,
                });
            }
        }
        source.last_block = Some(block_number);
        let key = MergeKey {
            block_number,
            priority: event_priority(event.kind()),
            stream,
            position: source.position,
        };
        source.position += 1;
        self.heap.push(Reverse(Head { key, event }));
        Ok(())
    }
}

impl<I> Iterator for EventMerger<I>
where
    I: Iterator<Item = ChainEvent>,
{
    type Item = MergeResult<ChainEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        if let Some(err) = self.pending.take() {
            self.failed = true;
            return Some(Err(err));
        }
        let Reverse(head) = self.heap.pop()?;
        if let Err(err) = self.refill(head.key.stream) {
            self.failed = true;
            return Some(Err(err));
        }
        trace!(
            block_number = head.key.block_number,
            stream = head.key.stream,
            kind = head.event.kind().as_str(),
            "[tc-03] merged event"
        );
        Some(Ok(head.event))
    }
}
