//! Cursor Module
//!
//! A merging cursor over one store's MemTable and SSTables.
//!
//! ## Semantics
//! - Sources are ordered newest → oldest (MemTable first)
//! - When several sources hold keys the comparator considers equal, the
//!   newest one wins and the others are skipped
//! - Tombstones are hidden
//! - The cursor is positioned by one of the `seek*` calls, then moved with
//!   `next()` / `prev()`; switching direction re-seeks around the current key
//!
//! A cursor reads the live MemTable in small batches, so it observes writes
//! made during iteration. It is meant to live for one bounded call.

use std::cmp::Ordering;
use std::collections::VecDeque;
use std::ops::Bound;
use std::sync::Arc;

use crate::comparator::SharedComparator;
use crate::error::Result;
use crate::memtable::MemTable;
use crate::storage::SSTableReader;

/// Entries fetched from the MemTable per refill
const MEMTABLE_BATCH: usize = 128;

/// Iteration direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending key order
    Forward,
    /// Descending key order
    Backward,
}

/// (key, value) where a `None` value is a tombstone
type RawEntry = (Vec<u8>, Option<Vec<u8>>);

// =============================================================================
// Sources
// =============================================================================

/// Batched reader over the live MemTable
struct MemSource {
    table: Arc<MemTable>,
    direction: Direction,
    buffer: VecDeque<RawEntry>,
    last_key: Option<Vec<u8>>,
    exhausted: bool,
}

impl MemSource {
    fn seek(&mut self, from: Bound<&[u8]>, direction: Direction) {
        self.direction = direction;
        self.buffer.clear();
        self.last_key = None;
        self.exhausted = false;
        self.fill(from);
    }

    fn fill(&mut self, from: Bound<&[u8]>) {
        let batch = self.table.range(from, self.direction, MEMTABLE_BATCH);
        if batch.len() < MEMTABLE_BATCH {
            self.exhausted = true;
        }
        self.buffer
            .extend(batch.into_iter().map(|(k, e)| (k, e.into_option())));
    }

    fn advance(&mut self) {
        if let Some((key, _)) = self.buffer.pop_front() {
            self.last_key = Some(key);
        }
        if self.buffer.is_empty() && !self.exhausted {
            if let Some(last) = self.last_key.take() {
                self.fill(Bound::Excluded(last.as_slice()));
                self.last_key = Some(last);
            }
        }
    }

    fn current(&self) -> Option<&RawEntry> {
        self.buffer.front()
    }
}

/// Positioned reader over one SSTable
struct TableSource {
    table: Arc<SSTableReader>,
    direction: Direction,
    pos: Option<usize>,
    entry: Option<RawEntry>,
}

impl TableSource {
    fn seek(&mut self, from: Bound<&[u8]>, direction: Direction) -> Result<()> {
        self.direction = direction;
        self.pos = self.table.position(from, direction);
        self.load()
    }

    fn advance(&mut self) -> Result<()> {
        let count = self.table.entry_count() as usize;
        self.pos = match (self.pos, self.direction) {
            (Some(p), Direction::Forward) => Some(p + 1).filter(|&n| n < count),
            (Some(p), Direction::Backward) => p.checked_sub(1),
            (None, _) => None,
        };
        self.load()
    }

    fn load(&mut self) -> Result<()> {
        self.entry = match self.pos {
            Some(p) => Some(self.table.entry_at(p)?),
            None => None,
        };
        Ok(())
    }
}

enum Source {
    Mem(MemSource),
    Table(TableSource),
}

impl Source {
    fn seek(&mut self, from: Bound<&[u8]>, direction: Direction) -> Result<()> {
        match self {
            Source::Mem(s) => {
                s.seek(from, direction);
                Ok(())
            }
            Source::Table(s) => s.seek(from, direction),
        }
    }

    fn advance(&mut self) -> Result<()> {
        match self {
            Source::Mem(s) => {
                s.advance();
                Ok(())
            }
            Source::Table(s) => s.advance(),
        }
    }

    fn current(&self) -> Option<&RawEntry> {
        match self {
            Source::Mem(s) => s.current(),
            Source::Table(s) => s.entry.as_ref(),
        }
    }
}

// =============================================================================
// Merging Cursor
// =============================================================================

/// Merging cursor over a store's MemTable and SSTables
pub struct Cursor {
    sources: Vec<Source>,
    comparator: SharedComparator,
    direction: Direction,
    current: Option<(Vec<u8>, Vec<u8>)>,
}

impl Cursor {
    /// Build an unpositioned cursor
    ///
    /// `tables` must be ordered newest → oldest; the MemTable, if any, is
    /// treated as newer than every table.
    pub fn new(
        memtable: Option<Arc<MemTable>>,
        tables: Vec<Arc<SSTableReader>>,
        comparator: SharedComparator,
    ) -> Self {
        let mut sources = Vec::with_capacity(tables.len() + 1);
        if let Some(table) = memtable {
            sources.push(Source::Mem(MemSource {
                table,
                direction: Direction::Forward,
                buffer: VecDeque::new(),
                last_key: None,
                exhausted: true,
            }));
        }
        sources.extend(tables.into_iter().map(|table| {
            Source::Table(TableSource {
                table,
                direction: Direction::Forward,
                pos: None,
                entry: None,
            })
        }));

        Self {
            sources,
            comparator,
            direction: Direction::Forward,
            current: None,
        }
    }

    /// Position at the first key >= `key`
    pub fn seek(&mut self, key: &[u8]) -> Result<()> {
        self.position(Bound::Included(key), Direction::Forward)
    }

    /// Position at the last key <= `key`
    pub fn seek_for_prev(&mut self, key: &[u8]) -> Result<()> {
        self.position(Bound::Included(key), Direction::Backward)
    }

    /// Position at the smallest key
    pub fn seek_to_first(&mut self) -> Result<()> {
        self.position(Bound::Unbounded, Direction::Forward)
    }

    /// Position at the largest key
    pub fn seek_to_last(&mut self) -> Result<()> {
        self.position(Bound::Unbounded, Direction::Backward)
    }

    /// Move to the next larger key
    pub fn next(&mut self) -> Result<()> {
        self.move_toward(Direction::Forward)
    }

    /// Move to the next smaller key
    pub fn prev(&mut self) -> Result<()> {
        self.move_toward(Direction::Backward)
    }

    fn move_toward(&mut self, direction: Direction) -> Result<()> {
        let Some((key, _)) = &self.current else {
            return Ok(());
        };
        if self.direction == direction {
            return self.step();
        }
        let key = key.clone();
        self.position(Bound::Excluded(key.as_slice()), direction)
    }

    /// Whether the cursor points at an entry
    pub fn valid(&self) -> bool {
        self.current.is_some()
    }

    /// Current key, if positioned
    pub fn key(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(k, _)| k.as_slice())
    }

    /// Current value, if positioned
    pub fn value(&self) -> Option<&[u8]> {
        self.current.as_ref().map(|(_, v)| v.as_slice())
    }

    /// Current (key, value), if positioned
    pub fn current(&self) -> Option<(&[u8], &[u8])> {
        self.current
            .as_ref()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Direction of the last positioning call
    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn position(&mut self, from: Bound<&[u8]>, direction: Direction) -> Result<()> {
        self.direction = direction;
        for source in &mut self.sources {
            source.seek(from, direction)?;
        }
        self.settle()
    }

    /// Advance past the current key in every source, then settle
    fn step(&mut self) -> Result<()> {
        if let Some((key, _)) = self.current.take() {
            self.skip_key(&key)?;
        }
        self.settle()
    }

    /// Pick the winning entry across sources, skipping tombstones
    fn settle(&mut self) -> Result<()> {
        loop {
            let Some(winner) = self.pick() else {
                self.current = None;
                return Ok(());
            };

            let (key, value) = match self.sources[winner].current() {
                Some(entry) => entry.clone(),
                None => {
                    self.current = None;
                    return Ok(());
                }
            };

            match value {
                Some(value) => {
                    self.current = Some((key, value));
                    return Ok(());
                }
                None => self.skip_key(&key)?,
            }
        }
    }

    /// Index of the source whose head comes first in `direction`; ties go to
    /// the newest source
    fn pick(&self) -> Option<usize> {
        let mut best: Option<(usize, &[u8])> = None;
        for (i, source) in self.sources.iter().enumerate() {
            let Some((key, _)) = source.current() else {
                continue;
            };
            let better = match best {
                None => true,
                Some((_, best_key)) => {
                    let ord = self.comparator.compare(key, best_key);
                    match self.direction {
                        Direction::Forward => ord == Ordering::Less,
                        Direction::Backward => ord == Ordering::Greater,
                    }
                }
            };
            if better {
                best = Some((i, key.as_slice()));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Advance every source whose head equals `key`
    fn skip_key(&mut self, key: &[u8]) -> Result<()> {
        for source in &mut self.sources {
            let at_key = matches!(
                source.current(),
                Some((k, _)) if self.comparator.compare(k, key) == Ordering::Equal
            );
            if at_key {
                source.advance()?;
            }
        }
        Ok(())
    }
}
