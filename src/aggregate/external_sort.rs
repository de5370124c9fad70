//! Bounded-memory external merge sort of string keys.
//!
//! Keys are collected into an in-memory run until its size reaches the
//! configured budget; the run is then sorted and spilled to an anonymous
//! temporary file. Finishing merges all runs k-way, so peak memory is one
//! run buffer plus one pending key per spilled run.
//!
//! At most `fan_in` runs are merged at once. Whenever `fan_in` runs of the
//! same level exist they are merged into one run of the next level, which
//! bounds the number of open run files.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Seek, SeekFrom, Write};

use anyhow::Result;
use tracing::debug;

use crate::error::CompassError;
use crate::util::cmp_ci;

/// Per-key bookkeeping overhead counted against the run budget.
const KEY_OVERHEAD_BYTES: usize = std::mem::size_of::<String>();

/// Default number of runs merged at once.
pub const DEFAULT_FAN_IN: usize = 64;

/// A sorted run on disk; level 0 runs come straight from the buffer.
struct Run {
    file: File,
    level: u32,
}

/// Accumulates keys and produces them in case-insensitive order.
pub struct ExternalSorter {
    buffer: Vec<String>,
    buffer_bytes: usize,
    budget_bytes: usize,
    fan_in: usize,
    /// Levels are non-increasing from first to last
    runs: Vec<Run>,
    spilled: usize,
    total: u64,
}

impl ExternalSorter {
    pub fn new(budget_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            buffer_bytes: 0,
            budget_bytes: budget_bytes.max(1),
            fan_in: DEFAULT_FAN_IN,
            runs: Vec::new(),
            spilled: 0,
            total: 0,
        }
    }

    /// Limit the number of runs merged at once (at least 2).
    pub fn with_fan_in(mut self, fan_in: usize) -> Self {
        self.fan_in = fan_in.max(2);
        self
    }

    /// Add a key. Keys must not contain line breaks.
    pub fn push(&mut self, key: String) -> Result<()> {
        self.buffer_bytes += key.len() + KEY_OVERHEAD_BYTES;
        self.buffer.push(key);
        self.total += 1;
        if self.buffer_bytes >= self.budget_bytes {
            self.spill()?;
        }
        Ok(())
    }

    /// Number of keys pushed.
    pub fn len(&self) -> u64 {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Number of runs spilled to disk so far.
    pub fn spilled_runs(&self) -> usize {
        self.spilled
    }

    /// Number of run files currently held open.
    pub fn open_runs(&self) -> usize {
        self.runs.len()
    }

    /// Finish collecting and return all keys in sorted order.
    pub fn finish(mut self) -> Result<SortedKeys> {
        if self.runs.is_empty() {
            self.buffer.sort_by(|a, b| cmp_ci(a, b));
            return Ok(SortedKeys::Memory(self.buffer.into_iter()));
        }

        if !self.buffer.is_empty() {
            self.spill()?;
        }
        while self.runs.len() > self.fan_in {
            self.merge_tail(self.fan_in)?;
        }
        debug!(runs = self.runs.len(), keys = self.total, "merging sorted runs");

        let files = self.runs.into_iter().map(|run| run.file).collect();
        Ok(SortedKeys::Merge(RunMerge::open(files)?))
    }

    fn spill(&mut self) -> Result<()> {
        self.buffer.sort_by(|a, b| cmp_ci(a, b));
        let file = write_run(self.buffer.drain(..).map(Ok))?;
        self.runs.push(Run { file, level: 0 });
        self.buffer_bytes = 0;
        self.spilled += 1;
        debug!(run = self.spilled, open = self.runs.len(), "spilled sorted run");

        // Merge full tiers, cascading upwards
        while self.runs.len() >= self.fan_in {
            let tail = &self.runs[self.runs.len() - self.fan_in..];
            let level = tail[0].level;
            if tail.iter().any(|run| run.level != level) {
                break;
            }
            self.merge_tail(self.fan_in)?;
        }
        Ok(())
    }

    /// Merge the last `count` runs into one run of the next level.
    fn merge_tail(&mut self, count: usize) -> Result<()> {
        let start = self.runs.len() - count;
        let tail: Vec<Run> = self.runs.drain(start..).collect();
        let level = tail.iter().map(|run| run.level).max().unwrap_or(0) + 1;
        let mut merge = RunMerge::open(tail.into_iter().map(|run| run.file).collect())?;
        let file = write_run(std::iter::from_fn(|| merge.next_key().transpose()))?;
        self.runs.push(Run { file, level });
        debug!(level, open = self.runs.len(), "merged sorted runs");
        Ok(())
    }
}

/// Write sorted keys to an anonymous temporary file.
fn write_run<I: Iterator<Item = Result<String>>>(keys: I) -> Result<File> {
    let file = tempfile::tempfile().map_err(sort_error)?;
    let mut out = BufWriter::new(file);
    for key in keys {
        writeln!(out, "{}", key?).map_err(sort_error)?;
    }
    out.into_inner().map_err(|e| sort_error(e.into_error()))
}

fn sort_error(e: std::io::Error) -> anyhow::Error {
    CompassError::SortError {
        message: e.to_string(),
    }
    .into()
}

/// Sorted output of an [`ExternalSorter`].
pub enum SortedKeys {
    Memory(std::vec::IntoIter<String>),
    Merge(RunMerge),
}

impl SortedKeys {
    pub fn empty() -> Self {
        SortedKeys::Memory(Vec::new().into_iter())
    }
}

impl Iterator for SortedKeys {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            SortedKeys::Memory(keys) => keys.next().map(Ok),
            SortedKeys::Merge(merge) => merge.next_key().transpose(),
        }
    }
}

struct HeapEntry {
    key: String,
    run: usize,
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        cmp_ci(&self.key, &other.key).then(self.run.cmp(&other.run))
    }
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

/// K-way merge over spilled runs.
pub struct RunMerge {
    readers: Vec<Lines<BufReader<File>>>,
    heap: BinaryHeap<Reverse<HeapEntry>>,
}

impl RunMerge {
    fn open(files: Vec<File>) -> Result<Self> {
        let mut readers = Vec::with_capacity(files.len());
        for mut file in files {
            file.seek(SeekFrom::Start(0)).map_err(sort_error)?;
            readers.push(BufReader::new(file).lines());
        }
        let mut merge = RunMerge {
            readers,
            heap: BinaryHeap::new(),
        };
        for run in 0..merge.readers.len() {
            merge.refill(run)?;
        }
        Ok(merge)
    }

    fn refill(&mut self, run: usize) -> Result<()> {
        if let Some(line) = self.readers[run].next() {
            let key = line.map_err(sort_error)?;
            self.heap.push(Reverse(HeapEntry { key, run }));
        }
        Ok(())
    }

    fn next_key(&mut self) -> Result<Option<String>> {
        let Some(Reverse(entry)) = self.heap.pop() else {
            return Ok(None);
        };
        self.refill(entry.run)?;
        Ok(Some(entry.key))
    }
}
