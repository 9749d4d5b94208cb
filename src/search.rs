use log::{debug, info};
use std::fmt;

use crate::config::SearchConfig;
use crate::digits::{DigitSource, DigitStream};
use crate::error::{self, Result};
use crate::hash_index::{HashIndex, Probe};
use crate::rolling_hash::WindowKey;

/// The earliest repeat known so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestMatch {
    /// Offset of the second occurrence.
    pub position: u64,
    pub digits: Vec<u8>,
}

impl BestMatch {
    /// Offset one past the last digit of the match.
    pub fn end(&self) -> u64 {
        self.position + self.digits.len() as u64
    }
}

impl fmt::Display for BestMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in &self.digits {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Progress notifications emitted while a search runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    BatchStarted { index: u64, start: u64 },
    /// Found past the end of a batch; a later batch may still beat it.
    Candidate(BestMatch),
    /// Found while recording windows; nothing earlier exists.
    Confirmed(BestMatch),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchReport {
    pub best: Option<BestMatch>,
    /// False when the scan ceiling cut the search short.
    pub exhaustive: bool,
    pub batches: u64,
}

/// Batch-and-retry search for the earliest repeated window.
///
/// Each batch records B consecutive windows in a fresh index, reporting the
/// first window already seen. When a batch finds nothing, scanning continues
/// past its end with the index frozen, to catch a repeat whose first copy lies
/// inside the batch. The next batch then starts where this one's recording
/// stopped, and only matters while it can still beat the best result.
pub struct SearchEngine<S: DigitSource> {
    source: S,
    config: SearchConfig,
    index: HashIndex,
    /// Batch buffer: digit `i` is stream digit `start + i`.
    digits: Vec<u8>,
    /// Sliding window for the retry phase.
    rolling: Vec<u8>,
}

impl<S: DigitSource> SearchEngine<S> {
    /// Validate `config` and allocate every buffer the run will use.
    pub fn new(source: S, config: SearchConfig) -> Result<Self> {
        config.validate()?;
        let index = HashIndex::new(config.window_len, config.key_digits, config.batch_size)?;
        let mut digits = Vec::new();
        digits
            .try_reserve_exact(config.buffer_len())
            .map_err(|_| error::SearchError::Allocation {
                what: "digit buffer",
                bytes: config.buffer_len(),
            })?;
        let rolling = error::try_zeroed(config.window_len, "retry window")?;
        Ok(Self {
            source,
            config,
            index,
            digits,
            rolling,
        })
    }

    #[cfg(test)]
    pub fn run(&mut self) -> Result<SearchReport> {
        self.run_with(|_| {})
    }

    /// Run to completion, passing every progress event to `observe`.
    pub fn run_with(&mut self, mut observe: impl FnMut(&SearchEvent)) -> Result<SearchReport> {
        let n = self.config.window_len;
        let batch = self.config.batch_size as u64;
        let max_total = self.config.max_total;

        let mut start = 0u64;
        let mut best: Option<BestMatch> = None;
        let mut batches = 0u64;

        while best.as_ref().map_or(true, |b| start < b.position) && start <= max_total {
            observe(&SearchEvent::BatchStarted {
                index: batches,
                start,
            });
            batches += 1;

            self.index.clear();
            self.digits.clear();
            let mut stream = self.source.open_at(start)?;
            let mut key = WindowKey::new(self.config.key_space());

            for _ in 0..n - 1 {
                self.digits.push(stream.next_digit()?);
            }
            key.init(&self.digits);

            // Insertion phase.
            let mut recorded = 0usize;
            for i in 0..self.config.batch_size {
                let position = start + i as u64;
                if best.as_ref().is_some_and(|b| position >= b.position) {
                    break;
                }
                let d = stream.next_digit()?;
                self.digits.push(d);
                key.push(d);
                recorded += 1;

                if self
                    .index
                    .test_and_maybe_insert(key.digest(), &self.digits, Probe::Insert(i as u32))
                {
                    let found = BestMatch {
                        position,
                        digits: self.digits[i..i + n].to_vec(),
                    };
                    info!("Confirmed repeat at offset {}: {}", position, found);
                    observe(&SearchEvent::Confirmed(found.clone()));
                    return Ok(SearchReport {
                        best: Some(found),
                        exhaustive: true,
                        batches,
                    });
                }
            }

            if recorded == self.config.batch_size {
                // Retry phase: keep sliding past the batch without recording.
                let last = recorded - 1;
                self.rolling.copy_from_slice(&self.digits[last..last + n]);
                let mut dist = start + batch;
                debug!("Batch exhausted, scanning read-only from offset {}", dist);

                while best.as_ref().map_or(true, |b| dist < b.position) && dist <= max_total {
                    let d = stream.next_digit()?;
                    self.rolling.copy_within(1.., 0);
                    self.rolling[n - 1] = d;
                    key.push(d);

                    if self.index.test_and_maybe_insert(
                        key.digest(),
                        &self.digits,
                        Probe::Lookup(&self.rolling),
                    ) {
                        let found = BestMatch {
                            position: dist,
                            digits: self.rolling.clone(),
                        };
                        info!("Possible repeat at offset {}: {}", dist, found);
                        observe(&SearchEvent::Candidate(found.clone()));
                        best = Some(found);
                        break;
                    }
                    dist += 1;
                }
            }

            start += batch;
        }

        let exhaustive = best.as_ref().is_some_and(|b| start >= b.position);
        Ok(SearchReport {
            best,
            exhaustive,
            batches,
        })
    }
}
