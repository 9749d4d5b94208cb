use crate::error::{Result, SearchError};

pub const DEFAULT_KEY_DIGITS: u32 = 8;
/// Must fit a 32-bit arena offset.
pub const DEFAULT_BATCH_SIZE: usize = 500_000_000;
pub const DEFAULT_MAX_TOTAL: u64 = 15_000_000_000;

/// Keys are held as `u32` table indices.
pub const MAX_KEY_DIGITS: u32 = 9;

/// Parameters fixed for the lifetime of one search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    /// N: length of the repeated string being searched for.
    pub window_len: usize,
    /// K: trailing digits used as the hash key. Must be below N.
    pub key_digits: u32,
    /// B: windows recorded per batch.
    pub batch_size: usize,
    /// Scan ceiling: no window starting past this offset is examined.
    pub max_total: u64,
}

impl SearchConfig {
    pub fn new(window_len: usize) -> Self {
        Self {
            window_len,
            key_digits: DEFAULT_KEY_DIGITS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_total: DEFAULT_MAX_TOTAL,
        }
    }

    pub fn with_key_digits(mut self, key_digits: u32) -> Self {
        self.key_digits = key_digits;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_max_total(mut self, max_total: u64) -> Self {
        self.max_total = max_total;
        self
    }

    /// Reject configurations before anything is allocated.
    pub fn validate(&self) -> Result<()> {
        if self.window_len == 0 {
            return Err(SearchError::Config("window length must be positive".into()));
        }
        if self.key_digits as usize >= self.window_len {
            return Err(SearchError::Config(format!(
                "key digits ({}) must be less than the window length ({})",
                self.key_digits, self.window_len
            )));
        }
        if self.key_digits > MAX_KEY_DIGITS {
            return Err(SearchError::Config(format!(
                "key digits ({}) must not exceed {}",
                self.key_digits, MAX_KEY_DIGITS
            )));
        }
        if self.batch_size == 0 {
            return Err(SearchError::Config("batch size must be positive".into()));
        }
        if self.batch_size >= u32::MAX as usize {
            return Err(SearchError::Config(format!(
                "batch size ({}) must be below {}",
                self.batch_size,
                u32::MAX
            )));
        }
        Ok(())
    }

    /// Size of the key space, 10^K.
    pub fn key_space(&self) -> u32 {
        10u32.pow(self.key_digits)
    }

    /// Digits held by one batch buffer: the first window plus one per extra window.
    pub fn buffer_len(&self) -> usize {
        self.window_len - 1 + self.batch_size
    }
}
