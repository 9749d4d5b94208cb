use crate::error::{self, Result};

/// Arena slot 0 means "no entry".
const NONE: u32 = 0;

#[derive(Debug, Clone, Copy, Default)]
struct IndexEntry {
    next: u32,
    /// Offset of the window's first digit in the batch buffer.
    offset: u32,
}

/// The candidate window handed to [`HashIndex::test_and_maybe_insert`].
#[derive(Debug, Clone, Copy)]
pub enum Probe<'a> {
    /// Window starting at this offset of the batch buffer; recorded on a miss.
    Insert(u32),
    /// Window held outside the batch buffer; the index is never mutated.
    Lookup(&'a [u8]),
}

/// Fixed-capacity multimap from a window key to the windows recorded under it.
///
/// Heads are indexed by key; chains are linked through an entry arena sized
/// once for a whole run and reused batch after batch.
pub struct HashIndex {
    heads: Vec<u32>,
    entries: Vec<IndexEntry>,
    next_free: u32,
    window_len: usize,
    /// N - K: leading digits compared once keys agree.
    prefix_len: usize,
}

impl HashIndex {
    pub fn new(window_len: usize, key_digits: u32, capacity: usize) -> Result<Self> {
        let heads = error::try_zeroed(10usize.pow(key_digits), "key table")?;
        let entries = error::try_zeroed(capacity + 1, "index arena")?;
        Ok(Self {
            heads,
            entries,
            next_free: 1,
            window_len,
            prefix_len: window_len - key_digits as usize,
        })
    }

    /// Forget every recorded window. Keeps all allocations.
    pub fn clear(&mut self) {
        self.heads.fill(NONE);
        self.next_free = 1;
    }

    /// Number of windows recorded since the last clear.
    pub fn len(&self) -> usize {
        self.next_free as usize - 1
    }

    pub fn capacity(&self) -> usize {
        self.entries.len() - 1
    }

    /// Report whether a window equal to the probe is already recorded under `key`.
    ///
    /// `digits` is the batch buffer all recorded offsets point into. Keys
    /// agree only when the trailing K digits agree, so just the leading N-K
    /// digits are compared. On a miss an `Insert` probe is appended to the end
    /// of its chain, unless the arena is full.
    pub fn test_and_maybe_insert(&mut self, key: u32, digits: &[u8], probe: Probe<'_>) -> bool {
        let candidate = match probe {
            Probe::Insert(offset) => &digits[offset as usize..offset as usize + self.window_len],
            Probe::Lookup(window) => window,
        };
        let candidate = &candidate[..self.prefix_len];

        let mut tail = NONE;
        let mut slot = self.heads[key as usize];
        while slot != NONE {
            let entry = self.entries[slot as usize];
            let stored = entry.offset as usize;
            if digits[stored..stored + self.prefix_len] == *candidate {
                return true;
            }
            tail = slot;
            slot = entry.next;
        }

        if let Probe::Insert(offset) = probe {
            if self.len() < self.capacity() {
                let new = self.next_free;
                self.entries[new as usize] = IndexEntry { next: NONE, offset };
                if tail == NONE {
                    self.heads[key as usize] = new;
                } else {
                    self.entries[tail as usize].next = new;
                }
                self.next_free += 1;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rolling_hash::WindowKey;

    fn key_of(window: &[u8], key_digits: u32) -> u32 {
        let mut key = WindowKey::new(10u32.pow(key_digits));
        key.init(window);
        key.digest()
    }

    fn insert(index: &mut HashIndex, digits: &[u8], offset: usize, n: usize, k: u32) -> bool {
        let key = key_of(&digits[offset..offset + n], k);
        index.test_and_maybe_insert(key, digits, Probe::Insert(offset as u32))
    }

    #[test]
    fn test_repeat_hits_and_distinct_misses() {
        // "121212", N=2, K=1
        let digits = [1, 2, 1, 2, 1, 2];
        let mut index = HashIndex::new(2, 1, 8).unwrap();
        assert!(!insert(&mut index, &digits, 0, 2, 1));
        assert!(!insert(&mut index, &digits, 1, 2, 1));
        assert!(insert(&mut index, &digits, 2, 2, 1));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_key_collision_is_not_a_hit() {
        // 1234 and 5234 share the key 234 with K=3.
        let digits = [1, 2, 3, 4, 5, 2, 3, 4];
        let mut index = HashIndex::new(4, 3, 8).unwrap();
        assert!(!insert(&mut index, &digits, 0, 4, 3));
        assert!(!insert(&mut index, &digits, 4, 4, 3));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_full_chain_walk_finds_older_entry() {
        // Same key 9 for all; prefixes 5, 1, 3 recorded in that order.
        let digits = [5, 9, 1, 9, 3, 9, 1, 9];
        let mut index = HashIndex::new(2, 1, 8).unwrap();
        for offset in [0, 2, 4] {
            assert!(!insert(&mut index, &digits, offset, 2, 1));
        }
        assert!(insert(&mut index, &digits, 6, 2, 1));
    }

    #[test]
    fn test_lookup_never_mutates() {
        let digits = [4, 2, 0, 0];
        let mut index = HashIndex::new(2, 1, 4).unwrap();
        assert!(!insert(&mut index, &digits, 0, 2, 1));

        assert!(!index.test_and_maybe_insert(key_of(&[7, 2], 1), &digits, Probe::Lookup(&[7, 2])));
        assert_eq!(index.len(), 1);
        assert!(index.test_and_maybe_insert(key_of(&[4, 2], 1), &digits, Probe::Lookup(&[4, 2])));
    }

    #[test]
    fn test_clear_resets_without_reallocating() {
        let digits = [1, 1, 1];
        let mut index = HashIndex::new(2, 1, 2).unwrap();
        assert!(!insert(&mut index, &digits, 0, 2, 1));
        assert!(insert(&mut index, &digits, 1, 2, 1));

        index.clear();
        assert_eq!(index.len(), 0);
        assert_eq!(index.capacity(), 2);
        assert!(!insert(&mut index, &digits, 1, 2, 1));
    }

    #[test]
    fn test_full_arena_stops_recording() {
        let digits = [1, 2, 3, 4, 1, 2, 3, 4];
        let mut index = HashIndex::new(2, 1, 2).unwrap();
        assert!(!insert(&mut index, &digits, 0, 2, 1));
        assert!(!insert(&mut index, &digits, 1, 2, 1));
        assert!(!insert(&mut index, &digits, 2, 2, 1));
        assert_eq!(index.len(), 2);
        // 34 was never recorded; 12 and 23 were.
        assert!(!insert(&mut index, &digits, 6, 2, 1));
        assert!(insert(&mut index, &digits, 4, 2, 1));
    }
}
