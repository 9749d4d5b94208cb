use crate::error::{Result, SearchError};

/// A forward-only cursor over a stream of decimal digits.
pub trait DigitStream {
    /// Next digit (0-9). Running out of digits is an error, never a silent end.
    fn next_digit(&mut self) -> Result<u8>;

    /// Discard `count` digits. Sources that can seek should override this,
    /// as long as the digits that follow are unchanged.
    fn skip(&mut self, count: u64) -> Result<()> {
        for _ in 0..count {
            self.next_digit()?;
        }
        Ok(())
    }
}

/// Something that can hand out fresh streams over the same digits.
pub trait DigitSource {
    type Stream: DigitStream;

    fn open(&self) -> Result<Self::Stream>;

    /// A stream whose first digit is the one at `offset`.
    fn open_at(&self, offset: u64) -> Result<Self::Stream> {
        let mut stream = self.open()?;
        stream.skip(offset)?;
        Ok(stream)
    }
}

/// Digits held in memory.
#[derive(Debug, Clone)]
pub struct MemoryDigits {
    digits: std::sync::Arc<[u8]>,
}

impl MemoryDigits {
    pub fn new(digits: Vec<u8>) -> Self {
        Self {
            digits: digits.into(),
        }
    }

    /// Parse a string of ASCII digits. Whitespace is ignored.
    pub fn from_text(text: &str) -> Result<Self> {
        let mut digits = Vec::with_capacity(text.len());
        for (i, c) in text.chars().enumerate() {
            match c {
                '0'..='9' => digits.push(c as u8 - b'0'),
                c if c.is_ascii_whitespace() => {}
                c => {
                    return Err(SearchError::MalformedSource {
                        path: "<memory>".into(),
                        reason: format!("unexpected character {c:?} at index {i}"),
                    })
                }
            }
        }
        Ok(Self::new(digits))
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }
}

impl DigitSource for MemoryDigits {
    type Stream = MemoryStream;

    fn open(&self) -> Result<MemoryStream> {
        Ok(MemoryStream {
            digits: self.digits.clone(),
            pos: 0,
        })
    }
}

pub struct MemoryStream {
    digits: std::sync::Arc<[u8]>,
    pos: u64,
}

impl DigitStream for MemoryStream {
    fn next_digit(&mut self) -> Result<u8> {
        let d = *self
            .digits
            .get(self.pos as usize)
            .ok_or(SearchError::StreamExhausted { offset: self.pos })?;
        self.pos += 1;
        Ok(d)
    }

    fn skip(&mut self, count: u64) -> Result<()> {
        // Exhaustion surfaces on the next read, as it would for a skip-by-reading.
        self.pos = self.pos.saturating_add(count);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn take(stream: &mut impl DigitStream, n: usize) -> Vec<u8> {
        (0..n).map(|_| stream.next_digit().unwrap()).collect()
    }

    #[test]
    fn test_from_text_ignores_whitespace() {
        let source = MemoryDigits::from_text("1415926535 8979323846\n2643").unwrap();
        assert_eq!(source.len(), 24);
        let mut stream = source.open().unwrap();
        assert_eq!(take(&mut stream, 4), vec![1, 4, 1, 5]);
    }

    #[test]
    fn test_from_text_rejects_other_characters() {
        let err = MemoryDigits::from_text("3.14").unwrap_err();
        assert!(matches!(err, SearchError::MalformedSource { .. }));
    }

    #[test]
    fn test_open_at_matches_discarding() {
        let source = MemoryDigits::from_text("0123456789").unwrap();
        let mut skipped = source.open_at(6).unwrap();

        let mut read = source.open().unwrap();
        take(&mut read, 6);

        assert_eq!(take(&mut skipped, 4), take(&mut read, 4));
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let source = MemoryDigits::from_text("12").unwrap();
        let mut stream = source.open_at(1).unwrap();
        assert_eq!(stream.next_digit().unwrap(), 2);
        assert!(matches!(
            stream.next_digit(),
            Err(SearchError::StreamExhausted { offset: 2 })
        ));
    }

    #[test]
    fn test_default_skip_reads_through() {
        struct Counter(u8);
        impl DigitStream for Counter {
            fn next_digit(&mut self) -> Result<u8> {
                let d = self.0;
                self.0 = (self.0 + 1) % 10;
                Ok(d)
            }
        }

        let mut counter = Counter(0);
        counter.skip(13).unwrap();
        assert_eq!(counter.next_digit().unwrap(), 3);
    }
}
