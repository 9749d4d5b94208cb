use log::{debug, info};
use memmap2::Mmap;
use std::path::{Path, PathBuf};

use crate::digits::{DigitSource, DigitStream};
use crate::error::{Result, SearchError};
use crate::util;

const SEGMENT_PREFIX: &str = "pi-";
const SEGMENT_SUFFIX: &str = ".txt";

/// How digits are laid out across segment files.
///
/// Each segment holds `lines_per_segment` lines of `digits_per_line` digits,
/// grouped with spaces. Anything after the last digit of a line is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentLayout {
    pub digits_per_line: usize,
    pub lines_per_segment: u64,
}

impl Default for SegmentLayout {
    fn default() -> Self {
        Self {
            digits_per_line: 100,
            lines_per_segment: 1_000_000,
        }
    }
}

impl SegmentLayout {
    pub fn segment_digits(&self) -> u64 {
        self.digits_per_line as u64 * self.lines_per_segment
    }
}

/// File name of the 0-based segment `index`; files are numbered from 1.
pub fn segment_file_name(index: u64) -> String {
    format!("{SEGMENT_PREFIX}{:04}{SEGMENT_SUFFIX}", index + 1)
}

fn parse_segment_number(name: &str) -> Option<u64> {
    name.strip_prefix(SEGMENT_PREFIX)?
        .strip_suffix(SEGMENT_SUFFIX)?
        .parse()
        .ok()
}

/// Digits of pi spread over numbered segment files in one directory.
#[derive(Debug, Clone)]
pub struct SegmentedPiFiles {
    dir: PathBuf,
    layout: SegmentLayout,
    segments: u64,
}

impl SegmentedPiFiles {
    /// Scan `dir` for `pi-0001.txt`, `pi-0002.txt`, ... and stop at the first gap.
    pub fn new(dir: &Path, layout: SegmentLayout) -> Result<Self> {
        if layout.digits_per_line == 0 || layout.lines_per_segment == 0 {
            return Err(SearchError::Config("segment layout must be non-empty".into()));
        }
        let numbers = util::numbered_files(dir, parse_segment_number)?;
        let segments = util::consecutive_from(&numbers, 1);
        if segments == 0 {
            return Err(SearchError::MalformedSource {
                path: dir.join(segment_file_name(0)),
                reason: "no digit segments found".into(),
            });
        }
        info!(
            "Found {} digit segment(s) in {} ({} digits)",
            segments,
            dir.display(),
            segments * layout.segment_digits()
        );
        Ok(Self {
            dir: dir.to_path_buf(),
            layout,
            segments,
        })
    }

    /// Upper bound on the digits available, assuming every segment is full.
    pub fn available_digits(&self) -> u64 {
        self.segments * self.layout.segment_digits()
    }
}

impl DigitSource for SegmentedPiFiles {
    type Stream = SegmentStream;

    fn open(&self) -> Result<SegmentStream> {
        Ok(SegmentStream {
            files: self.clone(),
            segment: 0,
            map: None,
            path: PathBuf::new(),
            cursor: 0,
            line_digits: 0,
            segment_emitted: 0,
            offset: 0,
        })
    }
}

pub struct SegmentStream {
    files: SegmentedPiFiles,
    segment: u64,
    map: Option<Mmap>,
    path: PathBuf,
    /// Byte position in the mapped segment.
    cursor: usize,
    /// Digits read from the current line.
    line_digits: usize,
    /// Digits read from the current segment.
    segment_emitted: u64,
    /// Absolute offset of the next digit.
    offset: u64,
}

impl SegmentStream {
    fn ensure_mapped(&mut self) -> Result<()> {
        if self.map.is_some() {
            return Ok(());
        }
        if self.segment >= self.files.segments {
            return Err(SearchError::StreamExhausted {
                offset: self.offset,
            });
        }
        self.path = self.files.dir.join(segment_file_name(self.segment));
        debug!("Opening {}", self.path.display());
        self.map = Some(util::mmap_file(&self.path)?);
        self.cursor = 0;
        self.line_digits = 0;
        Ok(())
    }

    fn next_segment(&mut self) {
        self.map = None;
        self.segment += 1;
        self.segment_emitted = 0;
        self.line_digits = 0;
    }

    fn malformed(&self, reason: String) -> SearchError {
        SearchError::MalformedSource {
            path: self.path.clone(),
            reason,
        }
    }

    /// Skip over one whole line of digits, checking it holds a full line.
    /// Returns false, without moving, when the segment ends first.
    fn skip_line(&mut self) -> Result<bool> {
        self.ensure_mapped()?;
        let Some(map) = self.map.as_ref() else {
            return Ok(false);
        };
        if self.line_digits != 0 {
            return Ok(false);
        }
        let wanted = self.files.layout.digits_per_line;
        let mut seen = 0;
        let mut cursor = self.cursor;
        while seen < wanted {
            let Some(&byte) = map.get(cursor) else {
                return Ok(false);
            };
            cursor += 1;
            match byte {
                b'0'..=b'9' => seen += 1,
                b' ' | b'\t' | b'\r' => {}
                b'\n' if seen == 0 => {}
                b'\n' => {
                    return Err(self.malformed(format!(
                        "line ends after {} of {} digits",
                        seen, wanted
                    )))
                }
                other => {
                    return Err(self.malformed(format!(
                        "unexpected byte 0x{other:02x} at byte {}",
                        cursor - 1
                    )))
                }
            }
        }
        // The rest of the line, e.g. a trailing digit counter, is not counted.
        self.cursor = match map[cursor..].iter().position(|&b| b == b'\n') {
            Some(len) => cursor + len + 1,
            None => map.len(),
        };
        Ok(true)
    }
}

impl DigitStream for SegmentStream {
    fn next_digit(&mut self) -> Result<u8> {
        let layout = self.files.layout;
        loop {
            if self.segment_emitted == layout.segment_digits() {
                self.next_segment();
            }
            self.ensure_mapped()?;
            let Some(map) = self.map.as_ref() else {
                continue;
            };

            if self.line_digits == layout.digits_per_line {
                // Drop the rest of the line, e.g. a trailing digit counter.
                match map[self.cursor..].iter().position(|&b| b == b'\n') {
                    Some(len) => self.cursor += len + 1,
                    None => self.cursor = map.len(),
                }
                self.line_digits = 0;
            }

            let Some(&byte) = map.get(self.cursor) else {
                // The segment ended short of its nominal size: no more digits exist.
                return Err(SearchError::StreamExhausted {
                    offset: self.offset,
                });
            };
            self.cursor += 1;

            match byte {
                b'0'..=b'9' => {
                    self.line_digits += 1;
                    self.segment_emitted += 1;
                    self.offset += 1;
                    return Ok(byte - b'0');
                }
                b' ' | b'\t' | b'\r' => {}
                b'\n' if self.line_digits == 0 => {}
                b'\n' => {
                    return Err(self.malformed(format!(
                        "line ends after {} of {} digits",
                        self.line_digits, layout.digits_per_line
                    )))
                }
                other => {
                    return Err(self.malformed(format!(
                        "unexpected byte 0x{other:02x} at byte {}",
                        self.cursor - 1
                    )))
                }
            }
        }
    }

    fn skip(&mut self, mut count: u64) -> Result<()> {
        let layout = self.files.layout;

        // Whole segments need no reading at all.
        loop {
            let remaining = layout.segment_digits() - self.segment_emitted;
            if count < remaining {
                break;
            }
            count -= remaining;
            self.offset += remaining;
            self.next_segment();
        }

        while count >= layout.digits_per_line as u64 && self.skip_line()? {
            count -= layout.digits_per_line as u64;
            self.offset += layout.digits_per_line as u64;
            self.segment_emitted += layout.digits_per_line as u64;
        }

        for _ in 0..count {
            self.next_digit()?;
        }
        Ok(())
    }
}

/// One file of ASCII digits; whitespace anywhere is ignored.
pub struct PlainDigitFile {
    path: PathBuf,
    map: std::sync::Arc<Mmap>,
}

impl PlainDigitFile {
    pub fn open(path: &Path) -> Result<Self> {
        let map = util::mmap_file(path)?;
        info!("Mapped {} ({} bytes)", path.display(), map.len());
        Ok(Self {
            path: path.to_path_buf(),
            map: std::sync::Arc::new(map),
        })
    }
}

impl DigitSource for PlainDigitFile {
    type Stream = PlainStream;

    fn open(&self) -> Result<PlainStream> {
        Ok(PlainStream {
            path: self.path.clone(),
            map: self.map.clone(),
            cursor: 0,
            offset: 0,
        })
    }
}

pub struct PlainStream {
    path: PathBuf,
    map: std::sync::Arc<Mmap>,
    cursor: usize,
    offset: u64,
}

impl DigitStream for PlainStream {
    fn next_digit(&mut self) -> Result<u8> {
        loop {
            let Some(&byte) = self.map.get(self.cursor) else {
                return Err(SearchError::StreamExhausted {
                    offset: self.offset,
                });
            };
            self.cursor += 1;
            match byte {
                b'0'..=b'9' => {
                    self.offset += 1;
                    return Ok(byte - b'0');
                }
                b if b.is_ascii_whitespace() => {}
                other => {
                    return Err(SearchError::MalformedSource {
                        path: self.path.clone(),
                        reason: format!("unexpected byte 0x{other:02x} at byte {}", self.cursor - 1),
                    })
                }
            }
        }
    }
}
