//! Line-oriented file helpers
//!
//! Test output can be arbitrarily large (a runaway loop printing forever until the timeout), so anything that copies
//! it works line by line through [`BoundedLines`] and stops reading as soon as the cap is reached. Lines are raw
//! bytes: test binaries are not obliged to print UTF-8.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Iterator over at most `limit` lines of a reader, terminators included.
pub struct BoundedLines<R> {
    reader: R,
    limit: usize,
    taken: usize,
}

impl<R: BufRead> BoundedLines<R> {
    pub fn new(reader: R, limit: usize) -> Self {
        Self {
            reader,
            limit,
            taken: 0,
        }
    }

    /// Number of lines yielded so far
    pub fn taken(&self) -> usize {
        self.taken
    }

    /// Whether the reader holds anything past the lines yielded so far.
    pub fn has_more(&mut self) -> io::Result<bool> {
        Ok(!self.reader.fill_buf()?.is_empty())
    }
}

impl<R: BufRead> Iterator for BoundedLines<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.taken >= self.limit {
            return None;
        }
        let mut line = Vec::new();
        match self.reader.read_until(b'\n', &mut line) {
            Ok(0) => None,
            Ok(_) => {
                self.taken += 1;
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// Outcome of [`copy_lines`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CopiedLines {
    pub lines: usize,
    /// More input remained when the limit was hit
    pub truncated: bool,
}

/// Copy at most `limit` lines from `reader` to `writer`.
pub fn copy_lines<R: BufRead, W: Write>(reader: R, writer: &mut W, limit: usize) -> io::Result<CopiedLines> {
    let mut lines = BoundedLines::new(reader, limit);
    for line in lines.by_ref() {
        writer.write_all(&line?)?;
    }
    let truncated = lines.taken() == limit && lines.has_more()?;
    Ok(CopiedLines {
        lines: lines.taken(),
        truncated,
    })
}

/// Write `output` with the leading lines of `input` dropped.
///
/// Lines are numbered from 1 and every line from `first_kept_line` on is kept, so `0` and `1` both copy the whole
/// file. Used by test scripts to strip tool banners before a comparison. Returns the number of lines written.
pub fn tail(input: &Path, output: &Path, first_kept_line: usize) -> io::Result<usize> {
    let reader = BufReader::new(File::open(input)?);
    let mut writer = BufWriter::new(File::create(output)?);

    let skip = first_kept_line.saturating_sub(1);
    let mut written = 0;
    for line in BoundedLines::new(reader, usize::MAX).skip(skip) {
        writer.write_all(&line?)?;
        written += 1;
    }
    writer.flush()?;
    Ok(written)
}
