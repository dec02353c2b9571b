//! Incremental, rotation-safe file tailing
//!
//! The tailer remembers a byte offset per path. Every poll reads from that
//! offset to end-of-file and stores the new end position. A file that shrank
//! below its stored offset is treated as rotated and read again from the start.

use crate::{LogLine, LogSource};
use std::collections::{HashMap, VecDeque};
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
pub struct Tailer {
    // path -> byte position right after the last consumed line
    offsets: HashMap<PathBuf, u64>,
}

impl Tailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored offset for a path, None if it was never read
    pub fn offset(&self, path: &Path) -> Option<u64> {
        self.offsets.get(path).copied()
    }

    /// Lines appended to `source` since the last read of its path.
    /// Line numbers restart at 1 on every call; blank lines are skipped.
    pub fn poll_new(&mut self, source: &LogSource) -> Vec<LogLine> {
        match self.read_new(source) {
            Ok(lines) => {
                if !lines.is_empty() {
                    debug!(source = %source.name, lines = lines.len(), "read new lines");
                }
                lines
            }
            Err(e) => {
                report_read_error(source, &e);
                Vec::new()
            }
        }
    }

    /// poll_new over every enabled source, in configured order
    pub fn poll_all(&mut self, sources: &[LogSource]) -> Vec<LogLine> {
        let mut lines = Vec::new();
        for source in sources.iter().filter(|s| s.enabled) {
            lines.extend(self.poll_new(source));
        }
        lines
    }

    /// The last `n` non-blank lines of the file, numbered by their position
    /// in the whole file. Moves the stored offset to end-of-file so the next
    /// poll only sees what is appended after this snapshot.
    pub fn read_last_n(&mut self, source: &LogSource, n: usize) -> Vec<LogLine> {
        match self.read_tail(source, n) {
            Ok(lines) => lines,
            Err(e) => {
                report_read_error(source, &e);
                Vec::new()
            }
        }
    }

    /// Set every enabled source's offset to its current size without reading.
    /// Missing files are left alone and start from 0 once they appear.
    pub fn initialize_positions(&mut self, sources: &[LogSource]) {
        for source in sources.iter().filter(|s| s.enabled) {
            match fs::metadata(&source.path) {
                Ok(meta) => {
                    self.offsets.insert(source.path.clone(), meta.len());
                }
                Err(e) => {
                    debug!(source = %source.name, path = %source.path.display(), error = %e, "skipping position init");
                }
            }
        }
    }

    fn read_new(&mut self, source: &LogSource) -> io::Result<Vec<LogLine>> {
        let mut file = File::open(&source.path)?;
        let size = file.metadata()?.len();

        let mut offset = self.offset(&source.path).unwrap_or(0);
        if size < offset {
            info!(
                source = %source.name,
                path = %source.path.display(),
                size,
                offset,
                "file shrank, assuming rotation and reading from the start"
            );
            offset = 0;
        }
        file.seek(SeekFrom::Start(offset))?;

        let mut lines = Vec::new();
        let mut line_number = 0;
        let consumed = for_each_line(BufReader::new(file), |text| {
            if text.is_empty() {
                return;
            }
            line_number += 1;
            lines.push(make_line(source, text, line_number));
        })?;

        self.offsets.insert(source.path.clone(), offset + consumed);
        Ok(lines)
    }

    fn read_tail(&mut self, source: &LogSource, n: usize) -> io::Result<Vec<LogLine>> {
        let file = File::open(&source.path)?;

        let mut window: VecDeque<LogLine> = VecDeque::with_capacity(n.min(1024));
        let mut physical = 0;
        let consumed = for_each_line(BufReader::new(file), |text| {
            physical += 1;
            if text.is_empty() || n == 0 {
                return;
            }
            if window.len() == n {
                window.pop_front();
            }
            window.push_back(make_line(source, text, physical));
        })?;

        self.offsets.insert(source.path.clone(), consumed);
        Ok(window.into())
    }
}

fn make_line(source: &LogSource, text: &str, line_number: u64) -> LogLine {
    LogLine {
        source_name: source.name.clone(),
        source_type: source.source_type.clone(),
        text: text.to_string(),
        line_number,
    }
}

// feed every physical line (trimmed, invalid utf-8 replaced) to `visit`,
// returning the number of bytes consumed
fn for_each_line<R: BufRead>(mut reader: R, mut visit: impl FnMut(&str)) -> io::Result<u64> {
    let mut consumed = 0u64;
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let read = reader.read_until(b'\n', &mut buf)?;
        if read == 0 {
            return Ok(consumed);
        }
        consumed += read as u64;
        visit(String::from_utf8_lossy(&buf).trim());
    }
}

fn report_read_error(source: &LogSource, e: &io::Error) {
    match e.kind() {
        io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
            warn!(source = %source.name, path = %source.path.display(), error = %e, "log source unavailable");
        }
        _ => {
            warn!(source = %source.name, path = %source.path.display(), error = %e, "failed reading log source");
        }
    }
}
