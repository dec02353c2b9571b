// Batcher - slices log lines into fixed-size groups for the oracle

use crate::{CoreError, LogLine};
use std::num::NonZeroUsize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batcher {
    size: NonZeroUsize,
}

impl Batcher {
    // reject a zero batch size up front so split() cannot fail
    pub fn new(size: usize) -> Result<Self, CoreError> {
        NonZeroUsize::new(size)
            .map(|size| Self { size })
            .ok_or(CoreError::InvalidBatchSize(size))
    }

    pub fn size(&self) -> usize {
        self.size.get()
    }

    /// Successive slices of `size` lines, the last one may be shorter
    pub fn split<'a>(&self, lines: &'a [LogLine]) -> std::slice::Chunks<'a, LogLine> {
        lines.chunks(self.size.get())
    }
}
