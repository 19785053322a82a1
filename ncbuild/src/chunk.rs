use std::cmp;

use tracing::debug;

use crate::{
    errors::{Error, Result},
    range::Range,
    schema::Variable,
};

/// Consecutive, inclusive windows of at most `chunk_size` entries covering `[0, axis_size - 1]`
///
/// Windows are produced in ascending order, don't overlap and cover every entry exactly once.
/// Every window but the last holds exactly `chunk_size` entries; the last one holds whatever
/// remains.
///
#[derive(Clone, Debug)]
pub struct Chunks {
    next: usize,
    axis_size: usize,
    chunk_size: usize,
}

impl Chunks {
    /// Fails with `InvalidChunkSize` if `chunk_size` is zero
    pub fn new(axis_size: usize, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize);
        }

        Ok(Self {
            next: 0,
            axis_size,
            chunk_size,
        })
    }

    /// Number of windows remaining
    pub fn count_remaining(&self) -> usize {
        let remaining = self.axis_size - self.next;
        (remaining + self.chunk_size - 1) / self.chunk_size
    }
}

impl Iterator for Chunks {
    type Item = Range;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next < self.axis_size {
            let length = cmp::min(self.chunk_size, self.axis_size - self.next);
            let chunk = Range::from_length(self.next, length).ok()?;
            self.next += length;

            Some(chunk)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count_remaining();
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks {}

/// Walk `axis` of `variable` in windows of `chunk_size` entries.
///
/// `visit` is called synchronously, once per window, in ascending order. The first error it
/// returns stops the traversal and is passed back to the caller.
///
/// # Arguments
///
/// * `variable` - The variable to traverse.
/// * `axis` - Which axis to split, usually 0, the leading axis.
/// * `chunk_size` - Maximum number of entries along `axis` per window. Must be positive.
/// * `visit` - Called with each window.
///
pub fn for_each_chunk<F>(
    variable: &Variable,
    axis: usize,
    chunk_size: usize,
    visit: F,
) -> Result<()>
where
    F: FnMut(Range) -> Result<()>,
{
    let shape = variable.shape();
    let axis_size = *shape.get(axis).ok_or_else(|| Error::InvalidAxis {
        variable: variable.name().to_string(),
        axis,
        rank: shape.len(),
    })?;

    for_each_window(axis_size, chunk_size, visit)
}

/// Walk `[0, axis_size - 1]` in windows of `chunk_size` entries
pub(crate) fn for_each_window<F>(axis_size: usize, chunk_size: usize, mut visit: F) -> Result<()>
where
    F: FnMut(Range) -> Result<()>,
{
    let chunks = Chunks::new(axis_size, chunk_size)?;
    let count = chunks.len();
    for (i, chunk) in chunks.enumerate() {
        debug!(chunk = i + 1, of = count, range = %chunk, "visiting chunk");
        visit(chunk)?;
    }

    Ok(())
}
