use std::fmt;
use std::slice;
use std::str::FromStr;

use crate::errors::{Error, Result};

/// An inclusive, zero based interval on one axis.
///
/// Both ends are part of the range, so `Range::new(0, 105)` covers 106 entries. This is the
/// indexing convention of the underlying array-file library and must not be confused with Rust's
/// half open `first..last`.
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Range {
    first: usize,
    last: usize,
}

impl Range {
    /// Create a new range.
    ///
    /// Fails with `InvalidRange` if `first` is negative or `last` is less than `first`.
    ///
    pub fn new(first: i64, last: i64) -> Result<Self> {
        if first < 0 || last < first {
            return Err(Error::InvalidRange { first, last });
        }

        Ok(Self {
            first: first as usize,
            last: last as usize,
        })
    }

    /// Range covering a whole axis of `size` entries.
    ///
    /// Fails with `InvalidRange` for an empty axis.
    ///
    pub fn whole(size: usize) -> Result<Self> {
        Self::from_length(0, size)
    }

    /// Range of `length` entries starting at `first`.
    ///
    /// Fails with `InvalidRange` if `length` is zero or the range would end past `usize::MAX`.
    ///
    pub fn from_length(first: usize, length: usize) -> Result<Self> {
        match first.checked_add(length) {
            Some(end) if length > 0 => Ok(Self {
                first,
                last: end - 1,
            }),
            _ => Err(Error::InvalidRange {
                first: first as i64,
                last: (first as i64).saturating_add(length as i64).saturating_sub(1),
            }),
        }
    }

    pub fn first(&self) -> usize {
        self.first
    }

    pub fn last(&self) -> usize {
        self.last
    }

    pub fn length(&self) -> usize {
        self.last - self.first + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        self.first <= index && index <= self.last
    }

    /// The same range moved `offset` entries along the axis
    pub fn shift(&self, offset: usize) -> Self {
        Self {
            first: self.first + offset,
            last: self.last + offset,
        }
    }

    /// Half open equivalent, for indexing into arrays
    pub(crate) fn as_std(&self) -> std::ops::Range<usize> {
        self.first..self.last + 1
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.first, self.last)
    }
}

impl FromStr for Range {
    type Err = Error;

    /// Parse `"first:last"`, or a single index `"n"` meaning `n:n`
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<i64>()
                .map_err(|_| Error::UnparsableSelection(s.to_string()))
        };

        match s.split_once(':') {
            Some((first, last)) => Self::new(parse(first)?, parse(last)?),
            None => {
                let index = parse(s)?;
                Self::new(index, index)
            }
        }
    }
}

/// One range per axis of a variable, in the variable's declared dimension order
///
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Selection(Vec<Range>);

impl Selection {
    pub fn new(ranges: Vec<Range>) -> Self {
        Self(ranges)
    }

    /// Select every entry of a variable with the given shape. Fails with `InvalidRange` if
    /// any axis is empty.
    pub fn all(shape: &[usize]) -> Result<Self> {
        let ranges = shape
            .iter()
            .map(|&size| Range::whole(size))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self(ranges))
    }

    /// Build a selection from `(first, last)` pairs
    pub fn from_pairs(pairs: &[(i64, i64)]) -> Result<Self> {
        let ranges = pairs
            .iter()
            .map(|&(first, last)| Range::new(first, last))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self(ranges))
    }

    /// Parse the array library's section syntax, eg `"0:1, 0:105, 0:212"`
    pub fn parse(section: &str) -> Result<Self> {
        let ranges = section
            .split(',')
            .map(str::parse)
            .collect::<Result<Vec<Range>>>()?;

        Ok(Self(ranges))
    }

    /// Number of axes
    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// Length of each axis of the selected block
    pub fn shape(&self) -> Vec<usize> {
        self.0.iter().map(Range::length).collect()
    }

    /// Number of selected elements
    pub fn size(&self) -> usize {
        self.0.iter().map(Range::length).product()
    }

    /// Zero based starting corner of the block
    pub fn origin(&self) -> Vec<usize> {
        self.0.iter().map(Range::first).collect()
    }

    pub fn ranges(&self) -> &[Range] {
        &self.0
    }

    pub fn iter(&self) -> slice::Iter<'_, Range> {
        self.0.iter()
    }

    pub fn get(&self, axis: usize) -> Option<&Range> {
        self.0.get(axis)
    }

    /// A copy of this selection with `axis` replaced by `range`
    pub fn with_axis(&self, axis: usize, range: Range) -> Self {
        let mut ranges = self.0.clone();
        ranges[axis] = range;

        Self(ranges)
    }

    /// Whether every range lies within `[0, size - 1]` of the corresponding axis
    pub fn fits(&self, shape: &[usize]) -> bool {
        self.rank() == shape.len()
            && self
                .0
                .iter()
                .zip(shape)
                .all(|(range, &size)| range.last < size)
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ranges: Vec<String> = self.0.iter().map(Range::to_string).collect();
        f.write_str(&ranges.join(", "))
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a Range;
    type IntoIter = slice::Iter<'a, Range>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<Range>> for Selection {
    fn from(ranges: Vec<Range>) -> Self {
        Self(ranges)
    }
}
