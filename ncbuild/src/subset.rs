//! Deriving a narrower dataset from an existing one.
//!
use std::collections::HashMap;

use tracing::info;

use crate::{
    builder::SchemaBuilder,
    copy::copy_variable_chunked,
    errors::{Error, Result},
    range::{Range, Selection},
    schema::{DatasetSchema, Variable},
    storage::{DatasetReader, DatasetWriter},
};

/// Ranges to keep, by dimension name. Dimensions without a range are kept whole.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Subset {
    ranges: HashMap<String, Range>,
}

impl Subset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrow `dimension` to `range`, replacing any range given before
    pub fn with_range<S: Into<String>>(mut self, dimension: S, range: Range) -> Self {
        self.ranges.insert(dimension.into(), range);

        self
    }

    /// Parse and add an assignment of the form `"lat=0:105"`
    pub fn push(&mut self, assignment: &str) -> Result<()> {
        let (dimension, range) = assignment
            .split_once('=')
            .ok_or_else(|| Error::UnparsableSelection(assignment.to_string()))?;
        let dimension = dimension.trim();
        if dimension.is_empty() {
            return Err(Error::UnparsableSelection(assignment.to_string()));
        }
        self.ranges.insert(dimension.to_string(), range.parse()?);

        Ok(())
    }

    pub fn range(&self, dimension: &str) -> Option<&Range> {
        self.ranges.get(dimension)
    }

    /// The part of `variable` this subset keeps, one range per axis
    pub fn selection(&self, variable: &Variable) -> Result<Selection> {
        let ranges = variable
            .dimensions()
            .map(|dimension| match self.range(&dimension.name) {
                Some(range) => Ok(*range),
                None => Range::whole(dimension.size),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ranges.into())
    }
}

/// Start a schema shaped like `source` with the dimensions named in `subset` narrowed.
///
/// Dimensions are defined in the source's order. Every global attribute, every variable and
/// every variable attribute is carried over. The builder is returned open so the caller can add
/// to it before committing.
///
pub fn subset_schema(source: &DatasetSchema, subset: &Subset) -> Result<SchemaBuilder> {
    for (name, range) in &subset.ranges {
        let dimension = source
            .dimension(name)
            .ok_or_else(|| Error::UnknownDimension(name.clone()))?;
        if range.last() >= dimension.size {
            return Err(Error::RangeOutOfBounds {
                variable: name.clone(),
                selection: range.to_string(),
                shape: vec![dimension.size],
            });
        }
    }

    let mut builder = SchemaBuilder::new();
    builder.copy_global_attributes(source)?;
    for dimension in source.dimensions() {
        let size = match subset.range(&dimension.name) {
            Some(range) => range.length(),
            None => dimension.size,
        };
        builder.define_dimension(&dimension.name, size)?;
    }

    for variable in source.variables() {
        builder.define_variable_like(&variable, &variable.spec().dimensions)?;
    }

    Ok(builder)
}

/// Copy the part of every variable of `source` selected by `subset` into `target`, in chunks of
/// `chunk_size` leading axis entries, then flush `target`.
///
/// `target` is usually committed from `subset_schema(source.schema(), subset)`.
///
pub fn subset_copy<R, W>(
    source: &R,
    target: &mut W,
    subset: &Subset,
    chunk_size: usize,
) -> Result<()>
where
    R: DatasetReader + ?Sized,
    W: DatasetWriter + ?Sized,
{
    for variable in source.schema().variables() {
        let selection = subset.selection(&variable)?;
        copy_variable_chunked(
            source,
            variable.name(),
            target,
            variable.name(),
            &selection,
            chunk_size,
        )?;
    }
    target.flush()?;

    info!(variables = source.schema().len(), "copied subset");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{data::DataBlock, storage::MemoryStore, testing};

    fn subset() -> Result<Subset> {
        Ok(Subset::new()
            .with_range("time", Range::new(5, 9)?)
            .with_range("lat", Range::new(10, 19)?))
    }

    #[test]
    fn test_parse_assignments() -> Result<()> {
        let mut parsed = Subset::new();
        parsed.push("time=5:9")?;
        parsed.push(" lat = 10:19")?;
        assert_eq!(parsed, subset()?);

        parsed.push("time=7")?;
        assert_eq!(parsed.range("time"), Some(&Range::new(7, 7)?));

        for bad in ["time", "=0:1", "time=a:b"] {
            assert!(matches!(
                parsed.push(bad),
                Err(Error::UnparsableSelection(_))
            ));
        }
        assert!(matches!(
            parsed.push("time=9:5"),
            Err(Error::InvalidRange { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_subset_schema() -> Result<()> {
        let source = testing::tas_schema(25)?;
        let schema = subset_schema(&source, &subset()?)?.freeze()?;

        assert_eq!(schema.dimension("time").unwrap().size, 5);
        assert_eq!(schema.dimension("lat").unwrap().size, 10);
        assert_eq!(schema.dimension("lon").unwrap().size, 213);
        assert_eq!(schema.global_attributes(), source.global_attributes());

        let names: Vec<&str> = schema.variables().map(|variable| variable.name()).collect();
        assert_eq!(names, vec!["lat", "lon", "time", "tas"]);

        let tas = schema.variable("tas").unwrap();
        assert_eq!(tas.shape(), vec![5, 10, 213]);
        assert_eq!(tas.attributes(), source.variable("tas").unwrap().attributes());

        Ok(())
    }

    #[test]
    fn test_subset_schema_rejects_bad_ranges() -> Result<()> {
        let source = testing::tas_schema(25)?;

        let subset = Subset::new().with_range("depth", Range::new(0, 1)?);
        assert!(matches!(
            subset_schema(&source, &subset),
            Err(Error::UnknownDimension(name)) if name == "depth"
        ));

        let subset = Subset::new().with_range("lat", Range::new(100, 106)?);
        assert!(matches!(
            subset_schema(&source, &subset),
            Err(Error::RangeOutOfBounds { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_subset_copy() -> Result<()> {
        let source = testing::tas_dataset(25)?;
        let subset = subset()?;
        let store = MemoryStore::new();
        let mut builder = subset_schema(source.schema(), &subset)?;
        let mut target = builder.commit(&store.backend("sub.nc"))?;

        subset_copy(&source, &mut target, &subset, 2)?;

        // Flushed by the copy
        let copied = store.open("sub.nc")?;
        let tas = copied.data("tas").unwrap();
        let original = source.data("tas").unwrap();
        assert_eq!(tas.shape(), &[5, 10, 213]);
        assert_eq!(tas.get_f64(&[0, 0, 0]), original.get_f64(&[5, 10, 0]));
        assert_eq!(tas.get_f64(&[4, 9, 212]), original.get_f64(&[9, 19, 212]));

        let selection = Selection::from_pairs(&[(10, 19), (0, 212)])?;
        assert_eq!(
            copied.data("lat"),
            Some(&source.data("lat").unwrap().slice(&selection))
        );

        let time: Vec<f64> = copied.data("time").map(DataBlock::to_f64_vec).unwrap();
        assert_eq!(time, vec![7200.0, 8640.0, 10080.0, 11520.0, 12960.0]);

        Ok(())
    }
}
