//! Moving selected data from an existing dataset into a committed one.
//!
//! Copies are not transactional across variables. If a write fails part way through, every
//! variable copied before it stays as written and the failed variable may be partially written;
//! it is up to the caller to retry or to discard the whole target.
//!
use tracing::{debug, info};

use crate::{
    chunk::for_each_window,
    errors::{Error, Result},
    range::Selection,
    storage::{check_selection, DatasetReader, DatasetWriter},
};

/// Copy `selection` of `source_variable` into the whole of `target_variable`.
///
/// The target variable must have been defined with exactly the shape of the selection and the
/// same element type as the source variable. The selected block is written at the target's
/// origin.
///
/// # Arguments
///
/// * `source` - The dataset to read from.
/// * `source_variable` - Name of the variable in `source`.
/// * `target` - A committed dataset to write into.
/// * `target_variable` - Name of the variable in `target`.
/// * `selection` - One inclusive range per axis of the source variable.
///
pub fn copy_variable<R, W>(
    source: &R,
    source_variable: &str,
    target: &mut W,
    target_variable: &str,
    selection: &Selection,
) -> Result<()>
where
    R: DatasetReader + ?Sized,
    W: DatasetWriter + ?Sized,
{
    let rank = check_copy(source, source_variable, target, target_variable, selection)?;

    let block = source.read(source_variable, selection)?;
    let expected = selection.shape();
    if block.shape() != expected.as_slice() {
        return Err(Error::ShapeMismatch {
            variable: target_variable.to_string(),
            block: block.shape().to_vec(),
            target: expected,
        });
    }
    target.write(target_variable, &vec![0; rank], &block)?;

    info!(
        source = source_variable,
        target = target_variable,
        selection = %selection,
        "copied variable"
    );

    Ok(())
}

/// Same as `copy_variable`, but the selection's leading axis is read and written in windows
/// of at most `chunk_size` entries, so only one window is held in memory at a time.
///
pub fn copy_variable_chunked<R, W>(
    source: &R,
    source_variable: &str,
    target: &mut W,
    target_variable: &str,
    selection: &Selection,
    chunk_size: usize,
) -> Result<()>
where
    R: DatasetReader + ?Sized,
    W: DatasetWriter + ?Sized,
{
    let rank = check_copy(source, source_variable, target, target_variable, selection)?;
    let leading = match selection.get(0) {
        Some(range) => *range,
        None => {
            // Scalars have nothing to split
            return copy_variable(source, source_variable, target, target_variable, selection);
        }
    };

    let mut origin = vec![0; rank];
    for_each_window(leading.length(), chunk_size, |window| {
        let chunk = selection.with_axis(0, window.shift(leading.first()));
        let block = source.read(source_variable, &chunk)?;
        let expected = chunk.shape();
        if block.shape() != expected.as_slice() {
            return Err(Error::ShapeMismatch {
                variable: target_variable.to_string(),
                block: block.shape().to_vec(),
                target: expected,
            });
        }

        origin[0] = window.first();
        debug!(
            target = target_variable,
            chunk = %chunk,
            "writing chunk"
        );
        target.write(target_variable, &origin, &block)
    })?;

    info!(
        source = source_variable,
        target = target_variable,
        selection = %selection,
        chunk_size,
        "copied variable"
    );

    Ok(())
}

/// Resolve both variables and check that `selection` can be copied from one to the other.
/// Returns the rank of the variables.
fn check_copy<R, W>(
    source: &R,
    source_variable: &str,
    target: &W,
    target_variable: &str,
    selection: &Selection,
) -> Result<usize>
where
    R: DatasetReader + ?Sized,
    W: DatasetReader + ?Sized,
{
    let from = source.find_variable(source_variable)?;
    let to = target.find_variable(target_variable)?;
    check_selection(&from, selection)?;

    let shape = selection.shape();
    let target_shape = to.shape();
    if shape != target_shape {
        return Err(Error::ShapeMismatch {
            variable: target_variable.to_string(),
            block: shape,
            target: target_shape,
        });
    }

    if from.data_type() != to.data_type() {
        return Err(Error::TypeMismatch {
            variable: target_variable.to_string(),
            expected: to.data_type(),
            found: from.data_type(),
        });
    }

    Ok(shape.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    use rand::{thread_rng, Rng};

    use crate::{
        builder::SchemaBuilder,
        data::DataBlock,
        range::Range,
        schema::{DataType, DatasetSchema},
        storage::{MemoryBackend, MemoryDataset},
        testing,
    };

    #[test]
    fn test_round_trip() -> Result<()> {
        let source = testing::tas_dataset(5)?;
        let mut target = testing::empty_tas_dataset(2)?;
        let selection = Selection::from_pairs(&[(0, 1), (0, 105), (0, 212)])?;

        copy_variable(&source, "tas", &mut target, "tas", &selection)?;

        let copied = target.data("tas").unwrap();
        let original = source.data("tas").unwrap();
        let mut rng = thread_rng();
        for _ in 0..200 {
            let index = [rng.gen_range(0..2), rng.gen_range(0..106), rng.gen_range(0..213)];
            assert_eq!(copied.get_f64(&index), original.get_f64(&index));
        }

        Ok(())
    }

    #[test]
    fn test_copy_offset_selection() -> Result<()> {
        let source = testing::tas_dataset(5)?;
        let mut target = testing::empty_tas_dataset(2)?;
        let selection = Selection::from_pairs(&[(3, 4), (0, 105), (0, 212)])?;

        copy_variable(&source, "tas", &mut target, "tas", &selection)?;

        // Lands at the target's origin
        let copied = target.data("tas").unwrap();
        let original = source.data("tas").unwrap();
        assert_eq!(copied.get_f64(&[0, 10, 20]), original.get_f64(&[3, 10, 20]));
        assert_eq!(copied.get_f64(&[1, 105, 212]), original.get_f64(&[4, 105, 212]));

        Ok(())
    }

    #[test]
    fn test_shape_mismatch() -> Result<()> {
        let source = testing::tas_dataset(5)?;
        let mut target = testing::empty_tas_dataset(1)?;
        let selection = Selection::from_pairs(&[(0, 1), (0, 105), (0, 212)])?;

        assert!(matches!(
            copy_variable(&source, "tas", &mut target, "tas", &selection),
            Err(Error::ShapeMismatch { .. })
        ));

        // Nothing was written
        let untouched = DataBlock::filled(DataType::Float, &[1, 106, 213]);
        assert_eq!(target.data("tas").unwrap(), &untouched);

        Ok(())
    }

    #[test]
    fn test_variable_not_found() -> Result<()> {
        let source = testing::tas_dataset(1)?;
        let mut target = testing::empty_tas_dataset(1)?;
        let selection = Selection::all(&[1, 106, 213])?;

        assert!(matches!(
            copy_variable(&source, "pr", &mut target, "tas", &selection),
            Err(Error::VariableNotFound(name)) if name == "pr"
        ));
        assert!(matches!(
            copy_variable(&source, "tas", &mut target, "pr", &selection),
            Err(Error::VariableNotFound(name)) if name == "pr"
        ));

        Ok(())
    }

    #[test]
    fn test_range_out_of_bounds() -> Result<()> {
        let source = testing::tas_dataset(1)?;
        let mut target = testing::empty_tas_dataset(1)?;

        let selection = Selection::from_pairs(&[(0, 0), (0, 106), (0, 212)])?;
        assert!(matches!(
            copy_variable(&source, "tas", &mut target, "tas", &selection),
            Err(Error::RangeOutOfBounds { .. })
        ));

        let selection = Selection::from_pairs(&[(0, 105), (0, 212)])?;
        assert!(matches!(
            copy_variable(&source, "tas", &mut target, "tas", &selection),
            Err(Error::RangeOutOfBounds { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_type_mismatch() -> Result<()> {
        let source = testing::tas_dataset(1)?;
        let mut builder = SchemaBuilder::new();
        builder.define_dimension("time", 1)?;
        builder.define_variable("tas", DataType::Double, ["time"], vec![])?;
        let mut target = builder.commit(&MemoryBackend::new())?;

        assert!(matches!(
            copy_variable(&source, "time", &mut target, "tas", &Selection::all(&[1])?),
            Err(Error::TypeMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_same_selection_into_two_variables() -> Result<()> {
        let source = testing::tas_dataset(1)?;
        let mut builder = SchemaBuilder::new();
        builder.define_dimension("lat", 106)?;
        builder.define_dimension("lon", 213)?;
        builder.define_variable("lat", DataType::Double, ["lat", "lon"], vec![])?;
        builder.define_variable("lat_copy", DataType::Double, ["lat", "lon"], vec![])?;
        let mut target = builder.commit(&MemoryBackend::new())?;

        let selection = Selection::all(&[106, 213])?;
        copy_variable(&source, "lat", &mut target, "lat", &selection)?;
        copy_variable(&source, "lat", &mut target, "lat_copy", &selection)?;

        assert_eq!(target.data("lat"), source.data("lat"));
        assert_eq!(target.data("lat_copy"), source.data("lat"));

        Ok(())
    }

    /// Wraps a source and remembers the largest block read from it
    struct Watched<'a> {
        inner: &'a MemoryDataset,
        largest: Cell<usize>,
        reads: Cell<usize>,
    }

    impl DatasetReader for Watched<'_> {
        fn schema(&self) -> &DatasetSchema {
            self.inner.schema()
        }

        fn read(&self, variable: &str, selection: &Selection) -> Result<DataBlock> {
            self.largest.set(self.largest.get().max(selection.size()));
            self.reads.set(self.reads.get() + 1);
            self.inner.read(variable, selection)
        }
    }

    #[test]
    fn test_chunked_copy() -> Result<()> {
        let source = testing::tas_dataset(25)?;
        let watched = Watched {
            inner: &source,
            largest: Cell::new(0),
            reads: Cell::new(0),
        };
        let mut target = testing::empty_tas_dataset(23)?;
        let selection = Selection::new(vec![
            Range::new(2, 24)?,
            Range::new(0, 105)?,
            Range::new(0, 212)?,
        ]);

        copy_variable_chunked(&watched, "tas", &mut target, "tas", &selection, 10)?;

        assert_eq!(watched.reads.get(), 3);
        assert_eq!(watched.largest.get(), 10 * 106 * 213);
        assert_eq!(
            target.data("tas").unwrap(),
            &source.data("tas").unwrap().slice(&selection)
        );

        Ok(())
    }

    #[test]
    fn test_chunked_copy_scalar() -> Result<()> {
        let mut builder = SchemaBuilder::new();
        builder.define_variable("crs", DataType::Int, Vec::<String>::new(), vec![])?;
        let source = builder
            .commit(&MemoryBackend::new())?
            .with_data("crs", DataBlock::Int(ndarray::arr0(4326).into_dyn()))?;

        let mut builder = SchemaBuilder::new();
        builder.define_variable("crs", DataType::Int, Vec::<String>::new(), vec![])?;
        let mut target = builder.commit(&MemoryBackend::new())?;

        copy_variable_chunked(&source, "crs", &mut target, "crs", &Selection::all(&[])?, 1000)?;
        assert_eq!(target.data("crs").unwrap().get_f64(&[]), Some(4326.0));

        Ok(())
    }
}
