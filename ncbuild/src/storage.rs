//! The capabilities the build and copy logic needs from an array-file library.
//!
//! Any backend that can materialize a committed `DatasetSchema` and read and write hyperslabs of
//! its variables is interchangeable. An in-memory backend lives here; the classic file backend
//! lives in its own crate.
//!
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    data::DataBlock,
    errors::{Error, Result},
    range::Selection,
    schema::{DatasetSchema, Variable},
};

/// Read access to an existing dataset
///
pub trait DatasetReader {
    /// The dataset's fixed metadata
    fn schema(&self) -> &DatasetSchema;

    /// Read the hyper-rectangle `selection` of `variable`, in row-major order.
    ///
    /// Fails with `VariableNotFound` for an unknown variable and with `RangeOutOfBounds` if
    /// `selection` doesn't have one in-bounds range per axis.
    ///
    fn read(&self, variable: &str, selection: &Selection) -> Result<DataBlock>;

    /// Resolve a variable by name
    fn find_variable(&self, name: &str) -> Result<Variable<'_>> {
        self.schema()
            .variable(name)
            .ok_or_else(|| Error::VariableNotFound(name.to_string()))
    }
}

/// Write access to a committed dataset. Metadata is fixed, only data can be written.
///
pub trait DatasetWriter: DatasetReader {
    /// Write `block` into `variable` with its corner at `origin`.
    ///
    /// Fails with `TypeMismatch` if the block's element type differs from the variable's and with
    /// `ShapeMismatch` if the block doesn't fit inside the variable at `origin`.
    ///
    fn write(&mut self, variable: &str, origin: &[usize], block: &DataBlock) -> Result<()>;

    /// Make everything written so far durable
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Materializes committed schemas
///
pub trait Backend {
    type Dataset: DatasetWriter;

    /// Create a dataset with the fixed metadata in `schema`. Every variable starts out holding
    /// its type's default fill value.
    ///
    fn create(&self, schema: DatasetSchema) -> Result<Self::Dataset>;
}

/// Check that `selection` has one range per axis of `variable`, each within its axis
///
pub fn check_selection(variable: &Variable, selection: &Selection) -> Result<()> {
    let shape = variable.shape();
    if !selection.fits(&shape) {
        return Err(Error::RangeOutOfBounds {
            variable: variable.name().to_string(),
            selection: selection.to_string(),
            shape,
        });
    }

    Ok(())
}

/// Check that `block` can be written into `variable` at `origin`
///
pub fn check_write(variable: &Variable, origin: &[usize], block: &DataBlock) -> Result<()> {
    if block.data_type() != variable.data_type() {
        return Err(Error::TypeMismatch {
            variable: variable.name().to_string(),
            expected: variable.data_type(),
            found: block.data_type(),
        });
    }

    let target = variable.shape();
    let shape = block.shape();
    let fits = origin.len() == target.len()
        && shape.len() == target.len()
        && origin
            .iter()
            .zip(shape)
            .zip(&target)
            .all(|((&start, &len), &size)| {
                start.checked_add(len).is_some_and(|end| end <= size)
            });
    if !fits {
        return Err(Error::ShapeMismatch {
            variable: variable.name().to_string(),
            block: shape.to_vec(),
            target,
        });
    }

    Ok(())
}

/// A dataset held entirely in RAM
///
#[derive(Clone, Debug)]
pub struct MemoryDataset {
    schema: DatasetSchema,
    data: HashMap<String, DataBlock>,
    store: Option<(MemoryStore, String)>,
}

impl MemoryDataset {
    /// A dataset with every variable of `schema` holding its fill value
    pub fn new(schema: DatasetSchema) -> Self {
        let data = schema
            .variables()
            .map(|variable| {
                let block = DataBlock::filled(variable.data_type(), &variable.shape());
                (variable.name().to_string(), block)
            })
            .collect();

        Self {
            schema,
            data,
            store: None,
        }
    }

    /// Fill `variable` from its origin with `block`, for assembling source datasets
    pub fn with_data(mut self, variable: &str, block: DataBlock) -> Result<Self> {
        let origin = vec![0; block.shape().len()];
        self.write(variable, &origin, &block)?;

        Ok(self)
    }

    /// All of a variable's data
    pub fn data(&self, variable: &str) -> Option<&DataBlock> {
        self.data.get(variable)
    }
}

impl DatasetReader for MemoryDataset {
    fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    fn read(&self, variable: &str, selection: &Selection) -> Result<DataBlock> {
        check_selection(&self.find_variable(variable)?, selection)?;
        let block = self
            .data
            .get(variable)
            .ok_or_else(|| Error::VariableNotFound(variable.to_string()))?;

        Ok(block.slice(selection))
    }
}

impl DatasetWriter for MemoryDataset {
    fn write(&mut self, variable: &str, origin: &[usize], block: &DataBlock) -> Result<()> {
        check_write(&self.find_variable(variable)?, origin, block)?;
        let data = self
            .data
            .get_mut(variable)
            .ok_or_else(|| Error::VariableNotFound(variable.to_string()))?;

        data.assign(variable, origin, block)
    }

    fn flush(&mut self) -> Result<()> {
        if let Some((store, path)) = &self.store {
            let mut saved = self.clone();
            saved.store = None;
            store.datasets.lock().insert(path.clone(), saved);
        }

        Ok(())
    }
}

/// In-memory stand in for a file system: datasets are kept by path once created
///
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    datasets: Arc<Mutex<HashMap<String, MemoryDataset>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend that creates its dataset at `path` in this store
    pub fn backend<S: Into<String>>(&self, path: S) -> MemoryBackend {
        MemoryBackend {
            store: Some((self.clone(), path.into())),
        }
    }

    /// Open the last flushed state of the dataset at `path`
    pub fn open(&self, path: &str) -> Result<MemoryDataset> {
        self.datasets.lock().get(path).cloned().ok_or_else(|| {
            Error::IO(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no dataset at {path}"),
            ))
        })
    }

    pub fn contains(&self, path: &str) -> bool {
        self.datasets.lock().contains_key(path)
    }
}

/// Creates `MemoryDataset`s, optionally registering them in a `MemoryStore`
///
#[derive(Clone, Debug, Default)]
pub struct MemoryBackend {
    store: Option<(MemoryStore, String)>,
}

impl MemoryBackend {
    /// A backend for scratch datasets that aren't kept anywhere
    pub fn new() -> Self {
        Self::default()
    }
}

impl Backend for MemoryBackend {
    type Dataset = MemoryDataset;

    fn create(&self, schema: DatasetSchema) -> Result<MemoryDataset> {
        let mut dataset = MemoryDataset::new(schema);
        dataset.store = self.store.clone();
        if let Some((_, path)) = &dataset.store {
            debug!(path = path.as_str(), "creating in-memory dataset");
        }
        dataset.flush()?;

        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use ndarray::ArrayD;

    use crate::{range::Range, schema::DataType, testing};

    #[test]
    fn test_new_dataset_is_filled() -> Result<()> {
        let dataset = MemoryDataset::new(testing::tas_schema(2)?);
        let tas = dataset.data("tas").unwrap();
        assert_eq!(tas.shape(), &[2, 106, 213]);
        assert_eq!(tas.get_f64(&[1, 105, 212]), Some(9.96921e36_f32 as f64));

        Ok(())
    }

    #[test]
    fn test_read_unknown_variable() -> Result<()> {
        let dataset = MemoryDataset::new(testing::tas_schema(2)?);
        let selection = Selection::all(&[2])?;
        assert!(matches!(
            dataset.read("pr", &selection),
            Err(Error::VariableNotFound(name)) if name == "pr"
        ));

        Ok(())
    }

    #[test]
    fn test_read_out_of_bounds() -> Result<()> {
        let dataset = MemoryDataset::new(testing::tas_schema(2)?);

        let selection = Selection::from_pairs(&[(0, 2), (0, 105), (0, 212)])?;
        assert!(matches!(
            dataset.read("tas", &selection),
            Err(Error::RangeOutOfBounds { .. })
        ));

        let selection = Selection::from_pairs(&[(0, 1), (0, 105)])?;
        assert!(matches!(
            dataset.read("tas", &selection),
            Err(Error::RangeOutOfBounds { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_write_then_read() -> Result<()> {
        let mut dataset = MemoryDataset::new(testing::tas_schema(2)?);
        let block: DataBlock = ArrayD::from_elem(vec![1, 2, 3], 280.5_f32).into();
        dataset.write("tas", &[1, 10, 20], &block)?;

        let selection = Selection::new(vec![
            Range::new(1, 1)?,
            Range::new(10, 11)?,
            Range::new(20, 22)?,
        ]);
        assert_eq!(dataset.read("tas", &selection)?, block);

        let wrong: DataBlock = ArrayD::from_elem(vec![1, 2, 3], 280.5_f64).into();
        assert!(matches!(
            dataset.write("tas", &[0, 0, 0], &wrong),
            Err(Error::TypeMismatch {
                expected: DataType::Float,
                found: DataType::Double,
                ..
            })
        ));
        assert!(matches!(
            dataset.write("tas", &[1, 105, 0], &block),
            Err(Error::ShapeMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_write_at_huge_origin() -> Result<()> {
        let mut dataset = MemoryDataset::new(testing::tas_schema(2)?);
        let block: DataBlock = ArrayD::from_elem(vec![1], 1440_i32).into();
        assert!(matches!(
            dataset.write("time", &[usize::MAX], &block),
            Err(Error::ShapeMismatch { .. })
        ));

        let mut data = dataset.data("time").unwrap().clone();
        assert!(matches!(
            data.assign("time", &[usize::MAX], &block),
            Err(Error::ShapeMismatch { .. })
        ));

        Ok(())
    }

    #[test]
    fn test_store_keeps_flushed_state() -> Result<()> {
        let store = MemoryStore::new();
        let backend = store.backend("copy.nc");
        let mut dataset = backend.create(testing::tas_schema(1)?)?;
        assert!(store.contains("copy.nc"));

        let block: DataBlock = ArrayD::from_elem(vec![1], 1440_i32).into();
        dataset.write("time", &[0], &block)?;

        // Not visible until flushed
        let opened = store.open("copy.nc")?;
        assert_eq!(opened.data("time").unwrap().get_f64(&[0]), Some(-2147483647.0));

        dataset.flush()?;
        let opened = store.open("copy.nc")?;
        assert_eq!(opened.data("time").unwrap().get_f64(&[0]), Some(1440.0));

        assert!(matches!(store.open("missing.nc"), Err(Error::IO(_))));

        Ok(())
    }
}
