use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use ndarray::{ArrayD, IxDyn};
use parking_lot::Mutex;
use tracing::{debug, info};

use ncbuild::{
    check_selection, check_write, Backend, DataBlock, DataType, DatasetReader, DatasetSchema,
    DatasetWriter, Range, Selection,
};

use crate::{
    errors::{Error, Result},
    extio::{padding, BigEndian},
    header::{self, Layout, Version},
};

/// Number of elements encoded at a time while pre-filling
const FILL_BATCH: usize = 8192;

/// Creates classic files
///
#[derive(Clone, Debug)]
pub struct ClassicBackend {
    path: PathBuf,
}

impl ClassicBackend {
    /// A backend that creates its dataset at `path`, replacing any file already there
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl Backend for ClassicBackend {
    type Dataset = ClassicFile;

    fn create(&self, schema: DatasetSchema) -> ncbuild::Result<ClassicFile> {
        Ok(ClassicFile::create(&self.path, schema)?)
    }
}

/// A classic file on disk
///
/// The schema is read once when the file is opened. Reads and writes go straight to the file and
/// only touch the bytes of the selected region.
///
/// The file cursor is shared, so each read or write holds the lock for all of its runs.
///
#[derive(Debug)]
pub struct ClassicFile {
    path: PathBuf,
    file: Mutex<File>,
    schema: DatasetSchema,
    version: Version,
    begins: HashMap<String, u64>,
}

impl ClassicFile {
    /// Open an existing file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> ncbuild::Result<Self> {
        Ok(Self::load(path.as_ref(), File::open(path.as_ref())?)?)
    }

    /// Open an existing file for reading and writing data. Its schema stays as it is.
    pub fn open_writable<P: AsRef<Path>>(path: P) -> ncbuild::Result<Self> {
        let file = File::options().read(true).write(true).open(path.as_ref())?;

        Ok(Self::load(path.as_ref(), file)?)
    }

    fn load(path: &Path, file: File) -> Result<Self> {
        let (schema, layout) = header::read_header(&mut io::BufReader::new(&file))?;
        debug!(
            path = %path.display(),
            variables = schema.len(),
            "opened classic file"
        );

        Ok(Self::assemble(path, file, schema, layout))
    }

    fn create(path: &Path, schema: DatasetSchema) -> Result<Self> {
        let layout = header::plan(&schema)?;
        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let mut stream = BufWriter::new(file);
        header::write_header(&mut stream, &schema, &layout)?;
        for variable in schema.variables() {
            let count = variable.len();
            match variable.data_type() {
                DataType::Byte => write_fill::<i8>(&mut stream, count)?,
                DataType::Char => write_fill::<u8>(&mut stream, count)?,
                DataType::Short => write_fill::<i16>(&mut stream, count)?,
                DataType::Int => write_fill::<i32>(&mut stream, count)?,
                DataType::Float => write_fill::<f32>(&mut stream, count)?,
                DataType::Double => write_fill::<f64>(&mut stream, count)?,
            }
        }
        let file = stream.into_inner().map_err(|err| err.into_error())?;

        info!(
            path = %path.display(),
            offset64 = layout.version == Version::Offset64,
            variables = schema.len(),
            "created classic file"
        );

        Ok(Self::assemble(path, file, schema, layout))
    }

    fn assemble(path: &Path, file: File, schema: DatasetSchema, layout: Layout) -> Self {
        let begins = schema
            .variables()
            .zip(layout.begins)
            .map(|(variable, begin)| (variable.name().to_string(), begin))
            .collect();

        Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            schema,
            version: layout.version,
            begins,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file uses the 64 bit offset variant of the format
    pub fn is_offset64(&self) -> bool {
        self.version == Version::Offset64
    }

    fn begin(&self, variable: &str) -> Result<u64> {
        self.begins
            .get(variable)
            .copied()
            .ok_or_else(|| ncbuild::Error::VariableNotFound(variable.to_string()).into())
    }

    fn read_array<T: BigEndian>(
        &self,
        begin: u64,
        shape: &[usize],
        ranges: &[Range],
    ) -> Result<ArrayD<T>> {
        let size = T::DATA_TYPE.size();
        let block_shape: Vec<usize> = ranges.iter().map(Range::length).collect();
        let mut values = Vec::with_capacity(block_shape.iter().product());
        let mut buffer = vec![];
        let mut file = self.file.lock();
        for_each_run(shape, ranges, |offset, count| {
            buffer.resize(count * size, 0);
            file.seek(SeekFrom::Start(begin + (offset * size) as u64))?;
            file.read_exact(&mut buffer)?;
            values.extend(buffer.chunks_exact(size).map(T::decode));

            Ok(())
        })?;

        ArrayD::from_shape_vec(IxDyn(&block_shape), values)
            .map_err(|err| Error::Format(err.to_string()))
    }

    fn write_array<T: BigEndian>(
        &self,
        begin: u64,
        shape: &[usize],
        ranges: &[Range],
        array: &ArrayD<T>,
    ) -> Result<()> {
        let size = T::DATA_TYPE.size();
        let mut values = array.iter();
        let mut buffer = vec![];
        let mut file = self.file.lock();
        for_each_run(shape, ranges, |offset, count| {
            buffer.clear();
            for &value in values.by_ref().take(count) {
                value.encode(&mut buffer);
            }
            file.seek(SeekFrom::Start(begin + (offset * size) as u64))?;
            file.write_all(&buffer)?;

            Ok(())
        })
    }
}

impl DatasetReader for ClassicFile {
    fn schema(&self) -> &DatasetSchema {
        &self.schema
    }

    fn read(&self, variable: &str, selection: &Selection) -> ncbuild::Result<DataBlock> {
        let found = self.find_variable(variable)?;
        check_selection(&found, selection)?;

        let begin = self.begin(variable)?;
        let shape = found.shape();
        let ranges = selection.ranges();
        let block: DataBlock = match found.data_type() {
            DataType::Byte => self.read_array::<i8>(begin, &shape, ranges)?.into(),
            DataType::Char => self.read_array::<u8>(begin, &shape, ranges)?.into(),
            DataType::Short => self.read_array::<i16>(begin, &shape, ranges)?.into(),
            DataType::Int => self.read_array::<i32>(begin, &shape, ranges)?.into(),
            DataType::Float => self.read_array::<f32>(begin, &shape, ranges)?.into(),
            DataType::Double => self.read_array::<f64>(begin, &shape, ranges)?.into(),
        };

        Ok(block)
    }
}

impl DatasetWriter for ClassicFile {
    fn write(
        &mut self,
        variable: &str,
        origin: &[usize],
        block: &DataBlock,
    ) -> ncbuild::Result<()> {
        let found = self.find_variable(variable)?;
        check_write(&found, origin, block)?;
        if block.is_empty() {
            return Ok(());
        }

        let begin = self.begin(variable)?;
        let shape = found.shape();
        let ranges: Vec<Range> = origin
            .iter()
            .zip(block.shape())
            .map(|(&first, &length)| Range::from_length(first, length))
            .collect::<ncbuild::Result<_>>()?;
        match block {
            DataBlock::Byte(array) => self.write_array(begin, &shape, &ranges, array)?,
            DataBlock::Char(array) => self.write_array(begin, &shape, &ranges, array)?,
            DataBlock::Short(array) => self.write_array(begin, &shape, &ranges, array)?,
            DataBlock::Int(array) => self.write_array(begin, &shape, &ranges, array)?,
            DataBlock::Float(array) => self.write_array(begin, &shape, &ranges, array)?,
            DataBlock::Double(array) => self.write_array(begin, &shape, &ranges, array)?,
        }

        Ok(())
    }

    fn flush(&mut self) -> ncbuild::Result<()> {
        self.file.lock().sync_data()?;

        Ok(())
    }
}

/// Write `count` fill values of `T`, then the padding that ends a variable's data
fn write_fill<T: BigEndian>(stream: &mut impl Write, count: usize) -> Result<()> {
    let mut batch = vec![];
    for _ in 0..count.min(FILL_BATCH) {
        T::FILL.encode(&mut batch);
    }

    let size = T::DATA_TYPE.size();
    let mut remaining = count;
    while remaining > 0 {
        let n = remaining.min(FILL_BATCH);
        stream.write_all(&batch[..n * size])?;
        remaining -= n;
    }
    stream.write_all(&[0; 3][..padding(count * size)])?;

    Ok(())
}

/// Call `visit(offset, count)` for each contiguous run of elements, in file order, that makes
/// up the hyper-rectangle `ranges` of a row-major array of `shape`. Offsets are in elements from
/// the start of the array.
///
/// Trailing axes that are selected whole are folded into a single run.
///
fn for_each_run<F>(shape: &[usize], ranges: &[Range], mut visit: F) -> Result<()>
where
    F: FnMut(usize, usize) -> Result<()>,
{
    let rank = shape.len();
    if rank == 0 {
        return visit(0, 1);
    }

    let mut strides = vec![1; rank];
    for axis in (0..rank - 1).rev() {
        strides[axis] = strides[axis + 1] * shape[axis + 1];
    }

    let mut split = rank - 1;
    while split > 0 && ranges[split].length() == shape[split] {
        split -= 1;
    }
    let run = ranges[split].length() * strides[split];
    let inner = ranges[split].first() * strides[split];

    let mut index: Vec<usize> = ranges[..split].iter().map(Range::first).collect();
    loop {
        let outer: usize = index.iter().zip(&strides).map(|(i, stride)| i * stride).sum();
        visit(outer + inner, run)?;

        // Advance the outer axes like an odometer
        let mut axis = split;
        loop {
            if axis == 0 {
                return Ok(());
            }
            axis -= 1;
            if index[axis] < ranges[axis].last() {
                index[axis] += 1;
                break;
            }
            index[axis] = ranges[axis].first();
        }
    }
}
