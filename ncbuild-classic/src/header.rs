//! The header of a classic file: magic, dimensions, attributes and variable layout.
//!
//! ```text
//! header    = magic numrecs dim_list gatt_list var_list
//! magic     = 'C' 'D' 'F' version                      version is 1, or 2 for 64 bit offsets
//! dim_list  = ABSENT | NC_DIMENSION nelems [name dim_length ...]
//! att_list  = ABSENT | NC_ATTRIBUTE nelems [name nc_type nelems values ...]
//! var_list  = ABSENT | NC_VARIABLE nelems [name nelems [dimid ...] vatt_list nc_type vsize begin ...]
//! ```
//!
//! Every integer is big endian and four bytes wide, except `begin`, which is eight bytes wide in
//! version 2 files. Names and values are zero padded to a multiple of four bytes.
//!
use std::collections::HashSet;
use std::io;

use ncbuild::{Attribute, AttributeValue, DataType, DatasetSchema, SchemaBuilder, Variable};

use crate::{
    errors::{Error, Result},
    extio::{padding, ExtendedRead, ExtendedWrite},
};

const MAGIC: &[u8; 3] = b"CDF";

const NC_DIMENSION: u32 = 0x0A;
const NC_VARIABLE: u32 = 0x0B;
const NC_ATTRIBUTE: u32 = 0x0C;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Version {
    /// CDF-1, 32 bit offsets
    Classic,

    /// CDF-2, 64 bit offsets
    Offset64,
}

impl Version {
    fn byte(&self) -> u8 {
        match self {
            Self::Classic => 1,
            Self::Offset64 => 2,
        }
    }
}

/// Where each variable's data lives in the file
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    pub version: Version,

    /// Offset of each variable's data, in schema order
    pub begins: Vec<u64>,
}

/// Bytes occupied by a variable's data, padding included
pub(crate) fn data_size(variable: &Variable) -> u64 {
    let size = variable.len() * variable.data_type().size();

    (size + padding(size)) as u64
}

/// Lay out the data section of a new file holding `schema`.
///
/// The smallest version able to address every variable is chosen.
///
pub(crate) fn plan(schema: &DatasetSchema) -> Result<Layout> {
    let layout = plan_version(schema, Version::Classic)?;
    match layout.begins.last() {
        Some(&last) if last > i32::MAX as u64 => plan_version(schema, Version::Offset64),
        _ => Ok(layout),
    }
}

fn plan_version(schema: &DatasetSchema, version: Version) -> Result<Layout> {
    let mut layout = Layout {
        version,
        begins: vec![0; schema.len()],
    };

    // Header length doesn't depend on the offsets written into it
    let mut header = vec![];
    write_header(&mut header, schema, &layout)?;

    let mut offset = header.len() as u64;
    for (begin, variable) in layout.begins.iter_mut().zip(schema.variables()) {
        *begin = offset;
        offset += data_size(&variable);
    }

    Ok(layout)
}

pub(crate) fn write_header(
    stream: &mut impl io::Write,
    schema: &DatasetSchema,
    layout: &Layout,
) -> Result<()> {
    stream.write_all(MAGIC)?;
    stream.write_all(&[layout.version.byte()])?;

    // No record dimension, so no records
    stream.write_u32(0)?;

    write_list_header(stream, NC_DIMENSION, schema.dimensions().len())?;
    for dimension in schema.dimensions() {
        let size = u32::try_from(dimension.size).map_err(|_| {
            Error::Unsupported(format!(
                "dimension {:?} of size {} is too long for a classic file",
                dimension.name, dimension.size
            ))
        })?;
        stream.write_name(&dimension.name)?;
        stream.write_u32(size)?;
    }

    write_attributes(stream, schema.global_attributes())?;

    write_list_header(stream, NC_VARIABLE, schema.len())?;
    for (variable, &begin) in schema.variables().zip(&layout.begins) {
        stream.write_name(variable.name())?;
        stream.write_u32(variable.rank() as u32)?;
        for dimension in &variable.spec().dimensions {
            let id = schema
                .dimension_id(dimension)
                .ok_or_else(|| ncbuild::Error::UnknownDimension(dimension.clone()))?;
            stream.write_u32(id as u32)?;
        }
        write_attributes(stream, variable.attributes())?;
        stream.write_u32(variable.data_type().code())?;

        // Sizes too large for 32 bits are stored as the maximum value
        let vsize = u32::try_from(data_size(&variable)).unwrap_or(u32::MAX);
        stream.write_u32(vsize)?;

        match layout.version {
            Version::Classic => stream.write_u32(begin as u32)?,
            Version::Offset64 => stream.write_u64(begin)?,
        }
    }

    Ok(())
}

fn write_list_header(stream: &mut impl io::Write, tag: u32, count: usize) -> Result<()> {
    if count == 0 {
        // ABSENT
        stream.write_u32(0)?;
        stream.write_u32(0)?;
    } else {
        stream.write_u32(tag)?;
        stream.write_u32(count as u32)?;
    }

    Ok(())
}

fn write_attributes(stream: &mut impl io::Write, attributes: &[Attribute]) -> Result<()> {
    write_list_header(stream, NC_ATTRIBUTE, attributes.len())?;
    for attribute in attributes {
        stream.write_name(&attribute.name)?;
        stream.write_u32(attribute.value.data_type().code())?;
        stream.write_u32(attribute.value.len() as u32)?;
        match &attribute.value {
            AttributeValue::Text(text) => stream.write_padded(text.as_bytes())?,
            AttributeValue::Byte(values) => stream.write_values(values)?,
            AttributeValue::Short(values) => stream.write_values(values)?,
            AttributeValue::Int(values) => stream.write_values(values)?,
            AttributeValue::Float(values) => stream.write_values(values)?,
            AttributeValue::Double(values) => stream.write_values(values)?,
        }
    }

    Ok(())
}

/// Parse a header, rebuilding the schema it describes
pub(crate) fn read_header(stream: &mut impl io::Read) -> Result<(DatasetSchema, Layout)> {
    let mut magic = [0; 4];
    stream.read_exact(&mut magic)?;
    if &magic[..3] != MAGIC {
        return Err(Error::Format(String::from("missing CDF magic number")));
    }
    let version = match magic[3] {
        1 => Version::Classic,
        2 => Version::Offset64,
        5 => {
            return Err(Error::Unsupported(String::from(
                "64 bit data (CDF-5) files",
            )))
        }
        other => return Err(Error::Format(format!("unknown version {other}"))),
    };

    // Meaningless without a record dimension
    stream.read_u32()?;

    let mut builder = SchemaBuilder::new();
    let mut dimensions = vec![];
    let mut seen = HashSet::new();
    for _ in 0..read_list_header(stream, NC_DIMENSION)? {
        let name = stream.read_name()?;
        let size = stream.read_u32()? as usize;
        if size == 0 {
            return Err(Error::Unsupported(format!("record dimension {name:?}")));
        }
        if !seen.insert(name.clone()) {
            return Err(Error::Format(format!("dimension {name:?} defined twice")));
        }
        builder.define_dimension(&name, size)?;
        dimensions.push(name);
    }

    for attribute in read_attributes(stream)? {
        builder.add_global_attribute(attribute.name, attribute.value)?;
    }

    let mut begins = vec![];
    for _ in 0..read_list_header(stream, NC_VARIABLE)? {
        let name = stream.read_name()?;
        let rank = stream.read_u32()?;
        let mut names = vec![];
        for _ in 0..rank {
            let id = stream.read_u32()? as usize;
            let dimension = dimensions.get(id).ok_or_else(|| {
                Error::Format(format!("variable {name:?} refers to dimension {id}"))
            })?;
            names.push(dimension.as_str());
        }
        let attributes = read_attributes(stream)?;
        let data_type = read_type(stream)?;

        // vsize is redundant with the shape
        stream.read_u32()?;
        let begin = match version {
            Version::Classic => stream.read_u32()? as u64,
            Version::Offset64 => stream.read_u64()?,
        };

        builder.define_variable(&name, data_type, names, attributes)?;
        begins.push(begin);
    }

    Ok((builder.freeze()?, Layout { version, begins }))
}

fn read_list_header(stream: &mut impl io::Read, tag: u32) -> Result<u32> {
    let found = stream.read_u32()?;
    let count = stream.read_u32()?;
    match (found, count) {
        (0, 0) => Ok(0),
        (found, count) if found == tag => Ok(count),
        (found, _) => Err(Error::Format(format!(
            "expected list tag {tag:#04x}, found {found:#04x}"
        ))),
    }
}

fn read_type(stream: &mut impl io::Read) -> Result<DataType> {
    let code = stream.read_u32()?;

    DataType::from_code(code).ok_or_else(|| Error::Format(format!("unknown type code {code}")))
}

fn read_attributes(stream: &mut impl io::Read) -> Result<Vec<Attribute>> {
    let mut attributes = vec![];
    for _ in 0..read_list_header(stream, NC_ATTRIBUTE)? {
        let name = stream.read_name()?;
        let data_type = read_type(stream)?;
        let count = stream.read_u32()? as usize;
        let value = match data_type {
            DataType::Char => {
                let bytes = stream.read_padded(count)?;
                let text = String::from_utf8(bytes).map_err(|_| {
                    Error::Format(format!("attribute {name:?} is not UTF-8 text"))
                })?;

                // Some writers count a terminating NUL
                AttributeValue::Text(text.trim_end_matches('\0').to_string())
            }
            DataType::Byte => AttributeValue::Byte(stream.read_values(count)?),
            DataType::Short => AttributeValue::Short(stream.read_values(count)?),
            DataType::Int => AttributeValue::Int(stream.read_values(count)?),
            DataType::Float => AttributeValue::Float(stream.read_values(count)?),
            DataType::Double => AttributeValue::Double(stream.read_values(count)?),
        };
        attributes.push(Attribute { name, value });
    }

    Ok(attributes)
}
