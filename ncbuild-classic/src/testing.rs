use ndarray::{Array1, Array3};

use ncbuild::{Attribute, AttributeValue, DataBlock, DataType, DatasetSchema, SchemaBuilder};

use crate::errors::Result;

/// Schema of a small daily temperature dataset, `time` steps on a 6 x 7 grid
pub fn tas_schema(time: usize) -> Result<DatasetSchema> {
    let mut builder = SchemaBuilder::new();
    builder.add_global_attribute("Conventions", "CF-1.7")?;
    builder.add_global_attribute("realization", 1)?;

    builder.define_dimension("time", time)?;
    builder.define_dimension("lat", 6)?;
    builder.define_dimension("lon", 7)?;

    builder.define_variable(
        "lat",
        DataType::Float,
        ["lat"],
        vec![Attribute::new("units", "degrees_north")],
    )?;
    builder.define_variable(
        "lon",
        DataType::Float,
        ["lon"],
        vec![Attribute::new("units", "degrees_east")],
    )?;
    builder.define_variable(
        "time",
        DataType::Int,
        ["time"],
        vec![
            Attribute::new("units", "minutes since 1850-01-01"),
            Attribute::new("calendar", "standard"),
        ],
    )?;
    builder.define_variable(
        "tas",
        DataType::Double,
        ["time", "lat", "lon"],
        vec![
            Attribute::new("units", "K"),
            Attribute::new("valid_range", AttributeValue::Float(vec![150.0, 350.0])),
            Attribute::new("flags", AttributeValue::Byte(vec![0, 1, 2])),
            Attribute::new("levels", AttributeValue::Short(vec![850, 500])),
        ],
    )?;

    Ok(builder.freeze()?)
}

/// `tas[t, y, x]`, distinct in every cell
pub fn tas(time: usize) -> DataBlock {
    Array3::from_shape_fn([time, 6, 7], |(t, y, x)| 250.0 + (t * 100 + y * 10 + x) as f64)
        .into_dyn()
        .into()
}

/// One day per step, in minutes
pub fn minutes(time: usize) -> DataBlock {
    Array1::from_shape_fn(time, |t| t as i32 * 1440).into_dyn().into()
}
