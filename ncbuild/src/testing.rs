use ndarray::{Array1, Array2, Array3};

use crate::{
    builder::SchemaBuilder,
    data::DataBlock,
    errors::Result,
    schema::{Attribute, AttributeValue, DataType, DatasetSchema},
    storage::{MemoryBackend, MemoryDataset},
};

pub const LAT: usize = 106;
pub const LON: usize = 213;

/// Template laid out the way the regional climate templates are: curvilinear `lat` and `lon`,
/// one time step and a single field
pub const TEMPLATE_JSON: &str = r#"{
    "filePathName": {"dir": "out", "name": "copy.nc"},
    "fileMetadata": [
        {"name": "Conventions", "value": "CF-1.7"},
        {"name": "frequency", "value": "day"}
    ],
    "variables": [
        {
            "name": "lat",
            "type": "DOUBLE",
            "dimensions": [{"name": "lat", "size": 106}, {"name": "lon", "size": 213}],
            "attributes": [{"name": "units", "value": "degrees_north"}]
        },
        {
            "name": "lon",
            "type": "DOUBLE",
            "dimensions": [{"name": "lat", "size": 106}, {"name": "lon", "size": 213}],
            "attributes": [{"name": "units", "value": "degrees_east"}]
        },
        {
            "name": "time",
            "type": "INT",
            "dimensions": [{"name": "time", "size": 1}],
            "attributes": [
                {"name": "units", "value": "minutes since 1850-01-01"},
                {"name": "calendar", "value": "standard"}
            ]
        },
        {
            "name": "tas",
            "type": "FLOAT",
            "dimensions": [
                {"name": "time", "size": 1},
                {"name": "lat", "size": 106},
                {"name": "lon", "size": 213}
            ],
            "attributes": [
                {"name": "units", "value": "K"},
                {"name": "missing_value", "value": 1e20}
            ]
        }
    ]
}"#;

/// Schema of a daily near-surface temperature dataset with `time` steps on a 106 x 213 grid
pub fn tas_schema(time: usize) -> Result<DatasetSchema> {
    let mut builder = SchemaBuilder::new();
    builder
        .add_global_attribute("Conventions", "CF-1.7")?
        .add_global_attribute("frequency", "day")?;

    builder.define_dimension("time", time)?;
    builder.define_dimension("lat", LAT)?;
    builder.define_dimension("lon", LON)?;

    builder.define_variable(
        "lat",
        DataType::Double,
        ["lat", "lon"],
        vec![Attribute::new("units", "degrees_north")],
    )?;
    builder.define_variable(
        "lon",
        DataType::Double,
        ["lat", "lon"],
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
        DataType::Float,
        ["time", "lat", "lon"],
        vec![
            Attribute::new("long_name", "Near-Surface Air Temperature"),
            Attribute::new("units", "K"),
            Attribute::new("missing_value", AttributeValue::Double(vec![1e20])),
        ],
    )?;

    builder.freeze()
}

/// In-memory dataset for `tas_schema(time)` with a distinct value in every cell.
///
/// `time` holds one day per step in minutes, `tas[t, y, x]` is 200 plus the cell's row-major
/// index.
///
pub fn tas_dataset(time: usize) -> Result<MemoryDataset> {
    let lat = Array2::from_shape_fn([LAT, LON], |(y, x)| {
        -12.0 + y as f64 * 0.22 + x as f64 * 1e-4
    });
    let lon = Array2::from_shape_fn([LAT, LON], |(y, x)| {
        131.0 + x as f64 * 0.22 - y as f64 * 1e-4
    });
    let minutes = Array1::from_shape_fn(time, |t| t as i32 * 1440);
    let tas = Array3::from_shape_fn([time, LAT, LON], |(t, y, x)| {
        200.0 + ((t * LAT + y) * LON + x) as f32
    });

    MemoryDataset::new(tas_schema(time)?)
        .with_data("lat", DataBlock::from(lat.into_dyn()))?
        .with_data("lon", DataBlock::from(lon.into_dyn()))?
        .with_data("time", DataBlock::from(minutes.into_dyn()))?
        .with_data("tas", DataBlock::from(tas.into_dyn()))
}

/// Committed in-memory copy of `tas_schema(time)` with every variable still at its fill value
pub fn empty_tas_dataset(time: usize) -> Result<MemoryDataset> {
    let schema = tas_schema(time)?;
    let mut builder = SchemaBuilder::new();
    builder.copy_global_attributes(&schema)?;
    for dimension in schema.dimensions() {
        builder.define_dimension(&dimension.name, dimension.size)?;
    }
    for variable in schema.variables() {
        builder.define_variable_like(&variable, &variable.spec().dimensions)?;
    }

    builder.commit(&MemoryBackend::new())
}
