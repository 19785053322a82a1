mod builder;
mod chunk;
mod copy;
mod data;
mod errors;
mod range;
mod registry;
mod schema;
mod storage;
mod subset;
mod template;
mod time;

#[cfg(test)]
mod testing;

pub use builder::SchemaBuilder;

pub use chunk::for_each_chunk;
pub use chunk::Chunks;

pub use copy::copy_variable;
pub use copy::copy_variable_chunked;

pub use data::DataBlock;
pub use data::Element;

pub use errors::Error;
pub use errors::Result;

pub use range::Range;
pub use range::Selection;

pub use registry::DimensionRegistry;

pub use schema::Attribute;
pub use schema::AttributeValue;
pub use schema::DataType;
pub use schema::DatasetSchema;
pub use schema::Dimension;
pub use schema::Variable;
pub use schema::VariableSpec;

pub use storage::check_selection;
pub use storage::check_write;
pub use storage::Backend;
pub use storage::DatasetReader;
pub use storage::DatasetWriter;
pub use storage::MemoryBackend;
pub use storage::MemoryDataset;
pub use storage::MemoryStore;

pub use subset::subset_copy;
pub use subset::subset_schema;
pub use subset::Subset;

pub use template::FilePathName;
pub use template::Template;
pub use template::TemplateAttribute;
pub use template::TemplateDimension;
pub use template::TemplateValue;
pub use template::TemplateVariable;

pub use time::decode_offset_to_date;
pub use time::decode_time_variable;
pub use time::TimeUnit;
pub use time::TimeUnits;
