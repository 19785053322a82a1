//! The declarative description a dataset schema is built from.
//!
//! Loading the description from JSON or YAML is left to the caller; these types only define its
//! shape. Field names are camel case (`filePathName`, `fileMetadata`, `variables`).
//!
use std::path::PathBuf;

use serde::Deserialize;

use crate::schema::{AttributeValue, DataType};

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub file_path_name: FilePathName,

    /// Global attributes
    #[serde(default)]
    pub file_metadata: Vec<TemplateAttribute>,

    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
}

impl Template {
    /// Where the dataset described by this template should be created
    pub fn target_path(&self) -> PathBuf {
        let mut path = PathBuf::from(&self.file_path_name.dir);
        path.push(&self.file_path_name.name);

        path
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct FilePathName {
    #[serde(default)]
    pub dir: String,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TemplateAttribute {
    pub name: String,
    pub value: TemplateValue,
}

/// Attribute values as they appear in a template
///
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TemplateValue {
    Text(String),
    Int(i32),
    Double(f64),
    Ints(Vec<i32>),
    Doubles(Vec<f64>),
}

impl From<&TemplateValue> for AttributeValue {
    fn from(value: &TemplateValue) -> Self {
        match value {
            TemplateValue::Text(text) => Self::Text(text.clone()),
            TemplateValue::Int(n) => Self::Int(vec![*n]),
            TemplateValue::Double(n) => Self::Double(vec![*n]),
            TemplateValue::Ints(values) => Self::Int(values.clone()),
            TemplateValue::Doubles(values) => Self::Double(values.clone()),
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TemplateVariable {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: DataType,

    /// Dimensions in storage order, eg `time, lat, lon`
    pub dimensions: Vec<TemplateDimension>,

    #[serde(default)]
    pub attributes: Vec<TemplateAttribute>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TemplateDimension {
    pub name: String,
    pub size: usize,
}
