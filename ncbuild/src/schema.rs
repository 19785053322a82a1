//! The dataset data model: dimensions, typed variables and attributes.
//!
//! A `DatasetSchema` is only ever produced by a `SchemaBuilder` and is immutable once it exists.
//! Variables refer to their dimensions by name, the dimensions themselves live once in the
//! schema.
//!
use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

/// The element types of the classic array-file model
///
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DataType {
    Byte,
    Char,
    Short,
    Int,
    Float,
    Double,
}

impl DataType {
    /// Size of a single element, in bytes
    pub fn size(&self) -> usize {
        match self {
            Self::Byte | Self::Char => 1,
            Self::Short => 2,
            Self::Int | Self::Float => 4,
            Self::Double => 8,
        }
    }

    /// The `nc_type` code used by classic files
    pub fn code(&self) -> u32 {
        match self {
            Self::Byte => 1,
            Self::Char => 2,
            Self::Short => 3,
            Self::Int => 4,
            Self::Float => 5,
            Self::Double => 6,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::Byte),
            2 => Some(Self::Char),
            3 => Some(Self::Short),
            4 => Some(Self::Int),
            5 => Some(Self::Float),
            6 => Some(Self::Double),
            _ => None,
        }
    }

    /// Lower case name, as used in CDL
    pub fn name(&self) -> &'static str {
        match self {
            Self::Byte => "byte",
            Self::Char => "char",
            Self::Short => "short",
            Self::Int => "int",
            Self::Float => "float",
            Self::Double => "double",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named axis with a fixed extent
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Dimension {
    pub name: String,
    pub size: usize,
}

impl Dimension {
    pub fn new<S: Into<String>>(name: S, size: usize) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// The value of an attribute. Numeric attributes are vectors, as in the classic model.
///
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeValue {
    Text(String),
    Byte(Vec<i8>),
    Short(Vec<i16>),
    Int(Vec<i32>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl AttributeValue {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Text(_) => DataType::Char,
            Self::Byte(_) => DataType::Byte,
            Self::Short(_) => DataType::Short,
            Self::Int(_) => DataType::Int,
            Self::Float(_) => DataType::Float,
            Self::Double(_) => DataType::Double,
        }
    }

    /// Number of elements. For text this is the byte length.
    pub fn len(&self) -> usize {
        match self {
            Self::Text(value) => value.len(),
            Self::Byte(values) => values.len(),
            Self::Short(values) => values.len(),
            Self::Int(values) => values.len(),
            Self::Float(values) => values.len(),
            Self::Double(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(values: &[T], suffix: &str) -> String {
            values
                .iter()
                .map(|value| format!("{value}{suffix}"))
                .collect::<Vec<_>>()
                .join(", ")
        }

        match self {
            Self::Text(value) => write!(f, "{value:?}"),
            Self::Byte(values) => f.write_str(&join(values, "b")),
            Self::Short(values) => f.write_str(&join(values, "s")),
            Self::Int(values) => f.write_str(&join(values, "")),
            Self::Float(values) => f.write_str(&join(values, "f")),
            Self::Double(values) => f.write_str(&join(values, "")),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(vec![value])
    }
}

impl From<f32> for AttributeValue {
    fn from(value: f32) -> Self {
        Self::Float(vec![value])
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Double(vec![value])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

impl Attribute {
    pub fn new<S, V>(name: S, value: V) -> Self
    where
        S: Into<String>,
        V: Into<AttributeValue>,
    {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Look up an attribute by name. The first attribute with the name wins.
pub(crate) fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a Attribute> {
    attributes.iter().find(|attribute| attribute.name == name)
}

/// The stored definition of a variable
///
/// Dimensions are held by name, in declared storage order, and resolved against the owning
/// schema.
///
#[derive(Clone, Debug, PartialEq)]
pub struct VariableSpec {
    pub name: String,
    pub data_type: DataType,
    pub dimensions: Vec<String>,
    pub attributes: Vec<Attribute>,
}

impl VariableSpec {
    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.attributes, name)
    }
}

/// A committed, immutable dataset schema
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DatasetSchema {
    global_attributes: Vec<Attribute>,
    dimensions: Vec<Dimension>,
    dimension_index: HashMap<String, usize>,
    variables: Vec<VariableSpec>,
    variable_index: HashMap<String, usize>,
}

impl DatasetSchema {
    /// Assemble a schema from already validated parts. Only the builder calls this.
    pub(crate) fn new(
        global_attributes: Vec<Attribute>,
        dimensions: Vec<Dimension>,
        variables: Vec<VariableSpec>,
    ) -> Self {
        let dimension_index = dimensions
            .iter()
            .enumerate()
            .map(|(i, dimension)| (dimension.name.clone(), i))
            .collect();
        let variable_index = variables
            .iter()
            .enumerate()
            .map(|(i, variable)| (variable.name.clone(), i))
            .collect();

        Self {
            global_attributes,
            dimensions,
            dimension_index,
            variables,
            variable_index,
        }
    }

    pub fn global_attributes(&self) -> &[Attribute] {
        &self.global_attributes
    }

    pub fn global_attribute(&self, name: &str) -> Option<&Attribute> {
        find_attribute(&self.global_attributes, name)
    }

    /// Dimensions in definition order
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimension_index.get(name).map(|&i| &self.dimensions[i])
    }

    /// Position of a dimension in definition order. Classic files refer to dimensions by this
    /// id.
    pub fn dimension_id(&self, name: &str) -> Option<usize> {
        self.dimension_index.get(name).copied()
    }

    pub fn variables(&self) -> impl Iterator<Item = Variable<'_>> {
        self.variables.iter().map(move |spec| Variable { spec, schema: self })
    }

    pub fn variable(&self, name: &str) -> Option<Variable<'_>> {
        self.variable_index.get(name).map(|&i| Variable {
            spec: &self.variables[i],
            schema: self,
        })
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// A variable resolved against its schema
///
#[derive(Clone, Copy, Debug)]
pub struct Variable<'a> {
    spec: &'a VariableSpec,
    schema: &'a DatasetSchema,
}

impl<'a> Variable<'a> {
    pub fn spec(&self) -> &'a VariableSpec {
        self.spec
    }

    pub fn name(&self) -> &'a str {
        &self.spec.name
    }

    pub fn data_type(&self) -> DataType {
        self.spec.data_type
    }

    pub fn rank(&self) -> usize {
        self.spec.rank()
    }

    pub fn dimensions(&self) -> impl Iterator<Item = &'a Dimension> + 'a {
        let schema = self.schema;
        self.spec
            .dimensions
            .iter()
            .filter_map(move |name| schema.dimension(name))
    }

    /// Extent of each axis, in declared dimension order
    pub fn shape(&self) -> Vec<usize> {
        self.dimensions().map(|dimension| dimension.size).collect()
    }

    /// Total number of elements
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn attributes(&self) -> &'a [Attribute] {
        &self.spec.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&'a Attribute> {
        self.spec.attribute(name)
    }
}
