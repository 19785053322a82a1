use tracing::{debug, warn};

use crate::{
    errors::{Error, Result},
    registry::DimensionRegistry,
    schema::{
        find_attribute, Attribute, AttributeValue, DataType, DatasetSchema, Dimension, Variable,
        VariableSpec,
    },
    storage::Backend,
    template::Template,
};

/// Lifecycle of a build session. Structure can only change while `Open`.
#[derive(Debug)]
enum State {
    Open(DimensionRegistry),
    Committed,
}

/// Builds a dataset schema, then commits it.
///
/// Dimensions, variables and attributes are accumulated while the builder is open. `commit`
/// fixes the metadata and materializes the dataset through a `Backend`; after that any attempt
/// to change the structure fails with `SchemaFrozen`. Data can then only be written through the
/// dataset returned by `commit`.
///
#[derive(Debug)]
pub struct SchemaBuilder {
    state: State,
    global_attributes: Vec<Attribute>,
    variables: Vec<VariableSpec>,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            state: State::Open(DimensionRegistry::new()),
            global_attributes: vec![],
            variables: vec![],
        }
    }

    /// Build a schema from a declarative template.
    ///
    /// Each dimension is defined the first time a variable mentions it and shared by every
    /// later variable naming it, which must then agree on its size.
    ///
    pub fn from_template(template: &Template) -> Result<Self> {
        let mut builder = Self::new();
        for attribute in &template.file_metadata {
            builder.add_global_attribute(&attribute.name, AttributeValue::from(&attribute.value))?;
        }

        for variable in &template.variables {
            for dimension in &variable.dimensions {
                builder.define_dimension(&dimension.name, dimension.size)?;
            }

            let attributes = variable
                .attributes
                .iter()
                .map(|attribute| Attribute::new(&attribute.name, &attribute.value))
                .collect();
            let dimensions = variable.dimensions.iter().map(|dimension| &dimension.name);
            builder.define_variable(&variable.name, variable.data_type, dimensions, attributes)?;
        }

        Ok(builder)
    }

    pub fn is_committed(&self) -> bool {
        matches!(self.state, State::Committed)
    }

    fn registry(&mut self) -> Result<&mut DimensionRegistry> {
        match &mut self.state {
            State::Open(registry) => Ok(registry),
            State::Committed => Err(Error::SchemaFrozen),
        }
    }

    /// Append a global attribute. A name already used by a global attribute is skipped.
    pub fn add_global_attribute<S, V>(&mut self, name: S, value: V) -> Result<&mut Self>
    where
        S: Into<String>,
        V: Into<AttributeValue>,
    {
        self.registry()?;
        let attribute = Attribute::new(name, value);
        check_name(&attribute.name)?;
        push_attribute(&mut self.global_attributes, attribute, None);

        Ok(self)
    }

    /// Copy every global attribute of another dataset
    pub fn copy_global_attributes(&mut self, source: &DatasetSchema) -> Result<&mut Self> {
        for attribute in source.global_attributes() {
            self.add_global_attribute(attribute.name.clone(), attribute.value.clone())?;
        }

        Ok(self)
    }

    /// Define a dimension, or look up one already defined under the same name.
    ///
    /// `size` must be positive. Fails with `SchemaConflict` if `name` is already defined with a
    /// different size.
    ///
    pub fn define_dimension(&mut self, name: &str, size: usize) -> Result<Dimension> {
        check_name(name)?;
        if size == 0 {
            return Err(Error::InvalidDimensionSize {
                name: name.to_string(),
                size: 0,
            });
        }

        let registry = self.registry()?;
        let known = registry.get(name).is_some();
        let dimension = registry.get_or_create(name, size)?.clone();
        if !known {
            debug!(name, size, "defined dimension");
        }

        Ok(dimension)
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        match &self.state {
            State::Open(registry) => registry.get(name),
            State::Committed => None,
        }
    }

    /// Define a variable over already defined dimensions.
    ///
    /// # Arguments
    ///
    /// * `name` - Name of the new variable. Must not be in use by another variable.
    /// * `data_type` - Element type of the stored data.
    /// * `dimensions` - Names of the variable's dimensions, in storage order. Each must have
    ///   been defined with `define_dimension` beforehand.
    /// * `attributes` - The variable's attributes. Repeated names are skipped.
    ///
    pub fn define_variable<I, S>(
        &mut self,
        name: &str,
        data_type: DataType,
        dimensions: I,
        attributes: Vec<Attribute>,
    ) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let registry = self.registry()?;
        let dimensions = dimensions
            .into_iter()
            .map(|dimension| {
                let dimension = dimension.as_ref();
                registry
                    .get(dimension)
                    .map(|dimension| dimension.name.clone())
                    .ok_or_else(|| Error::UnknownDimension(dimension.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        check_name(name)?;
        if self.variables.iter().any(|variable| variable.name == name) {
            return Err(Error::DuplicateVariable(name.to_string()));
        }

        let mut variable = VariableSpec {
            name: name.to_string(),
            data_type,
            dimensions,
            attributes: Vec::with_capacity(attributes.len()),
        };
        for attribute in attributes {
            check_name(&attribute.name)?;
            push_attribute(&mut variable.attributes, attribute, Some(name));
        }

        debug!(
            name,
            data_type = data_type.name(),
            dimensions = ?variable.dimensions,
            "defined variable"
        );
        self.variables.push(variable);

        Ok(self)
    }

    /// Define a variable with the name, type and attributes of `source`, over new dimensions
    pub fn define_variable_like<I, S>(
        &mut self,
        source: &Variable,
        dimensions: I,
    ) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.define_variable(
            source.name(),
            source.data_type(),
            dimensions,
            source.attributes().to_vec(),
        )
    }

    /// Append an attribute to an already defined variable
    pub fn add_variable_attribute<S, V>(
        &mut self,
        variable: &str,
        name: S,
        value: V,
    ) -> Result<&mut Self>
    where
        S: Into<String>,
        V: Into<AttributeValue>,
    {
        self.registry()?;
        let attribute = Attribute::new(name, value);
        check_name(&attribute.name)?;
        let spec = self
            .variables
            .iter_mut()
            .find(|spec| spec.name == variable)
            .ok_or_else(|| Error::VariableNotFound(variable.to_string()))?;
        push_attribute(&mut spec.attributes, attribute, Some(variable));

        Ok(self)
    }

    /// Fix the schema without materializing it anywhere.
    ///
    /// Used by `commit` and by backends reconstructing the schema of an existing dataset. The
    /// builder is frozen afterwards.
    ///
    pub fn freeze(&mut self) -> Result<DatasetSchema> {
        let registry = match std::mem::replace(&mut self.state, State::Committed) {
            State::Open(registry) => registry,
            State::Committed => return Err(Error::SchemaFrozen),
        };

        Ok(DatasetSchema::new(
            std::mem::take(&mut self.global_attributes),
            registry.into_dimensions(),
            std::mem::take(&mut self.variables),
        ))
    }

    /// Commit the schema and create the dataset through `backend`.
    ///
    /// Once this returns, whether successfully or not, the builder is frozen. Data is written
    /// into the returned dataset.
    ///
    pub fn commit<B: Backend>(&mut self, backend: &B) -> Result<B::Dataset> {
        let schema = self.freeze()?;
        debug!(
            dimensions = schema.dimensions().len(),
            variables = schema.len(),
            "committing schema"
        );

        backend.create(schema)
    }
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::InvalidName(name.to_string()));
    }

    Ok(())
}

/// Add `attribute` unless its name is already present, in which case the first value wins
fn push_attribute(attributes: &mut Vec<Attribute>, attribute: Attribute, owner: Option<&str>) {
    if find_attribute(attributes, &attribute.name).is_some() {
        warn!(
            owner = owner.unwrap_or("<global>"),
            attribute = attribute.name.as_str(),
            "skipping duplicate attribute"
        );
        return;
    }

    attributes.push(attribute);
}
