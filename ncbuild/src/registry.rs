use std::collections::HashMap;

use crate::{
    errors::{Error, Result},
    schema::Dimension,
};

/// Deduplicates named dimensions for one build session.
///
/// Dimensions are stored once, in definition order, and looked up by name. Asking for a name
/// that is already registered returns the existing dimension, provided the sizes agree.
///
#[derive(Debug, Default)]
pub struct DimensionRegistry {
    dimensions: Vec<Dimension>,
    index: HashMap<String, usize>,
}

impl DimensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the dimension called `name`, registering it with `size` if it isn't known yet.
    ///
    /// Fails with `SchemaConflict` if `name` is registered with a different size.
    ///
    pub fn get_or_create(&mut self, name: &str, size: usize) -> Result<&Dimension> {
        let i = match self.index.get(name) {
            Some(&i) => {
                let existing = self.dimensions[i].size;
                if existing != size {
                    return Err(Error::SchemaConflict {
                        name: name.to_string(),
                        existing,
                        requested: size,
                    });
                }

                i
            }
            None => {
                let i = self.dimensions.len();
                self.dimensions.push(Dimension::new(name, size));
                self.index.insert(name.to_string(), i);

                i
            }
        };

        Ok(&self.dimensions[i])
    }

    pub fn get(&self, name: &str) -> Option<&Dimension> {
        self.index.get(name).map(|&i| &self.dimensions[i])
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// Consume the registry, yielding dimensions in definition order
    pub fn into_dimensions(self) -> Vec<Dimension> {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_shares_dimension() -> Result<()> {
        let mut registry = DimensionRegistry::new();
        let first = registry.get_or_create("lat", 106)?.clone();
        let second = registry.get_or_create("lat", 106)?.clone();

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);

        Ok(())
    }

    #[test]
    fn test_get_or_create_conflict() -> Result<()> {
        let mut registry = DimensionRegistry::new();
        registry.get_or_create("lat", 106)?;

        match registry.get_or_create("lat", 90) {
            Err(Error::SchemaConflict {
                name,
                existing,
                requested,
            }) => {
                assert_eq!(name, "lat");
                assert_eq!(existing, 106);
                assert_eq!(requested, 90);
            }
            other => panic!("expected a conflict, got {other:?}"),
        }

        // The original definition survives the failed request
        assert_eq!(registry.get("lat").unwrap().size, 106);

        Ok(())
    }

    #[test]
    fn test_definition_order() -> Result<()> {
        let mut registry = DimensionRegistry::new();
        registry.get_or_create("time", 1)?;
        registry.get_or_create("lat", 106)?;
        registry.get_or_create("time", 1)?;
        registry.get_or_create("lon", 213)?;

        let names: Vec<String> = registry
            .into_dimensions()
            .into_iter()
            .map(|dimension| dimension.name)
            .collect();
        assert_eq!(names, vec!["time", "lat", "lon"]);

        Ok(())
    }

    #[test]
    fn test_same_size_different_names_stay_distinct() -> Result<()> {
        let mut registry = DimensionRegistry::new();
        registry.get_or_create("time", 1)?;
        registry.get_or_create("bnds", 1)?;
        assert_eq!(registry.len(), 2);

        Ok(())
    }
}
