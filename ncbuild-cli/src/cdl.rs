//! A CDL-like listing of a dataset's metadata.
//!
use std::fmt::Write;

use ncbuild::{Attribute, DatasetSchema};

pub fn render(name: &str, schema: &DatasetSchema) -> String {
    let mut out = String::new();

    // Writing to a String can't fail
    let _ = render_into(&mut out, name, schema);

    out
}

fn render_into(out: &mut String, name: &str, schema: &DatasetSchema) -> std::fmt::Result {
    writeln!(out, "netcdf {name} {{")?;

    if !schema.dimensions().is_empty() {
        writeln!(out, "dimensions:")?;
        for dimension in schema.dimensions() {
            writeln!(out, "\t{} = {} ;", dimension.name, dimension.size)?;
        }
    }

    if !schema.is_empty() {
        writeln!(out, "variables:")?;
        for variable in schema.variables() {
            let dimensions = variable.spec().dimensions.join(", ");
            if dimensions.is_empty() {
                writeln!(out, "\t{} {} ;", variable.data_type(), variable.name())?;
            } else {
                writeln!(
                    out,
                    "\t{} {}({dimensions}) ;",
                    variable.data_type(),
                    variable.name()
                )?;
            }
            write_attributes(out, variable.name(), variable.attributes())?;
        }
    }

    if !schema.global_attributes().is_empty() {
        writeln!(out)?;
        writeln!(out, "// global attributes:")?;
        write_attributes(out, "", schema.global_attributes())?;
    }

    writeln!(out, "}}")
}

fn write_attributes(out: &mut String, owner: &str, attributes: &[Attribute]) -> std::fmt::Result {
    for attribute in attributes {
        writeln!(out, "\t\t{owner}:{} = {} ;", attribute.name, attribute.value)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ncbuild::{AttributeValue, DataType, SchemaBuilder};

    #[test]
    fn test_render() -> ncbuild::Result<()> {
        let mut builder = SchemaBuilder::new();
        builder.add_global_attribute("Conventions", "CF-1.7")?;
        builder.define_dimension("time", 1)?;
        builder.define_dimension("lat", 106)?;
        builder.define_variable("time", DataType::Int, ["time"], vec![])?;
        builder.add_variable_attribute("time", "units", "minutes since 1850-01-01")?;
        builder.define_variable("tas", DataType::Float, ["time", "lat"], vec![])?;
        let valid_range = AttributeValue::Float(vec![150.0, 350.0]);
        builder.add_variable_attribute("tas", "valid_range", valid_range)?;
        builder.define_variable("crs", DataType::Int, Vec::<&str>::new(), vec![])?;
        let schema = builder.freeze()?;

        let expected = "\
netcdf copy {
dimensions:
\ttime = 1 ;
\tlat = 106 ;
variables:
\tint time(time) ;
\t\ttime:units = \"minutes since 1850-01-01\" ;
\tfloat tas(time, lat) ;
\t\ttas:valid_range = 150f, 350f ;
\tint crs ;

// global attributes:
\t\t:Conventions = \"CF-1.7\" ;
}
";
        assert_eq!(render("copy", &schema), expected);

        Ok(())
    }
}
