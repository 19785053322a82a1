use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::info;

use ncbuild::{
    decode_time_variable, subset_copy, subset_schema, DatasetReader, DatasetWriter, SchemaBuilder,
    Subset, Template,
};
use ncbuild_classic::{ClassicBackend, ClassicFile};

use crate::cdl;

/// Read a template, as JSON or YAML depending on the file's extension
pub fn load_template(path: &Path) -> Result<Template> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading template {}", path.display()))?;
    let template = match path.extension().and_then(|extension| extension.to_str()) {
        Some("json") => serde_json::from_str(&text)
            .with_context(|| format!("parsing template {}", path.display()))?,
        Some("yaml" | "yml") => serde_yaml::from_str(&text)
            .with_context(|| format!("parsing template {}", path.display()))?,
        _ => bail!(
            "template {} must have a .json, .yaml or .yml extension",
            path.display()
        ),
    };

    Ok(template)
}

/// Create the dataset a template describes, every variable holding its fill value.
/// Returns where the dataset was written.
pub fn create(template: &Path) -> Result<PathBuf> {
    let template = load_template(template)?;
    let target = template.target_path();
    if let Some(dir) = target.parent() {
        if !dir.as_os_str().is_empty() {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating directory {}", dir.display()))?;
        }
    }

    let mut builder = SchemaBuilder::from_template(&template)?;
    let mut dataset = builder.commit(&ClassicBackend::new(&target))?;
    dataset.flush()?;

    Ok(target)
}

/// Copy the part of `source` selected by `ranges`, each `dim=first:last`, into a new dataset
/// at `target`
pub fn subset(source: &Path, target: &Path, ranges: &[String], chunk_size: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(ncbuild::Error::InvalidChunkSize.into());
    }
    if target.exists() && fs::canonicalize(source)? == fs::canonicalize(target)? {
        bail!("source and target are the same file: {}", source.display());
    }

    let mut subset = Subset::new();
    for range in ranges {
        subset
            .push(range)
            .with_context(|| format!("bad range {range:?}"))?;
    }

    let source_file = ClassicFile::open(source)
        .with_context(|| format!("opening {}", source.display()))?;
    let mut builder = subset_schema(source_file.schema(), &subset)?;
    let mut target_file = builder.commit(&ClassicBackend::new(target))?;
    subset_copy(&source_file, &mut target_file, &subset, chunk_size)?;

    info!(
        source = %source.display(),
        target = %target.display(),
        "subset written"
    );

    Ok(())
}

/// List the decoded values of a time variable, one per line
pub fn dates(out: &mut impl Write, file: &Path, variable: &str) -> Result<()> {
    let dataset = ClassicFile::open(file).with_context(|| format!("opening {}", file.display()))?;
    for (i, date) in decode_time_variable(&dataset, variable)?.into_iter().enumerate() {
        match date {
            Some(date) => writeln!(out, "{i}\t{date}")?,
            None => writeln!(out, "{i}\t_")?,
        }
    }

    Ok(())
}

/// Print a dataset's metadata
pub fn header(out: &mut impl Write, file: &Path) -> Result<()> {
    let dataset = ClassicFile::open(file).with_context(|| format!("opening {}", file.display()))?;
    let name = file
        .file_stem()
        .map(|stem| stem.to_string_lossy())
        .unwrap_or_default();
    write!(out, "{}", cdl::render(&name, dataset.schema()))?;

    Ok(())
}
