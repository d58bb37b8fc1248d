//! File-system front end: maps `.jack` and `.vm` paths to their outputs.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use log::{debug, info};

use crate::translator::TranslateOptions;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum BootstrapMode {
    /// Emit the bootstrap when a `Sys.vm` unit is present.
    #[default]
    Auto,
    Always,
    Never,
}

/// Files in `dir` with the given extension, sorted by name.
fn sources(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("cannot read {}", dir.display()))? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn unit_name(path: &Path) -> Result<String> {
    match path.file_stem().and_then(|stem| stem.to_str()) {
        Some(stem) => Ok(stem.to_string()),
        None => bail!("{} has no usable file name", path.display()),
    }
}

/// Compiles one class file to its sibling `.vm` file. Nothing is written
/// when compilation fails.
pub fn compile_file(path: &Path) -> Result<PathBuf> {
    let source =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    let vm = crate::compile(&source).with_context(|| format!("{}", path.display()))?;
    let output = path.with_extension("vm");
    fs::write(&output, vm).with_context(|| format!("cannot write {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(output)
}

/// Compiles a `.jack` file, or every `.jack` file of a directory.
pub fn compile_path(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_dir() {
        let files = sources(path, "jack")?;
        if files.is_empty() {
            bail!("no .jack files in {}", path.display());
        }
        files.iter().map(|file| compile_file(file)).collect()
    } else {
        Ok(vec![compile_file(path)?])
    }
}

/// Translates a `.vm` file to its sibling `.asm`, or every `.vm` file of a
/// directory into `<dir>/<dirname>.asm`.
pub fn translate_path(
    path: &Path,
    bootstrap: BootstrapMode,
    options: TranslateOptions,
) -> Result<PathBuf> {
    let (units, output) = if path.is_dir() {
        let dir = fs::canonicalize(path)
            .with_context(|| format!("cannot resolve {}", path.display()))?;
        let name = unit_name(&dir)?;
        let units = sources(&dir, "vm")?;
        if units.is_empty() {
            bail!("no .vm files in {}", dir.display());
        }
        (units, dir.join(format!("{}.asm", name)))
    } else {
        (vec![path.to_path_buf()], path.with_extension("asm"))
    };

    let mut loaded = Vec::with_capacity(units.len());
    for unit in &units {
        let source =
            fs::read_to_string(unit).with_context(|| format!("cannot read {}", unit.display()))?;
        loaded.push((unit_name(unit)?, source));
    }

    let emit_bootstrap = match bootstrap {
        BootstrapMode::Always => true,
        BootstrapMode::Never => false,
        BootstrapMode::Auto => loaded.iter().any(|(name, _)| name == "Sys"),
    };
    debug!(
        "translating {} unit(s), bootstrap: {}",
        loaded.len(),
        emit_bootstrap
    );

    let units: Vec<(&str, &str)> = loaded
        .iter()
        .map(|(name, source)| (name.as_str(), source.as_str()))
        .collect();
    let asm = crate::translate(&units, emit_bootstrap, options)
        .with_context(|| format!("cannot translate {}", path.display()))?;

    fs::write(&output, asm).with_context(|| format!("cannot write {}", output.display()))?;
    info!("wrote {}", output.display());
    Ok(output)
}

/// Compiles every class of `dir`, then translates the directory.
pub fn build(dir: &Path, bootstrap: BootstrapMode, options: TranslateOptions) -> Result<PathBuf> {
    if !dir.is_dir() {
        bail!("{} is not a directory", dir.display());
    }
    compile_path(dir)?;
    translate_path(dir, bootstrap, options)
}
