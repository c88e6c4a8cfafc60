//! # Output Writers
//!
//! Renders a finished [`FontModel`] into output files. Every writer returns
//! bytes in memory; nothing touches the disk until [`write_files`] runs, so a
//! failing build never leaves partial output behind.

pub mod binary;
pub mod dump;
pub mod lvgl;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::info;

use crate::error::FontError;
use crate::font::FontModel;
use crate::options::OutputFormat;

/// Output path → file content.
pub type OutputFiles = BTreeMap<PathBuf, Vec<u8>>;

/// Render the model in the requested format. `output` is a file for `bin`
/// and `lvgl`, a directory for `dump`.
pub fn render(
    font: &FontModel,
    format: OutputFormat,
    output: &Path,
    command_line: &str,
) -> Result<OutputFiles, FontError> {
    let mut files = OutputFiles::new();
    match format {
        OutputFormat::Bin => {
            files.insert(output.to_path_buf(), binary::write(font));
        }
        OutputFormat::Lvgl => {
            let name = lvgl::font_name(output);
            let source = lvgl::write(font, &name, command_line);
            files.insert(output.to_path_buf(), source.into_bytes());
        }
        OutputFormat::Dump => {
            for (name, data) in dump::write(font)? {
                files.insert(output.join(name), data);
            }
        }
    }
    Ok(files)
}

/// Write every file, creating parent directories as needed.
pub fn write_files(files: &OutputFiles) -> Result<(), FontError> {
    for (path, data) in files {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| FontError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, data).map_err(|source| FontError::Io {
            path: path.clone(),
            source,
        })?;
        info!("Written {} bytes to {}", data.len(), path.display());
    }
    Ok(())
}
