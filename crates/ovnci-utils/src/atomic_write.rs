//! File writes for generated artifacts.
//!
//! Generated files (inventory, host_vars, test-env.sh) are replaced atomically
//! via temp file + fsync + rename. Shared system files (`/etc/hosts`,
//! `ansible.cfg`) are appended to instead, since other tools own their content.

use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs::{self, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};

use tempfile::NamedTempFile;

/// Atomically write content to a file using temp file + fsync + rename.
///
/// Line endings are normalized to LF and missing parent directories are
/// created.
pub fn write_file_atomic(path: &Utf8Path, content: &str) -> Result<()> {
    let normalized_content = normalize_line_endings(content);

    if let Some(parent) = path.parent() {
        if !parent.as_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create parent directory: {parent}"))?;
        }
    }

    let temp_dir = match path.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent,
        _ => Utf8Path::new("."),
    };
    let mut temp_file = NamedTempFile::new_in(temp_dir)
        .with_context(|| format!("Failed to create temporary file in: {temp_dir}"))?;

    temp_file
        .write_all(normalized_content.as_bytes())
        .with_context(|| "Failed to write content to temporary file")?;

    temp_file
        .as_file()
        .sync_all()
        .with_context(|| "Failed to fsync temporary file")?;

    temp_file
        .persist(path.as_std_path())
        .map_err(|e| anyhow::anyhow!(e.error))
        .with_context(|| format!("Failed to atomically write file: {path}"))?;

    Ok(())
}

/// Append content to a file, creating it if missing.
///
/// A file whose last line is unterminated gets a newline first, so appended
/// lines never merge into existing ones.
pub fn append_file(path: &Utf8Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open {path} for appending"))?;

    let mut payload = normalize_line_endings(content);
    if ends_unterminated(&mut file).with_context(|| format!("Failed to read {path}"))? {
        payload.insert(0, '\n');
    }

    file.write_all(payload.as_bytes())
        .with_context(|| format!("Failed to append to {path}"))?;
    file.sync_all()
        .with_context(|| format!("Failed to fsync {path}"))?;

    Ok(())
}

fn ends_unterminated(file: &mut fs::File) -> std::io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn normalize_line_endings(content: &str) -> String {
    content.replace("\r\n", "\n").replace('\r', "\n")
}
