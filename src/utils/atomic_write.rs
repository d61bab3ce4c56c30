//! Temp-file-then-rename writes
//!
//! Readers of the destination see either the old contents or the complete new
//! contents, never a partially written file.

use std::io::Write;
use std::path::Path;

/// Write `bytes` to `destination` through a temporary file in the same directory
pub async fn write_atomic(destination: &Path, bytes: Vec<u8>) -> std::io::Result<()> {
    let destination = destination.to_path_buf();
    tokio::task::spawn_blocking(move || write_atomic_blocking(&destination, &bytes))
        .await
        .map_err(std::io::Error::other)?
}

fn write_atomic_blocking(destination: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match destination.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(destination).map_err(|e| e.error)?;
    Ok(())
}
