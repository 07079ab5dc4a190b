use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::models::LibrarySnapshot;

/// Loads a snapshot written by the external library-access helper.
pub fn load_snapshot<P: AsRef<Path>>(path: P) -> Result<LibrarySnapshot> {
    let path = path.as_ref();
    let json_str = fs::read_to_string(path)
        .with_context(|| format!("Failed to read library snapshot {}", path.display()))?;
    parse_snapshot(&json_str)
        .with_context(|| format!("Failed to load library snapshot {}", path.display()))
}

pub fn parse_snapshot(json_str: &str) -> Result<LibrarySnapshot> {
    let snapshot: LibrarySnapshot = serde_json::from_str(json_str)
        .context("Failed to parse JSON output from the library helper")?;

    tracing::debug!(
        tracks = snapshot.items.len(),
        playlists = snapshot.playlists.len(),
        version = %snapshot.application_version,
        "Loaded library snapshot"
    );
    Ok(snapshot)
}
