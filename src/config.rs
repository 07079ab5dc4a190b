use crate::models::PersistentId;
use crate::path_mapper::PathMapper;
use crate::sorter::{SortOrder, SortProperty};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

pub const DEFAULT_OUTPUT_FILE_NAME: &str = "Library.xml";
const PREFERENCES_FILE_NAME: &str = "mlexport.plist";

/// Resolved user settings for one export run.
///
/// Keys mirror the preference store, so a preferences plist deserializes
/// straight into this struct. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ExportConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub music_library_path: Option<String>,
    /// Empty when the preferences never stored one; `load_from_file` fills it in.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generated_persistent_library_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory_path: Option<PathBuf>,
    pub output_file_name: String,

    pub remap_root_directory: bool,
    pub remap_root_directory_original_path: String,
    pub remap_root_directory_mapped_path: String,
    pub remap_root_directory_localhost_prefix: bool,

    pub flatten_playlist_hierarchy: bool,
    pub include_internal_playlists: bool,
    pub excluded_playlist_persistent_ids: BTreeSet<PersistentId>,
    pub playlist_custom_sort_properties: BTreeMap<PersistentId, SortProperty>,
    pub playlist_custom_sort_orders: BTreeMap<PersistentId, SortOrder>,
}

impl Default for ExportConfiguration {
    fn default() -> Self {
        Self {
            music_library_path: None,
            generated_persistent_library_id: Self::generate_persistent_library_id(),
            output_directory_path: None,
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            remap_root_directory: false,
            remap_root_directory_original_path: String::new(),
            remap_root_directory_mapped_path: String::new(),
            remap_root_directory_localhost_prefix: false,
            flatten_playlist_hierarchy: false,
            include_internal_playlists: false,
            excluded_playlist_persistent_ids: BTreeSet::new(),
            playlist_custom_sort_properties: BTreeMap::new(),
            playlist_custom_sort_orders: BTreeMap::new(),
        }
    }
}

impl ExportConfiguration {
    /// Reads preferences from `path`.
    ///
    /// A file without a library ID gets a fresh one, written straight back so
    /// later loads see the same value.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config: Self = plist::from_file(path)
            .with_context(|| format!("Failed to read preferences from {}", path.display()))?;
        if config.generated_persistent_library_id.is_empty() {
            config.regenerate_persistent_library_id();
            config.save_to_file(path)?;
            info!(
                id = %config.generated_persistent_library_id,
                path = %path.display(),
                "Stored new library persistent ID"
            );
        }
        Ok(config)
    }

    /// Like `load_from_file`, but a missing file is created with defaults first.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from_file(path);
        }
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        let config = Self::default();
        config.save_to_file(path)?;
        info!(path = %path.display(), "Created default preferences");
        Ok(config)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        plist::to_file_xml(path, self)
            .with_context(|| format!("Failed to write preferences to {}", path.display()))
    }

    /// `~/Library/Preferences/mlexport.plist` on macOS, the platform
    /// equivalent elsewhere.
    pub fn default_preferences_path() -> Option<PathBuf> {
        dirs::preference_dir().map(|dir| dir.join(PREFERENCES_FILE_NAME))
    }

    /// 16 uppercase hex digits, the shape of a legacy "Library Persistent ID".
    pub fn generate_persistent_library_id() -> String {
        let high = (Uuid::new_v4().as_u128() >> 64) as u64;
        format!("{high:016X}")
    }

    pub fn regenerate_persistent_library_id(&mut self) {
        self.generated_persistent_library_id = Self::generate_persistent_library_id();
    }

    pub fn output_file_path(&self) -> Option<PathBuf> {
        self.output_directory_path
            .as_ref()
            .map(|dir| dir.join(&self.output_file_name))
    }

    pub fn path_mapper(&self) -> PathMapper {
        if !self.remap_root_directory {
            return PathMapper::disabled();
        }
        PathMapper::new(
            self.remap_root_directory_original_path.as_str(),
            self.remap_root_directory_mapped_path.as_str(),
        )
        .with_localhost_prefix(self.remap_root_directory_localhost_prefix)
    }

    pub fn is_playlist_excluded(&self, id: PersistentId) -> bool {
        self.excluded_playlist_persistent_ids.contains(&id)
    }

    /// Sets or clears (`None`) the custom sort of one playlist.
    pub fn set_playlist_sort(
        &mut self,
        id: PersistentId,
        property: Option<SortProperty>,
        order: SortOrder,
    ) {
        match property {
            Some(property) => {
                self.playlist_custom_sort_properties.insert(id, property);
                self.playlist_custom_sort_orders.insert(id, order);
            }
            None => {
                self.playlist_custom_sort_properties.remove(&id);
                self.playlist_custom_sort_orders.remove(&id);
            }
        }
    }
}
