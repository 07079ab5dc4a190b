//! Export pipeline driver.
//!
//! One run walks `Preparing → GeneratingTracks → GeneratingPlaylists →
//! GeneratingLibrary → WritingToDisk → Finished`, dropping to `Error` on the
//! first failure. A later run starts again from `Stopped`. Only one run may be
//! active per manager; a second request while busy is rejected, never queued.

use crate::config::ExportConfiguration;
use crate::entity_ids::EntityIdRepository;
use crate::error::ExportError;
use crate::filter::{
    DistinguishedKindFilter, MediaItemFilter, MediaItemFilterGroup, MediaItemFiltering,
    MediaKindFilter, PlaylistFilter, PlaylistFilterGroup, PlaylistKindFilter,
    PlaylistParentIdFilter,
};
use crate::models::{LibrarySnapshot, MediaItem, Playlist, PlaylistKind};
use crate::playlist_tree::PlaylistTreeGenerator;
use crate::serializer::{LibrarySerializer, MediaItemSerializer, PlaylistSerializer};
use plist::{Dictionary, Value};
use std::fmt;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ExportState {
    #[default]
    Stopped,
    Preparing,
    GeneratingTracks,
    GeneratingPlaylists,
    GeneratingLibrary,
    WritingToDisk,
    Finished,
    Error,
}

impl ExportState {
    pub fn name(self) -> &'static str {
        match self {
            ExportState::Stopped => "Stopped",
            ExportState::Preparing => "Preparing",
            ExportState::GeneratingTracks => "Generating tracks",
            ExportState::GeneratingPlaylists => "Generating playlists",
            ExportState::GeneratingLibrary => "Generating library",
            ExportState::WritingToDisk => "Writing to disk",
            ExportState::Finished => "Finished",
            ExportState::Error => "Error",
        }
    }

    /// True for every state between the start of a run and its outcome.
    pub fn is_active(self) -> bool {
        !matches!(self, ExportState::Stopped | ExportState::Finished | ExportState::Error)
    }
}

impl fmt::Display for ExportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives progress from a run, synchronously on the thread doing the export.
pub trait ExportObserver: Send + Sync {
    fn state_changed(&self, _state: ExportState) {}
    fn tracks_exported(&self, _done: usize, _total: usize) {}
    fn playlists_exported(&self, _done: usize, _total: usize) {}
    fn playlist_excluded(&self, _playlist: &Playlist) {}
}

struct SilentObserver;

impl ExportObserver for SilentObserver {}

pub struct ExportManager {
    config: ExportConfiguration,
    observer: Arc<dyn ExportObserver>,
    state: Mutex<ExportState>,
    is_exporting: AtomicBool,
}

struct ExportGuard<'a>(&'a AtomicBool);

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ExportManager {
    pub fn new(config: ExportConfiguration) -> Self {
        Self::with_observer(config, Arc::new(SilentObserver))
    }

    pub fn with_observer(config: ExportConfiguration, observer: Arc<dyn ExportObserver>) -> Self {
        Self {
            config,
            observer,
            state: Mutex::new(ExportState::Stopped),
            is_exporting: AtomicBool::new(false),
        }
    }

    pub fn configuration(&self) -> &ExportConfiguration {
        &self.config
    }

    /// Replaces the configuration used by subsequent runs.
    pub fn set_configuration(&mut self, config: ExportConfiguration) {
        self.config = config;
    }

    pub fn state(&self) -> ExportState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Runs the full pipeline and writes the document, returning where it was written.
    pub fn export_library(&self, snapshot: &LibrarySnapshot) -> Result<PathBuf, ExportError> {
        let _guard = self.begin()?;
        let result = self.run_export(snapshot);
        self.finish(result)
    }

    /// Runs the pipeline without touching the disk.
    pub fn generate_document(&self, snapshot: &LibrarySnapshot) -> Result<Dictionary, ExportError> {
        let _guard = self.begin()?;
        let result = self.run_preview(snapshot);
        self.finish(result)
    }

    fn begin(&self) -> Result<ExportGuard<'_>, ExportError> {
        if self.is_exporting.swap(true, Ordering::SeqCst) {
            return Err(ExportError::Busy {
                state: self.state().to_string(),
            });
        }
        Ok(ExportGuard(&self.is_exporting))
    }

    fn finish<T>(&self, result: Result<T, ExportError>) -> Result<T, ExportError> {
        match &result {
            Ok(_) => self.set_state(ExportState::Finished),
            Err(e) => {
                error!(error = %e, kind = ?e.kind(), "Library export failed");
                self.set_state(ExportState::Error);
            }
        }
        result
    }

    /// A finished or failed manager passes back through `Stopped` before the next run.
    fn start(&self) {
        if self.state() != ExportState::Stopped {
            self.set_state(ExportState::Stopped);
        }
        self.set_state(ExportState::Preparing);
    }

    fn run_export(&self, snapshot: &LibrarySnapshot) -> Result<PathBuf, ExportError> {
        self.start();
        let music_folder = self.validate_music_source()?;
        let (output_dir, output_path) = self.validate_output()?;

        let document = self.build_document(snapshot, music_folder);

        self.set_state(ExportState::WritingToDisk);
        write_document(document, &output_dir, &output_path)?;
        info!(path = %output_path.display(), "Library exported");
        Ok(output_path)
    }

    fn run_preview(&self, snapshot: &LibrarySnapshot) -> Result<Dictionary, ExportError> {
        self.start();
        let music_folder = self.validate_music_source()?;
        Ok(self.build_document(snapshot, music_folder))
    }

    fn set_state(&self, state: ExportState) {
        {
            let mut current = self.state.lock().unwrap_or_else(|e| e.into_inner());
            *current = state;
        }
        debug!(%state, "Export state changed");
        self.observer.state_changed(state);
    }

    fn validate_music_source(&self) -> Result<&str, ExportError> {
        debug!(config = ?self.config, "Preparing export");

        let music_folder = self
            .config
            .music_library_path
            .as_deref()
            .filter(|path| !path.trim().is_empty())
            .ok_or(ExportError::MusicLibraryPathUnset)?;

        let config = &self.config;
        if config.generated_persistent_library_id.is_empty() {
            return Err(ExportError::LibraryIdUnset);
        }
        if config.remap_root_directory
            && (config.remap_root_directory_original_path.is_empty()
                || config.remap_root_directory_mapped_path.is_empty())
        {
            return Err(ExportError::InvalidRemapping {
                search: config.remap_root_directory_original_path.clone(),
                replacement: config.remap_root_directory_mapped_path.clone(),
            });
        }
        Ok(music_folder)
    }

    fn validate_output(&self) -> Result<(PathBuf, PathBuf), ExportError> {
        let dir = self
            .config
            .output_directory_path
            .clone()
            .ok_or(ExportError::OutputDirectoryUnset)?;
        if !dir.is_dir() {
            return Err(ExportError::OutputDirectoryMissing { path: dir });
        }
        if let Err(source) = tempfile::tempfile_in(&dir) {
            return Err(ExportError::OutputDirectoryNotWritable { path: dir, source });
        }

        let name = &self.config.output_file_name;
        if !is_valid_file_name(name) {
            return Err(ExportError::InvalidOutputFileName { name: name.clone() });
        }
        let path = dir.join(name);
        Ok((dir, path))
    }

    fn build_document(&self, snapshot: &LibrarySnapshot, music_folder: &str) -> Dictionary {
        let config = &self.config;
        let mut ids = EntityIdRepository::new();

        self.set_state(ExportState::GeneratingTracks);
        let item_filters = self.media_item_filters();
        let items: Vec<&MediaItem> = snapshot
            .items
            .iter()
            .filter(|item| item_filters.passes(item))
            .collect();
        let tracks = MediaItemSerializer::new(config.path_mapper())
            .serialize_items(&items, &mut ids, |done, total| {
                self.observer.tracks_exported(done, total)
            });
        info!(
            exported = items.len(),
            skipped = snapshot.items.len() - items.len(),
            "Serialized tracks"
        );

        self.set_state(ExportState::GeneratingPlaylists);
        let tree = PlaylistTreeGenerator::new(self.playlist_filters())
            .flatten_folders(config.flatten_playlist_hierarchy)
            .custom_sorting(
                config.playlist_custom_sort_properties.clone(),
                config.playlist_custom_sort_orders.clone(),
            )
            .generate(&snapshot.playlists);
        for playlist in &tree.excluded {
            debug!(id = %playlist.persistent_id, name = %playlist.name, "Excluded playlist");
            self.observer.playlist_excluded(playlist);
        }
        let playlists = PlaylistSerializer::new(&items)
            .serialize_tree(&tree.root, &mut ids, |done, total| {
                self.observer.playlists_exported(done, total)
            });
        info!(
            exported = playlists.len(),
            excluded = tree.excluded.len(),
            "Serialized playlists"
        );

        self.set_state(ExportState::GeneratingLibrary);
        LibrarySerializer::new(config.generated_persistent_library_id.as_str(), music_folder)
            .serialize_library(snapshot, tracks, playlists)
    }

    fn media_item_filters(&self) -> MediaItemFilterGroup {
        MediaItemFilterGroup::new(vec![MediaItemFilter::Kind(MediaKindFilter::with_base_kinds())])
    }

    fn playlist_filters(&self) -> PlaylistFilterGroup {
        let config = &self.config;

        let mut kinds = PlaylistKindFilter::with_base_kinds();
        if config.flatten_playlist_hierarchy {
            kinds.remove_kind(PlaylistKind::Folder);
        }
        let distinguished = if config.include_internal_playlists {
            DistinguishedKindFilter::with_internal_kinds()
        } else {
            DistinguishedKindFilter::with_base_kinds()
        };

        let mut group = PlaylistFilterGroup::new(vec![
            PlaylistFilter::Kind(kinds),
            PlaylistFilter::DistinguishedKind(distinguished),
            PlaylistFilter::ParentId(PlaylistParentIdFilter::new(
                config.excluded_playlist_persistent_ids.iter().copied(),
            )),
        ]);
        if !config.include_internal_playlists {
            group.add_filter(PlaylistFilter::Master);
        }
        group
    }
}

fn is_valid_file_name(name: &str) -> bool {
    !name.trim().is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Writes to a temporary file next to `path`, then renames it over `path`.
fn write_document(document: Dictionary, dir: &Path, path: &Path) -> Result<(), ExportError> {
    let write_error = |source: std::io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut temp = tempfile::Builder::new()
        .prefix(".mlexport-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(write_error)?;
    {
        let mut writer = BufWriter::new(temp.as_file_mut());
        Value::Dictionary(document)
            .to_writer_xml(&mut writer)
            .map_err(|source| ExportError::Serialize {
                path: path.to_path_buf(),
                source,
            })?;
        writer.flush().map_err(write_error)?;
    }
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}
