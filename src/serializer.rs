//! Turns filtered, sorted and ID-resolved library data into the ordered
//! property-list document the legacy library format expects.
//!
//! `plist::Dictionary` keeps insertion order, so the order keys are inserted
//! here is the order they are written. Nothing in this module re-sorts,
//! re-keys or deduplicates what it is handed.

use crate::entity_ids::EntityIdRepository;
use crate::models::{DistinguishedKind, LibrarySnapshot, MediaItem, PersistentId, Playlist};
use crate::path_mapper::PathMapper;
use crate::playlist_tree::PlaylistTreeNode;
use chrono::{DateTime, Utc};
use plist::{Date, Dictionary, Value};
use std::collections::HashMap;
use std::time::SystemTime;

const MAJOR_VERSION: u64 = 1;
const MINOR_VERSION: u64 = 1;
const FEATURES: u64 = 5;

fn insert_text(record: &mut Dictionary, key: &str, value: Option<&str>) {
    if let Some(value) = value.filter(|value| !value.is_empty()) {
        record.insert(key.to_string(), Value::String(value.to_string()));
    }
}

fn insert_number(record: &mut Dictionary, key: &str, value: Option<u64>) {
    if let Some(value) = value {
        record.insert(key.to_string(), Value::Integer(value.into()));
    }
}

fn insert_date(record: &mut Dictionary, key: &str, value: Option<DateTime<Utc>>) {
    if let Some(value) = value {
        record.insert(key.to_string(), date_value(value));
    }
}

fn insert_flag(record: &mut Dictionary, key: &str, value: bool) {
    if value {
        record.insert(key.to_string(), Value::Boolean(true));
    }
}

fn date_value(value: DateTime<Utc>) -> Value {
    Value::Date(Date::from(SystemTime::from(value)))
}

#[derive(Debug, Clone, Default)]
pub struct MediaItemSerializer {
    path_mapper: PathMapper,
}

impl MediaItemSerializer {
    pub fn new(path_mapper: PathMapper) -> Self {
        Self { path_mapper }
    }

    /// Serializes `items` in the given order into a mapping keyed by sequential ID.
    ///
    /// `progress` receives `(serialized, total)` after every item.
    pub fn serialize_items<F>(
        &self,
        items: &[&MediaItem],
        ids: &mut EntityIdRepository,
        mut progress: F,
    ) -> Dictionary
    where
        F: FnMut(usize, usize),
    {
        let total = items.len();
        let mut tracks = Dictionary::new();
        for (index, item) in items.iter().enumerate() {
            let id = ids.id_for(item.persistent_id);
            tracks.insert(id.to_string(), Value::Dictionary(self.serialize_item(item, id)));
            progress(index + 1, total);
        }
        tracks
    }

    pub fn serialize_item(&self, item: &MediaItem, id: u64) -> Dictionary {
        let mut record = Dictionary::new();
        record.insert("Track ID".to_string(), Value::Integer(id.into()));
        insert_text(&mut record, "Name", item.title.as_deref());
        insert_text(&mut record, "Artist", item.artist.as_deref());
        insert_text(&mut record, "Album Artist", item.album_artist.as_deref());
        insert_text(&mut record, "Composer", item.composer.as_deref());
        insert_text(&mut record, "Album", item.album.as_deref());
        insert_text(&mut record, "Genre", item.genre.as_deref());
        insert_text(&mut record, "Kind", item.kind.as_deref());
        insert_number(&mut record, "Size", item.size_bytes);
        insert_number(&mut record, "Total Time", item.total_time_ms);
        insert_number(&mut record, "Disc Number", item.disc_number);
        insert_number(&mut record, "Disc Count", item.disc_count);
        insert_number(&mut record, "Track Number", item.track_number);
        insert_number(&mut record, "Track Count", item.track_count);
        insert_number(&mut record, "Year", item.year);
        insert_date(&mut record, "Date Modified", item.date_modified);
        insert_date(&mut record, "Date Added", item.date_added);
        insert_number(&mut record, "Bit Rate", item.bit_rate);
        insert_number(&mut record, "Sample Rate", item.sample_rate);
        insert_number(&mut record, "Play Count", item.play_count);
        insert_date(&mut record, "Play Date UTC", item.play_date);
        insert_number(&mut record, "Skip Count", item.skip_count);
        insert_number(&mut record, "Rating", item.rating);
        insert_number(&mut record, "Album Rating", item.album_rating);
        insert_flag(&mut record, "Loved", item.loved);
        insert_flag(&mut record, "Compilation", item.compilation);
        insert_text(&mut record, "Comments", item.comments.as_deref());
        insert_text(&mut record, "Sort Name", item.sort_title.as_deref());
        insert_text(&mut record, "Sort Artist", item.sort_artist.as_deref());
        insert_text(&mut record, "Sort Album", item.sort_album.as_deref());
        record.insert("Media Kind".to_string(), Value::Integer(item.media_kind.code().into()));
        record.insert("Persistent ID".to_string(), Value::String(item.persistent_id.to_hex()));
        record.insert(
            "Track Type".to_string(),
            Value::String(item.location_type.as_str().to_string()),
        );
        if let Some(location) = item.location.as_deref() {
            let mapped = self.path_mapper.map_path(location);
            record.insert("Location".to_string(), Value::String(mapped));
        }
        record
    }
}

/// Serializes the final playlist tree, parents before their children.
#[derive(Debug, Clone, Default)]
pub struct PlaylistSerializer<'a> {
    included_items: HashMap<PersistentId, &'a MediaItem>,
}

impl<'a> PlaylistSerializer<'a> {
    /// `included_items` are the tracks that made it into the document; playlist
    /// members outside this set are skipped.
    pub fn new(included_items: &[&'a MediaItem]) -> Self {
        Self {
            included_items: included_items
                .iter()
                .map(|item| (item.persistent_id, *item))
                .collect(),
        }
    }

    pub fn serialize_tree<F>(
        &self,
        root: &PlaylistTreeNode<'_>,
        ids: &mut EntityIdRepository,
        mut progress: F,
    ) -> Vec<Value>
    where
        F: FnMut(usize, usize),
    {
        let total = root.playlist_count();
        let mut playlists = Vec::with_capacity(total);
        self.serialize_children(root, ids, &mut playlists, total, &mut progress);
        playlists
    }

    fn serialize_children<F>(
        &self,
        parent: &PlaylistTreeNode<'_>,
        ids: &mut EntityIdRepository,
        playlists: &mut Vec<Value>,
        total: usize,
        progress: &mut F,
    ) where
        F: FnMut(usize, usize),
    {
        for child in &parent.children {
            let Some(playlist) = child.playlist else {
                continue;
            };
            let record = self.serialize_playlist(child, playlist, parent.playlist, ids);
            playlists.push(Value::Dictionary(record));
            progress(playlists.len(), total);
            self.serialize_children(child, ids, playlists, total, progress);
        }
    }

    pub fn serialize_playlist(
        &self,
        node: &PlaylistTreeNode<'_>,
        playlist: &Playlist,
        parent: Option<&Playlist>,
        ids: &mut EntityIdRepository,
    ) -> Dictionary {
        let id = ids.id_for(playlist.persistent_id);

        let mut record = Dictionary::new();
        record.insert("Name".to_string(), Value::String(playlist.name.clone()));
        insert_text(&mut record, "Description", playlist.description.as_deref());
        insert_flag(&mut record, "Master", playlist.master);
        record.insert("Playlist ID".to_string(), Value::Integer(id.into()));
        record.insert(
            "Playlist Persistent ID".to_string(),
            Value::String(playlist.persistent_id.to_hex()),
        );
        if let Some(parent) = parent {
            record.insert(
                "Parent Persistent ID".to_string(),
                Value::String(parent.persistent_id.to_hex()),
            );
        }
        if playlist.distinguished_kind != DistinguishedKind::None {
            record.insert(
                "Distinguished Kind".to_string(),
                Value::Integer(playlist.distinguished_kind.code().into()),
            );
        }
        if playlist.hidden {
            record.insert("Visible".to_string(), Value::Boolean(false));
        }
        record.insert("All Items".to_string(), Value::Boolean(true));
        insert_flag(&mut record, "Folder", playlist.is_folder());

        let items = self.serialize_playlist_items(node, playlist, ids);
        if !items.is_empty() {
            record.insert("Playlist Items".to_string(), Value::Array(items));
        }
        record
    }

    fn serialize_playlist_items(
        &self,
        node: &PlaylistTreeNode<'_>,
        playlist: &Playlist,
        ids: &mut EntityIdRepository,
    ) -> Vec<Value> {
        let members: Vec<&MediaItem> = playlist
            .items
            .iter()
            .filter_map(|id| self.included_items.get(id).copied())
            .collect();

        node.sorter()
            .sort_items(members)
            .into_iter()
            .map(|item| {
                let mut entry = Dictionary::new();
                let id = ids.id_for(item.persistent_id);
                entry.insert("Track ID".to_string(), Value::Integer(id.into()));
                Value::Dictionary(entry)
            })
            .collect()
    }
}

/// Assembles the top-level library document.
#[derive(Debug, Clone)]
pub struct LibrarySerializer {
    persistent_id: String,
    music_folder: String,
}

impl LibrarySerializer {
    pub fn new(persistent_id: impl Into<String>, music_folder: impl Into<String>) -> Self {
        Self {
            persistent_id: persistent_id.into(),
            music_folder: music_folder.into(),
        }
    }

    pub fn serialize_library(
        &self,
        snapshot: &LibrarySnapshot,
        tracks: Dictionary,
        playlists: Vec<Value>,
    ) -> Dictionary {
        let mut library = Dictionary::new();
        library.insert("Major Version".to_string(), Value::Integer(MAJOR_VERSION.into()));
        library.insert("Minor Version".to_string(), Value::Integer(MINOR_VERSION.into()));
        library.insert("Date".to_string(), date_value(snapshot.date));
        library.insert(
            "Application Version".to_string(),
            Value::String(snapshot.application_version.clone()),
        );
        library.insert("Features".to_string(), Value::Integer(FEATURES.into()));
        library.insert("Show Content Ratings".to_string(), Value::Boolean(true));
        library.insert("Music Folder".to_string(), Value::String(self.music_folder.clone()));
        library.insert(
            "Library Persistent ID".to_string(),
            Value::String(self.persistent_id.clone()),
        );
        library.insert("Tracks".to_string(), Value::Dictionary(tracks));
        library.insert("Playlists".to_string(), Value::Array(playlists));
        library
    }
}
