use crate::models::{
    DistinguishedKind, LibrarySnapshot, LocationType, MediaItem, MediaKind, PersistentId, Playlist,
    PlaylistKind,
};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use plist::{Dictionary, Value};
use std::collections::HashMap;
use std::path::Path;
use std::time::SystemTime;
use tracing::warn;

/// Reads a legacy library XML document back into a snapshot.
pub fn parse_library_xml<P: AsRef<Path>>(path: P) -> Result<LibrarySnapshot> {
    let path = path.as_ref();
    let value = Value::from_file(path)
        .with_context(|| format!("Failed to read library XML {}", path.display()))?;
    let root_dict = value.as_dictionary().context("Root is not a dictionary")?;
    parse_library_document(root_dict)
}

pub fn parse_library_document(root_dict: &Dictionary) -> Result<LibrarySnapshot> {
    let tracks_dict = root_dict
        .get("Tracks")
        .context("No Tracks key")?
        .as_dictionary()
        .context("Tracks is not a dictionary")?;

    let mut items = Vec::with_capacity(tracks_dict.len());
    let mut track_ids = HashMap::with_capacity(tracks_dict.len());

    for (key, track_value) in tracks_dict {
        let Some(track_info) = track_value.as_dictionary() else {
            warn!(key = %key, "Skipping track entry that is not a dictionary");
            continue;
        };
        let Some(persistent_id) = persistent_id(track_info, "Persistent ID") else {
            warn!(key = %key, "Skipping track without a persistent ID");
            continue;
        };
        if let Some(track_id) = integer(track_info, "Track ID") {
            track_ids.insert(track_id, persistent_id);
        }
        items.push(parse_track(track_info, persistent_id));
    }

    let playlists = match root_dict.get("Playlists").and_then(Value::as_array) {
        Some(array) => array
            .iter()
            .filter_map(Value::as_dictionary)
            .filter_map(|info| parse_playlist(info, &track_ids))
            .collect(),
        None => Vec::new(),
    };

    Ok(LibrarySnapshot {
        application_version: text(root_dict, "Application Version").unwrap_or_default(),
        date: date(root_dict, "Date").unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        items,
        playlists,
    })
}

fn parse_track(info: &Dictionary, persistent_id: PersistentId) -> MediaItem {
    MediaItem {
        persistent_id,
        title: text(info, "Name"),
        sort_title: text(info, "Sort Name"),
        artist: text(info, "Artist"),
        sort_artist: text(info, "Sort Artist"),
        album_artist: text(info, "Album Artist"),
        album: text(info, "Album"),
        sort_album: text(info, "Sort Album"),
        composer: text(info, "Composer"),
        genre: text(info, "Genre"),
        kind: text(info, "Kind"),
        comments: text(info, "Comments"),
        media_kind: integer(info, "Media Kind")
            .and_then(MediaKind::from_code)
            .unwrap_or_default(),
        location_type: info
            .get("Track Type")
            .and_then(Value::as_string)
            .and_then(LocationType::parse)
            .unwrap_or_default(),
        location: text(info, "Location"),
        size_bytes: integer(info, "Size"),
        total_time_ms: integer(info, "Total Time"),
        disc_number: integer(info, "Disc Number"),
        disc_count: integer(info, "Disc Count"),
        track_number: integer(info, "Track Number"),
        track_count: integer(info, "Track Count"),
        year: integer(info, "Year"),
        bit_rate: integer(info, "Bit Rate"),
        sample_rate: integer(info, "Sample Rate"),
        play_count: integer(info, "Play Count"),
        skip_count: integer(info, "Skip Count"),
        rating: integer(info, "Rating"),
        album_rating: integer(info, "Album Rating"),
        loved: flag(info, "Loved"),
        compilation: flag(info, "Compilation"),
        date_added: date(info, "Date Added"),
        date_modified: date(info, "Date Modified"),
        play_date: date(info, "Play Date UTC"),
    }
}

fn parse_playlist(info: &Dictionary, track_ids: &HashMap<u64, PersistentId>) -> Option<Playlist> {
    let Some(id) = persistent_id(info, "Playlist Persistent ID") else {
        warn!(name = ?text(info, "Name"), "Skipping playlist without a persistent ID");
        return None;
    };

    let kind = if flag(info, "Folder") {
        PlaylistKind::Folder
    } else if info.contains_key("Smart Info") {
        PlaylistKind::Smart
    } else {
        PlaylistKind::Regular
    };

    let items = info
        .get("Playlist Items")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| integer(entry.as_dictionary()?, "Track ID"))
                .filter_map(|track_id| track_ids.get(&track_id).copied())
                .collect()
        })
        .unwrap_or_default();

    Some(Playlist {
        persistent_id: id,
        parent_persistent_id: persistent_id(info, "Parent Persistent ID"),
        name: text(info, "Name").unwrap_or_default(),
        description: text(info, "Description"),
        kind,
        distinguished_kind: integer(info, "Distinguished Kind")
            .and_then(DistinguishedKind::from_code)
            .unwrap_or_default(),
        master: flag(info, "Master"),
        hidden: info.get("Visible").and_then(Value::as_boolean) == Some(false),
        items,
    })
}

fn text(info: &Dictionary, key: &str) -> Option<String> {
    info.get(key).and_then(Value::as_string).map(str::to_string)
}

fn integer(info: &Dictionary, key: &str) -> Option<u64> {
    info.get(key).and_then(Value::as_unsigned_integer)
}

fn flag(info: &Dictionary, key: &str) -> bool {
    info.get(key).and_then(Value::as_boolean).unwrap_or(false)
}

fn date(info: &Dictionary, key: &str) -> Option<DateTime<Utc>> {
    info.get(key)
        .and_then(Value::as_date)
        .map(|d| DateTime::<Utc>::from(SystemTime::from(d.clone())))
}

fn persistent_id(info: &Dictionary, key: &str) -> Option<PersistentId> {
    info.get(key).and_then(Value::as_string)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIBRARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>Major Version</key><integer>1</integer>
	<key>Date</key><date>2024-02-03T04:05:06Z</date>
	<key>Application Version</key><string>12.9.5.5</string>
	<key>Tracks</key>
	<dict>
		<key>40</key>
		<dict>
			<key>Track ID</key><integer>40</integer>
			<key>Name</key><string>Blue in Green</string>
			<key>Artist</key><string>Miles Davis</string>
			<key>Loved</key><true/>
			<key>Media Kind</key><integer>7</integer>
			<key>Persistent ID</key><string>0A1B2C3D4E5F6071</string>
			<key>Track Type</key><string>File</string>
			<key>Location</key><string>file:///Users/me/Music/Blue%20in%20Green.m4a</string>
		</dict>
		<key>41</key>
		<dict>
			<key>Track ID</key><integer>41</integer>
			<key>Name</key><string>No ID</string>
		</dict>
	</dict>
	<key>Playlists</key>
	<array>
		<dict>
			<key>Name</key><string>Library</string>
			<key>Master</key><true/>
			<key>Playlist Persistent ID</key><string>00000000000000AA</string>
			<key>Visible</key><false/>
		</dict>
		<dict>
			<key>Name</key><string>Jazz</string>
			<key>Playlist Persistent ID</key><string>00000000000000BB</string>
			<key>Parent Persistent ID</key><string>00000000000000CC</string>
			<key>Smart Info</key><data>AAAA</data>
			<key>Playlist Items</key>
			<array>
				<dict><key>Track ID</key><integer>40</integer></dict>
				<dict><key>Track ID</key><integer>99</integer></dict>
			</array>
		</dict>
	</array>
</dict>
</plist>"#;

    fn parse(xml: &str) -> LibrarySnapshot {
        let value = Value::from_reader_xml(xml.as_bytes()).unwrap();
        parse_library_document(value.as_dictionary().unwrap()).unwrap()
    }

    #[test]
    fn reads_tracks_and_skips_entries_without_ids() {
        let snapshot = parse(LIBRARY);
        assert_eq!(snapshot.application_version, "12.9.5.5");
        assert_eq!(snapshot.items.len(), 1);

        let track = &snapshot.items[0];
        assert_eq!(track.persistent_id, PersistentId::new(0x0A1B2C3D4E5F6071));
        assert_eq!(track.title.as_deref(), Some("Blue in Green"));
        assert_eq!(track.media_kind, MediaKind::Song);
        assert!(track.loved);
        assert_eq!(track.location.as_deref(), Some("file:///Users/me/Music/Blue%20in%20Green.m4a"));
    }

    #[test]
    fn resolves_playlist_items_through_track_ids() {
        let snapshot = parse(LIBRARY);
        let master = &snapshot.playlists[0];
        assert!(master.master);
        assert!(master.hidden);

        let jazz = &snapshot.playlists[1];
        assert_eq!(jazz.kind, PlaylistKind::Smart);
        assert_eq!(jazz.parent_persistent_id, Some(PersistentId::new(0xCC)));
        assert_eq!(jazz.items, vec![PersistentId::new(0x0A1B2C3D4E5F6071)]);
    }

    #[test]
    fn missing_tracks_key_is_an_error() {
        let value = Value::Dictionary(Dictionary::new());
        assert!(parse_library_document(value.as_dictionary().unwrap()).is_err());
    }
}
