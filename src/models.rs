use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable identifier the source library assigns to a track or playlist.
///
/// Serialized as an uppercase hex string of at least 16 digits, the form the
/// legacy library format uses for "Persistent ID" values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersistentId(u128);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid persistent ID {0:?}")]
pub struct InvalidPersistentId(pub String);

impl PersistentId {
    pub const fn new(value: u128) -> Self {
        Self(value)
    }

    pub const fn value(self) -> u128 {
        self.0
    }

    pub fn to_hex(self) -> String {
        format!("{:016X}", self.0)
    }
}

impl fmt::Display for PersistentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

impl FromStr for PersistentId {
    type Err = InvalidPersistentId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.len() > 32 {
            return Err(InvalidPersistentId(s.to_string()));
        }
        u128::from_str_radix(trimmed, 16)
            .map(Self)
            .map_err(|_| InvalidPersistentId(s.to_string()))
    }
}

impl TryFrom<String> for PersistentId {
    type Error = InvalidPersistentId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PersistentId> for String {
    fn from(id: PersistentId) -> Self {
        id.to_hex()
    }
}

/// Media kind of a track, carrying the numeric codes of the legacy format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    None,
    AlertTone,
    Audiobook,
    Book,
    Movie,
    MusicVideo,
    Podcast,
    #[default]
    Song,
    TvShow,
    Ringtone,
    Course,
    VoiceMemo,
    Application,
    PdfBooklet,
    HomeVideo,
    DigitalBooklet,
}

impl MediaKind {
    const ALL: [MediaKind; 16] = [
        MediaKind::None,
        MediaKind::AlertTone,
        MediaKind::Audiobook,
        MediaKind::Book,
        MediaKind::Movie,
        MediaKind::MusicVideo,
        MediaKind::Podcast,
        MediaKind::Song,
        MediaKind::TvShow,
        MediaKind::Ringtone,
        MediaKind::Course,
        MediaKind::VoiceMemo,
        MediaKind::Application,
        MediaKind::PdfBooklet,
        MediaKind::HomeVideo,
        MediaKind::DigitalBooklet,
    ];

    pub fn code(self) -> u64 {
        self as u64
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.code() == code)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistKind {
    #[default]
    Regular,
    Smart,
    Genius,
    Folder,
    GeniusMix,
}

impl PlaylistKind {
    pub fn code(self) -> u64 {
        self as u64
    }
}

/// Marks built-in playlists the library maintains on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistinguishedKind {
    #[default]
    None,
    Movies,
    TvShows,
    Music,
    Audiobooks,
    Books,
    Ringtones,
    Podcasts,
    VoiceMemos,
    Purchases,
    Courses,
    NinetiesMusic,
    MyTopRated,
    Top25MostPlayed,
    RecentlyPlayed,
    RecentlyAdded,
    MusicVideos,
    ClassicalMusic,
    LibraryMusicVideos,
    HomeVideos,
    Applications,
    LovedSongs,
    MusicShowsAndMovies,
}

impl DistinguishedKind {
    /// Every kind that marks a system playlist.
    pub const INTERNAL: [DistinguishedKind; 22] = [
        DistinguishedKind::Movies,
        DistinguishedKind::TvShows,
        DistinguishedKind::Music,
        DistinguishedKind::Audiobooks,
        DistinguishedKind::Books,
        DistinguishedKind::Ringtones,
        DistinguishedKind::Podcasts,
        DistinguishedKind::VoiceMemos,
        DistinguishedKind::Purchases,
        DistinguishedKind::Courses,
        DistinguishedKind::NinetiesMusic,
        DistinguishedKind::MyTopRated,
        DistinguishedKind::Top25MostPlayed,
        DistinguishedKind::RecentlyPlayed,
        DistinguishedKind::RecentlyAdded,
        DistinguishedKind::MusicVideos,
        DistinguishedKind::ClassicalMusic,
        DistinguishedKind::LibraryMusicVideos,
        DistinguishedKind::HomeVideos,
        DistinguishedKind::Applications,
        DistinguishedKind::LovedSongs,
        DistinguishedKind::MusicShowsAndMovies,
    ];

    pub fn code(self) -> u64 {
        match self {
            DistinguishedKind::None => 0,
            DistinguishedKind::Movies => 1,
            DistinguishedKind::TvShows => 2,
            DistinguishedKind::Music => 3,
            DistinguishedKind::Audiobooks => 4,
            DistinguishedKind::Books => 5,
            DistinguishedKind::Ringtones => 6,
            DistinguishedKind::Podcasts => 7,
            DistinguishedKind::VoiceMemos => 14,
            DistinguishedKind::Purchases => 16,
            DistinguishedKind::Courses => 26,
            DistinguishedKind::NinetiesMusic => 42,
            DistinguishedKind::MyTopRated => 43,
            DistinguishedKind::Top25MostPlayed => 44,
            DistinguishedKind::RecentlyPlayed => 45,
            DistinguishedKind::RecentlyAdded => 46,
            DistinguishedKind::MusicVideos => 47,
            DistinguishedKind::ClassicalMusic => 48,
            DistinguishedKind::LibraryMusicVideos => 49,
            DistinguishedKind::HomeVideos => 50,
            DistinguishedKind::Applications => 51,
            DistinguishedKind::LovedSongs => 52,
            DistinguishedKind::MusicShowsAndMovies => 53,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        if code == 0 {
            return Some(DistinguishedKind::None);
        }
        Self::INTERNAL.into_iter().find(|kind| kind.code() == code)
    }
}

/// Where a track's media lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    #[default]
    File,
    Remote,
    Url,
}

impl LocationType {
    pub fn as_str(self) -> &'static str {
        match self {
            LocationType::File => "File",
            LocationType::Remote => "Remote",
            LocationType::Url => "URL",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "File" => Some(LocationType::File),
            "Remote" => Some(LocationType::Remote),
            "URL" => Some(LocationType::Url),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MediaItem {
    pub persistent_id: PersistentId,
    pub title: Option<String>,
    pub sort_title: Option<String>,
    pub artist: Option<String>,
    pub sort_artist: Option<String>,
    pub album_artist: Option<String>,
    pub album: Option<String>,
    pub sort_album: Option<String>,
    pub composer: Option<String>,
    pub genre: Option<String>,
    pub kind: Option<String>, // e.g. "MPEG audio file"
    pub comments: Option<String>,
    pub media_kind: MediaKind,
    pub location_type: LocationType,
    pub location: Option<String>, // file URL as reported by the library
    pub size_bytes: Option<u64>,
    pub total_time_ms: Option<u64>,
    pub disc_number: Option<u64>,
    pub disc_count: Option<u64>,
    pub track_number: Option<u64>,
    pub track_count: Option<u64>,
    pub year: Option<u64>,
    pub bit_rate: Option<u64>,
    pub sample_rate: Option<u64>,
    pub play_count: Option<u64>,
    pub skip_count: Option<u64>,
    pub rating: Option<u64>, // 0-100
    pub album_rating: Option<u64>,
    pub loved: bool,
    pub compilation: bool,
    pub date_added: Option<DateTime<Utc>>,
    pub date_modified: Option<DateTime<Utc>>,
    pub play_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Playlist {
    pub persistent_id: PersistentId,
    pub parent_persistent_id: Option<PersistentId>,
    pub name: String,
    pub description: Option<String>,
    pub kind: PlaylistKind,
    pub distinguished_kind: DistinguishedKind,
    pub master: bool,
    pub hidden: bool,
    pub items: Vec<PersistentId>, // persistent IDs of member tracks, in playlist order
}

impl Playlist {
    pub fn is_folder(&self) -> bool {
        self.kind == PlaylistKind::Folder
    }
}

/// In-memory capture of the source library, taken once per export run.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LibrarySnapshot {
    pub application_version: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub items: Vec<MediaItem>,
    #[serde(default)]
    pub playlists: Vec<Playlist>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistent_id_formats_as_padded_uppercase_hex() {
        let id = PersistentId::new(0xAB12);
        assert_eq!(id.to_hex(), "000000000000AB12");
        assert_eq!(id.to_string(), "000000000000AB12");
    }

    #[test]
    fn persistent_id_parses_hex_and_rejects_garbage() {
        assert_eq!(
            "1A2B3C4D5E6F7081".parse::<PersistentId>(),
            Ok(PersistentId::new(0x1A2B3C4D5E6F7081))
        );
        assert_eq!("1a2b".parse::<PersistentId>(), Ok(PersistentId::new(0x1A2B)));
        assert!("".parse::<PersistentId>().is_err());
        assert!("not-hex".parse::<PersistentId>().is_err());
    }

    #[test]
    fn distinguished_kind_codes_round_trip() {
        for kind in DistinguishedKind::INTERNAL {
            assert_eq!(DistinguishedKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(DistinguishedKind::from_code(0), Some(DistinguishedKind::None));
        assert_eq!(DistinguishedKind::from_code(99), None);
    }

    #[test]
    fn media_kind_codes_match_legacy_values() {
        assert_eq!(MediaKind::Song.code(), 7);
        assert_eq!(MediaKind::Podcast.code(), 6);
        assert_eq!(MediaKind::from_code(13), Some(MediaKind::PdfBooklet));
    }

    #[test]
    fn snapshot_deserializes_from_helper_json() {
        let json = r#"{
            "application_version": "1.4.5",
            "date": "2024-03-01T10:00:00Z",
            "items": [
                { "persistent_id": "00000000000000A1", "title": "Song", "media_kind": "song" }
            ],
            "playlists": [{
                "persistent_id": "B1",
                "parent_persistent_id": null,
                "name": "Mix",
                "kind": "folder",
                "items": ["A1"]
            }]
        }"#;
        let snapshot: LibrarySnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.items[0].persistent_id, PersistentId::new(0xA1));
        assert!(snapshot.playlists[0].is_folder());
        assert_eq!(snapshot.playlists[0].items, vec![PersistentId::new(0xA1)]);
    }
}
