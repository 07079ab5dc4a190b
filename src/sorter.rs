use crate::models::MediaItem;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Track properties a playlist can be custom-sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SortProperty {
    Title,
    Artist,
    AlbumArtist,
    Album,
    Genre,
    Composer,
    DateAdded,
    Year,
    PlayCount,
    Rating,
    TotalTime,
    TrackNumber,
    DiscNumber,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown sort property {0:?}")]
pub struct UnknownSortProperty(pub String);

/// Value read off a track for comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
enum SortValue<'a> {
    Text(&'a str),
    Number(u64),
    Date(Option<DateTime<Utc>>),
}

impl SortValue<'_> {
    fn is_empty(&self) -> bool {
        match self {
            SortValue::Text(text) => text.is_empty(),
            SortValue::Number(_) => false,
            SortValue::Date(date) => date.is_none(),
        }
    }

    fn compare(&self, other: &SortValue<'_>) -> Ordering {
        match (self, other) {
            (SortValue::Text(a), SortValue::Text(b)) => compare_ignoring_case(a, b),
            (SortValue::Number(a), SortValue::Number(b)) => a.cmp(b),
            (SortValue::Date(a), SortValue::Date(b)) => a.cmp(b),
            // A property and its substitutions always share a value type.
            _ => Ordering::Equal,
        }
    }
}

/// Lowercases both sides codepoint by codepoint; no locale is consulted.
fn compare_ignoring_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

fn text(value: &Option<String>) -> SortValue<'_> {
    SortValue::Text(value.as_deref().unwrap_or_default())
}

fn number(value: Option<u64>) -> SortValue<'static> {
    SortValue::Number(value.unwrap_or_default())
}

fn title(item: &MediaItem) -> SortValue<'_> {
    text(&item.title)
}

fn sort_title(item: &MediaItem) -> SortValue<'_> {
    text(&item.sort_title)
}

fn artist(item: &MediaItem) -> SortValue<'_> {
    text(&item.artist)
}

fn sort_artist(item: &MediaItem) -> SortValue<'_> {
    text(&item.sort_artist)
}

fn album_artist(item: &MediaItem) -> SortValue<'_> {
    text(&item.album_artist)
}

fn album(item: &MediaItem) -> SortValue<'_> {
    text(&item.album)
}

fn sort_album(item: &MediaItem) -> SortValue<'_> {
    text(&item.sort_album)
}

fn genre(item: &MediaItem) -> SortValue<'_> {
    text(&item.genre)
}

fn composer(item: &MediaItem) -> SortValue<'_> {
    text(&item.composer)
}

fn date_added(item: &MediaItem) -> SortValue<'_> {
    SortValue::Date(item.date_added)
}

fn year(item: &MediaItem) -> SortValue<'_> {
    number(item.year)
}

fn play_count(item: &MediaItem) -> SortValue<'_> {
    number(item.play_count)
}

fn rating(item: &MediaItem) -> SortValue<'_> {
    number(item.rating)
}

fn total_time(item: &MediaItem) -> SortValue<'_> {
    number(item.total_time_ms)
}

fn track_number(item: &MediaItem) -> SortValue<'_> {
    number(item.track_number)
}

fn disc_number(item: &MediaItem) -> SortValue<'_> {
    number(item.disc_number)
}

type Accessor = for<'a> fn(&'a MediaItem) -> SortValue<'a>;

/// Registry entry describing how a property is read and compared.
struct PropertyRule {
    name: &'static str,
    accessor: Accessor,
    /// Read in order when the property itself is empty.
    substitutions: &'static [Accessor],
    /// Compared in order when the primary values tie.
    fallbacks: &'static [SortProperty],
}

const TITLE_SUBSTITUTIONS: &[Accessor] = &[sort_title];
const ARTIST_SUBSTITUTIONS: &[Accessor] = &[sort_artist];
const ALBUM_ARTIST_SUBSTITUTIONS: &[Accessor] = &[artist, sort_artist];
const ALBUM_SUBSTITUTIONS: &[Accessor] = &[sort_album];

const DEFAULT_FALLBACKS: &[SortProperty] = &[
    SortProperty::Artist,
    SortProperty::Album,
    SortProperty::DiscNumber,
    SortProperty::TrackNumber,
    SortProperty::Title,
];

const ALBUM_FALLBACKS: &[SortProperty] = &[
    SortProperty::DiscNumber,
    SortProperty::TrackNumber,
    SortProperty::Title,
];

impl SortProperty {
    pub const ALL: [SortProperty; 13] = [
        SortProperty::Title,
        SortProperty::Artist,
        SortProperty::AlbumArtist,
        SortProperty::Album,
        SortProperty::Genre,
        SortProperty::Composer,
        SortProperty::DateAdded,
        SortProperty::Year,
        SortProperty::PlayCount,
        SortProperty::Rating,
        SortProperty::TotalTime,
        SortProperty::TrackNumber,
        SortProperty::DiscNumber,
    ];

    fn rule(self) -> PropertyRule {
        match self {
            SortProperty::Title => PropertyRule {
                name: "Title",
                accessor: title,
                substitutions: TITLE_SUBSTITUTIONS,
                fallbacks: &[SortProperty::Artist, SortProperty::Album],
            },
            SortProperty::Artist => PropertyRule {
                name: "Artist",
                accessor: artist,
                substitutions: ARTIST_SUBSTITUTIONS,
                fallbacks: &[
                    SortProperty::Album,
                    SortProperty::DiscNumber,
                    SortProperty::TrackNumber,
                    SortProperty::Title,
                ],
            },
            SortProperty::AlbumArtist => PropertyRule {
                name: "AlbumArtist",
                accessor: album_artist,
                substitutions: ALBUM_ARTIST_SUBSTITUTIONS,
                fallbacks: &[
                    SortProperty::Album,
                    SortProperty::DiscNumber,
                    SortProperty::TrackNumber,
                    SortProperty::Title,
                ],
            },
            SortProperty::Album => PropertyRule {
                name: "Album",
                accessor: album,
                substitutions: ALBUM_SUBSTITUTIONS,
                fallbacks: ALBUM_FALLBACKS,
            },
            SortProperty::Genre => PropertyRule {
                name: "Genre",
                accessor: genre,
                substitutions: &[],
                fallbacks: &[],
            },
            SortProperty::Composer => PropertyRule {
                name: "Composer",
                accessor: composer,
                substitutions: &[],
                fallbacks: &[],
            },
            SortProperty::DateAdded => PropertyRule {
                name: "DateAdded",
                accessor: date_added,
                substitutions: &[],
                fallbacks: &[SortProperty::Title],
            },
            SortProperty::Year => PropertyRule {
                name: "Year",
                accessor: year,
                substitutions: &[],
                fallbacks: &[],
            },
            SortProperty::PlayCount => PropertyRule {
                name: "PlayCount",
                accessor: play_count,
                substitutions: &[],
                fallbacks: &[],
            },
            SortProperty::Rating => PropertyRule {
                name: "Rating",
                accessor: rating,
                substitutions: &[],
                fallbacks: &[],
            },
            SortProperty::TotalTime => PropertyRule {
                name: "TotalTime",
                accessor: total_time,
                substitutions: &[],
                fallbacks: &[SortProperty::Title],
            },
            SortProperty::TrackNumber => PropertyRule {
                name: "TrackNumber",
                accessor: track_number,
                substitutions: &[],
                fallbacks: &[SortProperty::DiscNumber, SortProperty::Album, SortProperty::Title],
            },
            SortProperty::DiscNumber => PropertyRule {
                name: "DiscNumber",
                accessor: disc_number,
                substitutions: &[],
                fallbacks: &[SortProperty::TrackNumber, SortProperty::Album, SortProperty::Title],
            },
        }
    }

    pub fn name(self) -> &'static str {
        self.rule().name
    }

    fn value(self, item: &MediaItem) -> SortValue<'_> {
        let rule = self.rule();
        let value = (rule.accessor)(item);
        if !value.is_empty() {
            return value;
        }
        rule.substitutions
            .iter()
            .map(|substitute| substitute(item))
            .find(|candidate| !candidate.is_empty())
            .unwrap_or(value)
    }

    fn fallbacks(self) -> &'static [SortProperty] {
        let fallbacks = self.rule().fallbacks;
        if fallbacks.is_empty() {
            DEFAULT_FALLBACKS
        } else {
            fallbacks
        }
    }

    fn compare(self, a: &MediaItem, b: &MediaItem) -> Ordering {
        self.value(a).compare(&self.value(b))
    }
}

impl fmt::Display for SortProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SortProperty {
    type Err = UnknownSortProperty;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortProperty::ALL
            .into_iter()
            .find(|property| property.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownSortProperty(s.to_string()))
    }
}

/// Orders tracks by one property with a deterministic tie-break chain.
///
/// The order direction applies to the primary property only. Fallback
/// properties, and the final persistent ID comparison, always run ascending so
/// tied tracks keep the same relative order in both directions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaItemSorter {
    property: Option<SortProperty>,
    order: SortOrder,
}

impl MediaItemSorter {
    pub fn new(property: Option<SortProperty>, order: SortOrder) -> Self {
        Self { property, order }
    }

    pub fn property(&self) -> Option<SortProperty> {
        self.property
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// Returns the items in sorted order, or untouched when no property is set.
    pub fn sort_items<'a>(&self, mut items: Vec<&'a MediaItem>) -> Vec<&'a MediaItem> {
        let Some(property) = self.property else {
            return items;
        };
        items.sort_by(|a, b| self.compare(property, a, b));
        items
    }

    fn compare(&self, property: SortProperty, a: &MediaItem, b: &MediaItem) -> Ordering {
        let primary = match self.order {
            SortOrder::Ascending => property.compare(a, b),
            SortOrder::Descending => property.compare(b, a),
        };
        primary
            .then_with(|| {
                property
                    .fallbacks()
                    .iter()
                    .filter(|fallback| **fallback != property)
                    .map(|fallback| fallback.compare(a, b))
                    .find(|ordering| ordering.is_ne())
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| a.persistent_id.cmp(&b.persistent_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PersistentId;
    use chrono::TimeZone;

    fn item(id: u128, title: &str, artist: &str) -> MediaItem {
        MediaItem {
            persistent_id: PersistentId::new(id),
            title: Some(title.to_string()),
            artist: Some(artist.to_string()),
            ..Default::default()
        }
    }

    fn titles(items: &[&MediaItem]) -> Vec<String> {
        items.iter().map(|item| item.title.clone().unwrap_or_default()).collect()
    }

    #[test]
    fn no_property_leaves_order_unchanged() {
        let a = item(3, "Zed", "A");
        let b = item(1, "Alpha", "B");
        let sorter = MediaItemSorter::new(None, SortOrder::Descending);
        let sorted = sorter.sort_items(vec![&a, &b]);
        assert_eq!(titles(&sorted), vec!["Zed", "Alpha"]);
    }

    #[test]
    fn titles_compare_ignoring_case() {
        let a = item(1, "banana", "x");
        let b = item(2, "Apple", "x");
        let c = item(3, "cherry", "x");
        let sorter = MediaItemSorter::new(Some(SortProperty::Title), SortOrder::Ascending);
        let sorted = sorter.sort_items(vec![&a, &b, &c]);
        assert_eq!(titles(&sorted), vec!["Apple", "banana", "cherry"]);
    }

    #[test]
    fn descending_reverses_when_values_are_distinct() {
        let a = item(1, "b", "x");
        let b = item(2, "a", "x");
        let c = item(3, "c", "x");
        let ascending = MediaItemSorter::new(Some(SortProperty::Title), SortOrder::Ascending)
            .sort_items(vec![&a, &b, &c]);
        let mut descending = MediaItemSorter::new(Some(SortProperty::Title), SortOrder::Descending)
            .sort_items(vec![&a, &b, &c]);
        descending.reverse();
        assert_eq!(titles(&ascending), titles(&descending));
    }

    #[test]
    fn ties_keep_relative_order_in_both_directions() {
        let a = item(20, "Same", "Beta");
        let b = item(10, "Same", "Alpha");
        let c = item(30, "Other", "Gamma");
        let ids = |items: Vec<&MediaItem>| -> Vec<u128> {
            items.iter().map(|item| item.persistent_id.value()).collect()
        };

        let ascending = MediaItemSorter::new(Some(SortProperty::Title), SortOrder::Ascending)
            .sort_items(vec![&a, &b, &c]);
        let descending = MediaItemSorter::new(Some(SortProperty::Title), SortOrder::Descending)
            .sort_items(vec![&a, &b, &c]);

        // "Same" ties fall back to artist ascending either way.
        assert_eq!(ids(ascending), vec![30, 10, 20]);
        assert_eq!(ids(descending), vec![10, 20, 30]);
    }

    #[test]
    fn empty_album_artist_falls_back_to_artist() {
        let mut a = item(1, "One", "Zebra");
        a.album_artist = None;
        let mut b = item(2, "Two", "Aardvark");
        b.album_artist = Some("Middle".to_string());
        let sorted = MediaItemSorter::new(Some(SortProperty::AlbumArtist), SortOrder::Ascending)
            .sort_items(vec![&a, &b]);
        assert_eq!(titles(&sorted), vec!["Two", "One"]);
    }

    #[test]
    fn date_added_ties_break_on_title_then_persistent_id() {
        let added = Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap();
        let mut a = item(9, "Same", "x");
        let mut b = item(4, "Same", "x");
        let mut c = item(1, "Earlier", "x");
        a.date_added = Some(added);
        b.date_added = Some(added);
        c.date_added = Some(added);
        let sorted = MediaItemSorter::new(Some(SortProperty::DateAdded), SortOrder::Ascending)
            .sort_items(vec![&a, &b, &c]);
        let ids: Vec<u128> = sorted.iter().map(|item| item.persistent_id.value()).collect();
        assert_eq!(ids, vec![1, 4, 9]);
    }

    #[test]
    fn parses_property_names_case_insensitively() {
        assert_eq!("albumartist".parse(), Ok(SortProperty::AlbumArtist));
        assert_eq!("DateAdded".parse(), Ok(SortProperty::DateAdded));
        assert!("Mood".parse::<SortProperty>().is_err());
    }
}
