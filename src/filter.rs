//! Composable predicates over tracks and playlists.
//!
//! A group passes an entity only when every filter it holds passes it; an
//! empty group passes everything. Filters are pure and never fail.

use crate::models::{DistinguishedKind, MediaItem, MediaKind, PersistentId, Playlist, PlaylistKind};
use std::collections::BTreeSet;

pub trait MediaItemFiltering {
    fn passes(&self, item: &MediaItem) -> bool;
}

pub trait PlaylistFiltering {
    fn passes(&self, playlist: &Playlist) -> bool;
}

/// Passes tracks whose media kind is in the allowed set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaKindFilter {
    kinds: BTreeSet<MediaKind>,
}

impl MediaKindFilter {
    pub fn new(kinds: impl IntoIterator<Item = MediaKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Songs only.
    pub fn with_base_kinds() -> Self {
        Self::new([MediaKind::Song])
    }

    pub fn add_kind(&mut self, kind: MediaKind) {
        self.kinds.insert(kind);
    }

    pub fn remove_kind(&mut self, kind: MediaKind) {
        self.kinds.remove(&kind);
    }
}

impl MediaItemFiltering for MediaKindFilter {
    fn passes(&self, item: &MediaItem) -> bool {
        self.kinds.contains(&item.media_kind)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaItemFilter {
    Kind(MediaKindFilter),
}

impl MediaItemFiltering for MediaItemFilter {
    fn passes(&self, item: &MediaItem) -> bool {
        match self {
            MediaItemFilter::Kind(filter) => filter.passes(item),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MediaItemFilterGroup {
    filters: Vec<MediaItemFilter>,
}

impl MediaItemFilterGroup {
    pub fn new(filters: Vec<MediaItemFilter>) -> Self {
        Self { filters }
    }

    pub fn add_filter(&mut self, filter: MediaItemFilter) {
        self.filters.push(filter);
    }

    pub fn remove_filter(&mut self, index: usize) -> Option<MediaItemFilter> {
        (index < self.filters.len()).then(|| self.filters.remove(index))
    }

    pub fn filters(&self) -> &[MediaItemFilter] {
        &self.filters
    }
}

impl MediaItemFiltering for MediaItemFilterGroup {
    fn passes(&self, item: &MediaItem) -> bool {
        self.filters.iter().all(|filter| filter.passes(item))
    }
}

/// Passes playlists whose kind is in the allowed set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistKindFilter {
    kinds: BTreeSet<PlaylistKind>,
}

impl PlaylistKindFilter {
    pub fn new(kinds: impl IntoIterator<Item = PlaylistKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// Regular, smart and folder playlists; genius playlists are left out.
    pub fn with_base_kinds() -> Self {
        Self::new([PlaylistKind::Regular, PlaylistKind::Smart, PlaylistKind::Folder])
    }

    pub fn add_kind(&mut self, kind: PlaylistKind) {
        self.kinds.insert(kind);
    }

    pub fn remove_kind(&mut self, kind: PlaylistKind) {
        self.kinds.remove(&kind);
    }
}

impl PlaylistFiltering for PlaylistKindFilter {
    fn passes(&self, playlist: &Playlist) -> bool {
        self.kinds.contains(&playlist.kind)
    }
}

/// Passes playlists whose distinguished kind is in the allowed set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DistinguishedKindFilter {
    kinds: BTreeSet<DistinguishedKind>,
}

impl DistinguishedKindFilter {
    pub fn new(kinds: impl IntoIterator<Item = DistinguishedKind>) -> Self {
        Self {
            kinds: kinds.into_iter().collect(),
        }
    }

    /// User playlists only.
    pub fn with_base_kinds() -> Self {
        Self::new([DistinguishedKind::None])
    }

    /// User playlists plus every built-in system playlist.
    pub fn with_internal_kinds() -> Self {
        let mut filter = Self::with_base_kinds();
        filter.kinds.extend(DistinguishedKind::INTERNAL);
        filter
    }

    pub fn add_kind(&mut self, kind: DistinguishedKind) {
        self.kinds.insert(kind);
    }

    pub fn remove_kind(&mut self, kind: DistinguishedKind) {
        self.kinds.remove(&kind);
    }
}

impl PlaylistFiltering for DistinguishedKindFilter {
    fn passes(&self, playlist: &Playlist) -> bool {
        self.kinds.contains(&playlist.distinguished_kind)
    }
}

/// Rejects playlists whose own persistent ID has been excluded.
///
/// Descendants of an excluded playlist are not looked at here; the tree
/// generator resolves them structurally.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistParentIdFilter {
    excluded_ids: BTreeSet<PersistentId>,
}

impl PlaylistParentIdFilter {
    pub fn new(excluded_ids: impl IntoIterator<Item = PersistentId>) -> Self {
        Self {
            excluded_ids: excluded_ids.into_iter().collect(),
        }
    }

    pub fn exclude(&mut self, id: PersistentId) {
        self.excluded_ids.insert(id);
    }

    pub fn include(&mut self, id: PersistentId) {
        self.excluded_ids.remove(&id);
    }
}

impl PlaylistFiltering for PlaylistParentIdFilter {
    fn passes(&self, playlist: &Playlist) -> bool {
        !self.excluded_ids.contains(&playlist.persistent_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistFilter {
    Kind(PlaylistKindFilter),
    DistinguishedKind(DistinguishedKindFilter),
    ParentId(PlaylistParentIdFilter),
    /// Rejects the master library playlist.
    Master,
}

impl PlaylistFiltering for PlaylistFilter {
    fn passes(&self, playlist: &Playlist) -> bool {
        match self {
            PlaylistFilter::Kind(filter) => filter.passes(playlist),
            PlaylistFilter::DistinguishedKind(filter) => filter.passes(playlist),
            PlaylistFilter::ParentId(filter) => filter.passes(playlist),
            PlaylistFilter::Master => !playlist.master,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaylistFilterGroup {
    filters: Vec<PlaylistFilter>,
}

impl PlaylistFilterGroup {
    pub fn new(filters: Vec<PlaylistFilter>) -> Self {
        Self { filters }
    }

    pub fn add_filter(&mut self, filter: PlaylistFilter) {
        self.filters.push(filter);
    }

    pub fn remove_filter(&mut self, index: usize) -> Option<PlaylistFilter> {
        (index < self.filters.len()).then(|| self.filters.remove(index))
    }

    pub fn filters(&self) -> &[PlaylistFilter] {
        &self.filters
    }
}

impl PlaylistFiltering for PlaylistFilterGroup {
    fn passes(&self, playlist: &Playlist) -> bool {
        self.filters.iter().all(|filter| filter.passes(playlist))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(kind: MediaKind) -> MediaItem {
        MediaItem {
            media_kind: kind,
            ..Default::default()
        }
    }

    fn playlist(id: u128, kind: PlaylistKind, distinguished: DistinguishedKind) -> Playlist {
        Playlist {
            persistent_id: PersistentId::new(id),
            name: format!("Playlist {id}"),
            kind,
            distinguished_kind: distinguished,
            ..Default::default()
        }
    }

    #[test]
    fn empty_groups_pass_everything() {
        assert!(MediaItemFilterGroup::default().passes(&track(MediaKind::Application)));
        let genius = playlist(1, PlaylistKind::Genius, DistinguishedKind::Music);
        assert!(PlaylistFilterGroup::default().passes(&genius));
    }

    #[test]
    fn base_media_kinds_allow_songs_only() {
        let filter = MediaKindFilter::with_base_kinds();
        assert!(filter.passes(&track(MediaKind::Song)));
        assert!(!filter.passes(&track(MediaKind::Podcast)));
        assert!(!filter.passes(&track(MediaKind::PdfBooklet)));
    }

    #[test]
    fn media_kinds_can_be_added_and_removed() {
        let mut filter = MediaKindFilter::with_base_kinds();
        filter.add_kind(MediaKind::Podcast);
        assert!(filter.passes(&track(MediaKind::Podcast)));
        filter.remove_kind(MediaKind::Song);
        assert!(!filter.passes(&track(MediaKind::Song)));
    }

    #[test]
    fn distinguished_filters_split_user_and_system_playlists() {
        let base = DistinguishedKindFilter::with_base_kinds();
        let internal = DistinguishedKindFilter::with_internal_kinds();
        let user = playlist(1, PlaylistKind::Regular, DistinguishedKind::None);
        let music = playlist(2, PlaylistKind::Regular, DistinguishedKind::Music);

        assert!(base.passes(&user));
        assert!(!base.passes(&music));
        assert!(internal.passes(&user));
        assert!(internal.passes(&music));
    }

    #[test]
    fn parent_id_filter_excludes_direct_ids_only() {
        let filter = PlaylistParentIdFilter::new([PersistentId::new(7)]);
        let excluded = playlist(7, PlaylistKind::Folder, DistinguishedKind::None);
        let mut child = playlist(8, PlaylistKind::Regular, DistinguishedKind::None);
        child.parent_persistent_id = Some(PersistentId::new(7));

        assert!(!filter.passes(&excluded));
        assert!(filter.passes(&child));
    }

    #[test]
    fn group_requires_every_filter() {
        let mut group = PlaylistFilterGroup::default();
        group.add_filter(PlaylistFilter::Kind(PlaylistKindFilter::with_base_kinds()));
        group.add_filter(PlaylistFilter::Master);

        let regular = playlist(1, PlaylistKind::Regular, DistinguishedKind::None);
        let mut master = playlist(2, PlaylistKind::Regular, DistinguishedKind::None);
        master.master = true;
        let genius = playlist(3, PlaylistKind::Genius, DistinguishedKind::None);

        assert!(group.passes(&regular));
        assert!(!group.passes(&master));
        assert!(!group.passes(&genius));

        assert_eq!(group.remove_filter(1), Some(PlaylistFilter::Master));
        assert!(group.passes(&master));
        assert_eq!(group.remove_filter(5), None);
    }
}
