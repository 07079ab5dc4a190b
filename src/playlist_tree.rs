//! Rebuilds the playlist hierarchy from the flat snapshot list.
//!
//! Source data may be corrupt. A playlist whose parent is missing from the
//! snapshot becomes top-level. A playlist that is its own ancestor has its
//! parent link dropped, so every playlist on a cycle ends up at the top level
//! exactly once.

use crate::filter::{PlaylistFilterGroup, PlaylistFiltering};
use crate::models::{PersistentId, Playlist};
use crate::sorter::{MediaItemSorter, SortOrder, SortProperty};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

/// Recursion limit. Playlists nested deeper are reported as excluded.
pub const MAX_TREE_DEPTH: usize = 128;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistTreeNode<'a> {
    /// `None` only for the synthetic root.
    pub playlist: Option<&'a Playlist>,
    pub children: Vec<PlaylistTreeNode<'a>>,
    pub custom_sort_property: Option<SortProperty>,
    pub custom_sort_order: SortOrder,
    excluded: bool,
}

impl<'a> PlaylistTreeNode<'a> {
    pub fn root() -> Self {
        Self {
            playlist: None,
            children: Vec::new(),
            custom_sort_property: None,
            custom_sort_order: SortOrder::default(),
            excluded: false,
        }
    }

    pub fn with_playlist(playlist: &'a Playlist) -> Self {
        Self {
            playlist: Some(playlist),
            ..Self::root()
        }
    }

    pub fn is_root(&self) -> bool {
        self.playlist.is_none()
    }

    pub fn is_folder(&self) -> bool {
        self.playlist.is_some_and(Playlist::is_folder)
    }

    pub fn persistent_id(&self) -> Option<PersistentId> {
        self.playlist.map(|playlist| playlist.persistent_id)
    }

    pub fn name(&self) -> &str {
        self.playlist.map_or("", |playlist| playlist.name.as_str())
    }

    /// Sorter for this playlist's tracks; a no-op unless a custom sort is set.
    pub fn sorter(&self) -> MediaItemSorter {
        MediaItemSorter::new(self.custom_sort_property, self.custom_sort_order)
    }

    /// Number of playlist-backed nodes in this subtree.
    pub fn playlist_count(&self) -> usize {
        let own = usize::from(!self.is_root());
        own + self.children.iter().map(PlaylistTreeNode::playlist_count).sum::<usize>()
    }

    pub fn folder_count(&self) -> usize {
        let own = usize::from(self.is_folder());
        own + self.children.iter().map(PlaylistTreeNode::folder_count).sum::<usize>()
    }

    /// Replaces every folder node with its children, in place and in order.
    pub fn flatten(&mut self) {
        let children = std::mem::take(&mut self.children);
        self.children = flatten_nodes(children);
    }
}

fn flatten_nodes(nodes: Vec<PlaylistTreeNode<'_>>) -> Vec<PlaylistTreeNode<'_>> {
    let mut flattened = Vec::with_capacity(nodes.len());
    for mut node in nodes {
        let children = flatten_nodes(std::mem::take(&mut node.children));
        if node.is_folder() {
            flattened.extend(children);
        } else {
            node.children = children;
            flattened.push(node);
        }
    }
    flattened
}

/// Output of one generator run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistTree<'a> {
    pub root: PlaylistTreeNode<'a>,
    /// Playlists rejected by the filter group, in traversal order, followed by
    /// any nested past `MAX_TREE_DEPTH`.
    pub excluded: Vec<&'a Playlist>,
}

impl PlaylistTree<'_> {
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistTreeGenerator {
    filters: PlaylistFilterGroup,
    flatten_folders: bool,
    custom_sort_properties: BTreeMap<PersistentId, SortProperty>,
    custom_sort_orders: BTreeMap<PersistentId, SortOrder>,
}

impl PlaylistTreeGenerator {
    pub fn new(filters: PlaylistFilterGroup) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    pub fn flatten_folders(mut self, flatten: bool) -> Self {
        self.flatten_folders = flatten;
        self
    }

    pub fn custom_sorting(
        mut self,
        properties: BTreeMap<PersistentId, SortProperty>,
        orders: BTreeMap<PersistentId, SortOrder>,
    ) -> Self {
        self.custom_sort_properties = properties;
        self.custom_sort_orders = orders;
        self
    }

    /// Builds the tree for `playlists`, preserving their snapshot order among siblings.
    ///
    /// An empty snapshot, or one where every playlist is filtered out, yields a
    /// root with no children.
    pub fn generate<'a>(&self, playlists: &'a [Playlist]) -> PlaylistTree<'a> {
        let mut by_id: HashMap<PersistentId, &'a Playlist> =
            HashMap::with_capacity(playlists.len());
        for playlist in playlists {
            by_id.entry(playlist.persistent_id).or_insert(playlist);
        }

        let mut children_of: HashMap<Option<PersistentId>, Vec<&'a Playlist>> = HashMap::new();
        for playlist in playlists {
            let parent = effective_parent(playlist, &by_id);
            children_of.entry(parent).or_default().push(playlist);
        }

        let mut visited = HashSet::with_capacity(playlists.len());
        let mut too_deep = Vec::new();
        let mut root = PlaylistTreeNode::root();
        root.children = self.build_nodes(None, &children_of, &mut visited, &mut too_deep, 0);

        let mut excluded = Vec::new();
        root.children = self.remove_excluded(std::mem::take(&mut root.children), &mut excluded);
        excluded.append(&mut too_deep);
        if self.flatten_folders {
            root.flatten();
        }

        debug!(
            playlists = root.playlist_count(),
            excluded = excluded.len(),
            flatten = self.flatten_folders,
            "Generated playlist tree"
        );
        PlaylistTree { root, excluded }
    }

    fn build_nodes<'a>(
        &self,
        parent: Option<PersistentId>,
        children_of: &HashMap<Option<PersistentId>, Vec<&'a Playlist>>,
        visited: &mut HashSet<PersistentId>,
        too_deep: &mut Vec<&'a Playlist>,
        depth: usize,
    ) -> Vec<PlaylistTreeNode<'a>> {
        let Some(playlists) = children_of.get(&parent) else {
            return Vec::new();
        };
        if depth >= MAX_TREE_DEPTH {
            let before = too_deep.len();
            let mut pending: Vec<&'a Playlist> = playlists.iter().rev().copied().collect();
            while let Some(playlist) = pending.pop() {
                if !visited.insert(playlist.persistent_id) {
                    continue;
                }
                too_deep.push(playlist);
                if let Some(children) = children_of.get(&Some(playlist.persistent_id)) {
                    pending.extend(children.iter().rev().copied());
                }
            }
            warn!(
                ?parent,
                dropped = too_deep.len() - before,
                "Playlist hierarchy too deep, excluding branch"
            );
            return Vec::new();
        }

        let mut nodes = Vec::with_capacity(playlists.len());
        for &playlist in playlists {
            if !visited.insert(playlist.persistent_id) {
                warn!(id = %playlist.persistent_id, "Playlist visited twice, truncating branch");
                continue;
            }
            let mut node = self.node_for(playlist);
            // Children are still visited so they can be judged on their own.
            node.excluded = !self.filters.passes(playlist);
            node.children = self.build_nodes(
                Some(playlist.persistent_id),
                children_of,
                visited,
                too_deep,
                depth + 1,
            );
            nodes.push(node);
        }
        nodes
    }

    fn node_for<'a>(&self, playlist: &'a Playlist) -> PlaylistTreeNode<'a> {
        let mut node = PlaylistTreeNode::with_playlist(playlist);
        if let Some(property) = self.custom_sort_properties.get(&playlist.persistent_id) {
            node.custom_sort_property = Some(*property);
            node.custom_sort_order = self
                .custom_sort_orders
                .get(&playlist.persistent_id)
                .copied()
                .unwrap_or_default();
        }
        node
    }

    /// Drops excluded nodes. When flattening, an excluded folder hands its
    /// surviving children up to its parent; otherwise its subtree goes with it.
    fn remove_excluded<'a>(
        &self,
        nodes: Vec<PlaylistTreeNode<'a>>,
        excluded: &mut Vec<&'a Playlist>,
    ) -> Vec<PlaylistTreeNode<'a>> {
        let mut kept = Vec::with_capacity(nodes.len());
        for mut node in nodes {
            let children = std::mem::take(&mut node.children);
            if node.excluded {
                if let Some(playlist) = node.playlist {
                    excluded.push(playlist);
                }
                if self.flatten_folders && node.is_folder() {
                    kept.extend(self.remove_excluded(children, excluded));
                }
                continue;
            }
            node.children = self.remove_excluded(children, excluded);
            kept.push(node);
        }
        kept
    }
}

/// Parent the playlist is attached to, or `None` for the top level.
fn effective_parent(
    playlist: &Playlist,
    by_id: &HashMap<PersistentId, &Playlist>,
) -> Option<PersistentId> {
    let parent = playlist.parent_persistent_id?;
    if !by_id.contains_key(&parent) {
        warn!(
            id = %playlist.persistent_id,
            parent = %parent,
            "Playlist parent missing from library, promoting to top level"
        );
        return None;
    }

    let mut seen = HashSet::from([playlist.persistent_id]);
    let mut cursor = Some(parent);
    while let Some(ancestor) = cursor {
        if ancestor == playlist.persistent_id {
            warn!(
                id = %playlist.persistent_id,
                "Playlist is its own ancestor, promoting to top level"
            );
            return None;
        }
        if !seen.insert(ancestor) {
            // A cycle further up that this playlist is not part of.
            break;
        }
        cursor = by_id.get(&ancestor).and_then(|p| p.parent_persistent_id);
    }
    Some(parent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{DistinguishedKindFilter, PlaylistFilter, PlaylistParentIdFilter};
    use crate::models::{DistinguishedKind, PlaylistKind};

    fn playlist(id: u128, parent: Option<u128>, kind: PlaylistKind) -> Playlist {
        Playlist {
            persistent_id: PersistentId::new(id),
            parent_persistent_id: parent.map(PersistentId::new),
            name: format!("P{id}"),
            kind,
            ..Default::default()
        }
    }

    fn shape(node: &PlaylistTreeNode<'_>) -> Vec<(String, Vec<String>)> {
        node.children
            .iter()
            .map(|child| {
                let names = child.children.iter().map(|c| c.name().to_string()).collect();
                (child.name().to_string(), names)
            })
            .collect()
    }

    #[test]
    fn empty_snapshot_yields_empty_root() {
        let tree = PlaylistTreeGenerator::default().generate(&[]);
        assert!(tree.root.is_root());
        assert!(tree.is_empty());
    }

    #[test]
    fn children_attach_in_snapshot_order() {
        let playlists = vec![
            playlist(1, None, PlaylistKind::Folder),
            playlist(3, Some(1), PlaylistKind::Regular),
            playlist(2, None, PlaylistKind::Regular),
            playlist(4, Some(1), PlaylistKind::Regular),
        ];
        let tree = PlaylistTreeGenerator::default().generate(&playlists);
        assert_eq!(
            shape(&tree.root),
            vec![
                ("P1".to_string(), vec!["P3".to_string(), "P4".to_string()]),
                ("P2".to_string(), vec![]),
            ]
        );
    }

    #[test]
    fn dangling_parent_is_promoted() {
        let playlists = vec![playlist(5, Some(99), PlaylistKind::Regular)];
        let tree = PlaylistTreeGenerator::default().generate(&playlists);
        assert_eq!(tree.root.children.len(), 1);
        assert_eq!(tree.root.children[0].persistent_id(), Some(PersistentId::new(5)));
    }

    #[test]
    fn excluded_node_drops_subtree_without_flattening() {
        let playlists = vec![
            playlist(1, None, PlaylistKind::Folder),
            playlist(2, Some(1), PlaylistKind::Regular),
        ];
        let filters = PlaylistFilterGroup::new(vec![PlaylistFilter::ParentId(
            PlaylistParentIdFilter::new([PersistentId::new(1)]),
        )]);
        let tree = PlaylistTreeGenerator::new(filters).generate(&playlists);
        assert!(tree.is_empty());
        assert_eq!(tree.excluded.len(), 1);
    }

    #[test]
    fn excluded_folder_hands_children_up_when_flattening() {
        let mut music = playlist(1, None, PlaylistKind::Folder);
        music.distinguished_kind = DistinguishedKind::Music;
        let playlists = vec![
            music,
            playlist(2, Some(1), PlaylistKind::Folder),
            playlist(3, Some(2), PlaylistKind::Regular),
            playlist(4, Some(1), PlaylistKind::Regular),
        ];
        let filters = PlaylistFilterGroup::new(vec![PlaylistFilter::DistinguishedKind(
            DistinguishedKindFilter::with_base_kinds(),
        )]);
        let tree = PlaylistTreeGenerator::new(filters).flatten_folders(true).generate(&playlists);
        let names: Vec<&str> = tree.root.children.iter().map(PlaylistTreeNode::name).collect();
        assert_eq!(names, vec!["P3", "P4"]);
        assert_eq!(tree.root.folder_count(), 0);
    }

    #[test]
    fn playlists_nested_too_deep_are_reported_as_excluded() {
        let depth = MAX_TREE_DEPTH as u128 + 2;
        let mut playlists: Vec<Playlist> = (1..=depth)
            .map(|id| playlist(id, (id > 1).then(|| id - 1), PlaylistKind::Folder))
            .collect();
        playlists.push(playlist(depth + 1, Some(depth - 1), PlaylistKind::Regular));

        let tree = PlaylistTreeGenerator::default().generate(&playlists);
        assert_eq!(tree.root.playlist_count(), MAX_TREE_DEPTH);
        let excluded: Vec<PersistentId> = tree.excluded.iter().map(|p| p.persistent_id).collect();
        assert_eq!(
            excluded,
            vec![
                PersistentId::new(depth - 1),
                PersistentId::new(depth),
                PersistentId::new(depth + 1),
            ]
        );
    }

    #[test]
    fn self_parent_is_promoted() {
        let playlists = vec![playlist(1, Some(1), PlaylistKind::Regular)];
        let tree = PlaylistTreeGenerator::default().generate(&playlists);
        assert_eq!(tree.root.children.len(), 1);
        assert!(tree.root.children[0].children.is_empty());
    }

    #[test]
    fn descendant_of_cycle_stays_attached() {
        let playlists = vec![
            playlist(1, Some(2), PlaylistKind::Folder),
            playlist(2, Some(1), PlaylistKind::Folder),
            playlist(3, Some(1), PlaylistKind::Regular),
        ];
        let tree = PlaylistTreeGenerator::default().generate(&playlists);
        assert_eq!(
            shape(&tree.root),
            vec![
                ("P1".to_string(), vec!["P3".to_string()]),
                ("P2".to_string(), vec![]),
            ]
        );
    }

    #[test]
    fn custom_sort_is_read_from_overrides() {
        let playlists = vec![
            playlist(1, None, PlaylistKind::Regular),
            playlist(2, None, PlaylistKind::Regular),
        ];
        let properties = BTreeMap::from([(PersistentId::new(1), SortProperty::Artist)]);
        let orders = BTreeMap::from([
            (PersistentId::new(1), SortOrder::Descending),
            (PersistentId::new(2), SortOrder::Descending),
        ]);
        let tree = PlaylistTreeGenerator::default()
            .custom_sorting(properties, orders)
            .generate(&playlists);

        let first = &tree.root.children[0];
        assert_eq!(first.custom_sort_property, Some(SortProperty::Artist));
        assert_eq!(first.custom_sort_order, SortOrder::Descending);
        // An order without a property means default ordering.
        let second = &tree.root.children[1];
        assert_eq!(second.custom_sort_property, None);
        assert_eq!(second.sorter(), MediaItemSorter::default());
    }

    #[test]
    fn flatten_is_idempotent_without_folders() {
        let playlists = vec![
            playlist(1, None, PlaylistKind::Regular),
            playlist(2, None, PlaylistKind::Smart),
        ];
        let tree = PlaylistTreeGenerator::default().generate(&playlists);
        let mut flattened = tree.root.clone();
        flattened.flatten();
        assert_eq!(flattened, tree.root);
    }

    #[test]
    fn flatten_removes_exactly_the_folders() {
        let playlists = vec![
            playlist(1, None, PlaylistKind::Folder),
            playlist(2, Some(1), PlaylistKind::Folder),
            playlist(3, Some(2), PlaylistKind::Regular),
            playlist(4, Some(1), PlaylistKind::Regular),
            playlist(5, None, PlaylistKind::Regular),
        ];
        let tree = PlaylistTreeGenerator::default().generate(&playlists);
        let before = tree.root.playlist_count();
        let folders = tree.root.folder_count();

        let mut flattened = tree.root.clone();
        flattened.flatten();
        assert_eq!(flattened.playlist_count(), before - folders);
        let names: Vec<&str> = flattened.children.iter().map(PlaylistTreeNode::name).collect();
        assert_eq!(names, vec!["P3", "P4", "P5"]);
    }
}
