pub mod config;
pub mod entity_ids;
pub mod error;
pub mod export;
pub mod filter;
pub mod library_parser;
pub mod models;
pub mod path_mapper;
pub mod playlist_tree;
pub mod serializer;
pub mod sorter;
pub mod system_library;

pub use config::ExportConfiguration;
pub use entity_ids::EntityIdRepository;
pub use error::{ErrorKind, ExportError};
pub use export::{ExportManager, ExportObserver, ExportState};
pub use library_parser::{parse_library_document, parse_library_xml};
pub use models::{
    DistinguishedKind, LibrarySnapshot, LocationType, MediaItem, MediaKind, PersistentId, Playlist,
    PlaylistKind,
};
pub use path_mapper::PathMapper;
pub use playlist_tree::{PlaylistTree, PlaylistTreeGenerator, PlaylistTreeNode};
pub use sorter::{MediaItemSorter, SortOrder, SortProperty};
pub use system_library::{load_snapshot, parse_snapshot};
