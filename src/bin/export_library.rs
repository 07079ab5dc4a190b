use mlexport_lib::{
    load_snapshot, ExportConfiguration, ExportManager, ExportObserver, ExportState, Playlist,
};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

struct LogObserver;

impl ExportObserver for LogObserver {
    fn state_changed(&self, state: ExportState) {
        info!("{state}");
    }

    fn tracks_exported(&self, done: usize, total: usize) {
        if done == total {
            info!("Exported {done} tracks");
        }
    }

    fn playlists_exported(&self, done: usize, total: usize) {
        if done == total {
            info!("Exported {done} playlists");
        }
    }

    fn playlist_excluded(&self, playlist: &Playlist) {
        info!("Skipping playlist '{}'", playlist.name);
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let preferences = match args.get(2) {
        Some(path) => Some(PathBuf::from(path)),
        None => ExportConfiguration::default_preferences_path(),
    };
    let (Some(snapshot_path), Some(preferences)) = (args.get(1), preferences) else {
        eprintln!("Usage: export_library <snapshot.json> [preferences.plist]");
        return ExitCode::from(2);
    };

    let config = match ExportConfiguration::load_or_create(&preferences) {
        Ok(config) => config,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };
    let snapshot = match load_snapshot(snapshot_path) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("{e:#}");
            return ExitCode::FAILURE;
        }
    };

    let manager = ExportManager::with_observer(config, Arc::new(LogObserver));
    match manager.export_library(&snapshot) {
        Ok(path) => {
            info!("Library written to {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Export failed: {e}");
            ExitCode::FAILURE
        }
    }
}
