//! Hot reload of the configuration file.
//!
//! A modified file is re-parsed and re-validated; only a configuration that
//! passes validation is forwarded to the server. A broken edit is logged and
//! the running configuration stays in place.
//!
//! The parent directory is watched rather than the file itself, so editors
//! that save by writing a new file and renaming it over the old one keep
//! triggering reloads.

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::FormforgeConfig;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Watches one configuration file and publishes validated reloads.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<FormforgeConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configurations.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<FormforgeConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, update_tx } = self;
        let watched = path.clone();
        let file_name = path.file_name().map(OsString::from).ok_or_else(|| {
            notify::Error::generic(&format!("{} does not name a file", path.display()))
        })?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let handler = move |res: notify::Result<Event>| match res {
            Ok(event) if is_content_change(&event) && touches(&event, &file_name) => {
                if let Some(config) = reload(&watched) {
                    if update_tx.send(config).is_err() {
                        tracing::debug!("Config receiver gone, dropping reload");
                    }
                }
            }
            Ok(_) => {}
            Err(e) => tracing::error!(error = %e, "Config watch error"),
        };

        let mut watcher = RecommendedWatcher::new(handler, Config::default().with_poll_interval(POLL_INTERVAL))?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), dir = %dir.display(), "Config watcher started");
        Ok(watcher)
    }
}

fn is_content_change(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

/// Whether any path in the event names the watched file.
fn touches(event: &Event, file_name: &OsString) -> bool {
    event
        .paths
        .iter()
        .any(|p| p.file_name().is_some_and(|name| name == file_name.as_os_str()))
}

/// Load the file again, returning `None` (and logging) when it is not usable.
pub fn reload(path: &Path) -> Option<FormforgeConfig> {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), forms = config.forms.len(), "Config file reloaded");
            Some(config)
        }
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "Rejected config reload, keeping current configuration");
            None
        }
    }
}
