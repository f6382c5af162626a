use std::collections::BTreeMap;
use std::{fs, io, path::PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

const APP_HOME_DIR: &str = ".glide";
const SCROLL_STATE_FILE: &str = "scroll_state.json";

/// Scrolled distance per context key, per page URL.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ScrollStateDocument(pub BTreeMap<String, BTreeMap<String, f64>>);

impl ScrollStateDocument {
    pub fn get(&self, url: &str, key: &str) -> Option<f64> {
        self.0.get(url)?.get(key).copied()
    }

    /// Merge one entry in. Returns `true` if the document changed.
    pub fn set(&mut self, url: &str, key: &str, distance: f64) -> bool {
        if !distance.is_finite() {
            return false;
        }
        let page = self.0.entry(url.to_string()).or_default();
        if page.get(key) == Some(&distance) {
            return false;
        }
        page.insert(key.to_string(), distance);
        true
    }
}

/// Where scroll offsets are remembered between (re)initialisations.
pub trait ScrollStateStore {
    fn load(&self, url: &str, key: &str) -> Option<f64>;

    fn save(&mut self, url: &str, key: &str, distance: f64);

    /// Write pending changes to the backing medium.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Session-scoped, in-memory store.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    state: ScrollStateDocument,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn document(&self) -> &ScrollStateDocument {
        &self.state
    }
}

impl ScrollStateStore for SessionStore {
    fn load(&self, url: &str, key: &str) -> Option<f64> {
        self.state.get(url, key)
    }

    fn save(&mut self, url: &str, key: &str, distance: f64) {
        self.state.set(url, key, distance);
    }
}

/// JSON file store, `~/.glide/scroll_state.json` by default.
pub struct JsonFileStore {
    path: PathBuf,
    state: ScrollStateDocument,
    dirty: bool,
}

impl JsonFileStore {
    pub fn load() -> Result<Self> {
        Ok(Self::open(storage_path()?))
    }

    /// Open `path`, starting empty if it is missing or unreadable.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(data) => match serde_json::from_slice::<ScrollStateDocument>(&data) {
                Ok(parsed) => parsed,
                Err(error) => {
                    warn!(?error, ?path, "failed to parse persisted scroll state");
                    ScrollStateDocument::default()
                }
            },
            Err(error) => {
                if error.kind() != io::ErrorKind::NotFound {
                    warn!(?error, ?path, "failed to read persisted scroll state");
                }
                ScrollStateDocument::default()
            }
        };

        Self {
            path,
            state,
            dirty: false,
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl ScrollStateStore for JsonFileStore {
    fn load(&self, url: &str, key: &str) -> Option<f64> {
        self.state.get(url, key)
    }

    fn save(&mut self, url: &str, key: &str, distance: f64) {
        if self.state.set(url, key, distance) {
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }

        write_state(&self.path, &self.state)?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for JsonFileStore {
    fn drop(&mut self) {
        if self.dirty
            && let Err(error) = write_state(&self.path, &self.state)
        {
            warn!(?error, ?self.path, "failed to persist scroll state during drop");
        }
    }
}

fn storage_path() -> Result<PathBuf> {
    if let Some(mut home) = dirs::home_dir() {
        home.push(APP_HOME_DIR);
        home.push(SCROLL_STATE_FILE);
        Ok(home)
    } else {
        let mut cwd = std::env::current_dir()?;
        cwd.push(SCROLL_STATE_FILE);
        Ok(cwd)
    }
}

fn write_state(path: &PathBuf, state: &ScrollStateDocument) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(state)?;
    fs::write(path, json)?;
    Ok(())
}
