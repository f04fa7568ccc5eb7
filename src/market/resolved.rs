//! Skip-list of market ids known to be resolved or closed.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::MarketError;

/// Append-only, newline-delimited file of resolved market ids.
#[derive(Debug, Clone)]
pub struct ResolvedMarkets {
    path: PathBuf,
    ids: HashSet<String>,
}

impl ResolvedMarkets {
    /// Read the file at `path`. A missing file is an empty list.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MarketError> {
        let path = path.into();
        let ids = match fs::read_to_string(&path) {
            Ok(contents) => contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
            Err(e) if e.kind() == ErrorKind::NotFound => HashSet::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), count = ids.len(), "Loaded resolved markets");
        Ok(Self { path, ids })
    }

    /// Whether `id` is on the list.
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Add `id` to the list and the file. Ids already present are not
    /// written again.
    pub fn append(&mut self, id: &str) -> Result<(), MarketError> {
        if self.ids.contains(id) {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{id}")?;
        self.ids.insert(id.to_string());
        Ok(())
    }

    /// Number of ids on the list.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
