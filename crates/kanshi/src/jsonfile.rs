//! Whole-document JSON list files: `{"<key>": [ ... ]}`
//!
//! Every operation reads the entire document, changes it in memory and
//! writes it back. Concurrent writers are not coordinated; the last write wins.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use tracing::info;

use crate::config::file::write_file_replacing;

#[derive(Debug, Clone)]
pub struct JsonListFile {
    path: PathBuf,
    key: &'static str,
}

impl JsonListFile {
    pub fn new(path: impl Into<PathBuf>, key: &'static str) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all items. A missing or blank file is initialized empty.
    pub async fn read_items(&self) -> Result<Vec<Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("{:?} does not exist, creating", self.path);
                self.write_items(Vec::new()).await?;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to read {:?}", self.path)),
        };

        if content.trim().is_empty() {
            info!("{:?} is empty, initializing", self.path);
            self.write_items(Vec::new()).await?;
            return Ok(Vec::new());
        }

        let doc: Value = serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {:?}", self.path))?;
        match doc.get(self.key) {
            Some(Value::Array(items)) => Ok(items.clone()),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => anyhow::bail!("{:?}: `{}` is not an array", self.path, self.key),
        }
    }

    /// Replace the whole list
    pub async fn write_items(&self, items: Vec<Value>) -> Result<()> {
        let mut doc = Map::new();
        doc.insert(self.key.to_string(), Value::Array(items));
        let json = serde_json::to_string_pretty(&Value::Object(doc))?;
        write_file_replacing(&self.path, json.as_bytes()).await
    }

    /// Remove every item whose `id` equals `id`. Returns how many were removed.
    pub async fn remove_by_id(&self, id: &str) -> Result<usize> {
        let mut items = self.read_items().await?;
        let before = items.len();
        items.retain(|item| item.get("id").and_then(Value::as_str) != Some(id));
        let removed = before - items.len();
        if removed > 0 {
            self.write_items(items).await?;
        }
        Ok(removed)
    }

    /// Insert an item at the front of the list
    pub async fn prepend(&self, item: Value) -> Result<()> {
        let mut items = self.read_items().await?;
        items.insert(0, item);
        self.write_items(items).await
    }
}
