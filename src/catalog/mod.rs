//! Picture catalog.
//!
//! A directory of `.webp` files plus a JSON database describing them. On
//! open the database is loaded, pictures found on disk but missing from it
//! are added with default metadata, and the result is written back.
//!
//! The catalog is read-only once the server starts, so it is shared between
//! connections as a plain `Arc<Catalog>`.

pub mod picture;

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::CatalogConfig;
use crate::handlers::{json_handler, static_route};
use crate::router::Router;

pub use picture::Picture;

const PICTURE_EXTENSION: &str = "webp";

#[derive(Debug)]
pub struct Catalog {
    pictures: Vec<Picture>,
    root_dir: PathBuf,
    database_file: PathBuf,
    json_indent: usize,
}

impl Catalog {
    /// Loads `root_dir/database_file`, adds untracked pictures and persists.
    pub fn open(root_dir: impl Into<PathBuf>, database_file: &str, json_indent: usize) -> Result<Self> {
        let root_dir = root_dir.into();
        let database_file = root_dir.join(database_file);

        let mut catalog = Self {
            pictures: Vec::new(),
            root_dir,
            database_file,
            json_indent,
        };

        let started = Instant::now();
        catalog.load()?;
        debug!(took = %duration_readable(started.elapsed()), "Loaded picture database");

        catalog.persist()?;
        info!(pictures = catalog.pictures.len(), "Finished loading pictures");
        Ok(catalog)
    }

    pub fn from_config(cfg: &CatalogConfig) -> Result<Self> {
        Self::open(&cfg.root_dir, &cfg.database_file, cfg.json_indent)
    }

    fn load(&mut self) -> Result<()> {
        if self.database_file.exists() {
            let text = fs::read_to_string(&self.database_file)
                .with_context(|| format!("read {}", self.database_file.display()))?;
            let items: Vec<Picture> = serde_json::from_str(&text)
                .with_context(|| format!("parse {}", self.database_file.display()))?;

            for item in items {
                self.add(item)?;
            }
        }

        let mut found = Vec::new();
        let entries = fs::read_dir(&self.root_dir)
            .with_context(|| format!("list {}", self.root_dir.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if Path::new(&name).extension().is_some_and(|e| e == PICTURE_EXTENSION) && self.get(&name).is_none() {
                found.push(name);
            }
        }

        // read_dir order is platform dependent.
        found.sort();
        for name in found {
            info!(path = %name, "New picture added");
            self.add(Picture::new(name))?;
        }

        Ok(())
    }

    fn add(&mut self, picture: Picture) -> Result<()> {
        if self.get(&picture.path).is_some() {
            bail!("duplicated picture name {}", picture.path);
        }
        self.pictures.push(picture);
        Ok(())
    }

    /// Writes the database with the configured indentation.
    pub fn persist(&self) -> Result<()> {
        let started = Instant::now();

        let indent = vec![b' '; self.json_indent];
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(&indent));
        self.pictures.serialize(&mut ser)?;

        fs::write(&self.database_file, buf)
            .with_context(|| format!("write {}", self.database_file.display()))?;

        debug!(took = %duration_readable(started.elapsed()), "Persisted picture database");
        Ok(())
    }

    pub fn pictures(&self) -> &[Picture] {
        &self.pictures
    }

    pub fn get(&self, path: &str) -> Option<&Picture> {
        self.pictures.iter().find(|p| p.path == path)
    }

    /// Tag usage counts, most used first. Ties keep first-seen order.
    pub fn all_tags(&self) -> Vec<(String, usize)> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();

        for tag in self.pictures.iter().flat_map(|p| &p.tags) {
            let count = counts.entry(tag.as_str()).or_insert(0);
            if *count == 0 {
                order.push(tag.clone());
            }
            *count += 1;
        }

        let mut tags: Vec<(String, usize)> = order
            .into_iter()
            .map(|tag| {
                let count = counts[tag.as_str()];
                (tag, count)
            })
            .collect();
        tags.sort_by(|a, b| b.1.cmp(&a.1));
        tags
    }

    /// Registers the catalog routes under `prefix`:
    ///
    /// - `GET {prefix}/pictures`: every picture
    /// - `GET {prefix}/tags`: tag counts as an object, most used first
    /// - `GET {prefix}/picture/<file>`: the picture bytes
    pub fn register_routes(self: &Arc<Self>, router: &mut Router, prefix: &str) {
        let catalog = Arc::clone(self);
        router.get(
            format!("{prefix}/pictures"),
            json_handler(move |_| {
                let catalog = Arc::clone(&catalog);
                async move { Ok::<_, anyhow::Error>(catalog.pictures().to_vec()) }
            }),
        );

        let catalog = Arc::clone(self);
        router.get(
            format!("{prefix}/tags"),
            json_handler(move |_| {
                let catalog = Arc::clone(&catalog);
                async move {
                    let tags: Map<String, Value> = catalog
                        .all_tags()
                        .into_iter()
                        .map(|(tag, count)| (tag, Value::from(count)))
                        .collect();
                    Ok::<_, anyhow::Error>(tags)
                }
            }),
        );

        // Trailing slash keeps this from shadowing `/pictures`.
        router.add_route(static_route(format!("{prefix}/picture/"), self.root_dir.clone()));
    }
}

/// Formats an elapsed time for logs: `"1 ms"` floor, then ms, s, minutes.
pub fn duration_readable(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    let ms = elapsed.as_millis();

    if ms == 0 {
        "1 ms".to_string()
    } else if ms < 1500 {
        format!("{ms} ms")
    } else if secs < 60.0 {
        format!("{secs:.3} s")
    } else {
        format!("{:.3} m", secs / 60.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readable_durations() {
        assert_eq!(duration_readable(Duration::from_micros(300)), "1 ms");
        assert_eq!(duration_readable(Duration::from_millis(42)), "42 ms");
        assert_eq!(duration_readable(Duration::from_millis(1499)), "1499 ms");
        assert_eq!(duration_readable(Duration::from_millis(2500)), "2.500 s");
        assert_eq!(duration_readable(Duration::from_secs(90)), "1.500 m");
    }

    #[test]
    fn picture_defaults() {
        let picture: Picture = serde_json::from_str(r#"{"path": "a.webp"}"#).unwrap();
        assert_eq!(picture.name, "untitled");
        assert_eq!(picture.dir, vec!["uncategorized".to_string()]);
        assert!(picture.tags.is_empty());
    }
}
