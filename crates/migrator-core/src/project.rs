//! Project manifest access
//!
//! A project is described by a YAML manifest listing build properties and
//! declared items:
//!
//! ```yaml
//! properties:
//!   AssemblyName: Contoso.Web
//! items:
//!   - type: Content
//!     include: Web.config
//!   - type: Compile
//!     update: $(AssemblyName).cs
//! ```
//!
//! Files on disk matching the `default_items` globs are items too, without
//! being declared. A manifest that omits the table gets
//! [`DEFAULT_ITEM_GLOBS`]; `default_items: {}` turns implicit items off.
//!
//! Handles are short-lived: load, query, optionally mutate, save, drop.

use crate::error::{MigrationError, Result};
use glob::{MatchOptions, Pattern};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use walkdir::WalkDir;

/// Implicit item globs, by item type, for manifests without `default_items`
pub const DEFAULT_ITEM_GLOBS: &[(&str, &[&str])] = &[
    ("Compile", &["**/*.cs"]),
    ("Content", &["**/*.json", "**/*.config", "wwwroot/**/*"]),
];

/// Build output never contributes implicit items
const EXCLUDED_DIRS: &[&str] = &["bin", "obj"];

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: false,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One declared entry in the manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectItem {
    /// Item category (e.g. `Content`, `Compile`)
    #[serde(rename = "type")]
    pub item_type: String,

    /// Path the item includes, relative to the project directory
    #[serde(default, skip_serializing_if = "String::is_empty")]
    include: String,

    /// Path of an auto-discovered item this entry updates
    #[serde(default, skip_serializing_if = "String::is_empty")]
    update: String,
}

impl ProjectItem {
    pub fn new(item_type: impl Into<String>, include: impl Into<String>) -> Self {
        Self {
            item_type: item_type.into(),
            include: include.into(),
            update: String::new(),
        }
    }

    pub fn include(&self) -> &str {
        &self.include
    }

    pub fn update(&self) -> &str {
        &self.update
    }

    pub fn set_include(&mut self, include: impl Into<String>) {
        self.include = include.into();
    }

    pub fn set_update(&mut self, update: impl Into<String>) {
        self.update = update.into();
    }
}

/// An existing manifest item as seen by the item matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMatchCandidate {
    pub item_type: String,
    /// Include path with `$(Property)` references expanded
    pub evaluated_include: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ProjectDocument {
    #[serde(default)]
    properties: IndexMap<String, String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_items: Option<IndexMap<String, Vec<String>>>,

    #[serde(default)]
    items: Vec<ProjectItem>,
}

/// A loaded project manifest
#[derive(Debug, Clone)]
pub struct Project {
    path: PathBuf,
    document: ProjectDocument,
}

impl Project {
    /// Load the manifest at `path`
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(MigrationError::ProjectNotFound(path));
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| MigrationError::InvalidProject {
                path: path.clone(),
                source: e.into(),
            })?;

        // An empty document is a project with no properties and no items
        let document = if content.trim().is_empty() {
            ProjectDocument::default()
        } else {
            serde_yaml::from_str(&content).map_err(|e| MigrationError::InvalidProject {
                path: path.clone(),
                source: e.into(),
            })?
        };

        Ok(Self { path, document })
    }

    /// Absolute or caller-relative path of the manifest file
    pub fn full_path(&self) -> &Path {
        &self.path
    }

    /// Directory containing the manifest; item paths are relative to it
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Every item of the project with its include evaluated: declared items
    /// in manifest order, then implicit items not already declared
    pub fn items(&self) -> Vec<ItemMatchCandidate> {
        let mut items: Vec<ItemMatchCandidate> = self
            .document
            .items
            .iter()
            .map(|item| ItemMatchCandidate {
                item_type: item.item_type.clone(),
                evaluated_include: self.expand_properties(&item.include),
            })
            .collect();
        let declared = items.len();

        for implicit in self.implicit_items() {
            let duplicate = items[..declared].iter().any(|item| {
                eq_ignore_case(&item.item_type, &implicit.item_type)
                    && same_path(&item.evaluated_include, &implicit.evaluated_include)
            });
            if !duplicate {
                items.push(implicit);
            }
        }

        items
    }

    /// Items as written in the manifest
    pub fn declared_items(&self) -> &[ProjectItem] {
        &self.document.items
    }

    /// Raw declared items, for in-place edits
    pub fn items_mut(&mut self) -> &mut [ProjectItem] {
        &mut self.document.items
    }

    /// Evaluated value of a build property, if it is defined
    pub fn property_value(&self, name: &str) -> Option<String> {
        self.document
            .properties
            .get(name)
            .map(|value| self.expand_properties(value))
    }

    /// Declare a new item
    pub fn add_item(&mut self, item_type: impl Into<String>, include: impl Into<String>) {
        self.document
            .items
            .push(ProjectItem::new(item_type, include));
    }

    /// Persist the manifest, replacing the file through a temporary sibling
    pub async fn save(&self) -> Result<()> {
        let to_err = |source| MigrationError::SaveProject {
            path: self.path.clone(),
            source,
        };

        let content = serde_yaml::to_string(&self.document)
            .map_err(|e| to_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, content).await.map_err(to_err)?;
        fs::rename(&temp_path, &self.path).await.map_err(to_err)?;

        tracing::debug!("Saved project {}", self.path.display());
        Ok(())
    }

    fn default_item_globs(&self) -> Vec<(String, Vec<Pattern>)> {
        let table: Vec<(String, Vec<String>)> = match &self.document.default_items {
            Some(table) => table
                .iter()
                .map(|(item_type, globs)| (item_type.clone(), globs.clone()))
                .collect(),
            None => DEFAULT_ITEM_GLOBS
                .iter()
                .map(|(item_type, globs)| {
                    (
                        item_type.to_string(),
                        globs.iter().map(|g| g.to_string()).collect(),
                    )
                })
                .collect(),
        };

        table
            .into_iter()
            .map(|(item_type, globs)| {
                let patterns = globs
                    .iter()
                    .filter_map(|glob| match Pattern::new(glob) {
                        Ok(pattern) => Some(pattern),
                        Err(e) => {
                            tracing::warn!("Ignoring invalid {} glob {}: {}", item_type, glob, e);
                            None
                        }
                    })
                    .collect();
                (item_type, patterns)
            })
            .collect()
    }

    /// Files under the project directory picked up by the default globs,
    /// in file name order
    fn implicit_items(&self) -> Vec<ItemMatchCandidate> {
        let globs = self.default_item_globs();
        if globs.iter().all(|(_, patterns)| patterns.is_empty()) {
            return Vec::new();
        }

        let dir = self.directory();
        let root = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        let manifest_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut found = Vec::new();
        let entries = WalkDir::new(root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_excluded_dir(entry))
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file());

        for entry in entries {
            let relative = match entry.path().strip_prefix(root) {
                Ok(relative) => relative.to_string_lossy().replace('\\', "/"),
                Err(_) => continue,
            };
            if relative == manifest_name {
                continue;
            }

            for (item_type, patterns) in &globs {
                if patterns
                    .iter()
                    .any(|pattern| pattern.matches_with(&relative, GLOB_OPTIONS))
                {
                    found.push(ItemMatchCandidate {
                        item_type: item_type.clone(),
                        evaluated_include: relative.clone(),
                    });
                }
            }
        }

        tracing::debug!(
            "Found {} implicit items under {}",
            found.len(),
            root.display()
        );
        found
    }

    /// Expand `$(Name)` references from the property table.
    ///
    /// Unknown properties evaluate to the empty string. Properties are not
    /// expanded recursively.
    fn expand_properties(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;

        while let Some(start) = rest.find("$(") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find(')') {
                Some(end) => {
                    let name = &after[..end];
                    if let Some(v) = self.document.properties.get(name) {
                        out.push_str(v);
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}

fn is_excluded_dir(entry: &walkdir::DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    entry.file_type().is_dir() && EXCLUDED_DIRS.iter().any(|dir| eq_ignore_case(&name, dir))
}

/// Case-insensitive comparison for item types and file names
pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Manifest paths compare case-insensitively and with either separator
pub(crate) fn same_path(declared: &str, relative_path: &str) -> bool {
    !declared.is_empty()
        && declared.replace('\\', "/").to_lowercase()
            == relative_path.replace('\\', "/").to_lowercase()
}
