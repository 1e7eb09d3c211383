//! Template configuration types and loading

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

/// A file the migrated project is expected to contain
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSpec {
    /// Manifest item category
    #[serde(rename = "type", alias = "Type")]
    pub item_type: String,

    /// Path relative to the project directory (and to the configuration
    /// file for the template source)
    #[serde(alias = "Path")]
    pub path: String,

    /// Whether the item must be declared in the manifest, as opposed to
    /// being discovered automatically
    #[serde(
        default,
        alias = "IncludeExplicitly",
        alias = "includeExplicitly",
        deserialize_with = "or_default"
    )]
    pub include_explicitly: bool,

    /// Literal strings an existing file must all contain to count as a match
    #[serde(default, alias = "Keywords", deserialize_with = "or_default")]
    pub keywords: Vec<String>,
}

impl ItemSpec {
    pub fn new(
        item_type: impl Into<String>,
        path: impl Into<String>,
        include_explicitly: bool,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            path: path.into(),
            include_explicitly,
            keywords,
        }
    }
}

/// One template configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplateConfiguration {
    /// Files to add when the project lacks them
    #[serde(
        default,
        alias = "TemplateItems",
        alias = "templateItems",
        deserialize_with = "or_default"
    )]
    pub template_items: Vec<ItemSpec>,

    /// Token -> replacement expression, either a literal or `$(Property)`
    #[serde(default, alias = "Replacements", deserialize_with = "or_default")]
    pub replacements: IndexMap<String, String>,

    /// Only apply to projects recognized as web apps
    #[serde(
        default,
        alias = "UpdateWebAppsOnly",
        alias = "updateWebAppsOnly",
        deserialize_with = "or_default"
    )]
    pub update_web_apps_only: bool,
}

/// A template item selected for addition, with everything needed to write it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeItemSpec {
    pub spec: ItemSpec,

    /// Where the template file lives
    pub template_path: PathBuf,

    /// Replacements from the configuration that declared this item
    pub replacements: IndexMap<String, String>,
}

impl RuntimeItemSpec {
    pub fn new(
        spec: ItemSpec,
        template_path: PathBuf,
        replacements: IndexMap<String, String>,
    ) -> Self {
        Self {
            spec,
            template_path,
            replacements,
        }
    }

    /// Destination path relative to the project directory
    pub fn path(&self) -> &str {
        &self.spec.path
    }
}

/// Fields with the wrong shape fall back to their default instead of
/// rejecting the whole document
fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_yaml::Value::deserialize(deserializer)?;
    match serde_yaml::from_value(value) {
        Ok(parsed) => Ok(parsed),
        Err(e) => {
            tracing::warn!("Ignoring malformed template configuration field: {}", e);
            Ok(T::default())
        }
    }
}

/// Resolve configuration paths against `base_dir` unless already absolute
pub fn resolve_config_paths(paths: &[PathBuf], base_dir: &Path) -> Vec<PathBuf> {
    paths
        .iter()
        .map(|path| {
            if path.is_absolute() {
                path.clone()
            } else {
                base_dir.join(path)
            }
        })
        .collect()
}

/// Load one template configuration file.
///
/// Any problem is logged and yields `None`; the source then contributes no
/// template items.
pub async fn load_one(path: &Path) -> Option<TemplateConfiguration> {
    if path.as_os_str().is_empty() || path.to_string_lossy().trim().is_empty() {
        tracing::error!("Invalid template configuration file path: {}", path.display());
        return None;
    }

    if !fs::try_exists(path).await.unwrap_or(false) {
        tracing::error!("Template configuration file not found: {}", path.display());
        return None;
    }

    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) => {
            tracing::error!(
                "Failed to read template configuration file {}: {}",
                path.display(),
                e
            );
            return None;
        }
    };

    // YAML parsing also accepts JSON documents
    match serde_yaml::from_str(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::error!(
                "Error deserializing template configuration file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}
