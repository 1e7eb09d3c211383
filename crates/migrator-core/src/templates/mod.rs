//! Template catalogs and their materialization
//!
//! This module provides:
//! - Template configuration types and loading (`config`)
//! - Matching template items against an existing project (`matcher`)
//! - Token replacement resolution from project properties (`tokens`)
//! - Streaming copy with inline substitution (`stream`)
//! - Writing templates into a project with backups of existing files (`materializer`)

pub mod config;
pub mod materializer;
pub mod matcher;
pub mod stream;
pub mod tokens;

pub use config::{
    load_one, resolve_config_paths, ItemSpec, RuntimeItemSpec, TemplateConfiguration,
};
pub use materializer::{backup_file_name, materialize, rename_file};
pub use matcher::{is_web_app, item_matches, project_contains};
pub use stream::copy_with_replacements;
pub use tokens::{resolve_replacements, PropertyCache, PropertySource, Replacement};
