//! Writing template files into a project

use crate::cancel::CancellationToken;
use crate::error::{MigrationError, Result};
use crate::project::{same_path, Project};
use crate::templates::config::RuntimeItemSpec;
use crate::templates::stream::copy_with_replacements;
use crate::templates::tokens::resolve_replacements;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Upper bound on `.old.N` suffixes tried before giving up
const MAX_BACKUP_ATTEMPTS: u32 = 10_000;

/// Pick the backup name for `file_name` in `dir`.
///
/// `name.ext` becomes `name.old.ext`, or `name.old.0.ext`, `name.old.1.ext`,
/// ... if taken. Returns `None` once every candidate is in use.
pub async fn backup_file_name(dir: &Path, file_name: &str) -> Option<String> {
    let path = Path::new(file_name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let candidate = format!("{}.old{}", stem, ext);
    if !exists(&dir.join(&candidate)).await {
        return Some(candidate);
    }

    for counter in 0..MAX_BACKUP_ATTEMPTS {
        let candidate = format!("{}.old.{}{}", stem, counter, ext);
        if !exists(&dir.join(&candidate)).await {
            return Some(candidate);
        }
    }
    None
}

/// Move an existing project file out of the way, keeping it in the project.
///
/// `relative_path` is the file's path relative to the project directory.
/// Manifest items including or updating that path are pointed at the backup
/// before the file itself moves. The file is never deleted.
pub async fn rename_file(project: &mut Project, relative_path: &str) -> Result<PathBuf> {
    let file_path = project.directory().join(relative_path);
    let dir = file_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let file_name = file_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let backup_name = match backup_file_name(&dir, &file_name).await {
        Some(name) => name,
        None => {
            return Err(MigrationError::Backup {
                from: file_path.clone(),
                to: dir.join(format!("{}.old", file_name)),
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "no unused backup name",
                ),
            })
        }
    };
    let backup_path = dir.join(&backup_name);
    let backup_relative = sibling_path(relative_path, &backup_name);

    tracing::info!(
        "File already exists, moving {} to {}",
        file_name,
        backup_name
    );

    // The old file stays in the project so the pending manual migration
    // remains visible
    let mut previous = Vec::new();
    for (index, item) in project.items_mut().iter_mut().enumerate() {
        let include = same_path(item.include(), relative_path);
        let update = same_path(item.update(), relative_path);
        if !include && !update {
            continue;
        }
        previous.push((index, item.clone()));
        if include {
            item.set_include(backup_relative.clone());
        }
        if update {
            item.set_update(backup_relative.clone());
        }
    }

    if let Err(source) = fs::rename(&file_path, &backup_path).await {
        // File did not move, so neither do the references
        let items = project.items_mut();
        for (index, item) in previous {
            items[index] = item;
        }
        return Err(MigrationError::Backup {
            from: file_path,
            to: backup_path,
            source,
        });
    }

    Ok(backup_path)
}

/// Write every needed item into the project, in map order.
///
/// The template source is opened before anything at the destination is
/// touched. Existing files at a destination are then backed up. Items
/// declared for explicit inclusion are added to `project`; saving it is left
/// to the caller, also on failure. Stops at the first failure; files already
/// written or moved stay that way, and `project` reflects them.
pub async fn materialize(
    items: &IndexMap<String, RuntimeItemSpec>,
    project: &mut Project,
    cancel: &CancellationToken,
) -> Result<usize> {
    let project_dir = project.directory().to_path_buf();
    let mut added = 0;

    for item in items.values() {
        cancel.check()?;

        let mut template = open_template(&item.template_path).await?;

        let file_path = project_dir.join(item.path());
        if exists(&file_path).await {
            rename_file(project, item.path()).await?;
        }

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| MigrationError::Materialize {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        // Properties come from the manifest as persisted, through a handle
        // scoped to this resolution
        let properties = Project::load(project.full_path()).await?;
        let tokens = resolve_replacements(&item.replacements, &properties);
        drop(properties);

        write_template(&mut template, &file_path, &tokens).await?;

        if item.spec.include_explicitly {
            project.add_item(item.spec.item_type.clone(), item.path());
        }

        tracing::info!("Added {} to the project from template file", item.path());
        added += 1;
    }

    Ok(added)
}

async fn open_template(template_path: &Path) -> Result<fs::File> {
    fs::File::open(template_path)
        .await
        .map_err(|source| MigrationError::TemplateSource {
            path: template_path.to_path_buf(),
            source,
        })
}

async fn write_template(
    template: &mut fs::File,
    file_path: &Path,
    tokens: &IndexMap<String, String>,
) -> Result<()> {
    let mut output = fs::File::create(file_path)
        .await
        .map_err(|source| MigrationError::Materialize {
            path: file_path.to_path_buf(),
            source,
        })?;

    copy_with_replacements(template, &mut output, tokens)
        .await
        .map_err(|source| MigrationError::Materialize {
            path: file_path.to_path_buf(),
            source,
        })
}

async fn exists(path: &Path) -> bool {
    fs::try_exists(path).await.unwrap_or(false)
}

/// Replace the file name of a `/`- or `\`-separated relative path
fn sibling_path(relative_path: &str, file_name: &str) -> String {
    match relative_path.rfind(['/', '\\']) {
        Some(idx) => format!("{}{}", &relative_path[..=idx], file_name),
        None => file_name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::config::ItemSpec;

    async fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(path, content).await.unwrap();
    }

    async fn read(path: &Path) -> String {
        fs::read_to_string(path).await.unwrap()
    }

    #[tokio::test]
    async fn test_backup_name_sequence() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();

        assert_eq!(
            backup_file_name(dir, "appsettings.json").await.unwrap(),
            "appsettings.old.json"
        );

        write(&dir.join("appsettings.old.json"), "").await;
        assert_eq!(
            backup_file_name(dir, "appsettings.json").await.unwrap(),
            "appsettings.old.0.json"
        );

        write(&dir.join("appsettings.old.0.json"), "").await;
        assert_eq!(
            backup_file_name(dir, "appsettings.json").await.unwrap(),
            "appsettings.old.1.json"
        );

        assert_eq!(backup_file_name(dir, "LICENSE").await.unwrap(), "LICENSE.old");
    }

    #[tokio::test]
    async fn test_rename_file_updates_manifest_then_moves() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        let manifest = dir.join("App.proj.yaml");
        write(
            &manifest,
            "\
items:
  - type: Content
    include: APPSETTINGS.json
  - type: None
    update: appsettings.json
  - type: Content
    include: Web.config
",
        )
        .await;
        write(&dir.join("appsettings.json"), "{ \"old\": true }").await;
        write(&dir.join("appsettings.old.json"), "earlier backup").await;

        let mut project = Project::load(&manifest).await.unwrap();
        let backup = rename_file(&mut project, "appsettings.json").await.unwrap();

        assert_eq!(backup, dir.join("appsettings.old.0.json"));
        assert_eq!(read(&backup).await, "{ \"old\": true }");
        assert!(!dir.join("appsettings.json").exists());
        assert_eq!(read(&dir.join("appsettings.old.json")).await, "earlier backup");

        let items = project.items_mut();
        assert_eq!(items[0].include(), "appsettings.old.0.json");
        assert_eq!(items[1].update(), "appsettings.old.0.json");
        assert_eq!(items[2].include(), "Web.config");
    }

    #[tokio::test]
    async fn test_rename_nested_file() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        let manifest = dir.join("App.proj.yaml");
        write(&manifest, "items:\n  - type: Content\n    include: Views\\Web.config\n").await;
        write(&dir.join("Views/Web.config"), "<old />").await;

        let mut project = Project::load(&manifest).await.unwrap();
        rename_file(&mut project, "Views/Web.config").await.unwrap();

        assert!(dir.join("Views/Web.old.config").exists());
        assert_eq!(project.items_mut()[0].include(), "Views\\Web.old.config");
    }

    #[tokio::test]
    async fn test_materialize_writes_and_registers() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        let templates = dir.join("templates");
        let project_dir = dir.join("app");
        let manifest = project_dir.join("App.proj.yaml");

        write(&templates.join("Startup.cs"), "namespace WebApplication1 { $Missing$ }").await;
        write(&templates.join("appsettings.json"), "{}").await;
        write(&manifest, "properties:\n  AssemblyName: Contoso.Web\n").await;
        write(&project_dir.join("appsettings.json"), "{ \"legacy\": 1 }").await;

        let replacements: IndexMap<String, String> = [
            ("WebApplication1".to_string(), "$(AssemblyName)".to_string()),
            ("$Missing$".to_string(), "$(Missing)".to_string()),
        ]
        .into_iter()
        .collect();

        let mut items = IndexMap::new();
        items.insert(
            "Startup.cs".to_string(),
            RuntimeItemSpec::new(
                ItemSpec::new("Compile", "Startup.cs", true, Vec::new()),
                templates.join("Startup.cs"),
                replacements,
            ),
        );
        items.insert(
            "appsettings.json".to_string(),
            RuntimeItemSpec::new(
                ItemSpec::new("Content", "appsettings.json", false, Vec::new()),
                templates.join("appsettings.json"),
                IndexMap::new(),
            ),
        );

        let mut project = Project::load(&manifest).await.unwrap();
        let added = materialize(&items, &mut project, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(added, 2);
        assert_eq!(
            read(&project_dir.join("Startup.cs")).await,
            "namespace Contoso.Web { $Missing$ }"
        );
        assert_eq!(read(&project_dir.join("appsettings.json")).await, "{}");
        assert_eq!(
            read(&project_dir.join("appsettings.old.json")).await,
            "{ \"legacy\": 1 }"
        );

        // Only the explicitly included item is registered
        let registered = project.declared_items();
        assert_eq!(registered.len(), 1);
        assert_eq!(registered[0].item_type, "Compile");
        assert_eq!(registered[0].include(), "Startup.cs");
    }

    #[tokio::test]
    async fn test_materialize_missing_template_fails() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = temp.path().join("App.proj.yaml");
        write(&manifest, "").await;

        let missing = temp.path().join("gone/Program.cs");
        let mut items = IndexMap::new();
        items.insert(
            "Program.cs".to_string(),
            RuntimeItemSpec::new(
                ItemSpec::new("Compile", "Program.cs", true, Vec::new()),
                missing.clone(),
                IndexMap::new(),
            ),
        );

        let mut project = Project::load(&manifest).await.unwrap();
        let err = materialize(&items, &mut project, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            format!("Template file not found: {}", missing.display())
        );
        assert!(project.declared_items().is_empty());
    }

    #[tokio::test]
    async fn test_missing_template_leaves_destination_alone() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        let manifest = dir.join("App.proj.yaml");
        write(&manifest, "items:\n  - { type: Content, include: Web.config }\n").await;
        write(&dir.join("Web.config"), "<old />").await;

        let mut items = IndexMap::new();
        items.insert(
            "Web.config".to_string(),
            RuntimeItemSpec::new(
                ItemSpec::new("Content", "Web.config", false, Vec::new()),
                dir.join("gone/Web.config"),
                IndexMap::new(),
            ),
        );

        let mut project = Project::load(&manifest).await.unwrap();
        let err = materialize(&items, &mut project, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, MigrationError::TemplateSource { .. }));
        assert_eq!(read(&dir.join("Web.config")).await, "<old />");
        assert!(!dir.join("Web.old.config").exists());
        assert_eq!(project.declared_items()[0].include(), "Web.config");
    }

    #[tokio::test]
    async fn test_materialize_observes_cancellation() {
        let temp = tempfile::tempdir().unwrap();
        let manifest = temp.path().join("App.proj.yaml");
        write(&manifest, "").await;
        write(&temp.path().join("t/Program.cs"), "class Program {}").await;

        let mut items = IndexMap::new();
        items.insert(
            "Program.cs".to_string(),
            RuntimeItemSpec::new(
                ItemSpec::new("Compile", "Program.cs", true, Vec::new()),
                temp.path().join("t/Program.cs"),
                IndexMap::new(),
            ),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut project = Project::load(&manifest).await.unwrap();

        let err = materialize(&items, &mut project, &cancel).await.unwrap_err();
        assert!(matches!(err, MigrationError::Cancelled));
        assert!(!temp.path().join("Program.cs").exists());
    }

    #[test]
    fn test_sibling_path() {
        assert_eq!(sibling_path("Views\\Web.config", "Web.old.config"), "Views\\Web.old.config");
        assert_eq!(sibling_path("Web.config", "Web.old.config"), "Web.old.config");
    }
}
