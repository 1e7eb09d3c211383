//! Matching template items against items a project already has

use crate::project::{eq_ignore_case, ItemMatchCandidate, Project};
use crate::templates::config::ItemSpec;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Items whose presence marks a project as a web app rather than a class
/// library or some other project type
const WEB_APP_MARKERS: &[(&str, &str)] = &[
    ("Content", "Global.asax"),
    ("Content", "Web.config"),
];

fn web_app_markers() -> Vec<ItemSpec> {
    WEB_APP_MARKERS
        .iter()
        .map(|(item_type, path)| ItemSpec::new(*item_type, *path, false, Vec::new()))
        .collect()
}

/// Whether the project looks like a web app, judged by its marker items
pub async fn is_web_app(project: &Project) -> bool {
    let markers = web_app_markers();
    let dir = project.directory();

    for candidate in project.items() {
        for marker in &markers {
            if item_matches(marker, &candidate, dir).await {
                return true;
            }
        }
    }
    false
}

/// Whether any item in the project already satisfies `expected`
pub async fn project_contains(project: &Project, expected: &ItemSpec) -> bool {
    let dir = project.directory();
    for candidate in project.items() {
        if item_matches(expected, &candidate, dir).await {
            return true;
        }
    }
    false
}

/// Whether an existing manifest item satisfies an expected item.
///
/// Checks run cheapest first and stop at the first failure: item type,
/// non-empty include, file name, existence on disk, then keywords. File
/// contents are only read once the file is known to exist.
pub async fn item_matches(
    expected: &ItemSpec,
    candidate: &ItemMatchCandidate,
    project_dir: &Path,
) -> bool {
    if !eq_ignore_case(&expected.item_type, &candidate.item_type) {
        return false;
    }

    let include = candidate.evaluated_include.as_str();
    if include.is_empty() {
        return false;
    }

    // Directory is ignored; only the file name has to line up
    if !eq_ignore_case(file_name(include), &expected.path) {
        return false;
    }

    let file_path = resolve_include(include, project_dir);
    tracing::debug!(
        "Considering {} for expected file {}",
        file_path.display(),
        expected.path
    );

    if !fs::try_exists(&file_path).await.unwrap_or(false) {
        tracing::debug!("File {} does not exist", file_path.display());
        return false;
    }

    if !expected.keywords.is_empty() {
        let contents = match fs::read(&file_path).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => {
                tracing::debug!("Could not read {}: {}", file_path.display(), e);
                return false;
            }
        };

        if expected.keywords.iter().any(|k| !contents.contains(k.as_str())) {
            tracing::debug!(
                "File {} does not contain all necessary keywords to match",
                file_path.display()
            );
            return false;
        }
    }

    tracing::debug!(
        "File {} matches expected file {}",
        file_path.display(),
        expected.path
    );
    true
}

/// Last path component, accepting either separator style
fn file_name(include: &str) -> &str {
    include.rsplit(['/', '\\']).next().unwrap_or(include)
}

fn resolve_include(include: &str, project_dir: &Path) -> PathBuf {
    let native = if std::path::MAIN_SEPARATOR == '/' {
        include.replace('\\', "/")
    } else {
        include.to_string()
    };

    let path = PathBuf::from(native);
    if path.is_absolute() {
        path
    } else {
        project_dir.join(path)
    }
}
