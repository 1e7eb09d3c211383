//! End-to-end runs of the template inserter step against on-disk projects

use migrator_core::steps::{
    TemplateInserterOptions, TemplateInserterStep, TEMPLATE_INSERTER_STEP_ID,
};
use migrator_core::{
    run_step, CancellationToken, MigrationStep, MigratorConfig, NonInteractiveInput, Project,
    ProjectContext, SelectionPreference, StepStatus,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

async fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await.unwrap();
    }
    fs::write(path, content).await.unwrap();
}

async fn read(path: &Path) -> String {
    fs::read_to_string(path).await.unwrap()
}

struct Workspace {
    _temp: tempfile::TempDir,
    root: PathBuf,
    manifest: PathBuf,
}

impl Workspace {
    async fn new(manifest: &str) -> Self {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().to_path_buf();
        let manifest_path = root.join("project/Contoso.Web.proj.yaml");
        write(&manifest_path, manifest).await;
        Self {
            _temp: temp,
            root,
            manifest: manifest_path,
        }
    }

    fn project_file(&self, name: &str) -> PathBuf {
        self.root.join("project").join(name)
    }

    fn step(&self, configs: &[&str]) -> TemplateInserterStep {
        TemplateInserterStep::new(
            &self.manifest,
            TemplateInserterOptions {
                template_config_files: configs.iter().map(PathBuf::from).collect(),
                base_dir: self.root.join("catalog"),
            },
        )
    }
}

#[tokio::test]
async fn startup_template_added_then_complete() {
    let ws = Workspace::new("properties:\n  AssemblyName: Contoso.Web\n").await;
    write(
        &ws.root.join("catalog/a.yaml"),
        "template_items:\n  - { type: Content, path: Startup.cs, include_explicitly: true, keywords: [] }\n",
    )
    .await;
    write(&ws.root.join("catalog/Startup.cs"), "public class Startup {}\n").await;

    let mut step = ws.step(&["a.yaml"]);
    let context = ProjectContext::new(&ws.manifest);
    let cancel = CancellationToken::new();

    let initial = step.initialize(&context, &cancel).await;
    assert_eq!(initial.status, StepStatus::Incomplete);
    assert!(initial.details.contains("Startup.cs"));

    let applied = step.apply(&context, &cancel).await;
    assert_eq!(applied.status, StepStatus::Complete);
    assert_eq!(read(&ws.project_file("Startup.cs")).await, "public class Startup {}\n");

    let project = Project::load(&ws.manifest).await.unwrap();
    let declared = project.declared_items();
    assert_eq!(declared.len(), 1);
    assert_eq!(declared[0].item_type, "Content");
    assert_eq!(declared[0].include(), "Startup.cs");

    let again = step.initialize(&context, &cancel).await;
    assert_eq!(again.status, StepStatus::Complete);
    assert_eq!(again.details, "All expected template items found");
}

#[tokio::test]
async fn existing_file_backed_up_with_next_free_name() {
    let ws = Workspace::new(
        "items:\n  - { type: Content, include: appsettings.json }\n  - { type: Content, include: appsettings.old.json }\n",
    )
    .await;
    write(&ws.project_file("appsettings.json"), "{ \"legacy\": true }").await;
    write(&ws.project_file("appsettings.old.json"), "{ \"older\": true }").await;
    write(
        &ws.root.join("catalog/a.yaml"),
        "template_items:\n  - { type: Content, path: appsettings.json, keywords: [Logging] }\n",
    )
    .await;
    write(&ws.root.join("catalog/appsettings.json"), "{ \"Logging\": {} }").await;

    let mut step = ws.step(&["a.yaml"]);
    let context = ProjectContext::new(&ws.manifest);
    let cancel = CancellationToken::new();

    // The existing file lacks the keyword, so it does not count
    assert_eq!(step.initialize(&context, &cancel).await.status, StepStatus::Incomplete);
    assert_eq!(step.apply(&context, &cancel).await.status, StepStatus::Complete);

    assert_eq!(read(&ws.project_file("appsettings.json")).await, "{ \"Logging\": {} }");
    assert_eq!(
        read(&ws.project_file("appsettings.old.0.json")).await,
        "{ \"legacy\": true }"
    );
    assert_eq!(
        read(&ws.project_file("appsettings.old.json")).await,
        "{ \"older\": true }"
    );

    let mut dir = fs::read_dir(ws.root.join("project")).await.unwrap();
    let mut backups = Vec::new();
    while let Some(entry) = dir.next_entry().await.unwrap() {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.contains(".old") {
            backups.push(name);
        }
    }
    backups.sort();
    assert_eq!(backups, ["appsettings.old.0.json", "appsettings.old.json"]);

    let project = Project::load(&ws.manifest).await.unwrap();
    let includes: Vec<_> = project
        .declared_items()
        .iter()
        .map(|i| i.include().to_string())
        .collect();
    // Not explicitly included, so the new file is not registered
    assert_eq!(includes, ["appsettings.old.0.json", "appsettings.old.json"]);

    // The default globs still make it part of the project
    let again = step.initialize(&context, &cancel).await;
    assert_eq!(again.status, StepStatus::Complete);
}

#[tokio::test]
async fn property_tokens_substituted_or_left_verbatim() {
    let ws = Workspace::new(
        "properties:\n  AssemblyName: Contoso.Web\n  RootNamespace: \"  \"\n",
    )
    .await;
    write(
        &ws.root.join("catalog/a.yaml"),
        "\
template_items:
  - { type: Compile, path: Program.cs, include_explicitly: true }
replacements:
  WebApplication1: $(AssemblyName)
  RootNamespace1: $(RootNamespace)
  CompanyName: Contoso
",
    )
    .await;
    write(
        &ws.root.join("catalog/Program.cs"),
        "// CompanyName\nnamespace WebApplication1.RootNamespace1 {}\n",
    )
    .await;

    let mut step = ws.step(&["a.yaml"]);
    let context = ProjectContext::new(&ws.manifest);
    let cancel = CancellationToken::new();

    step.initialize(&context, &cancel).await;
    step.apply(&context, &cancel).await;

    assert_eq!(
        read(&ws.project_file("Program.cs")).await,
        "// Contoso\nnamespace Contoso.Web.RootNamespace1 {}\n"
    );
}

#[tokio::test]
async fn run_step_drives_to_completion() {
    let ws = Workspace::new("").await;
    write(
        &ws.root.join("catalog/a.yaml"),
        "template_items:\n  - { type: Content, path: Web.config, include_explicitly: true }\n",
    )
    .await;
    write(&ws.root.join("catalog/Web.config"), "<configuration />").await;

    let mut step = ws.step(&["a.yaml"]);
    let context = ProjectContext::new(&ws.manifest);
    let input = NonInteractiveInput::new(Duration::ZERO);

    let result = run_step(&mut step, &context, &input, &CancellationToken::new()).await;

    assert_eq!(result.status, StepStatus::Complete);
    assert_eq!(context.reload_count(), 1);
    assert!(ws.project_file("Web.config").exists());
}

#[tokio::test]
async fn non_interactive_config_applies() {
    let ws = Workspace::new("").await;
    write(
        &ws.root.join("catalog/a.yaml"),
        "template_items:\n  - { type: Content, path: appsettings.json }\n",
    )
    .await;
    write(&ws.root.join("catalog/appsettings.json"), "{}").await;

    let mut config = MigratorConfig::new(&ws.manifest);
    config.template_config_files = vec![PathBuf::from("a.yaml")];
    config.base_dir = ws.root.join("catalog");
    config.non_interactive = true;
    config.non_interactive_wait = Duration::ZERO;

    let context = ProjectContext::new(&config.project_path);
    let mut step =
        TemplateInserterStep::new(&config.project_path, config.template_inserter_options());
    let input = config.user_input();
    let cancel = CancellationToken::new();

    assert!(input.wait_to_proceed(&cancel).await.unwrap());
    let result = run_step(&mut step, &context, input.as_ref(), &cancel).await;

    assert_eq!(result.status, StepStatus::Complete);
    assert_eq!(read(&ws.project_file("appsettings.json")).await, "{}");
}

#[tokio::test]
async fn last_choice_step_skips() {
    let ws = Workspace::new("").await;
    write(
        &ws.root.join("catalog/a.yaml"),
        "template_items:\n  - { type: Content, path: appsettings.json }\n",
    )
    .await;
    write(&ws.root.join("catalog/appsettings.json"), "{}").await;

    let mut step = ws.step(&["a.yaml"]);
    let context = ProjectContext::new(&ws.manifest);
    let input = NonInteractiveInput::new(Duration::ZERO)
        .with_preference(TEMPLATE_INSERTER_STEP_ID, SelectionPreference::Last);

    let result = run_step(&mut step, &context, &input, &CancellationToken::new()).await;

    assert_eq!(result.status, StepStatus::Incomplete);
    assert!(!ws.project_file("appsettings.json").exists());
}
