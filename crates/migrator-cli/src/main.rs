//! migrator CLI - Upgrade a legacy project in place, one step at a time

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use migrator_core::steps::TemplateInserterStep;
use migrator_core::{run_step, CancellationToken, MigratorConfig, ProjectContext, StepStatus};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "migrator")]
#[command(about = "Upgrade a legacy project in place by running migration steps")]
#[command(version)]
pub struct Args {
    /// Project manifest to migrate
    pub project: PathBuf,

    /// Template configuration file (repeatable; later files override earlier ones)
    #[arg(short, long = "template-config")]
    pub template_configs: Vec<PathBuf>,

    /// Directory relative template configuration paths are resolved against
    /// (defaults to the executable's directory)
    #[arg(long = "base-dir")]
    pub base_dir: Option<PathBuf>,

    /// Answer prompts automatically (non-interactive mode)
    #[arg(short = 'y', long = "non-interactive")]
    pub non_interactive: bool,

    /// Seconds to pause before proceeding in non-interactive mode
    #[arg(long = "wait")]
    pub wait: Option<u64>,

    /// Step id for which non-interactive mode picks the last option
    /// instead of the first (repeatable)
    #[arg(long = "last-choice-step")]
    pub last_choice_steps: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    fn into_config(self) -> MigratorConfig {
        let mut config = MigratorConfig::from_env(self.project);
        if !self.template_configs.is_empty() {
            config.template_config_files = self.template_configs;
        }
        if let Some(base_dir) = self.base_dir {
            config.base_dir = base_dir;
        }
        if let Some(wait) = self.wait {
            config.non_interactive_wait = Duration::from_secs(wait);
        }
        config.non_interactive = self.non_interactive;
        config.last_choice_steps = self.last_choice_steps;
        config
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    let args = Args::parse();
    init_logging(args.verbose);
    let config = args.into_config();

    // Ctrl+C cancels between file operations instead of killing mid-write
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        handler_token.cancel();
    })
    .ok();

    let context = ProjectContext::new(&config.project_path);
    let mut step =
        TemplateInserterStep::new(&config.project_path, config.template_inserter_options());
    let input = config.user_input();

    println!(
        "{} {}",
        "Migrating".cyan().bold(),
        config.project_path.display()
    );

    if !input.wait_to_proceed(&cancel).await? {
        println!("{}", "Migration cancelled.".yellow());
        return Ok(());
    }

    let result = run_step(&mut step, &context, input.as_ref(), &cancel).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    match result.status {
        StepStatus::Complete => {
            println!("{} {}", "Complete:".green().bold(), result.details);
            Ok(())
        }
        StepStatus::Incomplete => {
            println!("{} {}", "Incomplete:".yellow().bold(), result.details);
            Ok(())
        }
        StepStatus::Failed => anyhow::bail!("{}", result.details),
    }
}
