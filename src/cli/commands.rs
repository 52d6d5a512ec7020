//! Command dispatch and handlers

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, info_span, instrument, Instrument};
use uuid::Uuid;

use crate::application::services::{BuildPolicy, ResolveReport, TreeDocument};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::evidence::CATALOG;

/// Parameters of one `ask` run; unset fields fall back to settings.
#[derive(Debug, Clone, Default)]
pub struct AskRequest {
    pub question: String,
    pub depth: Option<usize>,
    pub output: Option<PathBuf>,
    pub partial: bool,
    pub skip_resolve: bool,
    pub concurrency: Option<usize>,
}

/// Result of `ask`: the saved document and where it went.
#[derive(Debug)]
pub struct AskOutcome {
    pub document: TreeDocument,
    /// `None` when resolution was skipped
    pub report: Option<ResolveReport>,
    pub output: PathBuf,
}

pub async fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Ask {
            question,
            depth,
            output,
            partial,
            skip_resolve,
            concurrency,
        }) => {
            let container = ServiceContainer::new(load_settings(cli)?)?;
            let request = AskRequest {
                question: question.clone(),
                depth: *depth,
                output: output.clone(),
                partial: *partial,
                skip_resolve: *skip_resolve,
                concurrency: concurrency.map(usize::from),
            };
            cmd_ask(&container, &request).await
        }
        Some(Commands::Show { file }) => cmd_show(file),
        Some(Commands::Tools) => {
            cmd_tools();
            Ok(())
        }
        Some(Commands::Config { command }) => cmd_config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::InvalidArgs(
            "no command given, see --help".to_string(),
        )),
    }
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let local_dir = cli
        .config_dir
        .clone()
        .or_else(|| std::env::current_dir().ok());
    Ok(Settings::load(local_dir.as_deref())?)
}

/// Build, resolve and save a question tree.
#[instrument(level = "debug", skip(container))]
pub async fn run_ask(container: &ServiceContainer, request: &AskRequest) -> CliResult<AskOutcome> {
    let tree_settings = &container.settings.tree;
    let depth = request.depth.unwrap_or(tree_settings.default_depth);
    let policy = if request.partial {
        BuildPolicy::Partial
    } else {
        tree_settings.build_policy
    };
    let concurrency = request.concurrency.unwrap_or(tree_settings.concurrency);
    let output = request
        .output
        .clone()
        .unwrap_or_else(|| tree_settings.output.clone());

    let span = info_span!("ask", run_id = %Uuid::new_v4(), depth);
    async {
        let mut tree = container.builder(policy).build(&request.question, depth).await?;
        let report = if request.skip_resolve {
            debug!("resolve skipped");
            None
        } else {
            Some(container.resolver(concurrency).resolve(&mut tree).await)
        };

        let document = TreeDocument::new(tree, depth);
        document.save(&output)?;
        Ok::<_, CliError>(AskOutcome {
            document,
            report,
            output,
        })
    }
    .instrument(span)
    .await
}

async fn cmd_ask(container: &ServiceContainer, request: &AskRequest) -> CliResult<()> {
    let outcome = run_ask(container, request).await?;
    let document = &outcome.document;

    output::info(&document.tree.to_display_tree());
    output::header("Nodes per level");
    output::detail(&output::format_level_counts(&document.level_counts));
    if !document.complete {
        output::warning("tree is incomplete: some nodes could not be expanded");
    }
    if let Some(report) = &outcome.report {
        if report.is_clean() {
            output::success(&output::format_report(report));
        } else {
            output::warning(&output::format_report(report));
        }
    }
    output::action("Saved", &outcome.output.display());
    Ok(())
}

fn cmd_show(file: &Path) -> CliResult<()> {
    let document = TreeDocument::load(file)?;
    output::header(&format!(
        "{} (depth {}, generated {})",
        document.question,
        document.max_depth,
        document.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));
    output::info(&document.tree.to_display_tree());
    output::detail(&output::format_level_counts(&document.level_counts));
    if !document.complete {
        output::warning("tree is incomplete: some nodes could not be expanded");
    }
    Ok(())
}

fn cmd_tools() {
    for op in CATALOG {
        let params = op.params.iter().map(|p| p.name).collect::<Vec<_>>();
        output::action(op.name, &format!("({})", params.join(", ")));
        output::detail(&op.description);
    }
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.redacted().to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("Global", &path.display()),
                None => output::warning("no config directory for this platform"),
            }
            let local_dir = cli
                .config_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from("."));
            output::action("Local", &local_config_path(&local_dir).display());
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}
