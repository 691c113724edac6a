use crate::args::{Cli, Commands, ConfigCommand, OutputFormat};
use crate::presentation;
use anyhow::{Context, Result};
use corex_sdk::{Client, EventPayload, ModelProvider, OrchestratorConfig};
use std::io::Write;
use std::path::PathBuf;

pub async fn run(cli: Cli) -> Result<()> {
    let workspace = resolve_workspace(cli.workspace)?;

    match cli.command {
        Commands::Run { goal, mock, auto_approve } => run_goal(workspace, cli.format, goal, mock, auto_approve).await,
        Commands::Config { command } => config_command(workspace, command),
    }
}

fn resolve_workspace(explicit: Option<PathBuf>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path),
        None => Ok(corex_core::resolve_workspace_path(None)?),
    }
}

async fn run_goal(workspace: PathBuf, format: OutputFormat, goal: String, mock: bool, auto_approve: bool) -> Result<()> {
    let config = OrchestratorConfig::load_from(&workspace.join("config.toml")).unwrap_or_default();

    let mut builder = Client::builder().workspace_root(workspace).config(config.clone());
    builder = if mock {
        builder.provider(ModelProvider::Mock(Default::default()))
    } else {
        let endpoint = config.require_model().context("no model endpoint configured; run `corex config init` first or pass --mock")?;
        builder.provider(ModelProvider::Anthropic(endpoint.clone()))
    };

    let client = builder.build().await.context("failed to initialize runtime")?;
    let mut handle = client.run(goal);

    while let Some(event) = handle.recv().await {
        if let EventPayload::ConfirmRequired { request_id, .. } = &event.payload {
            presentation::render(&event, format);
            let approved = if auto_approve { true } else { prompt_confirm()? };
            handle.confirm(request_id, approved).await;
            continue;
        }
        presentation::render(&event, format);
        if matches!(event.payload, EventPayload::Done { .. }) {
            break;
        }
    }

    Ok(())
}

fn prompt_confirm() -> Result<bool> {
    print!("approve? [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn config_command(workspace: PathBuf, command: ConfigCommand) -> Result<()> {
    let path = workspace.join("config.toml");
    match command {
        ConfigCommand::Show => {
            let config = OrchestratorConfig::load_from(&path).unwrap_or_default();
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigCommand::Init => {
            let config = OrchestratorConfig::default();
            config.save_to(&path)?;
            println!("wrote defaults to {}", path.display());
        }
    }
    Ok(())
}
