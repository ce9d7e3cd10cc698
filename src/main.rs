use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hwmod::core::{DirectoryResolver, ModuleRequest, Orchestrator, create_gateway};
use hwmod::{config, context, logging};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "hwmod")]
#[command(about = "Hardware module downloader", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download and install a module, printing its config as JSON
    Fetch(FetchArgs),
    /// Print the resolved directory layout
    Paths(ConfigArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Module name
    name: String,
    /// Module version
    version: String,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args, Serialize)]
struct ConfigArgs {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    module_resource_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    module_root: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[arg(long)]
    json_logs: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Commands::Fetch(args) => {
            let config = config::AppConfig::new(Some(&args.config))?;
            config.validate()?;
            logging::init(logging::LogConfig::from(&config));
            run_fetch(context::AppContext::new(config), args)
                .await
                .context("Failed to download hardware module")?
        }
        Commands::Paths(args) => {
            let config = config::AppConfig::new(Some(args))?;
            run_paths(context::AppContext::new(config));
        }
    }

    Ok(())
}

async fn run_fetch(ctx: context::AppContext, args: &FetchArgs) -> Result<()> {
    let encryption = create_gateway(&ctx.config.encryption_command)
        .context("encryption_command is not configured")?;
    let request = ModuleRequest::new(args.name.clone(), args.version.clone());

    let config = Orchestrator::new(ctx)
        .acquire(&request, encryption.as_ref())
        .await?;

    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

fn run_paths(ctx: context::AppContext) {
    let dirs = &ctx.directories;
    println!("module root:    {}", dirs.module_root().display());
    println!("modules:        {}", dirs.modules().display());
    println!("block modules:  {}", dirs.block_modules().display());
}
