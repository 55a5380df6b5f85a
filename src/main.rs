use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use wpm::ops;
use wpm::runner;

/// wpm - wsx package manager
///
/// Fetches packages named in a remote registry, unpacks them into the
/// project's ws_packages/ directory, tracks installed metadata, and runs
/// package modules through the wsx interpreter.
///
/// The registry URL is taken from --registry, the WPM_REGISTRY environment
/// variable, the wpackage.json "registry" field, or a built-in default, in
/// that order.
///
/// Examples:
///   wpm install mathlib   # Install one package from the registry
///   wpm get               # Install everything wpackage.json lists
///   wpm run draw          # Run the "draw" module of an installed package
#[derive(Parser, Debug)]
#[command(author, version = env!("WPM_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root directory (overrides the current directory; also via WPM_ROOT)
    #[arg(
        long = "root",
        short = 'r',
        env = "WPM_ROOT",
        value_name = "PATH",
        global = true
    )]
    pub root: Option<PathBuf>,

    /// Registry mapping URL (overrides WPM_REGISTRY and the manifest)
    #[arg(long = "registry", value_name = "URL", global = true)]
    pub registry: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch the registry mapping and rewrite the local cache
    Refresh,

    /// Install a package from the registry
    Install(PackageArgs),

    /// Update an installed package when the registry version differs
    Update(PackageArgs),

    /// Remove an installed package
    #[command(visible_aliases = ["remove", "rm"])]
    Uninstall(PackageArgs),

    /// List installed packages
    #[command(visible_alias = "ls")]
    List,

    /// Install or update every package wpackage.json lists
    Get,

    /// Run a package module through the wsx interpreter
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
pub struct PackageArgs {
    /// The package name as listed in the registry
    #[arg(value_name = "NAME")]
    pub name: String,
}

#[derive(clap::Args, Debug)]
pub struct RunArgs {
    /// Module name declared in a package's assignment.json
    #[arg(value_name = "MODULE")]
    pub module: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let runtime = wpm::runtime::RealRuntime;

    match cli.command {
        Commands::Refresh => ops::refresh(runtime, cli.root, cli.registry).await?,
        Commands::Install(args) => {
            ops::install(runtime, &args.name, cli.root, cli.registry).await?
        }
        Commands::Update(args) => ops::update(runtime, &args.name, cli.root, cli.registry).await?,
        Commands::Uninstall(args) => ops::uninstall(runtime, &args.name, cli.root)?,
        Commands::List => ops::list(runtime, cli.root)?,
        Commands::Get => ops::sync(runtime, cli.root, cli.registry).await?,
        Commands::Run(args) => {
            let code = runner::run_module(runtime, &args.module, cli.root)?;
            std::process::exit(code);
        }
    }
    Ok(())
}
