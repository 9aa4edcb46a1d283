mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use immutant_core::BootstrapGateway;
use immutant_core::config::{self, InstallConfig};
use tracing_subscriber::EnvFilter;

use cmd::{cmd_config, cmd_deploy, cmd_deps, cmd_descriptor, cmd_invoke, cmd_resources};
use output::{OutputFormat, print_error};

/// immutant - Bootstrap, mount and run Lua applications
#[derive(Parser)]
#[command(name = "immutant")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  /// Output format
  #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
  output: OutputFormat,

  /// Local artifact repository (default: $IMMUTANT_REPOSITORY or ~/.m2/repository)
  #[arg(long, global = true)]
  repository: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Print a deployment descriptor as parsed by the bootstrap runtime
  Descriptor {
    /// Path to the descriptor
    file: PathBuf,
  },

  /// Print an application's full configuration as JSON
  Config {
    /// Path to the descriptor
    descriptor: PathBuf,

    /// Application root (default: the root named by the descriptor)
    #[arg(long)]
    root: Option<PathBuf>,
  },

  /// List an application's resource directories in order
  Resources {
    /// Application root
    root: PathBuf,

    /// Activate a profile (repeatable)
    #[arg(short, long = "profile")]
    profiles: Vec<String>,
  },

  /// List the archives an application depends on
  Deps {
    /// Application root
    root: PathBuf,

    /// Only use archives already present in the application's lib directory
    #[arg(long)]
    offline: bool,

    /// Activate a profile (repeatable)
    #[arg(short, long = "profile")]
    profiles: Vec<String>,
  },

  /// Mount an application's dependencies and report the result
  Deploy {
    /// Path to the descriptor
    descriptor: PathBuf,

    /// Installation root (default: $IMMUTANT_HOME, $JBOSS_HOME or the current directory)
    #[arg(long)]
    install_root: Option<PathBuf>,

    /// Leave the mounted archives in place instead of undeploying
    #[arg(long)]
    keep: bool,
  },

  /// Call a function in a fresh managed runtime
  Invoke {
    /// Qualified function name, e.g. app.handler/greet
    function: String,

    /// Module root to load code from (repeatable)
    #[arg(long = "root")]
    roots: Vec<PathBuf>,

    /// Arguments, each as JSON
    args: Vec<String>,
  },
}

fn init_logging(verbose: bool) {
  let default_level = if verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();
}

fn main() {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  if let Err(e) = run(cli) {
    print_error(&format!("{:#}", e));
    std::process::exit(1);
  }
}

fn run(cli: Cli) -> Result<()> {
  let repository = cli.repository.unwrap_or_else(config::repository_dir);
  let format = cli.output;

  match cli.command {
    Commands::Descriptor { file } => cmd_descriptor(&BootstrapGateway::with_repository(repository), &file),
    Commands::Config { descriptor, root } => {
      cmd_config(&BootstrapGateway::with_repository(repository), &descriptor, root)
    }
    Commands::Resources { root, profiles } => {
      cmd_resources(&BootstrapGateway::with_repository(repository), &root, &profiles, format)
    }
    Commands::Deps {
      root,
      offline,
      profiles,
    } => cmd_deps(
      &BootstrapGateway::with_repository(repository),
      &root,
      offline,
      &profiles,
      format,
    ),
    Commands::Deploy {
      descriptor,
      install_root,
      keep,
    } => {
      let install = InstallConfig::from_env().with_repository(repository);
      let install = match install_root {
        Some(root) => install.with_install_root(root),
        None => install,
      };
      cmd_deploy(&descriptor, install, keep, format)
    }
    Commands::Invoke { function, roots, args } => cmd_invoke(&function, roots, &args),
  }
}
