//! Command-line interface definitions.
//!
//! `install` runs the interactive wizard, `render` replays an answers file
//! without prompting, and the remaining commands drive an installed stack.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use super::paths;
use crate::domain::service::ServiceKind;

/// Hardware-aware installer for a self-hosted AI workflow stack
#[derive(Parser, Debug)]
#[command(name = "stackforge")]
#[command(version)]
pub struct Cli {
    /// Color output mode [auto, always, never]
    #[arg(
        long,
        global = true,
        default_value = "auto",
        hide_possible_values = true
    )]
    pub color: ColorChoice,

    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase output verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Color output mode for terminal rendering.
#[derive(Clone, Debug, Default, clap::ValueEnum)]
pub enum ColorChoice {
    /// Detect automatically
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Walk through an install interactively and write the stack
    Install(InstallArgs),

    /// Write the stack from an answers file without prompting
    Render(RenderArgs),

    /// Show detected hardware
    Detect(ConfigPathArg),

    /// Show the resource plan for this host
    Plan(PlanArgs),

    /// Start the stack
    Up(StackArgs),

    /// Stop the stack
    Down(StackArgs),

    /// Restart one service
    Restart(ServiceArgs),

    /// Show service logs
    Logs(LogsArgs),

    /// Show container state
    Status(StackArgs),

    /// Check for newer image tags and apply them
    Update(UpdateArgs),

    /// List registry tags for a service image
    Versions(VersionsArgs),
}

impl Commands {
    /// Answers file named by the command, if it takes one.
    #[must_use]
    pub fn config_path(&self) -> Option<&Path> {
        let path = match self {
            Self::Install(args) => &args.stack.config.config,
            Self::Render(args) => &args.stack.config.config,
            Self::Up(args)
            | Self::Down(args)
            | Self::Status(args) => &args.config.config,
            Self::Detect(args) => &args.config,
            Self::Plan(args) => &args.config.config,
            Self::Restart(args) => &args.stack.config.config,
            Self::Logs(args) => &args.stack.config.config,
            Self::Update(args) => &args.stack.config.config,
            Self::Versions(_) => return None,
        };
        Some(path)
    }
}

/// Answers file location.
#[derive(Args, Debug, Clone)]
pub struct ConfigPathArg {
    /// Answers file
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,
}

/// Answers file plus install directory.
#[derive(Args, Debug, Clone)]
pub struct StackArgs {
    #[command(flatten)]
    pub config: ConfigPathArg,

    /// Directory holding the generated artifacts
    #[arg(short, long)]
    pub dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct InstallArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Start the stack after writing it
    #[arg(long)]
    pub start: bool,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Write even when planning or routing raised warnings
    #[arg(short, long, visible_alias = "accept-warnings")]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigPathArg,

    /// Run the model runner on the CPU even if a GPU is present
    #[arg(long)]
    pub force_cpu: bool,

    /// Leave an optional service out (repeatable)
    #[arg(long = "disable", value_name = "SERVICE", value_parser = parse_service)]
    pub disabled: Vec<ServiceKind>,
}

#[derive(Args, Debug, Clone)]
pub struct ServiceArgs {
    /// Service name, e.g. workflow-engine or n8n
    #[arg(value_parser = parse_service)]
    pub service: ServiceKind,

    #[command(flatten)]
    pub stack: StackArgs,
}

#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    /// Service name, e.g. workflow-engine or n8n
    #[arg(value_parser = parse_service)]
    pub service: ServiceKind,

    /// Keep streaming new lines
    #[arg(short, long)]
    pub follow: bool,

    /// Number of lines to show from the end
    #[arg(short = 'n', long)]
    pub tail: Option<u32>,

    #[command(flatten)]
    pub stack: StackArgs,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    #[command(flatten)]
    pub stack: StackArgs,

    /// Only report available updates
    #[arg(long, conflicts_with = "yes")]
    pub check: bool,

    /// Apply every available update without prompting
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args, Debug, Clone)]
pub struct VersionsArgs {
    /// Service name, e.g. workflow-engine or n8n
    #[arg(value_parser = parse_service)]
    pub service: ServiceKind,

    /// Show at most this many tags
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

fn parse_service(value: &str) -> Result<ServiceKind, String> {
    value.parse().map_err(|e: crate::domain::error::DomainError| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags() {
        let cli = Cli::try_parse_from(["stackforge", "-q", "--json", "-vv", "status"]).unwrap();
        assert!(cli.quiet);
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.color, ColorChoice::Auto));
    }

    #[test]
    fn parses_color_never() {
        let cli = Cli::try_parse_from(["stackforge", "--color", "never", "detect"]).unwrap();
        assert!(matches!(cli.color, ColorChoice::Never));
    }

    #[test]
    fn render_takes_config_and_dir() {
        let cli = Cli::try_parse_from([
            "stackforge",
            "render",
            "--config",
            "answers.toml",
            "--dir",
            "/srv/stack",
        ])
        .unwrap();
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert_eq!(args.stack.config.config, PathBuf::from("answers.toml"));
        assert_eq!(args.stack.dir, Some(PathBuf::from("/srv/stack")));
        assert!(!args.yes);
    }

    #[test]
    fn render_accepts_warnings_alias() {
        let cli = Cli::try_parse_from(["stackforge", "render", "--accept-warnings"]).unwrap();
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };
        assert!(args.yes);
    }

    #[test]
    fn config_defaults_under_home() {
        let cli = Cli::try_parse_from(["stackforge", "up"]).unwrap();
        let Commands::Up(args) = cli.command else {
            panic!("expected up");
        };
        assert_eq!(args.config.config, paths::default_config());
        assert!(args.dir.is_none());
    }

    #[test]
    fn logs_accepts_product_alias() {
        let cli = Cli::try_parse_from(["stackforge", "logs", "n8n", "-f", "-n", "50"]).unwrap();
        let Commands::Logs(args) = cli.command else {
            panic!("expected logs");
        };
        assert_eq!(args.service, ServiceKind::WorkflowEngine);
        assert!(args.follow);
        assert_eq!(args.tail, Some(50));
    }

    #[test]
    fn unknown_service_is_rejected() {
        assert!(Cli::try_parse_from(["stackforge", "restart", "redis"]).is_err());
    }

    #[test]
    fn plan_collects_disabled_services() {
        let cli = Cli::try_parse_from([
            "stackforge",
            "plan",
            "--disable",
            "ollama",
            "--disable",
            "langflow",
            "--force-cpu",
        ])
        .unwrap();
        let Commands::Plan(args) = cli.command else {
            panic!("expected plan");
        };
        assert!(args.force_cpu);
        assert_eq!(
            args.disabled,
            vec![ServiceKind::ModelRunner, ServiceKind::FlowBuilder]
        );
    }

    #[test]
    fn config_path_follows_command() {
        let cli = Cli::try_parse_from(["stackforge", "logs", "proxy", "-c", "a.toml"]).unwrap();
        assert_eq!(cli.command.config_path(), Some(Path::new("a.toml")));
        let cli = Cli::try_parse_from(["stackforge", "versions", "ollama"]).unwrap();
        assert_eq!(cli.command.config_path(), None);
    }

    #[test]
    fn update_check_conflicts_with_yes() {
        assert!(Cli::try_parse_from(["stackforge", "update", "--check", "--yes"]).is_err());
    }
}
