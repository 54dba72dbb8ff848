use clap::Parser;
use tokio::signal;
use tracing::{debug, info};

use stackforge::adapter::inbound::cli::command::{Cli, ColorChoice, Commands};
use stackforge::adapter::inbound::cli::output::{self, OutputConfig};
use stackforge::adapter::inbound::cli::{detect, install, plan, render, service, update};
use stackforge::error::{Error, Result};
use stackforge::infrastructure::config::logging::LoggingConfig;
use stackforge::infrastructure::config::settings::Config;

async fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Install(args) => install::execute(&args).await,
        Commands::Render(args) => render::execute(&args),
        Commands::Detect(args) => detect::execute(&args),
        Commands::Plan(args) => plan::execute(&args),
        Commands::Up(args) => service::up(&args).await,
        Commands::Down(args) => service::down(&args).await,
        Commands::Restart(args) => service::restart(&args).await,
        Commands::Logs(args) => service::logs(&args).await,
        Commands::Status(args) => service::status(&args).await,
        Commands::Update(args) => update::execute(&args).await,
        Commands::Versions(args) => update::versions(&args).await,
    }
}

fn report(err: &Error) {
    if output::is_json() {
        match err {
            Error::PlanInfeasible(issues) | Error::InputInvalid(issues) => {
                let errors: Vec<_> = issues.iter().filter(|i| i.is_error()).cloned().collect();
                output::issues(&errors);
            }
            Error::WarningsUnacknowledged(issues) => output::issues(issues),
            _ => {}
        }
    }
    output::error(&err.to_string());
}

fn init_logging(cli: &Cli) {
    // The handler reports a broken answers file; logging just falls back.
    let file = cli
        .command
        .config_path()
        .filter(|path| path.exists())
        .and_then(|path| Config::load(path).ok())
        .and_then(|config| config.logging);
    let mut logging = LoggingConfig::resolve(file.as_ref(), cli.quiet, cli.verbose);
    if cli.json && file.is_none() {
        logging.format = "json".into();
    }
    logging.init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {}
    }
    output::configure(OutputConfig::new(cli.json, cli.quiet));
    init_logging(&cli);
    debug!(command = ?cli.command, "Starting");

    tokio::select! {
        result = dispatch(cli.command) => {
            if let Err(e) = result {
                report(&e);
                std::process::exit(1);
            }
        }
        _ = signal::ctrl_c() => {
            info!("Interrupted");
            output::warning("Interrupted");
            std::process::exit(130);
        }
    }
}
