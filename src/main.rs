use std::process::ExitCode;

use atom_connect::navigation::{self, dashboard_for, panel_label};
use atom_connect::{AuthSnapshot, ClientConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] atom_connect::config::ConfigError),
    #[error(transparent)]
    Gateway(#[from] atom_connect::GatewayError),
    #[error("sign-in failed: {0}")]
    SignIn(#[from] atom_connect::SignInError),
}

#[derive(Parser, Debug)]
#[command(name = "atom-connect", about = "Atom Connect session client")]
struct Cli {
    /// Identity server root; overrides `ATOM_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore the saved session and show who is signed in.
    Status,
    /// Sign in with email and password.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ATOM_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign out and forget the saved session.
    Logout,
    /// Show the screens reachable with the current session.
    Routes,
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        let overridden = ClientConfig::new(base_url)?;
        config.base_url = overridden.base_url;
    }
    tracing::debug!(base_url = %config.base_url, "starting session client");

    let manager = atom_connect::start(config).await?;

    match cli.command {
        Command::Status => print_status(&manager.snapshot()),
        Command::Login { email, password } => {
            manager.sign_in(&email, &password).await?;
            print_status(&manager.snapshot());
        }
        Command::Logout => {
            manager.sign_out().await;
            println!("signed out");
        }
        Command::Routes => {
            let snapshot = manager.snapshot();
            for route in navigation::reachable_routes(&snapshot) {
                println!("{:<10} {}", route.title(), route.path());
            }
            for path in navigation::default_paths(&snapshot) {
                println!("default  {path}");
            }
        }
    }
    Ok(())
}

fn print_status(snapshot: &AuthSnapshot) {
    match (&snapshot.user, navigation::initial_route(snapshot)) {
        (Some(user), Some(route)) if snapshot.is_authenticated() => {
            let dashboard = dashboard_for(user.role);
            println!("{}", dashboard.greeting(user));
            println!("signed in as {} ({})", user.email, panel_label(user.role));
            println!("start screen: {} ({})", route.title(), dashboard.path());
        }
        (_, Some(route)) => {
            println!("not signed in");
            println!("start screen: {}", route.title());
        }
        (_, None) => println!("session still loading"),
    }
}
