use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use dealflow::config::Config;
use dealflow::errors::ApiError;

mod cmd;

#[derive(Parser)]
#[command(name = "dealflow")]
#[command(version, about = "Sales pipeline CRM client: kanban board, records and statistics")]
pub struct Cli {
    /// Debug logging to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// CRM service base URL, e.g. http://localhost:3000/api. Overrides DEALFLOW_API_URL and dealflow.toml.
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create .dealflow/ with a default dealflow.toml
    Init,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Sign in and store the session token
    Login {
        #[arg(long, env = "DEALFLOW_EMAIL")]
        email: Option<String>,
        #[arg(long, env = "DEALFLOW_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show the pipeline board
    Board,
    /// Move a deal to another stage
    Move {
        /// Deal id
        deal: i64,
        /// Stage name, `column-<Stage>`, another deal's id, or `deal-<id>`
        target: String,
    },
    /// List, show, create or delete deals
    Deals {
        #[command(subcommand)]
        command: DealsCommands,
    },
    /// List, show, create or delete clients
    Clients {
        #[command(subcommand)]
        command: ClientsCommands,
    },
    /// Payment milestones of a deal
    Payments {
        #[command(subcommand)]
        command: PaymentsCommands,
    },
    /// Stage history of a deal
    History { deal: i64 },
    /// Action items of a deal
    Actions {
        #[command(subcommand)]
        command: ActionsCommands,
    },
    /// Manage user accounts
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Pipeline statistics
    Stats {
        /// Also sum pending payment milestones across all deals
        #[arg(long)]
        payments: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show resolved configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

#[derive(Subcommand, Clone)]
pub enum DealsCommands {
    List,
    Show {
        id: i64,
    },
    Create {
        /// Client id
        #[arg(long)]
        client: Option<i64>,
        /// Sales rep user id
        #[arg(long)]
        sales_rep: Option<i64>,
        #[arg(long, default_value = "Lead")]
        stage: String,
        /// Estimated value
        #[arg(long)]
        value: Option<String>,
        /// Win probability in percent (0-100)
        #[arg(long)]
        probability: Option<String>,
        /// Expected close date, YYYY-MM-DD
        #[arg(long)]
        close: Option<String>,
    },
    /// Change fields of a deal; fields not given stay as they are
    Update {
        id: i64,
        #[arg(long)]
        client: Option<i64>,
        #[arg(long)]
        sales_rep: Option<i64>,
        #[arg(long)]
        stage: Option<String>,
        #[arg(long)]
        value: Option<String>,
        /// Win probability in percent (0-100)
        #[arg(long)]
        probability: Option<String>,
        /// Expected close date, YYYY-MM-DD
        #[arg(long)]
        close: Option<String>,
        /// Date the deal was won, YYYY-MM-DD
        #[arg(long)]
        won_on: Option<String>,
        /// Date the deal was lost, YYYY-MM-DD
        #[arg(long)]
        lost_on: Option<String>,
    },
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum ClientsCommands {
    List,
    Show {
        id: i64,
    },
    Create {
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        board_id: Option<String>,
    },
    /// Change fields of a client; fields not given stay as they are
    Update {
        id: i64,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        contact: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Empty string clears the phone number
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        board_id: Option<String>,
    },
    Delete {
        id: i64,
        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand, Clone)]
pub enum PaymentsCommands {
    List {
        deal: i64,
    },
    Add {
        deal: i64,
        /// Milestone name
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
        /// pending or paid
        #[arg(long, default_value = "pending")]
        status: String,
        /// Paid-on date, YYYY-MM-DD (defaults to today for paid milestones)
        #[arg(long)]
        paid_on: Option<String>,
    },
    /// Mark a milestone paid
    MarkPaid {
        payment: i64,
        /// Paid-on date, YYYY-MM-DD (defaults to today)
        #[arg(long)]
        on: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ActionsCommands {
    List {
        deal: i64,
    },
    Add {
        deal: i64,
        #[arg(long)]
        description: Option<String>,
        /// Owner user id
        #[arg(long)]
        owner: Option<i64>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum UsersCommands {
    List,
    Create {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// owner, admin or sales_rep
        #[arg(long)]
        role: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "dealflow=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// True when any error in the chain is a rejected session.
fn session_expired(err: &anyhow::Error) -> bool {
    err.chain()
        .any(|e| e.downcast_ref::<ApiError>().is_some_and(ApiError::is_unauthorized))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    if let Err(err) = run(&cli, project_dir).await {
        if session_expired(&err) {
            eprintln!("Your session has expired or is invalid. Run `dealflow login` to sign in again.");
            std::process::exit(1);
        }
        return Err(err);
    }
    Ok(())
}

async fn run(cli: &Cli, project_dir: PathBuf) -> Result<()> {
    let config = || -> Result<Config> {
        let config = Config::new(project_dir.clone(), cli.verbose, cli.api_url.clone())?;
        tracing::debug!(base_url = %config.base_url, "resolved configuration");
        Ok(config)
    };

    match &cli.command {
        Commands::Init => cmd::cmd_init(&project_dir, cli.api_url.as_deref())?,
        Commands::Config { command } => cmd::cmd_config(&project_dir, cli, command.clone())?,
        Commands::Login { email, password } => {
            cmd::cmd_login(&config()?, email.clone(), password.clone()).await?
        }
        Commands::Logout => cmd::cmd_logout(&config()?)?,
        Commands::Board => cmd::cmd_board(&config()?).await?,
        Commands::Move { deal, target } => cmd::cmd_move(&config()?, *deal, target).await?,
        Commands::Deals { command } => cmd::cmd_deals(&config()?, command.clone()).await?,
        Commands::Clients { command } => cmd::cmd_clients(&config()?, command.clone()).await?,
        Commands::Payments { command } => {
            cmd::cmd_payments(&config()?, command.clone()).await?
        }
        Commands::History { deal } => cmd::cmd_history(&config()?, *deal).await?,
        Commands::Actions { command } => cmd::cmd_actions(&config()?, command.clone()).await?,
        Commands::Users { command } => cmd::cmd_users(&config()?, command.clone()).await?,
        Commands::Stats { payments } => cmd::cmd_stats(&config()?, *payments).await?,
    }
    Ok(())
}
