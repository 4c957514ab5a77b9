use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::json;
use shortener::{
    config::{self, logger},
    domain::{
        error::{DomainError, ErrorKind},
        models::{Actor, Role, UserId},
    },
    fs::content::ContentDir,
    postgres::db::DB,
    usecase::{about::AboutUsecase, url::URLUsecase},
};

/// Short link administration against the configured Postgres store.
#[derive(Parser, Debug)]
#[command(name = "shortener")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Copy)]
struct ActorArgs {
    /// Id of the acting user
    #[arg(long)]
    user: UserId,

    /// Role of the acting user (user, admin, superadmin)
    #[arg(long, default_value = "user")]
    role: Role,
}

impl From<ActorArgs> for Actor {
    fn from(args: ActorArgs) -> Self {
        Actor::new(args.user, args.role)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect and create missing tables
    Init,

    #[command(flatten)]
    Link(LinkCommands),

    /// Read or edit the about page
    #[command(subcommand)]
    About(AboutCommands),
}

#[derive(Subcommand, Debug)]
enum LinkCommands {
    /// Issue a short code for a long URL
    Shorten {
        url: String,
        #[command(flatten)]
        actor: ActorArgs,
    },

    /// Print the long URL behind a code
    Resolve { code: String },

    /// Show one shortened URL
    Show { id: i64 },

    /// List all shortened URLs
    #[command(alias = "ls")]
    List,

    /// Delete a shortened URL (owner or admin)
    Delete {
        id: i64,
        #[command(flatten)]
        actor: ActorArgs,
    },
}

#[derive(Subcommand, Debug)]
enum AboutCommands {
    /// Print the about page
    Show,

    /// Replace the about page content (admin only)
    Set {
        /// New content
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        content: Option<String>,

        /// Read new content from a file
        #[arg(long)]
        file: Option<PathBuf>,

        #[command(flatten)]
        actor: ActorArgs,
    },
}

/// sysexits(3) codes.
fn exit_code(kind: ErrorKind) -> ExitCode {
    ExitCode::from(match kind {
        ErrorKind::InvalidInput | ErrorKind::Conflict => 65,
        ErrorKind::NotFound => 66,
        ErrorKind::Forbidden => 77,
        ErrorKind::Unavailable => 75,
        ErrorKind::Internal => 70,
    })
}

/// Output of `resolve`.
#[derive(Serialize, Debug)]
struct Resolved {
    long_url: String,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

enum Failure {
    Domain(DomainError),
    Other(anyhow::Error),
}

impl From<DomainError> for Failure {
    fn from(e: DomainError) -> Self {
        Failure::Domain(e)
    }
}

impl From<anyhow::Error> for Failure {
    fn from(e: anyhow::Error) -> Self {
        Failure::Other(e)
    }
}

async fn run_link(command: LinkCommands, urls: URLUsecase<DB>) -> Result<(), Failure> {
    match command {
        LinkCommands::Shorten { url, actor } => {
            print_json(&urls.shorten(&mut OsRng, &url, &actor.into()).await?)?
        }
        LinkCommands::Resolve { code } => {
            let long_url = urls.resolve(&code).await?;
            print_json(&Resolved { long_url })?
        }
        LinkCommands::Show { id } => print_json(&urls.get(id).await?)?,
        LinkCommands::List => print_json(&urls.list().await?)?,
        LinkCommands::Delete { id, actor } => urls.delete(id, &actor.into()).await?,
    }
    Ok(())
}

async fn run_about(
    command: AboutCommands,
    about: AboutUsecase<DB, ContentDir>,
) -> Result<(), Failure> {
    match command {
        AboutCommands::Show => print_json(&about.get().await?)?,
        AboutCommands::Set {
            content,
            file,
            actor,
        } => {
            let content = match (content, file) {
                (Some(content), _) => content,
                (None, Some(path)) => std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read {}", path.display()))?,
                (None, None) => {
                    return Err(DomainError::Validation("Content is required.".into()).into());
                }
            };
            about.update(&actor.into(), &content).await?;
        }
    }
    Ok(())
}

async fn run(cli: Cli, cfg: config::Config) -> Result<(), Failure> {
    let db = DB::new(cfg.postgres).await?;

    match cli.command {
        Commands::Init => {
            tracing::info!("Database is ready");
            Ok(())
        }
        Commands::Link(command) => run_link(command, URLUsecase::new(db, cfg.shortener)?).await,
        Commands::About(command) => {
            run_about(command, AboutUsecase::new(db, ContentDir::new(cfg.about))).await
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg = match config::load() {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("Failed to load configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };
    logger::init(&cfg.logger);
    tracing::debug!(config = ?cfg, "Configuration loaded successfully");

    match run(cli, cfg).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(Failure::Domain(err)) => {
            let kind = err.kind();
            if matches!(kind, ErrorKind::Internal | ErrorKind::Unavailable) {
                tracing::error!(error = ?err, "Command failed");
            }
            eprintln!("{}", json!({ "message": err.to_string() }));
            exit_code(kind)
        }
        Err(Failure::Other(err)) => {
            tracing::error!(error = ?err, "Command failed");
            eprintln!("{}", json!({ "message": format!("{err:#}") }));
            ExitCode::FAILURE
        }
    }
}
