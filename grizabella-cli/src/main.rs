use clap::Parser;
use grizabella_cli::commands::Commands;
use grizabella_cli::context::GrizabellaCliContext;
use grizabella_cli::handlers;
use grizabella_cli::output::{self, OutputFormat};
use tracing::error;

#[derive(Parser)]
#[command(name = "grizabella-cli")]
#[command(about = "Command-line interface for the Grizabella tri-store knowledge engine", long_about = None)]
#[command(version = grizabella_core::VERSION)]
struct Cli {
    /// Custom data directory for storage; falls back to GRIZABELLA_DB_PATH
    /// and then the per-user default.
    #[arg(long, global = true)]
    data_dir: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        let name = cmd.get_name().to_string();
        clap_complete::generate(*shell, &mut cmd, name, &mut std::io::stdout());
        return std::process::ExitCode::SUCCESS;
    }

    let ctx = match GrizabellaCliContext::new(cli.data_dir).await {
        Ok(ctx) => ctx,
        Err(e) => {
            output::output_error(&e.to_string(), cli.output);
            return std::process::ExitCode::FAILURE;
        }
    };

    let result = dispatch(&ctx, cli.command, cli.output).await;
    ctx.close().await;

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(e) => {
            output::output_error(&e.to_string(), cli.output);
            error!(error = %e, "command failed");
            std::process::ExitCode::FAILURE
        }
    }
}

async fn dispatch(ctx: &GrizabellaCliContext, command: Commands, format: OutputFormat) -> grizabella_core::error::Result<()> {
    match command {
        Commands::ObjectType(cmd) => handlers::object_type::handle(ctx, cmd, format).await,
        Commands::RelationType(cmd) => handlers::relation_type::handle(ctx, cmd, format).await,
        Commands::EmbeddingDefinition(cmd) => handlers::embedding_definition::handle(ctx, cmd, format).await,
        Commands::Object(cmd) => handlers::object::handle(ctx, cmd, format).await,
        Commands::Relation(cmd) => handlers::relation::handle(ctx, cmd, format).await,
        Commands::Query(cmd) => handlers::query::handle(ctx, cmd, format).await,
        Commands::Completions { .. } => unreachable!("handled before context construction"),
    }
}
