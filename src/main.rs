use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use recipe_api::{actions::users::create_superuser, config::Config, routes::routes, state::State};
use tokio::signal;

#[derive(Parser)]
#[command(name = "recipe-api")]
#[command(version, about = "REST backend for recipes, tags and ingredients", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migrations and serve the API (default)
    Serve,
    /// Apply pending database migrations
    Migrate,
    /// Create an account with staff and superuser rights
    CreateSuperuser {
        #[arg(long)]
        email: String,
        #[arg(long, env = "SUPERUSER_PASSWORD")]
        password: String,
        #[arg(long, default_value = "")]
        name: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let state = State::connect(config)
        .await
        .context("Failed to connect to the database")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            state.migrate().await?;
            serve(state).await
        }
        Commands::Migrate => Ok(state.migrate().await?),
        Commands::CreateSuperuser {
            email,
            password,
            name,
        } => {
            state.migrate().await?;
            let user = create_superuser(&email, &password, &name, &state.pool).await?;
            println!("Superuser {} created", user.email);
            Ok(())
        }
    }
}

async fn serve(state: State) -> Result<()> {
    let address = state.config.address;

    let (address, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())
        .with_context(|| format!("Failed to bind to {address}"))?;
    info!("Server running on {address}");

    server.await;
    info!("Server shut down");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
