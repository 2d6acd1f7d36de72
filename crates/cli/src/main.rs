use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::App;
use shelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Book catalog server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Apply pending migrations and exit
    Migrate,
    /// Load and print the effective configuration
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load shelf settings")?;
    shelf_telemetry::init(&settings.telemetry)?;

    let command = cli.command.unwrap_or(Command::Serve);
    tracing::info!(
        command = ?command,
        env = ?settings.environment,
        "shelf cli starting"
    );

    match command {
        Command::Serve => App::new(settings)?.serve().await,
        Command::Migrate => {
            let app = App::new(settings)?;
            let applied = app.migrate().await?;
            println!("applied {} migration(s)", applied);
            Ok(())
        }
        Command::CheckConfig => {
            println!("environment: {:?}", settings.environment);
            println!(
                "listen: {}:{}",
                settings.server.host, settings.server.port
            );
            println!(
                "database: {:?} at {}",
                settings.database.backend,
                settings.database.path.display()
            );
            println!("log format: {:?}", settings.telemetry.log_format);
            println!("categories: {}", settings.catalog.categories.len());
            Ok(())
        }
    }
}
