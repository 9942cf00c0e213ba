use std::path::PathBuf;

use clap::{Parser, Subcommand};
use colored::Colorize;
use quizapp::{
    app,
    config::{CONFIG_FILE, prepare_config},
};

/// Terminal quiz client.
#[derive(Parser)]
#[command(name = "quizapp", version, about)]
struct Cli {
    /// Configuration file.
    #[arg(short, long, default_value = CONFIG_FILE)]
    config: PathBuf,
    /// Store file. Defaults to `storage.json` in the user data directory.
    #[arg(long)]
    store: Option<PathBuf>,
    /// User profile schema (json or toml). Defaults to the builtin schema.
    #[arg(long)]
    schema: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, PartialEq, Eq)]
enum Commands {
    /// Start the quiz (default).
    Run,
    /// Edit the configuration in a form.
    Config,
    /// Forget the saved profile and page.
    Reset,
    /// Print the saved store entries.
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run);

    let config = prepare_config(&cli.config, command == Commands::Config).await?;
    let data_dir = app::data_dir()?;
    let store_path = cli.store.unwrap_or_else(|| data_dir.join("storage.json"));
    app::init_logging(config.log_level.into(), &data_dir.join("quizapp.log"))?;

    match command {
        Commands::Run => {
            let schema = app::user_schema(cli.schema.as_deref())?;
            app::run_quiz(&config, schema, store_path).await?;
        }
        Commands::Config => {
            println!(
                "{}",
                format!("Configuration file: {}", cli.config.display()).green()
            );
        }
        Commands::Reset => {
            app::reset(&store_path)?;
            println!(
                "{}",
                format!("Cleared saved profile in {}", store_path.display()).green()
            );
        }
        Commands::Show => {
            let entries = app::show(&store_path)?;
            if entries.is_empty() {
                println!("{}", "Nothing saved yet".yellow());
            }
            for (key, value) in entries {
                println!("{}: {value}", key.bold());
            }
        }
    }
    Ok(())
}
