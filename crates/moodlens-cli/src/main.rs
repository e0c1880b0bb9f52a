use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use moodlens_store::Store;
use moodlensd::config::Config;
use moodlensd::engine;

#[derive(Parser)]
#[command(name = "moodlens", about = "MoodLens emotion recognition CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the face in a photo and classify its emotion
    Predict {
        /// Image file (JPEG, PNG, ...)
        image: PathBuf,
        /// Record the result in the history database
        #[arg(long)]
        save: bool,
        /// User to record the result under (default: the configured default user)
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Show recent analyses for a user
    History {
        #[arg(short, long)]
        user: Option<String>,
        /// Number of entries to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Create the database and the default user
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Predict { image, save, user } => {
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("failed to read {}", image.display()))?;

            let settings = config.engine_settings();
            let engine = tokio::task::spawn_blocking(move || engine::spawn_engine(settings))
                .await??;
            if !engine.model_loaded() {
                bail!(
                    "emotion model not loaded from {}",
                    config.classifier_model.display()
                );
            }

            let prediction = engine.predict(bytes).await?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);

            if save {
                let store = open_store(&config).await?;
                let username = user.unwrap_or_else(|| config.default_user.clone());
                let owner = store.get_or_create_user(&username).await?;
                let record = store.save_result(owner.id, &prediction, None).await?;
                println!("Saved as result {} for {}", record.id, owner.username);
            }
        }
        Commands::History { user, limit } => {
            let store = open_store(&config).await?;
            let username = user.unwrap_or_else(|| config.default_user.clone());
            let Some(owner) = store.find_user_by_name(&username).await? else {
                bail!("no such user: {username}");
            };

            let records = store.recent_results(owner.id, limit).await?;
            if records.is_empty() {
                println!("No analyses for {}", owner.username);
            }
            let now = Utc::now();
            for record in records {
                println!(
                    "{:>5}  {:<8} {:>6.2}%  {}",
                    record.id,
                    record.dominant_emotion.label(),
                    record.confidence,
                    record.time_ago(now)
                );
            }
        }
        Commands::Init => {
            open_store(&config).await?;
            println!("Database ready at {}", config.db_path.display());
        }
    }

    Ok(())
}

/// Open the configured database and make sure the schema and default user exist.
async fn open_store(config: &Config) -> Result<Store> {
    let store = Store::open(&config.db_path)
        .await
        .with_context(|| format!("failed to open database {}", config.db_path.display()))?
        .with_default_avatar(config.default_avatar_url.clone());
    let default_user = store.provision(&config.default_user).await?;
    tracing::debug!(user_id = default_user.id, "default user provisioned");
    Ok(store)
}
