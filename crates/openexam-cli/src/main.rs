//! OpenExam CLI: manage slides and generated cheatsheets.
//!
//! Set OPENEXAM_API_URL and OPENEXAM_ACCESS_TOKEN (and OPENEXAM_USER_ID for
//! sharing). Uses bearer-token auth.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use openexam_api_client::ApiClient;
use openexam_cli::{init_tracing, render_groups};
use openexam_core::{group_files_by_date, ClientConfig};
use openexam_sync::{
    EventBus, FileActions, FileStore, NoticeLevel, ShareRoster, StoreConfig, UploadSource,
    UploadSummary,
};
use serde::Serialize;

#[derive(Parser)]
#[command(name = "openexam", about = "OpenExam slides and cheatsheets CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List files grouped by upload date
    List {
        /// Print JSON instead of grouped text
        #[arg(long)]
        json: bool,
    },
    /// Upload up to 10 PDF slides
    Upload {
        /// Paths to the PDF files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Generate a cheatsheet from uploaded slides
    Generate {
        /// Ids of the source slides
        #[arg(required = true)]
        file_ids: Vec<String>,
        /// Wait until the cheatsheet shows up in the file list
        #[arg(long)]
        wait: bool,
    },
    /// Delete a file by storage key
    Delete {
        /// Storage key, e.g. slides/12/ab12cd_lecture.pdf
        key: String,
    },
    /// Download a file by storage key
    Download {
        key: String,
        /// Output path (defaults to the file name from the key)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Show who a file is shared with
    Shares {
        file_id: String,
    },
    /// Share a file with another user
    Share {
        file_id: String,
        /// Numeric id of the user to share with
        user_id: String,
    },
    /// Revoke another user's access to a file
    Unshare {
        file_id: String,
        user_id: String,
    },
    /// Keep the file list up to date and print it whenever it changes
    Watch,
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    config.validate()?;
    let client = Arc::new(ApiClient::from_config(&config).context(
        "Failed to create API client. Set OPENEXAM_API_URL and OPENEXAM_ACCESS_TOKEN",
    )?);

    let cli = Cli::parse();

    let bus = EventBus::new();
    let store = FileStore::new(client.clone(), StoreConfig::from(&config));
    let actions = FileActions::new(client.clone(), store.clone(), bus.clone(), &config);

    match cli.command {
        Commands::List { json } => {
            store.refresh().await?;
            let groups = group_files_by_date(&store.view(), chrono::Utc::now());
            if json {
                print_json(&groups)?;
            } else {
                print!("{}", render_groups(&groups));
            }
        }
        Commands::Upload { files } => {
            let mut sources = Vec::with_capacity(files.len());
            for path in &files {
                let source = UploadSource::from_path(path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                sources.push(source);
            }
            let report = actions.upload_files(sources).await?;
            print_json(&UploadSummary::from(&report))?;
            if !report.is_complete() {
                anyhow::bail!("{} of the files failed to upload", report.failed.len());
            }
        }
        Commands::Generate { file_ids, wait } => {
            let generated = actions.generate(&file_ids).await?;
            let confirmed = if wait {
                Some(
                    actions
                        .wait_for_generated(&generated, config.poll_interval)
                        .await?,
                )
            } else {
                None
            };
            print_json(&serde_json::json!({
                "file_id": generated.id,
                "key": generated.key,
                "listed": confirmed,
            }))?;
        }
        Commands::Delete { key } => {
            actions.delete(&key).await?;
            print_json(
                &serde_json::json!({ "success": true, "message": format!("{} deleted", key) }),
            )?;
        }
        Commands::Download { key, output } => {
            let data = client.download_file(&key).await?;
            let path = match output {
                Some(path) => path,
                None => PathBuf::from(key.rsplit('/').next().unwrap_or(key.as_str())),
            };
            tokio::fs::write(&path, &data)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_json(&serde_json::json!({
                "key": key,
                "path": path.display().to_string(),
                "bytes": data.len(),
            }))?;
        }
        Commands::Shares { file_id } => {
            let roster = load_roster(&client, &store, &file_id, &config, &bus).await?;
            print_json(&roster.users())?;
        }
        Commands::Share { file_id, user_id } => {
            let mut roster = load_roster(&client, &store, &file_id, &config, &bus).await?;
            roster.share(&user_id).await?;
            print_json(&roster.users())?;
        }
        Commands::Unshare { file_id, user_id } => {
            let mut roster = load_roster(&client, &store, &file_id, &config, &bus).await?;
            roster.unshare(&user_id).await?;
            print_json(&roster.users())?;
        }
        Commands::Watch => watch(store.clone(), &bus, &config).await?,
    }

    store.shutdown();
    bus.shutdown().await;
    Ok(())
}

async fn load_roster(
    client: &Arc<ApiClient>,
    store: &Arc<FileStore>,
    file_id: &str,
    config: &ClientConfig,
    bus: &EventBus,
) -> anyhow::Result<ShareRoster> {
    let user_id = config.require_user_id()?;
    let roster = ShareRoster::load(client.clone(), file_id, user_id, config)
        .await
        .with_context(|| format!("Failed to load file {}", file_id))?;
    Ok(roster.with_bus(bus.clone()).with_notices(store.clone()))
}

/// Poll the listing and print the grouped view on every change until Ctrl-C.
async fn watch(
    store: Arc<FileStore>,
    bus: &EventBus,
    config: &ClientConfig,
) -> anyhow::Result<()> {
    let _subscription = store.attach(bus).await;
    let mut views = store.subscribe_view();
    let mut notices = store.subscribe_notices();
    let mut ticker = tokio::time::interval(config.poll_interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    tracing::info!(
        poll_secs = config.poll_interval.as_secs(),
        "Watching files, press Ctrl-C to stop"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => store.request_refresh(),
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                print!("{}", render_groups(&group_files_by_date(&view, chrono::Utc::now())));
                println!();
            }
            notice = notices.recv() => {
                if let Ok(notice) = notice {
                    if notice.level == NoticeLevel::Error {
                        eprintln!("error: {}", notice.message);
                    }
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Stopping watch");
                break;
            }
        }
    }
    Ok(())
}
