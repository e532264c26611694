// ============================================================================
// shopkeeper - GM command line for campaign shops
// ============================================================================
// Usage:
//   shopkeeper serve [--port 5174]            Run the LAN campaign server
//   shopkeeper pull | push                    Sync the local campaign
//   shopkeeper push-location <id>             Push one location's rules
//   shopkeeper preview <location-id>          Show a location's inventory
//   shopkeeper import <file> | export         Catalog packs
//   shopkeeper stats                          Local database statistics
// ============================================================================

use anyhow::{anyhow, bail, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use shop_core::presets::{pricing_profile, pricing_profiles, LEGAL_STATUSES, VEGAS_TAG_POOL};
use shop_core::rules::edits;
use shop_core::{
    export_catalog, parse_catalog_pack, CampaignDb, CampaignServer, CampaignStore,
    HttpCampaignRemote, PullOutcome, RuntimeConfig, SyncController, LOCAL_SNAPSHOT_KEY,
    SERVER_DOCUMENT_KEY,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Campaign shop manager
#[derive(Parser)]
#[command(name = "shopkeeper", version, about = "Manage and sync campaign shops")]
struct Cli {
    /// Path to the local database file (default: ~/.shopkeeper/campaign.redb)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Campaign server base URL (default: http://127.0.0.1:{port})
    #[arg(long, global = true)]
    server: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the campaign document server
    Serve {
        #[arg(long)]
        port: Option<u16>,

        /// Server database file (default: ~/.shopkeeper/server.redb)
        #[arg(long)]
        server_db_path: Option<PathBuf>,
    },

    /// Replace the local campaign with the server copy
    Pull,

    /// Overwrite the server copy with the local campaign
    Push,

    /// Push one location's rules without touching other locations
    PushLocation { location_id: String },

    /// Show the rule-based inventory of a location
    Preview { location_id: String },

    /// Add a location to the active setting
    AddLocation { name: String },

    RemoveLocation { location_id: String },

    /// Rename a location of the active setting
    RenameLocation { location_id: String, name: String },

    /// Create a setting and make it active
    AddSetting { name: String },

    /// Switch the active setting
    UseSetting { setting_id: String },

    /// Set a location's markup percentage
    SetMarkup { location_id: String, percent: f64 },

    /// Pin or unpin an item at a location
    TogglePin { location_id: String, item_id: String },

    /// Ban or unban an item at a location
    ToggleBan { location_id: String, item_id: String },

    /// Toggle an include tag (or exclude tag with --exclude)
    ToggleTag {
        location_id: String,
        tag: String,
        #[arg(long)]
        exclude: bool,
    },

    /// Toggle an include category
    ToggleCategory { location_id: String, category: String },

    /// Toggle an allowed legal status
    ToggleLegal { location_id: String, status: String },

    /// Set or clear (no price) a manual price override
    SetPrice {
        location_id: String,
        item_id: String,
        price: Option<f64>,
    },

    /// Select a pricing profile preset
    SetProfile { location_id: String, profile_id: String },

    /// List pricing profiles, legal statuses and known tags
    Vocab,

    /// Import a catalog pack into the active setting
    Import { file: PathBuf },

    /// Export the active setting's catalog as a pack
    Export {
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Show database and campaign statistics
    Stats,
}

fn format_timestamp(ts: i64) -> String {
    Utc.timestamp_opt(ts, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("(invalid: {})", ts))
}

#[tokio::main]
async fn main() -> Result<()> {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Warning: Could not load .env file: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shopkeeper=info".parse()?)
                .add_directive("shop_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let mut config = RuntimeConfig::from_env();
    if let Some(path) = cli.db_path {
        config.db_path = Some(path);
    }
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    match cli.command {
        Commands::Serve {
            port,
            server_db_path,
        } => {
            if let Some(port) = port {
                config.port = port;
            }
            if server_db_path.is_some() {
                config.server_db_path = server_db_path;
            }
            cmd_serve(config).await
        }
        command => run_local(command, &config).await,
    }
}

/// Commands that work on the local campaign snapshot
async fn run_local(command: Commands, config: &RuntimeConfig) -> Result<()> {
    let db = CampaignDb::open(config.db_path.as_deref())?;
    let mut store = CampaignStore::from_snapshot(db.read_document(LOCAL_SNAPSHOT_KEY)?.as_ref());

    match command {
        Commands::Serve { .. } => bail!("serve does not run against the local campaign"),
        Commands::Pull => cmd_pull(&db, &mut store, config).await,
        Commands::Push => cmd_push(&mut store, config).await,
        Commands::PushLocation { location_id } => {
            cmd_push_location(&mut store, config, &location_id).await
        }
        Commands::Preview { location_id } => cmd_preview(&store, &location_id),
        Commands::AddLocation { name } => {
            let id = store.add_location(&name);
            println!("Added location {}", id);
            save(&db, &store)
        }
        Commands::RemoveLocation { location_id } => {
            if !store.remove_location(&location_id) {
                bail!("Location not found in the active setting: {}", location_id);
            }
            println!("Removed location {}", location_id);
            save(&db, &store)
        }
        Commands::RenameLocation { location_id, name } => {
            cmd_rename_location(&db, &mut store, &location_id, &name)
        }
        Commands::AddSetting { name } => {
            let id = store.add_setting(&name);
            println!("Added setting {} (now active)", id);
            save(&db, &store)
        }
        Commands::UseSetting { setting_id } => {
            if !store.set_active_setting(&setting_id) {
                bail!("Unknown setting: {}", setting_id);
            }
            println!("Active setting: {}", store.active_setting().name);
            save(&db, &store)
        }
        Commands::SetMarkup {
            location_id,
            percent,
        } => edit_rules(&db, &mut store, &location_id, |rules| {
            edits::with_markup(rules, percent)
        }),
        Commands::TogglePin {
            location_id,
            item_id,
        } => edit_rules(&db, &mut store, &location_id, |rules| {
            edits::toggle_pin(rules, &item_id)
        }),
        Commands::ToggleBan {
            location_id,
            item_id,
        } => edit_rules(&db, &mut store, &location_id, |rules| {
            edits::toggle_ban(rules, &item_id)
        }),
        Commands::ToggleTag {
            location_id,
            tag,
            exclude,
        } => edit_rules(&db, &mut store, &location_id, |rules| {
            if exclude {
                edits::toggle_exclude_tag(rules, &tag)
            } else {
                edits::toggle_include_tag(rules, &tag)
            }
        }),
        Commands::ToggleCategory {
            location_id,
            category,
        } => edit_rules(&db, &mut store, &location_id, |rules| {
            edits::toggle_include_category(rules, &category)
        }),
        Commands::ToggleLegal {
            location_id,
            status,
        } => {
            if !LEGAL_STATUSES.contains(&status.as_str()) {
                bail!(
                    "Unknown legal status '{}'. Valid values: {}",
                    status,
                    LEGAL_STATUSES.join(", ")
                );
            }
            edit_rules(&db, &mut store, &location_id, |rules| {
                edits::toggle_legal_status(rules, &status)
            })
        }
        Commands::SetPrice {
            location_id,
            item_id,
            price,
        } => edit_rules(&db, &mut store, &location_id, |rules| {
            edits::with_price_override(rules, &item_id, price)
        }),
        Commands::SetProfile {
            location_id,
            profile_id,
        } => {
            let profile = pricing_profile(&profile_id)
                .ok_or_else(|| anyhow!("Unknown pricing profile: {}", profile_id))?;
            edit_rules(&db, &mut store, &location_id, |rules| {
                edits::with_pricing_profile(rules, profile)
            })
        }
        Commands::Vocab => cmd_vocab(&store),
        Commands::Import { file } => cmd_import(&db, &mut store, &file),
        Commands::Export { out } => cmd_export(&store, out),
        Commands::Stats => cmd_stats(&db, &store),
    }
}

fn save(db: &CampaignDb, store: &CampaignStore) -> Result<()> {
    let snapshot = store
        .snapshot()
        .map_err(|e| anyhow!("Failed to serialize campaign: {}", e))?;
    db.write_document(LOCAL_SNAPSHOT_KEY, &snapshot)
}

fn controller(config: &RuntimeConfig) -> SyncController<HttpCampaignRemote> {
    SyncController::new(HttpCampaignRemote::new(config.server_url.clone()))
}

async fn cmd_serve(config: RuntimeConfig) -> Result<()> {
    let db = Arc::new(CampaignDb::open_server(config.server_db_path.as_deref())?);
    let server = CampaignServer::new(db.document(SERVER_DOCUMENT_KEY));

    tokio::task::spawn_blocking(move || server.serve(&config))
        .await
        .map_err(|e| anyhow!("Server thread panicked: {}", e))?
}

async fn cmd_pull(db: &CampaignDb, store: &mut CampaignStore, config: &RuntimeConfig) -> Result<()> {
    match controller(config).pull(store).await {
        PullOutcome::Applied => {
            save(db, store)?;
            println!(
                "Pulled {} locations from {}",
                store.campaign().location_count(),
                config.server_url
            );
            Ok(())
        }
        PullOutcome::KeptLocal => {
            println!("{}", store.sync_error().unwrap_or("Local data kept"));
            Ok(())
        }
        PullOutcome::Failed => bail!("{}", store.sync_error().unwrap_or("Pull failed")),
    }
}

async fn cmd_push(store: &mut CampaignStore, config: &RuntimeConfig) -> Result<()> {
    if !controller(config).push_all(store).await {
        bail!("{}", store.sync_error().unwrap_or("Push failed"));
    }
    println!("Pushed campaign to {}", config.server_url);
    Ok(())
}

async fn cmd_push_location(
    store: &mut CampaignStore,
    config: &RuntimeConfig,
    location_id: &str,
) -> Result<()> {
    if !controller(config).push_location(store, location_id).await {
        bail!("{}", store.sync_error().unwrap_or("Push failed"));
    }
    println!("Pushed location {} to {}", location_id, config.server_url);
    Ok(())
}

fn cmd_preview(store: &CampaignStore, location_id: &str) -> Result<()> {
    let location = store
        .location(location_id)
        .ok_or_else(|| anyhow!("Location not found in the active setting: {}", location_id))?;
    let items = store.preview_location(location_id).unwrap_or_default();

    println!("=== {} ({}) ===", location.name, store.active_setting().name);
    if items.is_empty() {
        println!("No items. Add include rules or pin items.");
        return Ok(());
    }

    println!("{:<28} {:<28} {:>10} {:>10}  {}", "ID", "NAME", "BASE", "PRICE", "SOURCE");
    println!("{}", "-".repeat(90));
    for item in &items {
        println!(
            "{:<28} {:<28} {:>10.2} {:>10.2}  {:?}",
            item.id, item.name, item.base_price, item.final_price, item.source
        );
    }
    println!();
    println!("{} items", items.len());
    Ok(())
}

fn cmd_rename_location(
    db: &CampaignDb,
    store: &mut CampaignStore,
    location_id: &str,
    name: &str,
) -> Result<()> {
    if name.trim().is_empty() {
        bail!("Location name cannot be blank");
    }
    if !store.rename_location(location_id, name) {
        bail!("Location not found in the active setting: {}", location_id);
    }
    println!("Renamed {} to {}", location_id, name.trim());
    save(db, store)
}

fn edit_rules<F>(db: &CampaignDb, store: &mut CampaignStore, location_id: &str, edit: F) -> Result<()>
where
    F: FnOnce(shop_core::RuleConfig) -> shop_core::RuleConfig,
{
    if !store.set_location_rules(location_id, edit) {
        bail!("Location not found in the active setting: {}", location_id);
    }
    info!("Rules updated for {}", location_id);
    save(db, store)
}

fn cmd_vocab(store: &CampaignStore) -> Result<()> {
    println!("Pricing profiles:");
    for profile in pricing_profiles() {
        let modifiers: Vec<String> = profile
            .category_modifiers
            .iter()
            .map(|(category, pct)| format!("{} {:+}%", category, pct))
            .collect();
        println!("  {:14} {}", profile.id, modifiers.join(", "));
    }
    println!("Legal statuses: {}", LEGAL_STATUSES.join(", "));

    // Tags in use across the active catalog, plus the built-in pool
    let mut tags: Vec<&str> = VEGAS_TAG_POOL.to_vec();
    for item in &store.active_setting().catalog {
        for tag in &item.tags {
            if !tags.contains(&tag.as_str()) {
                tags.push(tag);
            }
        }
    }
    println!("Tags: {}", tags.join(", "));
    Ok(())
}

fn cmd_import(db: &CampaignDb, store: &mut CampaignStore, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .map_err(|e| anyhow!("Failed to read {}: {}", file.display(), e))?;
    let pack = parse_catalog_pack(&text).map_err(|e| {
        warn!("Import of {} rejected: {}", file.display(), e.detail);
        anyhow!("{}", e)
    })?;

    let merged = store.import_catalog(pack.items);
    println!("Imported {} items into {}", merged, store.active_setting().name);
    save(db, store)
}

fn cmd_export(store: &CampaignStore, out: Option<PathBuf>) -> Result<()> {
    let pack = export_catalog(store.active_setting());
    let mut document = serde_json::to_value(&pack)?;
    if let Value::Object(map) = &mut document {
        map.insert("exportedAt".into(), Value::String(Utc::now().to_rfc3339()));
    }
    let text = serde_json::to_string_pretty(&document)?;

    match out {
        Some(path) => {
            std::fs::write(&path, text)
                .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;
            println!("Exported {} items to {}", pack.items.len(), path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn cmd_stats(db: &CampaignDb, store: &CampaignStore) -> Result<()> {
    let stats = db.stats()?;
    let campaign = store.campaign();

    println!("=== Shopkeeper Database Stats ===");
    println!("Database: {}", db.path().display());
    println!();
    for doc in &stats.documents {
        let updated = doc
            .updated_at
            .map(format_timestamp)
            .unwrap_or_else(|| "-".to_string());
        println!("  {:16} {:>10} bytes  {}", doc.key, doc.bytes, updated);
    }
    println!("Total:    {} bytes", stats.total_bytes);
    println!();
    println!("Settings: {}", campaign.settings.len());
    for setting in &campaign.settings {
        let marker = if setting.id == campaign.active_setting_id { "*" } else { " " };
        println!(
            " {} {:20} {:>4} items  {:>3} locations",
            marker,
            setting.name,
            setting.catalog.len(),
            setting.locations.len()
        );
    }

    Ok(())
}
