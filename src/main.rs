mod config;
mod db;
mod error;
mod extract;
mod fetch;
mod registry;
mod render;
mod sources;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::{info, warn};

use crate::config::Settings;
use crate::extract::{mcpdir, SourceDocument};
use crate::registry::{aggregate, canonical, KeyPolicy};
use crate::sources::Extracted;

#[derive(Parser)]
#[command(
    name = "mcp_registry",
    about = "Aggregate MCP server listings into one deduplicated registry"
)]
struct Cli {
    /// Config file (default: ./mcp-registry.{toml,json,yaml} when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// SQLite store path (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract awesome-list READMEs from the directories root
    Scan,
    /// Extract mcpdir's pulsemcp-slugs.json export
    Mcpdir,
    /// Fetch and extract web registries
    Scrape,
    /// Deduplicate stored candidates and write the index + JSON export
    Dedupe {
        /// Only key GitHub repositories; drop everything else
        #[arg(long)]
        strict: bool,
    },
    /// scan + mcpdir + scrape + dedupe
    Run {
        #[arg(long)]
        strict: bool,
    },
    /// Print the canonical key for a URL
    Canon {
        url: String,
        /// Require a GitHub repository key
        #[arg(long)]
        strict: bool,
    },
    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(db) = cli.db {
        settings.db_path = db;
    }

    let result = match cli.command {
        Commands::Scan => {
            let conn = open_store(&settings)?;
            let docs = sources::scan_directories(&settings.directories_root)?;
            if docs.is_empty() {
                println!(
                    "No awesome-list READMEs under {}.",
                    settings.directories_root.display()
                );
                return Ok(());
            }
            let n = collect(&conn, &docs)?;
            println!("Stored {} entries from {} lists.", n, docs.len());
            Ok(())
        }
        Commands::Mcpdir => {
            let conn = open_store(&settings)?;
            let Some(doc) = sources::read_mcpdir(&settings.mcpdir_export()) else {
                println!(
                    "mcpdir export not found. Check out eL1fe/mcpdir at {}.",
                    settings.mcpdir_path.display()
                );
                return Ok(());
            };
            let n = collect(&conn, std::slice::from_ref(&doc))?;
            println!("Stored {} entries from mcpdir.", n);

            match mcpdir::servers(&doc.body, &doc.source_id) {
                Ok(servers) => {
                    let path = render::write_mcpdir_index(&servers, &settings.output_dir)?;
                    println!("Generated mcpdir index: {}", path.display());
                }
                Err(e) => warn!("No mcpdir index written: {:#}", e),
            }
            Ok(())
        }
        Commands::Scrape => {
            let conn = open_store(&settings)?;
            let docs = fetch::fetch_registries(&settings, settings.registries.clone()).await?;
            let extracted = sources::extract_documents(&docs);
            let n = store(&conn, &extracted)?;
            println!("Stored {} entries from {} registries.", n, docs.len());

            let path = render::write_url_list(
                extracted.iter().flat_map(|e| &e.records),
                &settings.output_dir,
            )?;
            println!("URL list: {}", path.display());
            Ok(())
        }
        Commands::Dedupe { strict } => {
            let conn = open_store(&settings)?;
            dedupe(&conn, &settings, policy(strict))
        }
        Commands::Run { strict } => {
            let conn = open_store(&settings)?;

            let t_collect = Instant::now();
            let mut docs = match sources::scan_directories(&settings.directories_root) {
                Ok(docs) => docs,
                Err(e) => {
                    warn!("Skipping awesome lists: {:#}", e);
                    Vec::new()
                }
            };
            docs.extend(sources::read_mcpdir(&settings.mcpdir_export()));
            docs.extend(fetch::fetch_registries(&settings, settings.registries.clone()).await?);
            let n = collect(&conn, &docs)?;
            println!(
                "Collected {} entries from {} sources in {:.1}s",
                n,
                docs.len(),
                t_collect.elapsed().as_secs_f64()
            );

            dedupe(&conn, &settings, policy(strict))
        }
        Commands::Canon { url, strict } => {
            if strict {
                let key = canonical::github_key(&url)?;
                println!("{}", key);
            } else {
                match canonical::canonicalize(&url) {
                    Some(key) => println!("{}", key),
                    None => println!("(no key)"),
                }
            }
            Ok(())
        }
        Commands::Stats => {
            let conn = open_store(&settings)?;
            let s = db::get_stats(&conn)?;
            println!("Candidates: {}", s.candidates);
            println!("Sources:    {}", s.sources);
            println!("Servers:    {}", s.servers);
            for (source, count) in &s.per_source {
                println!("  {:<32} {:>6}", truncate(source, 32), count);
            }

            let mut servers = db::fetch_servers(&conn)?;
            servers.retain(|r| r.popularity.is_some());
            servers.sort_by(|a, b| b.popularity.cmp(&a.popularity));
            if !servers.is_empty() {
                println!("\n--- Most popular ---");
                for r in servers.iter().take(10) {
                    println!(
                        "  {:<32} {:>7}  {}",
                        truncate(&r.name, 32),
                        r.popularity.unwrap_or_default(),
                        r.url
                    );
                }
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn policy(strict: bool) -> KeyPolicy {
    if strict {
        KeyPolicy::StrictGitHub
    } else {
        KeyPolicy::Lenient
    }
}

fn open_store(settings: &Settings) -> Result<Connection> {
    let conn = db::connect(&settings.db_path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

/// Extract documents and store each source's candidates, replacing earlier runs.
fn collect(conn: &Connection, docs: &[SourceDocument]) -> Result<usize> {
    store(conn, &sources::extract_documents(docs))
}

fn store(conn: &Connection, extracted: &[Extracted]) -> Result<usize> {
    let mut stored = 0;
    for e in extracted {
        stored += db::replace_candidates(conn, &e.source_id, &e.records)?;
    }
    Ok(stored)
}

fn dedupe(conn: &Connection, settings: &Settings, policy: KeyPolicy) -> Result<()> {
    let candidates = db::fetch_candidates(conn)?;
    if candidates.is_empty() {
        println!("No candidates stored. Run 'scan', 'mcpdir' or 'scrape' first.");
        return Ok(());
    }

    let (registry, summary) = aggregate(&candidates, policy);
    info!(?policy, ?summary, "Aggregated candidates");

    db::save_registry(conn, &registry)?;
    let (index, json) = render::write_outputs(&registry, &settings.output_dir)?;

    println!("Total entries before deduplication: {}", summary.candidates);
    println!("Dropped (no canonical key):         {}", summary.dropped);
    println!("Unique servers after deduplication: {}", summary.unique);
    println!("Generated index: {}", index.display());
    println!("Generated JSON:  {}", json.display());
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
