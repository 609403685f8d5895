//! Hafalan CLI
//!
//! Command-line client for a running Hafalan API server:
//! - Check server status
//! - List kaca and santri
//! - Show progress, dashboards and ayat locks
//! - Export progress as CSV

use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "hafalan-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Client for the Hafalan memorization tracker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API server URL
    #[arg(long, default_value = "http://localhost:8080", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show server status
    Status,

    /// List kaca
    Kaca {
        /// Only kaca in this juz
        #[arg(short, long)]
        juz: Option<u32>,
        /// Page size
        #[arg(short, long, default_value = "100")]
        limit: u32,
    },

    /// List santri
    Santri {
        /// Only santri taught by this guru
        #[arg(short, long)]
        guru: Option<i64>,
        /// Page size
        #[arg(short, long, default_value = "100")]
        limit: u32,
    },

    /// Show progress of one santri
    Progress {
        /// Santri id
        santri_id: i64,
    },

    /// Show counters and top santri
    Dashboard {
        /// Number of top santri
        #[arg(short, long, default_value = "5")]
        top: usize,
    },

    /// Show ayat locks of a santri on one kaca
    Locks {
        /// Santri id
        santri_id: i64,
        /// Kaca id
        kaca_id: i64,
    },

    /// Export progress as CSV
    Export {
        /// Only santri taught by this guru
        #[arg(short, long)]
        guru: Option<i64>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let json_output = cli.format == "json";

    match cli.command {
        Commands::Status => {
            let response = client.get(format!("{}/health", cli.api_url)).send().await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let health: Value = resp.json().await?;

                    if json_output {
                        println!("{}", serde_json::to_string_pretty(&health)?);
                        return Ok(());
                    }

                    println!(
                        "Hafalan {}",
                        health["version"].as_str().unwrap_or(env!("CARGO_PKG_VERSION"))
                    );
                    println!();
                    println!(
                        "API Status: {}",
                        health["status"].as_str().unwrap_or("unknown")
                    );
                    println!(
                        "Database:   {}",
                        health["database"].as_str().unwrap_or("unknown")
                    );
                    if let Some(uptime) = health["uptime_seconds"].as_u64() {
                        println!("Uptime:     {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("API returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to Hafalan API at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the Hafalan API server is running:");
                    eprintln!("  cargo run --bin hafalan");
                    std::process::exit(1);
                }
            }
        }

        Commands::Kaca { juz, limit } => {
            let mut url = format!("{}/api/kaca?limit={}", cli.api_url, limit);
            if let Some(juz) = juz {
                url.push_str(&format!("&juz={}", juz));
            }
            let page = get_json(&client, &url).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_kaca_table(&page);
            }
        }

        Commands::Santri { guru, limit } => {
            let mut url = format!("{}/api/santri?limit={}", cli.api_url, limit);
            if let Some(guru) = guru {
                url.push_str(&format!("&guru_id={}", guru));
            }
            let page = get_json(&client, &url).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&page)?);
            } else {
                print_santri_table(&page);
            }
        }

        Commands::Progress { santri_id } => {
            let url = format!("{}/api/reports/santri/{}", cli.api_url, santri_id);
            let progress = get_json(&client, &url).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&progress)?);
            } else {
                print_progress(&progress);
            }
        }

        Commands::Dashboard { top } => {
            let url = format!("{}/api/reports/dashboard?top={}", cli.api_url, top);
            let dashboard = get_json(&client, &url).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&dashboard)?);
            } else {
                print_dashboard(&dashboard);
            }
        }

        Commands::Locks { santri_id, kaca_id } => {
            let url = format!(
                "{}/api/santri/{}/kaca/{}/locks",
                cli.api_url, santri_id, kaca_id
            );
            let locks = get_json(&client, &url).await?;

            if json_output {
                println!("{}", serde_json::to_string_pretty(&locks)?);
            } else {
                print_locks(&locks);
            }
        }

        Commands::Export { guru, output } => {
            let mut url = format!("{}/api/export/progress", cli.api_url);
            if let Some(guru) = guru {
                url.push_str(&format!("?guru_id={}", guru));
            }

            let response = client.get(&url).send().await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                eprintln!("Export failed ({}): {}", status, text);
                std::process::exit(1);
            }

            let data = response.text().await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, &data)?;
                    println!("Exported to {:?}", path);
                }
                None => {
                    print!("{}", data);
                }
            }
        }

        Commands::Config { output } => {
            let config = hafalan::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

/// GET a JSON document, exiting with the server's error message on failure
async fn get_json(client: &reqwest::Client, url: &str) -> Result<Value, reqwest::Error> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        let message = body["error"].as_str().unwrap_or("request failed");
        eprintln!("Request failed ({}): {}", status, message);
        std::process::exit(1);
    }

    response.json().await
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

fn items(page: &Value) -> &[Value] {
    page["items"].as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn print_kaca_table(page: &Value) {
    let rows = items(page);
    if rows.is_empty() {
        println!("No kaca defined yet.");
        return;
    }

    println!(
        "{:<6} {:<6} {:<4} {:<20} {}",
        "ID", "Page", "Juz", "Surah", "Ayat"
    );
    println!("{}", "-".repeat(50));

    for kaca in rows {
        println!(
            "{:<6} {:<6} {:<4} {:<20} {}-{}",
            kaca["id"].as_i64().unwrap_or(0),
            kaca["page_number"].as_u64().unwrap_or(0),
            kaca["juz"].as_u64().unwrap_or(0),
            kaca["surah_name"].as_str().unwrap_or("-"),
            kaca["ayat_start"].as_u64().unwrap_or(0),
            kaca["ayat_end"].as_u64().unwrap_or(0),
        );
    }
    print_page_footer(page);
}

fn print_santri_table(page: &Value) {
    let rows = items(page);
    if rows.is_empty() {
        println!("No santri found.");
        return;
    }

    println!(
        "{:<6} {:<12} {:<24} {:<8} {}",
        "ID", "NIS", "Name", "Class", "Guru"
    );
    println!("{}", "-".repeat(66));

    for santri in rows {
        println!(
            "{:<6} {:<12} {:<24} {:<8} {}",
            santri["id"].as_i64().unwrap_or(0),
            santri["nis"].as_str().unwrap_or("-"),
            santri["name"].as_str().unwrap_or("-"),
            santri["class_name"].as_str().unwrap_or("-"),
            santri["guru_name"].as_str().unwrap_or("-"),
        );
    }
    print_page_footer(page);
}

fn print_page_footer(page: &Value) {
    let shown = items(page).len();
    let total = page["total"].as_u64().unwrap_or(shown as u64);
    if total as usize > shown {
        println!();
        println!(
            "Showing {} of {} (page {})",
            shown,
            total,
            page["page"].as_u64().unwrap_or(1)
        );
    }
}

fn print_progress(progress: &Value) {
    println!(
        "{} ({})",
        progress["name"].as_str().unwrap_or("-"),
        progress["nis"].as_str().unwrap_or("-")
    );
    if let Some(guru) = progress["guru_name"].as_str() {
        println!("Guru: {}", guru);
    }
    println!();
    println!(
        "Completion:      {:.1}%",
        progress["completion_percent"].as_f64().unwrap_or(0.0)
    );
    println!(
        "Completed kaca:  {} / {}",
        progress["completed_kaca"].as_u64().unwrap_or(0),
        progress["total_kaca"].as_u64().unwrap_or(0)
    );
    println!(
        "Rechecked kaca:  {}",
        progress["rechecked_kaca"].as_u64().unwrap_or(0)
    );
    println!(
        "In progress:     {}",
        progress["in_progress_kaca"].as_u64().unwrap_or(0)
    );
    println!(
        "Memorized ayat:  {}",
        progress["memorized_ayat"].as_u64().unwrap_or(0)
    );
    println!(
        "Active partials: {}",
        progress["active_partials"].as_u64().unwrap_or(0)
    );
    println!(
        "Last activity:   {}",
        progress["last_activity"].as_str().unwrap_or("never")
    );
}

fn print_dashboard(dashboard: &Value) {
    let stats = &dashboard["stats"];

    println!("Users: {}", stats["total_users"].as_u64().unwrap_or(0));
    if let Some(users) = stats["users"].as_object() {
        for (role, count) in users {
            println!("  {:<26} {}", role, count.as_u64().unwrap_or(0));
        }
    }
    println!("Kaca:  {}", stats["total_kaca"].as_u64().unwrap_or(0));
    println!("Hafalan:");
    if let Some(hafalan) = stats["hafalan"].as_object() {
        for (status, count) in hafalan {
            println!("  {:<26} {}", status, count.as_u64().unwrap_or(0));
        }
    }
    println!(
        "Active partials: {}",
        stats["active_partials"].as_u64().unwrap_or(0)
    );

    let top = dashboard["top_santri"].as_array().map(Vec::as_slice).unwrap_or(&[]);
    if top.is_empty() {
        return;
    }

    println!();
    println!("{:<4} {:<24} {:>8} {:>6}", "#", "Santri", "Percent", "Ayat");
    println!("{}", "-".repeat(45));
    for (rank, santri) in top.iter().enumerate() {
        println!(
            "{:<4} {:<24} {:>7.1}% {:>6}",
            rank + 1,
            santri["name"].as_str().unwrap_or("-"),
            santri["completion_percent"].as_f64().unwrap_or(0.0),
            santri["memorized_ayat"].as_u64().unwrap_or(0),
        );
    }
}

fn print_locks(locks: &Value) {
    let ayat = locks["ayat"].as_array().map(Vec::as_slice).unwrap_or(&[]);

    match locks["lowest_active_ayat"].as_u64() {
        Some(n) => println!("Lowest in-progress ayat: {}", n),
        None => println!("No ayat in progress"),
    }
    println!();
    println!("{:<6} {:<12} {}", "Ayat", "Memorized", "Lock");
    println!("{}", "-".repeat(30));

    for entry in ayat {
        println!(
            "{:<6} {:<12} {}",
            entry["ayat"].as_u64().unwrap_or(0),
            if entry["memorized"].as_bool().unwrap_or(false) {
                "yes"
            } else {
                "no"
            },
            entry["lock"].as_str().unwrap_or("-"),
        );
    }
}
