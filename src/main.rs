use clap::{Parser, Subcommand};
use readiness_analyzer::{
    AnalysisService, Config, HttpAnalysisClient, IngestError, PreviewTable, Session,
    normalize_report, normalize_str, render, report_id, report_url,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "readiness-analyzer", about = "E-invoicing readiness and gap analyzer")]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, global = true, default_value = ".config/readiness.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a CSV or JSON file and show the data preview
    Preview {
        file: PathBuf,
        /// Number of rows to show (defaults to the config value)
        #[arg(long)]
        rows: Option<usize>,
    },
    /// Upload a file, run the analysis and print the report
    Analyze {
        file: PathBuf,
        /// Write the report JSON to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Fetch a stored report by id
    Report { report_id: String },
    /// Normalize a saved analysis response offline
    Normalize { file: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // init tracing; stdout is reserved for the preview and report
    tracing_subscriber::fmt()
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load_or_default(&cli.config)?;

    match cli.command {
        Command::Preview { file, rows } => {
            let session = Session::new();
            show_preview(&session, &file, rows.unwrap_or(cfg.preview.rows)).await?;
        }
        Command::Analyze { file, out } => {
            let session = Session::new();
            show_preview(&session, &file, cfg.preview.rows).await?;

            let client = HttpAnalysisClient::new(&cfg.api)?;
            let report = session.analyze(&client, &cfg.questionnaire).await?;
            print!("\n{}", render::report_text(&report));

            let raw = session.raw_response().await;
            if let Some(id) = raw.as_ref().and_then(report_id) {
                println!("\nShareable link: {}", report_url(client.base_url(), &id));
            }

            if let Some(path) = out {
                // Keep the server's own document when there is one
                let json = match raw {
                    Some(value) => serde_json::to_string_pretty(&value)?,
                    None => serde_json::to_string_pretty(&report)?,
                };
                tokio::fs::write(&path, json).await?;
                info!(path = %path.display(), "Report written");
            }
        }
        Command::Report { report_id: id } => {
            let client = HttpAnalysisClient::new(&cfg.api)?;
            let response = client.fetch_report(&id).await?;
            let report = normalize_report(&response)?;
            print!("{}", render::report_text(&report));
            println!("\nShareable link: {}", report_url(client.base_url(), &id));
        }
        Command::Normalize { file } => {
            let text = tokio::fs::read_to_string(&file).await?;
            let report = normalize_str(&text)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

async fn show_preview(
    session: &Session,
    path: &Path,
    rows: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let Some(table) = session.select_file(path).await? else {
        return Ok(());
    };

    let preview = PreviewTable::build(&table, rows);
    println!("{} ({} rows, {})", path.display(), table.len(), table.format());
    print!("{}", render::preview_text(&preview));

    match table.into_rows() {
        Ok(_) => {}
        Err(IngestError::UnparsableInput) => warn!("File has no header line or JSON rows"),
        Err(IngestError::NoDataRows) => warn!("File has a header but no data rows"),
    }
    Ok(())
}
