//! Migrastat CLI - chart series from migration CSV exports
//!
//! # Main Commands
//!
//! ```bash
//! migrastat serve --data wanderung.csv     # Start HTTP server (port 3000)
//! migrastat analyze wanderung.csv          # Full report as JSON
//! ```
//!
//! # Single Queries
//!
//! ```bash
//! migrastat totals wanderung.csv           # Yearly arrivals/departures/balance
//! migrastat top wanderung.csv --year 2022  # Top countries for one year
//! migrastat dynamics wanderung.csv -k 5    # Largest balance swings
//! migrastat parse wanderung.csv            # Just parse CSV to JSON
//! ```

use clap::{Parser, Subcommand};
use migrastat::{
    analysis::pipeline::format_delimiter, analyze_csv, parse_file, parse_file_auto,
    AnalysisOptions, AnalysisReport, EngineConfig, ServerConfig, TotalsScope,
};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "migrastat")]
#[command(about = "Extract arrivals/departures time series from migration CSV tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Full report: totals, rankings and balance dynamics
    Analyze {
        /// Input CSV file
        input: PathBuf,

        /// Year for the rankings (default: latest year)
        #[arg(short, long)]
        year: Option<i32>,

        /// Entities per ranking
        #[arg(short = 'n', long, default_value = "10")]
        top_n: usize,

        /// Entities in the balance dynamics
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Sum every non-structural column into the totals
        #[arg(long)]
        all_columns: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Yearly total arrivals, departures and balance
    Totals {
        /// Input CSV file
        input: PathBuf,

        /// Sum every non-structural column into the totals
        #[arg(long)]
        all_columns: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Top arrival and departure countries for one year
    Top {
        /// Input CSV file
        input: PathBuf,

        /// Year to rank
        #[arg(short, long)]
        year: i32,

        /// Entities per ranking
        #[arg(short = 'n', long, default_value = "10")]
        top_n: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Countries with the largest yearly balance and their series
    Dynamics {
        /// Input CSV file
        input: PathBuf,

        /// Number of countries
        #[arg(short = 'k', long, default_value = "5")]
        top_k: usize,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Start HTTP server
    Serve {
        /// Port to listen on (default: MIGRASTAT_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,

        /// CSV file loaded at startup (default: MIGRASTAT_DATA_FILE)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Static front end served as fallback (default: MIGRASTAT_STATIC_DIR)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),

        Commands::Analyze {
            input,
            year,
            top_n,
            top_k,
            all_columns,
            output,
        } => {
            let engine = engine_config(all_columns).with_top_n(top_n).with_top_k(top_k);
            cmd_analyze(&input, year, engine, output.as_deref())
        }

        Commands::Totals {
            input,
            all_columns,
            output,
        } => cmd_totals(&input, engine_config(all_columns), output.as_deref()),

        Commands::Top {
            input,
            year,
            top_n,
            output,
        } => cmd_top(&input, year, top_n, output.as_deref()),

        Commands::Dynamics {
            input,
            top_k,
            output,
        } => cmd_dynamics(&input, top_k, output.as_deref()),

        Commands::Serve {
            port,
            data,
            static_dir,
        } => cmd_serve(port, data, static_dir).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn engine_config(all_columns: bool) -> EngineConfig {
    let scope = if all_columns {
        TotalsScope::AllColumns
    } else {
        TotalsScope::Entities
    };
    EngineConfig::default().with_totals_scope(scope)
}

fn cmd_parse(input: &Path, delimiter: Option<char>, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Parsing CSV: {}", input.display());

    let result = match delimiter {
        Some(d) => parse_file(input, d)?,
        None => parse_file_auto(input)?,
    };

    eprintln!("   Encoding: {}", result.encoding);
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(result.delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );
    eprintln!("   Columns: {}", result.headers.len());
    eprintln!("✅ Parsed {} rows", result.table.len());

    write_json(&result.table, output)
}

/// Run the pipeline with the report's progress going to the log broadcaster.
fn run(input: &Path, selected_year: Option<i32>, engine: EngineConfig) -> Result<AnalysisReport, Box<dyn std::error::Error>> {
    let options = AnalysisOptions {
        selected_year,
        engine,
    };
    let output = analyze_csv(input, &options)?;
    if !output.report.has_year_data() {
        eprintln!("⚠️  No year rows found in {}", input.display());
    }
    Ok(output.report)
}

fn cmd_analyze(
    input: &Path,
    year: Option<i32>,
    engine: EngineConfig,
    output: Option<&Path>,
) -> CliResult {
    eprintln!("📊 Analyzing: {}", input.display());
    let report = run(input, year, engine)?;

    eprintln!("\n   Years: {}", report.available_years.len());
    eprintln!("   Countries: {}", report.entity_columns.len());
    if let Some(year) = report.selected_year {
        eprintln!("   Selected year: {}", year);
    }
    if !report.skipped_rows.is_empty() {
        eprintln!("   Skipped rows: {}", report.skipped_rows.len());
    }

    write_json(&report, output)?;
    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_totals(input: &Path, engine: EngineConfig, output: Option<&Path>) -> CliResult {
    eprintln!("📈 Totals: {}", input.display());
    let report = run(input, None, engine)?;

    for point in &report.totals {
        eprintln!(
            "   {}  +{:<8} -{:<8} = {:+}",
            point.year, point.arrivals, point.departures, point.balance
        );
    }

    write_json(&report.totals, output)
}

fn cmd_top(input: &Path, year: i32, top_n: usize, output: Option<&Path>) -> CliResult {
    eprintln!("🏆 Top {} for {}: {}", top_n, year, input.display());
    let engine = EngineConfig::default().with_top_n(top_n);
    let report = run(input, Some(year), engine)?;

    let rankings = report
        .top_by_year
        .ok_or_else(|| format!("No migration data in {}", input.display()))?;
    if rankings.arrivals.is_none() && rankings.departures.is_none() {
        eprintln!("⚠️  No complete data for {}", year);
    }

    write_json(&rankings, output)
}

fn cmd_dynamics(input: &Path, top_k: usize, output: Option<&Path>) -> CliResult {
    eprintln!("🌍 Balance dynamics (top {}): {}", top_k, input.display());
    let engine = EngineConfig::default().with_top_k(top_k);
    let report = run(input, None, engine)?;

    let dynamics = report
        .dynamics
        .ok_or("Balance dynamics need more than one year of data")?;
    for leader in &dynamics.leaders {
        eprintln!("   {:<30} {:.0}", leader.name, leader.peak_abs_balance);
    }

    write_json(&dynamics, output)
}

async fn cmd_serve(
    port: Option<u16>,
    data: Option<PathBuf>,
    static_dir: Option<PathBuf>,
) -> CliResult {
    let config = ServerConfig::from_env()?.with_overrides(port, data, static_dir);
    migrastat::server::start_server(config).await?;
    Ok(())
}

fn write_json<T: Serialize>(value: &T, path: Option<&Path>) -> CliResult {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(p) => {
            fs::write(p, &json)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", json);
        }
    }
    Ok(())
}
