//! data_tasks CLI - common table chores for clinical coordinators
//!
//! # Commands
//!
//! ```bash
//! data_tasks left-join left.xlsx right.csv --on subject_id --out joined.xlsx
//! data_tasks recode-dates consents.csv --columns signed --out consents.xlsx
//! data_tasks inspect visits.csv.gz            # table as JSON records
//! ```

use clap::{Parser, Subcommand};
use data_tasks::{
    left_join, load_table, recode_dates_file, ConsoleLogger, JoinOptions, LoadOptions, SheetSelector,
    DEFAULT_INDICATOR,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "data_tasks")]
#[command(about = "Automate the most common data tasks of clinical coordinators", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Left join two tables on key columns and write an annotated Excel report
    LeftJoin {
        /// Left table (csv, csv.gz, xls, xlsx)
        left: PathBuf,

        /// Right table (csv, csv.gz, xls, xlsx)
        right: PathBuf,

        /// Column(s) to join on
        #[arg(long = "on", required = true, num_args = 1..)]
        join_on: Vec<String>,

        /// Output Excel file
        #[arg(short, long)]
        out: PathBuf,

        /// Don't add the match indicator column
        #[arg(long)]
        no_indicator: bool,

        /// Name of the match indicator column
        #[arg(long, default_value = DEFAULT_INDICATOR)]
        indicator_name: String,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Also write the run summary as JSON
        #[arg(long)]
        summary: Option<PathBuf>,
    },

    /// Recode columns as dates (unreadable values become missing)
    RecodeDates {
        /// Input table
        input: PathBuf,

        /// Column(s) to recode
        #[arg(short, long, required = true, num_args = 1..)]
        columns: Vec<String>,

        /// Output Excel file
        #[arg(short, long)]
        out: PathBuf,

        /// Worksheet index or name for Excel input (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,
    },

    /// Load a table and output its rows as JSON
    Inspect {
        /// Input table
        input: PathBuf,

        /// Worksheet index or name for Excel input (default: first sheet)
        #[arg(short, long)]
        sheet: Option<String>,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let log = ConsoleLogger::from_env();

    let result = match cli.command {
        Commands::LeftJoin {
            left,
            right,
            join_on,
            out,
            no_indicator,
            indicator_name,
            delimiter,
            summary,
        } => {
            let options = JoinOptions {
                indicator: !no_indicator,
                indicator_name,
                delimiter,
                ..Default::default()
            };
            cmd_left_join(&left, &right, &join_on, &out, &options, summary.as_deref(), &log)
        }

        Commands::RecodeDates {
            input,
            columns,
            out,
            sheet,
            delimiter,
        } => cmd_recode_dates(&input, &columns, &out, load_options(sheet, delimiter), &log),

        Commands::Inspect {
            input,
            sheet,
            delimiter,
            output,
        } => cmd_inspect(&input, load_options(sheet, delimiter), output.as_deref(), &log),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn load_options(sheet: Option<String>, delimiter: Option<char>) -> LoadOptions {
    let sheet = match sheet {
        Some(s) => match s.parse::<usize>() {
            Ok(i) => SheetSelector::Index(i),
            Err(_) => SheetSelector::Name(s),
        },
        None => SheetSelector::default(),
    };
    LoadOptions {
        sheet,
        delimiter,
        encoding: None,
    }
}

fn cmd_left_join(
    left: &Path,
    right: &Path,
    join_on: &[String],
    out: &Path,
    options: &JoinOptions,
    summary_path: Option<&Path>,
    log: &ConsoleLogger,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("🔗 Left join: {} ⟕ {}", left.display(), right.display());

    let summary = left_join(left, right, join_on, out, options, log)?;

    eprintln!("   Rows: {}", summary.rows);
    eprintln!("   Matched: {}", summary.counts.both);
    eprintln!("   Left only: {}", summary.counts.left_only);
    if !summary.sorted {
        eprintln!("   Index left unsorted");
    }

    if let Some(path) = summary_path {
        fs::write(path, serde_json::to_string_pretty(&summary)?)?;
        eprintln!("   💾 Summary saved to: {}", path.display());
    }

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_recode_dates(
    input: &Path,
    columns: &[String],
    out: &Path,
    options: LoadOptions,
    log: &ConsoleLogger,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📅 Recoding dates: {}", input.display());

    let summary = recode_dates_file(input, columns, out, &options, log)?;
    eprintln!("   Rows: {}", summary.rows);
    eprintln!("   Unreadable dates: {}", summary.unparsed);

    eprintln!("\n✨ Done!");
    Ok(())
}

fn cmd_inspect(
    input: &Path,
    options: LoadOptions,
    output: Option<&Path>,
    log: &ConsoleLogger,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {}", input.display());

    let table = load_table(input, &options, log)?;
    eprintln!("   Columns: {}", table.column_names().join(", "));
    eprintln!("✅ Loaded {} rows", table.height());

    let json = serde_json::to_string_pretty(&table.to_records())?;
    write_output(&json, output)?;

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
