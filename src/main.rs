use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use lettersplit::analysis::PageAnalyzer;
use lettersplit::export::{Exporter, JsonExporter, LetterSummary, TextExporter};
use lettersplit::pipeline::{build_report, load_tables, PipelineConfig};
use lettersplit::LetterConfig;

#[derive(Parser, Debug)]
#[command(name = "lettersplit")]
#[command(
    version,
    about = "Split scanned multi-letter documents into letters from OCR token tables",
    long_about = None
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Group the pages of a scan into letters
    Split {
        /// Token table (TSV or JSON) or a directory of them
        input: PathBuf,

        /// Output directory (default: ./<input_name>_letters)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format(s) to generate
        #[arg(short, long, value_enum, default_values_t = vec![Format::Json, Format::Text])]
        format: Vec<Format>,

        #[command(flatten)]
        settings: Settings,
    },

    /// Print the markers detected on each page as JSON
    Analyze {
        /// Token table (TSV or JSON) or a directory of them
        input: PathBuf,

        /// Only print this 1-based scan page
        #[arg(short, long)]
        page: Option<usize>,

        #[command(flatten)]
        settings: Settings,
    },
}

#[derive(clap::Args, Debug)]
struct Settings {
    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Postal code of the expected recipient
    #[arg(long)]
    target_zip: Option<String>,

    /// Worker threads for page analysis
    #[arg(short, long)]
    jobs: Option<usize>,
}

impl Settings {
    fn load(&self) -> Result<LetterConfig> {
        let mut config = match &self.config {
            Some(path) => LetterConfig::from_json_file(path)?,
            None => LetterConfig::default(),
        };
        if let Some(zip) = &self.target_zip {
            config.detector.target_zip = Some(zip.clone());
        }
        if self.jobs.is_some() {
            config.max_threads = self.jobs;
        }
        config
            .install_global_thread_pool()
            .context("failed to start worker threads")?;
        Ok(config)
    }
}

#[derive(ValueEnum, Clone, Debug, PartialEq)]
enum Format {
    Json,
    Text,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Split {
            input,
            output,
            format,
            settings,
        } => split(input, output, format, settings),
        Commands::Analyze {
            input,
            page,
            settings,
        } => analyze(input, page, settings),
    }
}

fn split(
    input: PathBuf,
    output: Option<PathBuf>,
    formats: Vec<Format>,
    settings: Settings,
) -> Result<()> {
    let output_dir = output.unwrap_or_else(|| {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scan".to_string());
        PathBuf::from(format!("{}_letters", stem))
    });

    let config = PipelineConfig::new(input.clone(), output_dir.clone(), settings.load()?);
    let report = build_report(&config)
        .with_context(|| format!("Failed to split: {}", input.display()))?;

    for (idx, letter) in report.letters.iter().enumerate() {
        let summary = LetterSummary::new(idx + 1, letter);
        println!(
            "[{}] pages {}-{}  date: {}  sender: {}  subject: {}",
            summary.letter,
            summary.first_page,
            summary.last_page,
            summary.date.map(|d| d.to_string()).unwrap_or_else(|| "-".to_string()),
            summary.sender.unwrap_or("-"),
            summary.subject.unwrap_or("-"),
        );
    }

    if formats.contains(&Format::Json) {
        JsonExporter::new(output_dir.clone())
            .export(&report)
            .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;
    }
    if formats.contains(&Format::Text) {
        TextExporter::new(output_dir.clone())
            .export(&report)
            .with_context(|| format!("Failed to export to: {}", output_dir.display()))?;
    }

    println!("\n[✓] {} letters written to {}", report.letters.len(), output_dir.display());
    Ok(())
}

fn analyze(input: PathBuf, page: Option<usize>, settings: Settings) -> Result<()> {
    let config = settings.load()?;
    let tables = load_tables(&input)?;
    let pages = PageAnalyzer::new(config.detector).analyze_pages(&tables);

    let selected: Vec<_> = match page {
        Some(num) => {
            let found: Vec<_> = pages.into_iter().filter(|p| p.scan_page_num == num).collect();
            if found.is_empty() {
                anyhow::bail!("Page {} not found ({} pages)", num, tables.len());
            }
            found
        }
        None => pages,
    };

    println!("{}", serde_json::to_string_pretty(&selected)?);
    Ok(())
}
