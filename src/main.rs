use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use tsql_compat::capture::ReportLayout;
use tsql_compat::logging::init_logging;
use tsql_compat::{
    analyze, delete_report, export_captures, generate_report, list_report, reanalyze,
    AnalyzeOptions, ReanalyzeOptions, ReportOptions,
};

#[derive(Parser)]
#[command(name = "tsql-compat")]
#[command(author, version, about = "Compatibility assessment of SQL Server T-SQL code")]
struct Cli {
    /// Directory holding all reports
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import and analyze T-SQL input files
    Analyze {
        /// Report name
        #[arg(short, long)]
        report: String,

        /// Application the input files belong to
        #[arg(short, long)]
        app: String,

        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Add the inputs to an existing report
        #[arg(long)]
        add: bool,

        /// Re-import inputs already imported for this application
        #[arg(long)]
        replace: bool,

        /// XML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Target version to assess against
        #[arg(short, long)]
        target_version: Option<String>,
    },
    /// Generate the text and HTML report
    Report {
        #[arg(short, long)]
        report: String,

        /// Report options, e.g. xref, xref=feature, status=all, apps, batchnr, detail, filter=<regex>, maxLineNrs=<n>
        #[arg(short, long = "option")]
        options: Vec<String>,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Fail unless the capture files were analyzed for this version
        #[arg(short, long)]
        target_version: Option<String>,
    },
    /// Re-analyze every imported input of a report
    Reanalyze {
        #[arg(short, long)]
        report: String,

        #[arg(short, long)]
        config: Option<PathBuf>,

        #[arg(short, long)]
        target_version: Option<String>,
    },
    /// Export capture records for external processing
    Export {
        #[arg(short, long)]
        report: String,
    },
    /// List the applications and input files of a report
    List {
        #[arg(short, long)]
        report: String,
    },
    /// Delete a report
    Delete {
        #[arg(short, long)]
        report: String,
    },
}

impl Commands {
    fn report_name(&self) -> &str {
        match self {
            Commands::Analyze { report, .. }
            | Commands::Report { report, .. }
            | Commands::Reanalyze { report, .. }
            | Commands::Export { report }
            | Commands::List { report }
            | Commands::Delete { report } => report,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only analysis may create a report directory
    let layout = ReportLayout::new(&cli.root, cli.command.report_name());
    let session_log = match cli.command {
        Commands::Delete { .. } | Commands::List { .. } => None,
        Commands::Analyze { .. } => Some(layout),
        _ => layout.exists().then_some(layout),
    }
    .map(|layout| {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        layout.session_log_file(&timestamp)
    });
    init_logging(cli.verbose, session_log.as_deref());

    match cli.command {
        Commands::Analyze {
            report,
            app,
            inputs,
            add,
            replace,
            config,
            target_version,
        } => {
            let summary = analyze(AnalyzeOptions {
                root: cli.root,
                report: report.clone(),
                app,
                inputs,
                add,
                replace,
                config_path: config,
                target_version,
                verbose: cli.verbose,
            })?;
            println!(
                "Analyzed {} files into report '{}': {} batches, {} with errors, {} items captured",
                summary.files, report, summary.batches, summary.error_batches, summary.records
            );
        }
        Commands::Report {
            report,
            options,
            config,
            target_version,
        } => {
            let (text, html) = generate_report(ReportOptions {
                root: cli.root,
                report,
                options,
                config_path: config,
                target_version,
                verbose: cli.verbose,
            })?;
            println!("Report written to {}", text.display());
            println!("HTML report written to {}", html.display());
        }
        Commands::Reanalyze {
            report,
            config,
            target_version,
        } => {
            let summary = reanalyze(ReanalyzeOptions {
                root: cli.root,
                report: report.clone(),
                config_path: config,
                target_version,
                verbose: cli.verbose,
            })?;
            println!(
                "Re-analyzed {} files of report '{}': {} items captured",
                summary.files, report, summary.records
            );
        }
        Commands::Export { report } => {
            let (path, count) = export_captures(&cli.root, &report)?;
            println!("Exported {} records to {}", count, path.display());
        }
        Commands::List { report } => {
            let inputs = list_report(&cli.root, &report)?;
            if inputs.is_empty() {
                println!("Report '{}' has no imported input files", report);
            }
            for input in inputs {
                println!(
                    "{} : {} ({} batches, {} lines, {}, read at {})",
                    input.app,
                    input.input_path,
                    input.batches,
                    input.lines,
                    input.encoding,
                    input.read_at
                );
            }
        }
        Commands::Delete { report } => {
            delete_report(&cli.root, &report)?;
            println!("Deleted report '{}'", report);
        }
    }

    Ok(())
}
