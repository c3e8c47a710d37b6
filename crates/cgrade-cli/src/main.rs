mod grader;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cgrade_core::{Config, Report, Severity};
use cgrade_engine::{check_preconditions, discover_functions, extract_variables, ExpectedOutputModel};
use grader::{resolve_source, Grader};

/// cgrade - automated checks for C programming assignments
#[derive(Parser)]
#[command(name = "cgrade")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: cgrade.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Folder holding the submission
    #[arg(long, global = true, env = "STUDENT_SRC_FOLDER", default_value = ".")]
    src_folder: PathBuf,

    /// File under test, relative to the source folder
    #[arg(long, global = true, env = "C_FILENAME", default_value = "main.c")]
    file: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every check and write a report
    Check {
        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,

        /// Repository whose latest commit message is checked
        #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
        workspace: PathBuf,

        /// Skip the clang-format check
        #[arg(long)]
        skip_format: bool,

        /// Skip the commit message check
        #[arg(long)]
        skip_commit: bool,
    },

    /// Check which control-flow constructs each function uses
    Style {
        /// Functions to check (default: every function except the excluded ones)
        functions: Vec<String>,
    },

    /// Build, run, and compare the program output
    Run,

    /// Check clang-format compliance
    Format {
        /// Root the fix command's path is shown relative to
        #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
        workspace: PathBuf,
    },

    /// Check that the latest commit message is descriptive
    CommitMsg {
        /// Message to check instead of the latest commit
        #[arg(short, long)]
        message: Option<String>,

        /// Repository to read the latest commit from
        #[arg(long, env = "GITHUB_WORKSPACE", default_value = ".")]
        workspace: PathBuf,
    },

    /// List the functions the structural rules would check
    Functions {
        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// Print the expected program output for the declared values
    Expected,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    if let Some(config_path) = path {
        return Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()));
    }

    let default_path = Path::new("cgrade.toml");
    if default_path.exists() {
        return Config::from_file(default_path).context("Failed to load cgrade.toml");
    }

    if verbose {
        eprintln!("{}", "No config file found, using defaults".yellow());
    }
    Ok(Config::default())
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads env-backed arguments
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref(), cli.verbose)?;
    let source = match &cli.command {
        // the commit check never reads the source
        Commands::CommitMsg { .. } => cli.src_folder.join(&cli.file),
        _ => resolve_source(&cli.src_folder, &cli.file)?,
    };

    if cli.verbose {
        eprintln!("{} {}", "File under test:".cyan(), source.display());
    }

    let grader = Grader::new(&config, source);

    match cli.command {
        Commands::Check {
            output,
            markdown,
            workspace,
            skip_format,
            skip_commit,
        } => {
            check_command(
                &grader,
                &output,
                markdown.as_deref(),
                &workspace,
                skip_format,
                skip_commit,
                cli.verbose,
            )
            .await
        }
        Commands::Style { functions } => style_command(&config, &grader, functions).await,
        Commands::Run => run_command(&grader).await,
        Commands::Format { workspace } => format_command(&grader, &workspace).await,
        Commands::CommitMsg { message, workspace } => {
            commit_msg_command(&grader, &workspace, message).await
        }
        Commands::Functions { json } => functions_command(&config, &grader, json).await,
        Commands::Expected => expected_command(&config, &grader),
    }
}

/// Check command - every check, aggregated into one report
async fn check_command(
    grader: &Grader<'_>,
    output: &Path,
    markdown: Option<&Path>,
    workspace: &Path,
    skip_format: bool,
    skip_commit: bool,
    verbose: bool,
) -> Result<()> {
    let mut report = Report::new().with_source(grader.source().display().to_string());

    if verbose {
        eprintln!("{}", "Checking structure...".cyan());
    }
    grader.structure(&mut report).await;

    if verbose {
        eprintln!("{}", "Building and running...".cyan());
    }
    grader.behavior(&mut report).await?;

    if !skip_format {
        if verbose {
            eprintln!("{}", "Checking formatting...".cyan());
        }
        grader.format(&mut report, workspace).await;
    }

    if !skip_commit {
        if verbose {
            eprintln!("{}", "Checking commit message...".cyan());
        }
        grader.commit_message(&mut report, workspace, None).await;
    }

    report
        .save_to_file(output)
        .with_context(|| format!("Failed to write report to {}", output.display()))?;

    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if let Some(md_path) = markdown {
        std::fs::write(md_path, generate_markdown_report(&report))
            .with_context(|| format!("Failed to write markdown report to {}", md_path.display()))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    finish(&report)
}

/// Style command - structural rules only
async fn style_command(config: &Config, grader: &Grader<'_>, functions: Vec<String>) -> Result<()> {
    let mut report = Report::new().with_source(grader.source().display().to_string());

    if functions.is_empty() {
        grader.structure(&mut report).await;
    } else {
        let mut config = config.clone();
        config.structure.functions = functions;
        Grader::new(&config, grader.source()).structure(&mut report).await;
    }

    finish(&report)
}

/// Run command - build, execute, compare
async fn run_command(grader: &Grader<'_>) -> Result<()> {
    let mut report = Report::new().with_source(grader.source().display().to_string());
    grader.behavior(&mut report).await?;
    finish(&report)
}

/// Format command - clang-format compliance
async fn format_command(grader: &Grader<'_>, workspace: &Path) -> Result<()> {
    let mut report = Report::new().with_source(grader.source().display().to_string());
    grader.format(&mut report, workspace).await;
    finish(&report)
}

/// Commit message command
async fn commit_msg_command(grader: &Grader<'_>, workspace: &Path, message: Option<String>) -> Result<()> {
    let mut report = Report::new();
    grader.commit_message(&mut report, workspace, message).await;
    finish(&report)
}

/// Functions command - list what the structural rules would check
async fn functions_command(config: &Config, grader: &Grader<'_>, json: bool) -> Result<()> {
    let tree = match grader.parse().await {
        Ok(tree) => tree,
        Err(diag) => {
            let report = Report::from_diagnostics(vec![diag]);
            return finish(&report);
        }
    };

    let names = discover_functions(&tree, &config.structure.exclude);

    if json {
        println!("{}", serde_json::to_string_pretty(&names)?);
    } else if names.is_empty() {
        println!("{}", "No functions found".yellow());
    } else {
        for name in &names {
            println!("{}", name);
        }
    }

    Ok(())
}

/// Expected command - print the golden output
fn expected_command(config: &Config, grader: &Grader<'_>) -> Result<()> {
    let behavior = &config.behavior;
    let source = grader.source();
    let text = std::fs::read_to_string(source)
        .with_context(|| format!("Failed to read {}", source.display()))?;

    let vars = extract_variables(&text, &behavior.variables)?;
    check_preconditions(&vars, &behavior.variables)?;

    let model = ExpectedOutputModel::from_variables(&vars)?;
    for line in model.lines(behavior.checked_lines())? {
        print!("{}", line);
    }

    Ok(())
}

/// Print the summary and exit 1 when the report holds errors
fn finish(report: &Report) -> Result<()> {
    print_report_summary(report);

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Submission Check Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    if let Some(source) = &report.source {
        println!("Source: {}", source);
    }
    println!();

    println!("{}", "Summary:".bold());
    println!("  Total diagnostics: {}", report.summary.total);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }

    println!("  Info:     {}", report.summary.info);
    if report.summary.functions_checked > 0 {
        println!("  Functions checked: {}", report.summary.functions_checked);
    }
    if report.summary.lines_checked > 0 {
        println!("  Output lines checked: {}", report.summary.lines_checked);
    }
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(loc) = &diag.location {
                println!("    at {}", loc);
            }

            if let Some(exp) = &diag.expected {
                println!("    Expected: {:?}", exp);
            }
            if let Some(act) = &diag.actual {
                println!("    Actual:   {:?}", act);
            }

            if let Some(details) = &diag.details {
                for line in details.lines() {
                    println!("    | {}", line.dimmed());
                }
            }

            if let Some(hint) = &diag.hint {
                println!("    {} {}", "hint:".cyan(), hint);
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Generate markdown report
fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Submission Check Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));
    if let Some(source) = &report.source {
        md.push_str(&format!("**Source:** `{}`\n\n", source));
    }

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Total diagnostics: {}\n", report.summary.total));
    md.push_str(&format!("- Errors: {}\n", report.summary.errors));
    md.push_str(&format!("- Warnings: {}\n", report.summary.warnings));
    md.push_str(&format!("- Info: {}\n", report.summary.info));
    md.push_str(&format!("- Functions checked: {}\n", report.summary.functions_checked));
    md.push_str(&format!("- Output lines checked: {}\n", report.summary.lines_checked));
    md.push('\n');

    if report.diagnostics.is_empty() {
        md.push_str("✅ **No issues found!**\n");
    } else {
        md.push_str("## Diagnostics\n\n");

        for diag in &report.diagnostics {
            let severity_emoji = match diag.severity {
                Severity::Error => "❌",
                Severity::Warn => "⚠️",
                Severity::Info => "ℹ️",
            };

            md.push_str(&format!("### {} {} - {}\n\n", severity_emoji, diag.severity, diag.code));
            md.push_str(&format!("{}\n\n", diag.message));

            if let Some(loc) = &diag.location {
                md.push_str(&format!("**Location:** {}\n\n", loc));
            }

            if let Some(exp) = &diag.expected {
                md.push_str(&format!("**Expected:** `{}`\n\n", exp));
            }
            if let Some(act) = &diag.actual {
                md.push_str(&format!("**Actual:** `{}`\n\n", act));
            }

            if let Some(details) = &diag.details {
                md.push_str(&format!("```text\n{}\n```\n\n", details.trim_end()));
            }

            if let Some(hint) = &diag.hint {
                md.push_str(&format!("**Hint:** {}\n\n", hint));
            }
        }
    }

    md
}
