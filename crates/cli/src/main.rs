use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use prism_core::{
    Article, HtmlConfig, InputFormat, JsonConfig, MarkdownConfig, OutputFormat, Reader, collect_input_files,
    convert_to_json, read_file, read_stdin,
};
use tracing_subscriber::EnvFilter;
use url::Url;

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for converted articles
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    #[value(alias = "md")]
    Markdown,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Markdown => OutputFormat::Markdown,
        }
    }
}

/// Input format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum InputKind {
    /// Detect from the file extension
    Auto,
    Html,
    Xml,
}

impl InputKind {
    fn resolve(self, path: &Path) -> prism_core::Result<InputFormat> {
        match self {
            InputKind::Auto => InputFormat::from_path(path),
            InputKind::Html => Ok(InputFormat::Html),
            InputKind::Xml => Ok(InputFormat::Xml),
        }
    }
}

/// Convert journal HTML pages and JATS XML records to JSON or Markdown
#[derive(Parser, Debug)]
#[command(name = "prism")]
#[command(author = "Prism Contributors")]
#[command(version)]
#[command(about = "Convert journal HTML and JATS XML articles to JSON or Markdown", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only report errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a single article file
    Convert(ConvertArgs),
    /// Convert every article under a directory (recursive)
    Batch(BatchArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Article file (.html, .htm, .xml, .nxml) or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json", value_name = "FORMAT")]
    format: Format,

    /// Input format
    #[arg(long, value_enum, default_value = "auto", value_name = "FORMAT")]
    input_format: InputKind,

    /// Overwrite the output file if it already exists
    #[arg(short = 'F', long)]
    force: bool,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Directory searched for .html, .htm, .xml and .nxml files
    #[arg(value_name = "DIR")]
    input: PathBuf,

    /// Output directory; the input tree is mirrored under it
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "markdown", value_name = "FORMAT")]
    format: Format,

    /// Input format
    #[arg(long, value_enum, default_value = "auto", value_name = "FORMAT")]
    input_format: InputKind,

    /// Overwrite output files that already exist
    #[arg(short = 'F', long)]
    force: bool,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Omit figures from JSON output
    #[arg(long)]
    no_figures: bool,

    /// Include TOML frontmatter (Markdown only)
    #[arg(long)]
    frontmatter: bool,

    /// Base URL for resolving relative links in HTML input
    #[arg(long, value_name = "URL")]
    base_url: Option<Url>,
}

impl RenderArgs {
    fn reader(&self) -> Reader {
        Reader::with_html_config(HtmlConfig::builder().base_url(self.base_url.clone()).build())
    }

    fn render(&self, article: &Article, format: Format) -> prism_core::Result<String> {
        match format {
            Format::Json => {
                convert_to_json(article, &JsonConfig { pretty: self.pretty, include_figures: !self.no_figures })
            }
            Format::Markdown => {
                article.to_markdown_with_config(&MarkdownConfig { include_frontmatter: self.frontmatter })
            }
        }
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn write_output(path: &Path, content: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))
}

fn run_convert(args: &ConvertArgs, verbose: bool, quiet: bool) -> anyhow::Result<()> {
    if let Some(path) = &args.output
        && path.exists()
        && !args.force
    {
        if !quiet {
            echo::print_warning(&format!("Skipping {} (already exists, use --force to overwrite)", path.display()));
        }
        return Ok(());
    }

    if verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    let (input, format) = if args.input == "-" {
        if verbose {
            echo::print_step(1, 3, "Reading from stdin");
        }
        let format = match args.input_format {
            InputKind::Auto => bail!("Cannot detect the input format of stdin; pass --input-format html|xml"),
            kind => kind.resolve(Path::new(""))?,
        };
        (read_stdin().context("Failed to read from stdin")?, format)
    } else {
        let path = Path::new(&args.input);
        if verbose {
            echo::print_step(1, 3, &format!("Reading from file {}", args.input.bright_white()));
        }
        let format = args
            .input_format
            .resolve(path)
            .context("Could not detect input format from extension. Use --input-format html|xml")?;
        (read_file(path).with_context(|| format!("Failed to read file: {}", args.input))?, format)
    };

    if verbose {
        eprintln!("  {} {}", "Size:".dimmed(), echo::format_size(input.len()).bright_white());
        eprintln!("  {} {}", "Input:".dimmed(), format.to_string().bright_white());
        eprintln!();
        echo::print_step(2, 3, "Parsing article");
    }

    let started = Instant::now();
    let article = args
        .render
        .reader()
        .parse(&input, format)
        .with_context(|| format!("Failed to parse {}", args.input))?;

    if verbose {
        echo::print_timing("Parse", started.elapsed());
        echo::print_article_summary(&article);
        echo::print_step(3, 3, "Writing output");
    }

    let output = args.render.render(&article, args.format).context("Failed to render article")?;

    match &args.output {
        Some(path) => {
            write_output(path, &output)?;
            if !quiet {
                echo::print_success(&format!("Wrote {}", path.display()));
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            if !output.ends_with('\n') {
                writeln!(stdout)?;
            }
        }
    }

    Ok(())
}

fn convert_one(path: &Path, out_path: &Path, args: &BatchArgs, reader: &Reader) -> anyhow::Result<()> {
    let format = args.input_format.resolve(path)?;
    let input = read_file(path)?;
    let article = reader.parse(&input, format)?;
    let output = args.render.render(&article, args.format)?;
    write_output(out_path, &output)
}

fn run_batch(args: &BatchArgs, quiet: bool) -> anyhow::Result<()> {
    let files = collect_input_files(&args.input)
        .with_context(|| format!("Failed to list input directory: {}", args.input.display()))?;

    if files.is_empty() {
        if !quiet {
            echo::print_warning("No .html/.xml files in directory.");
        }
        return Ok(());
    }

    fs::create_dir_all(&args.output)
        .with_context(|| format!("Failed to create output directory: {}", args.output.display()))?;

    let ext = OutputFormat::from(args.format).extension();
    let reader = args.render.reader();

    let pb = if quiet { ProgressBar::hidden() } else { ProgressBar::new(files.len() as u64) };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let (mut ok, mut skipped, mut failed) = (0usize, 0usize, 0usize);

    for path in &files {
        let rel = path.strip_prefix(&args.input).unwrap_or(path);
        let out_path = args.output.join(rel).with_extension(ext);
        pb.set_message(rel.display().to_string());

        if out_path.exists() && !args.force {
            skipped += 1;
            pb.inc(1);
            continue;
        }

        match convert_one(path, &out_path, args, &reader) {
            Ok(()) => ok += 1,
            Err(e) => {
                failed += 1;
                tracing::warn!(file = %path.display(), error = %e, "conversion failed");
                pb.suspend(|| echo::print_error(&format!("Failed {}: {:#}", rel.display(), e)));
            }
        }
        pb.inc(1);
    }

    pb.finish_and_clear();

    let mut summary = format!("Done. {}/{} files converted.", ok, files.len());
    if skipped > 0 {
        summary.push_str(&format!(" {} skipped (already exist).", skipped));
    }
    if failed > 0 {
        summary.push_str(&format!(" {} failed.", failed));
    }
    println!("{}", summary);

    if failed > 0 {
        bail!("{} of {} files failed to convert", failed, files.len());
    }

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Command::Convert(args) => run_convert(args, cli.verbose, cli.quiet),
        Command::Batch(args) => run_batch(args, cli.quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            echo::print_error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}
