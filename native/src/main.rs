//! datasrc CLI - parse, rewrite and load data-source containers off the browser
//!
//! # Commands
//!
//! ```bash
//! datasrc parse people.csv              # Delimited text to JSON
//! datasrc rewrite card.html --wrap row  # Template directives to petite-vue
//! datasrc sniff https://x.test/a.csv    # Which decoder a source would get
//! datasrc load data/people.csv          # Fetch and decode like a container
//! datasrc run page.json                 # Dry run of a whole page
//! ```

use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use datasrc::{
    decide, load, parse, parse_delimiter, rewrite, scope_expression, to_delimited, wrap_presentation,
    ContainerDescriptor, EventLevel, HeaderMode, LifecycleEvent, PayloadFormat, TabularOptions,
};
use datasrc_native::{current_dir_url, decode_body, detect_delimiter, render_page, HttpFetcher, PageManifest};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "datasrc")]
#[command(about = "Parse, rewrite and load declarative data-source containers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a delimited text file and output JSON
    Parse {
        /// Input file
        input: PathBuf,

        /// Delimiter, one character or \t (auto-detect if not specified)
        #[arg(short, long, value_parser = parse_delimiter)]
        delimiter: Option<char>,

        /// Header row: auto, true or false
        #[arg(long, default_value = "auto")]
        header: HeaderMode,

        /// Keep surrounding whitespace in cells
        #[arg(long)]
        no_trim: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rewrite template directives into petite-vue directives
    Rewrite {
        /// Template file
        input: PathBuf,

        /// Also wrap in the presentation shell with this binding
        #[arg(long)]
        wrap: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show which decoder a source would get
    Sniff {
        /// Source locator as written on the container
        source: String,

        /// Content type announced by the server
        #[arg(long)]
        content_type: Option<String>,

        /// Format override: csv or json
        #[arg(long = "type")]
        format: Option<PayloadFormat>,

        /// Base URL for relative sources
        #[arg(long)]
        base: Option<Url>,
    },

    /// Fetch and decode a source the way a container would
    Load {
        /// URL, file: URL or path relative to the base
        source: String,

        /// Format override: csv or json
        #[arg(long = "type")]
        format: Option<PayloadFormat>,

        /// Delimiter, one character or \t
        #[arg(short, long, value_parser = parse_delimiter, default_value = ",")]
        delimiter: char,

        /// Header row: auto, true or false
        #[arg(long, default_value = "auto")]
        header: HeaderMode,

        /// Keep surrounding whitespace in cells
        #[arg(long)]
        no_trim: bool,

        /// Base URL for relative sources (default: current directory)
        #[arg(long)]
        base: Option<Url>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Dry run of every container in a page manifest
    Run {
        /// Page manifest (JSON)
        page: PathBuf,

        /// Base URL when the manifest has no location (default: manifest directory)
        #[arg(long)]
        base: Option<Url>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Delimited,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Parse {
            input,
            delimiter,
            header,
            no_trim,
            format,
            output,
        } => cmd_parse(&input, delimiter, header, !no_trim, format, output.as_deref()),

        Commands::Rewrite { input, wrap, output } => cmd_rewrite(&input, wrap.as_deref(), output.as_deref()),

        Commands::Sniff {
            source,
            content_type,
            format,
            base,
        } => cmd_sniff(&source, content_type.as_deref(), format, base.as_ref()),

        Commands::Load {
            source,
            format,
            delimiter,
            header,
            no_trim,
            base,
            output,
        } => {
            let options = TabularOptions::default()
                .with_delimiter(delimiter)
                .with_header(header)
                .with_trim(!no_trim);
            cmd_load(source, format, options, base, output.as_deref()).await
        }

        Commands::Run { page, base, output } => cmd_run(&page, base, output.as_deref()).await,
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    header: HeaderMode,
    trim: bool,
    format: OutputFormat,
    output: Option<&Path>,
) -> CliResult {
    eprintln!("📄 Parsing: {}", input.display());

    let bytes = fs::read(input)?;
    let text = decode_body(&bytes, None);

    let used_delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&text));
    eprintln!(
        "   Delimiter: '{}'{}",
        format_delimiter(used_delimiter),
        if delimiter.is_none() { " (auto-detected)" } else { "" }
    );

    let options = TabularOptions {
        delimiter: used_delimiter,
        trim,
        header,
    };
    let table = parse(&text, &options);

    match table.headers() {
        Some(headers) => eprintln!("   Columns: {}", headers.join(", ")),
        None => eprintln!("   No header row"),
    }
    eprintln!("✅ Parsed {} rows", table.len());

    let content = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&table.to_value())?,
        OutputFormat::Delimited => to_delimited(&table, used_delimiter),
    };
    write_output(&content, output)
}

fn cmd_rewrite(input: &Path, wrap: Option<&str>, output: Option<&Path>) -> CliResult {
    eprintln!("📝 Rewriting: {}", input.display());

    let markup = fs::read_to_string(input)?;
    let template = rewrite(&markup);

    let content = match wrap {
        Some(binding) => {
            eprintln!("   v-scope: {}", scope_expression(binding));
            wrap_presentation(&template)
        }
        None => template,
    };
    write_output(&content, output)
}

fn cmd_sniff(
    source: &str,
    content_type: Option<&str>,
    format: Option<PayloadFormat>,
    base: Option<&Url>,
) -> CliResult {
    let decided = decide(source, content_type, format, base);
    println!("{}", decided);
    Ok(())
}

async fn cmd_load(
    source: String,
    format: Option<PayloadFormat>,
    tabular: TabularOptions,
    base: Option<Url>,
    output: Option<&Path>,
) -> CliResult {
    let base = match base {
        Some(base) => base,
        None => current_dir_url()?,
    };
    eprintln!("📡 Loading: {}", source);

    let descriptor = ContainerDescriptor {
        source,
        binding: datasrc::config::DEFAULT_BINDING.to_string(),
        format,
        tabular,
        original_markup: String::new(),
    };
    let data = load(&HttpFetcher::new(), &descriptor, Some(&base)).await?;

    eprintln!("✅ Loaded");
    let content = serde_json::to_string_pretty(&data)?;
    write_output(&content, output)
}

async fn cmd_run(page: &Path, base: Option<Url>, output: Option<&Path>) -> CliResult {
    eprintln!("📄 Page: {}", page.display());

    let manifest: PageManifest = serde_json::from_str(&fs::read_to_string(page)?)?;
    let base = match base {
        Some(base) => base,
        None => {
            let dir = fs::canonicalize(page)?
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default();
            datasrc_native::directory_url(&dir)?
        }
    };

    let outcome = render_page(&manifest, base, HttpFetcher::new()).await;
    for event in &outcome.events {
        print_event(event);
    }

    match (&outcome.report, &outcome.error) {
        (Some(report), _) => eprintln!(
            "\n📊 Results: {} ready, {} failed",
            report.ready_count(),
            report.failed_count()
        ),
        (None, Some(error)) => eprintln!("\n❌ Page failed: {}", error),
        (None, None) => {}
    }

    let content = serde_json::to_string_pretty(&outcome)?;
    write_output(&content, output)
}

fn print_event(event: &LifecycleEvent) {
    let prefix = match event.level {
        EventLevel::Info => "   ",
        EventLevel::Success => "✅ ",
        EventLevel::Warning => "⚠️  ",
        EventLevel::Error => "❌ ",
    };
    match event.container {
        Some(id) => eprintln!("{}[{}] {}", prefix, id, event.message),
        None => eprintln!("{}{}", prefix, event.message),
    }
}

fn write_output(content: &str, path: Option<&Path>) -> CliResult {
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
