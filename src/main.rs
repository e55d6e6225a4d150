use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use subtrack::config::Config;
use subtrack::loader::{load_bitmap_stream, load_subtitles, print_summary, LoadConfig};
use subtrack::subtitle::json::JsonPrinter;
use subtrack::subtitle::{create_printer, Format, Payload, QueryEngine, Shown, SubtitlePrinter};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "subtrack")]
#[command(version, about = "Subtitle parsing and playback-time cue matching")]
#[command(long_about = "Parse SRT, SSA/ASS, LRC, MicroDVD, TTML and legacy XML subtitles \
or binary bitmap caption streams, and answer what is on screen at a given time.")]
struct Cli {
    /// Input subtitle file
    input: PathBuf,

    /// Input format: srt, ssa, lrc, sub, ttml, legacyxml, binary (detected from extension if omitted)
    #[arg(short, long)]
    format: Option<String>,

    /// Text encoding: utf-8, utf-16le, utf-16be, iso-8859-1
    #[arg(short, long)]
    encoding: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the parsed track
    Dump {
        #[arg(short, long, value_enum, default_value_t = DumpFormat::Srt)]
        output: DumpFormat,
    },
    /// Show what is on screen at the given times (milliseconds)
    Query {
        #[arg(long = "at", required = true, num_args = 1..)]
        at: Vec<i64>,
    },
    /// Simulate playback between two times, polling at the configured tick
    Play {
        #[arg(long, default_value = "0")]
        from: i64,
        #[arg(long)]
        to: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DumpFormat {
    Srt,
    Sub,
    Json,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

fn describe(shown: &Shown) -> String {
    match &shown.payload {
        Payload::Text(text) if text.is_empty() => "(nothing)".to_string(),
        Payload::Text(text) => format!("{:?}", text),
        Payload::Bitmap(bitmap) => format!("<bitmap {}x{}>", bitmap.width, bitmap.height),
    }
}

/// Anything that answers "what is showing at `ms`".
trait Lookup {
    fn lookup(&mut self, ms: i64) -> Option<Shown>;
}

impl Lookup for QueryEngine {
    fn lookup(&mut self, ms: i64) -> Option<Shown> {
        self.query(ms)
    }
}

impl Lookup for subtrack::subtitle::bitmap::BitmapDecoder {
    fn lookup(&mut self, ms: i64) -> Option<Shown> {
        self.query(ms)
    }
}

fn open_lookup(input: &Path, load_config: &LoadConfig) -> Result<Box<dyn Lookup>> {
    if load_config.format == Some(Format::Binary) {
        let decoder = load_bitmap_stream(input).context("Failed to read bitmap stream")?;
        return Ok(Box::new(decoder));
    }

    let result = load_subtitles(input, load_config).context("Failed to load subtitles")?;
    Ok(Box::new(QueryEngine::new(result.track)))
}

fn run_query(lookup: &mut dyn Lookup, times: &[i64]) {
    for &ms in times {
        match lookup.lookup(ms) {
            Some(shown) => println!(
                "{:>10} ms  [{} - {}]  {}",
                ms,
                shown.begin,
                shown.end,
                describe(&shown)
            ),
            None => println!("{:>10} ms  no subtitles", ms),
        }
    }
}

fn run_play(lookup: &mut dyn Lookup, from: i64, to: i64, tick_ms: u64) {
    let tick = tick_ms.min(i64::MAX as u64) as i64;
    let mut last: Option<String> = None;
    let mut ms = from;

    while ms <= to {
        let line = lookup.lookup(ms).map(|shown| describe(&shown));
        if line != last {
            println!("{:>10} ms  {}", ms, line.as_deref().unwrap_or("no subtitles"));
            last = line;
        }
        ms = match ms.checked_add(tick) {
            Some(next) => next,
            None => break,
        };
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    // Validate input file exists
    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    // Load and validate configuration
    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    // Parse format
    let format = match cli.format {
        Some(ref name) => Some(
            name.parse::<Format>()
                .map_err(|e: String| anyhow::anyhow!(e))?,
        ),
        None => config.default_format,
    };

    let load_config = LoadConfig {
        format,
        encoding: cli.encoding.unwrap_or_else(|| config.default_encoding.clone()),
    };

    info!("Input:    {}", cli.input.display());
    info!("Encoding: {}", load_config.encoding);

    match cli.command {
        Command::Dump { output } => {
            let result = load_subtitles(&cli.input, &load_config).context("Failed to load subtitles")?;
            let text = match output {
                DumpFormat::Srt => create_printer(Format::Srt)?.print_track(&result.track)?,
                DumpFormat::Sub => create_printer(Format::MicroDvd)?
                    .print_track(&result.track)
                    .context("Track has no frame numbers; only MicroDVD input can be dumped as sub")?,
                DumpFormat::Json => JsonPrinter {
                    source_file: Some(cli.input.display().to_string()),
                }
                .print_track(&result.track)?,
            };
            print!("{}", text);
            print_summary(&result);
        }
        Command::Query { at } => {
            let mut lookup = open_lookup(&cli.input, &load_config)?;
            run_query(lookup.as_mut(), &at);
        }
        Command::Play { from, to } => {
            if to < from {
                anyhow::bail!("--to ({}) must not be before --from ({})", to, from);
            }
            let mut lookup = open_lookup(&cli.input, &load_config)?;
            info!("Playing {} ms to {} ms every {} ms", from, to, config.tick_ms);
            run_play(lookup.as_mut(), from, to, config.tick_ms);
        }
    }

    Ok(())
}
