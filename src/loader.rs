use crate::error::{Result, SubtrackError};
use crate::source;
use crate::subtitle::bitmap::BitmapDecoder;
use crate::subtitle::{create_parser, CueTrack, Format};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// How a subtitle file should be loaded.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Forced format. Detected from the path and contents when `None`.
    pub format: Option<Format>,
    /// Encoding name passed to the text reader.
    pub encoding: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            format: None,
            encoding: "utf-8".to_string(),
        }
    }
}

/// Statistics from loading one file.
#[derive(Debug, Clone)]
pub struct LoadStats {
    /// Time spent reading and parsing.
    pub parse_time: Duration,
    /// Number of cues in the track.
    pub cues: usize,
    /// Whether the query engine will join concurrent cues.
    pub overlapping: bool,
}

#[derive(Debug)]
pub struct LoadResult {
    pub path: PathBuf,
    pub format: Format,
    pub track: CueTrack,
    pub stats: LoadStats,
}

/// Read, decode and parse a text subtitle file.
pub fn load_subtitles(path: &Path, config: &LoadConfig) -> Result<LoadResult> {
    let start_time = Instant::now();

    let text = source::read_text(path, &config.encoding)?;
    let format = match config.format {
        Some(format) => format,
        None => Format::detect(path, &text).ok_or_else(|| {
            SubtrackError::UnsupportedFormat(format!(
                "cannot detect subtitle format of {}",
                path.display()
            ))
        })?,
    };

    info!("Parsing {:?} as {}", path, format);
    let track = create_parser(format)?.parse(&text)?;

    if track.is_empty() {
        warn!("No cues found in {:?}", path);
    }

    let stats = LoadStats {
        parse_time: start_time.elapsed(),
        cues: track.len(),
        overlapping: track.is_overlapping(),
    };
    info!("Loaded {} cues in {:.2?}", stats.cues, stats.parse_time);

    Ok(LoadResult {
        path: path.to_path_buf(),
        format,
        track,
        stats,
    })
}

/// Feed a recorded binary caption stream into a fresh decoder.
///
/// A truncated final packet is logged and dropped; everything before it is kept.
pub fn load_bitmap_stream(path: &Path) -> Result<BitmapDecoder> {
    if !path.exists() {
        return Err(SubtrackError::FileNotFound(path.display().to_string()));
    }

    let bytes = std::fs::read(path)?;
    let mut decoder = BitmapDecoder::new();
    match decoder.feed(&bytes) {
        Ok(count) => info!("Stored {} bitmap packets from {:?}", count, path),
        Err(SubtrackError::Truncated {
            expected,
            available,
        }) => warn!(
            "Ignoring truncated final packet in {:?} ({} of {} bytes)",
            path, available, expected
        ),
        Err(e) => return Err(e),
    }

    Ok(decoder)
}

/// Print a human-readable summary of a load to stderr.
pub fn print_summary(result: &LoadResult) {
    let mut err = std::io::stderr().lock();
    if let Err(e) = write_summary(&mut err, result) {
        warn!("Failed to write load summary: {}", e);
    }
}

/// Write the load summary to any writer.
pub fn write_summary<W: Write>(out: &mut W, result: &LoadResult) -> std::io::Result<()> {
    writeln!(out)?;
    writeln!(out, "═══════════════════════════════════════════════════════════════")?;
    writeln!(out, "                        Subtitle Track Loaded                  ")?;
    writeln!(out, "═══════════════════════════════════════════════════════════════")?;
    writeln!(out)?;
    writeln!(out, "  File:        {}", result.path.display())?;
    writeln!(out, "  Format:      {}", result.format)?;
    writeln!(out, "  Cues:        {}", result.stats.cues)?;
    writeln!(
        out,
        "  Overlapping: {}",
        if result.stats.overlapping { "yes" } else { "no" }
    )?;
    if let (Some(first), Some(last)) = (result.track.cues().first(), result.track.cues().last()) {
        writeln!(out, "  Span:        {} → {}", first.begin, last.end)?;
    }
    writeln!(out)?;
    writeln!(
        out,
        "  Parse time:  {:.2}ms",
        result.stats.parse_time.as_secs_f64() * 1000.0
    )?;
    writeln!(out)?;
    writeln!(out, "═══════════════════════════════════════════════════════════════")
}
