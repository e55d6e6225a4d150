// SSA / ASS dialogue events
use super::{sanitize, Cue, CueTrack, Format, SubtitleParser, Timestamp};
use crate::error::{Result, SubtrackError};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

const DEFAULT_FIELDS: [&str; 10] = [
    "Layer", "Start", "End", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect", "Text",
];

static TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+):(\d{1,2}):(\d{1,2})[.:](\d{1,3})$").expect("static SSA time pattern")
});

// Text made only of {\move(...)} blocks.
static MOVE_ONLY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\{[^}]*\\move\([^}]*\})+\s*$").expect("static SSA move pattern")
});

/// Positions of the fields the parser needs within a dialogue line.
#[derive(Debug, Clone, Copy)]
struct Layout {
    start: usize,
    end: usize,
    text: usize,
}

impl Layout {
    fn from_fields(fields: &[&str]) -> Option<Self> {
        let find = |name: &str| {
            fields
                .iter()
                .position(|f| f.trim().eq_ignore_ascii_case(name))
        };
        let text = find("Text")?;
        // Text swallows the rest of the line, so it has to be last.
        if text + 1 != fields.len() {
            return None;
        }
        Some(Layout {
            start: find("Start")?,
            end: find("End")?,
            text,
        })
    }
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            start: 1,
            end: 2,
            text: DEFAULT_FIELDS.len() - 1,
        }
    }
}

pub struct SsaParser;

impl SubtitleParser for SsaParser {
    fn parse(&self, text: &str) -> Result<CueTrack> {
        let mut track = CueTrack::new(Format::Ssa);
        if text.trim().is_empty() {
            return Ok(track);
        }

        let mut in_events = false;
        let mut saw_events = false;
        let mut saw_dialogue = false;
        let mut layout = Layout::default();
        let mut sequence = 0;

        for line in text.lines() {
            let line = line.trim_start_matches('\u{feff}').trim();

            if line.starts_with('[') {
                in_events = line.eq_ignore_ascii_case("[events]");
                saw_events |= in_events;
                continue;
            }

            if in_events {
                if let Some(columns) = line.strip_prefix("Format:") {
                    let fields: Vec<&str> = columns.split(',').collect();
                    match Layout::from_fields(&fields) {
                        Some(parsed) => layout = parsed,
                        None => debug!("Ignoring unusable SSA Format line: {:?}", line),
                    }
                    continue;
                }
            }

            let Some(rest) = line.strip_prefix("Dialogue:") else {
                continue;
            };
            saw_dialogue = true;

            match parse_dialogue(rest, layout) {
                Some((begin, end, text)) => {
                    sequence += 1;
                    track.insert(Cue::text(sequence, begin, end, text, Format::Ssa));
                }
                None => debug!("Skipping malformed SSA dialogue: {:?}", line),
            }
        }

        if !saw_dialogue && !saw_events {
            return Err(SubtrackError::malformed(
                Format::Ssa,
                "no [Events] section or Dialogue: line found",
            ));
        }

        Ok(track)
    }

    fn format(&self) -> Format {
        Format::Ssa
    }
}

fn parse_dialogue(rest: &str, layout: Layout) -> Option<(Timestamp, Timestamp, String)> {
    let fields: Vec<&str> = rest.splitn(layout.text + 1, ',').collect();
    if fields.len() <= layout.text {
        return None;
    }

    let begin = parse_time(fields.get(layout.start)?.trim())?;
    let end = parse_time(fields.get(layout.end)?.trim())?;
    let raw = fields[layout.text];

    // Positioned-only and move-only events keep their timing slot but show nothing.
    let text = if raw.starts_with(r"{\pos(") || MOVE_ONLY.is_match(raw) {
        String::new()
    } else {
        sanitize::strip(raw, Format::Ssa)
    };

    Some((begin, end, text))
}

/// Parse `H:MM:SS.cc`. Two fractional digits are centiseconds.
fn parse_time(s: &str) -> Option<Timestamp> {
    let caps = TIME.captures(s)?;
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    let hour = group(1).parse().ok()?;
    let minute = group(2).parse().ok()?;
    let second = group(3).parse().ok()?;
    let fraction = group(4);
    let value: u32 = fraction.parse().ok()?;
    let millis = match fraction.len() {
        1 => value * 100,
        2 => value * 10,
        _ => value,
    };

    Some(Timestamp::from_components(hour, minute, second, millis))
}
