// LRC lyrics format
use super::{sanitize, Cue, CueTrack, Format, SubtitleParser, Timestamp};
use crate::error::{Result, SubtrackError};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

/// How long the final line stays up, since nothing follows it.
const LAST_LINE_DURATION_MS: i64 = 1000;

static TIME_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[(\d+):(\d{1,2})(?:[.:](\d{1,3}))?\]").expect("static LRC time pattern")
});

static ID_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[([A-Za-z#]+):([^\]]*)\]").expect("static LRC id pattern")
});

struct Line {
    arrival: usize,
    begin: Timestamp,
    text: String,
}

pub struct LrcParser;

impl SubtitleParser for LrcParser {
    fn parse(&self, text: &str) -> Result<CueTrack> {
        let mut track = CueTrack::new(Format::Lrc);
        if text.trim().is_empty() {
            return Ok(track);
        }

        let mut offset_ms: i64 = 0;
        let mut lines: Vec<Line> = Vec::new();

        for raw in text.lines() {
            let mut rest = raw.trim_start_matches('\u{feff}').trim();
            let mut times = Vec::new();

            while let Some(caps) = TIME_TAG.captures(rest) {
                times.push(parse_time(&caps));
                rest = &rest[caps.get(0).map_or(0, |m| m.end())..];
            }

            if times.is_empty() {
                if let Some(caps) = ID_TAG.captures(rest) {
                    let key = caps.get(1).map_or("", |m| m.as_str());
                    let value = caps.get(2).map_or("", |m| m.as_str()).trim();
                    if key.eq_ignore_ascii_case("offset") {
                        offset_ms = value.parse().unwrap_or_else(|_| {
                            debug!("Ignoring unparseable LRC offset {:?}", value);
                            0
                        });
                    }
                } else if !rest.is_empty() {
                    debug!("Skipping LRC line without time tag: {:?}", rest);
                }
                continue;
            }

            let text = sanitize::strip(rest, Format::Lrc);
            for begin in times {
                lines.push(Line {
                    arrival: lines.len() + 1,
                    begin,
                    text: text.clone(),
                });
            }
        }

        if lines.is_empty() {
            return Err(SubtrackError::malformed(
                Format::Lrc,
                "no '[mm:ss.xx]' time tag found",
            ));
        }

        if offset_ms != 0 {
            for line in &mut lines {
                line.begin = Timestamp::from_millis(line.begin.total_ms().saturating_sub(offset_ms));
            }
        }

        // Repeated tags on one line put later times before earlier lines.
        lines.sort_by_key(|line| line.begin.total_ms());

        let ends: Vec<i64> = lines
            .iter()
            .skip(1)
            .map(|next| next.begin.total_ms())
            .chain(
                lines
                    .last()
                    .map(|last| last.begin.total_ms().saturating_add(LAST_LINE_DURATION_MS)),
            )
            .collect();

        for (line, end) in lines.into_iter().zip(ends) {
            track.insert(Cue::text(
                line.arrival,
                line.begin,
                Timestamp::from_millis(end),
                line.text,
                Format::Lrc,
            ));
        }

        Ok(track)
    }

    fn format(&self) -> Format {
        Format::Lrc
    }
}

fn parse_time(caps: &regex::Captures<'_>) -> Timestamp {
    let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());

    let minutes: u32 = group(1).parse().unwrap_or(0);
    let seconds: u32 = group(2).parse().unwrap_or(0);
    let fraction = group(3);
    let millis = match fraction.len() {
        0 => 0,
        1 => fraction.parse::<u32>().unwrap_or(0) * 100,
        2 => fraction.parse::<u32>().unwrap_or(0) * 10,
        _ => fraction.parse::<u32>().unwrap_or(0),
    };

    Timestamp::from_components(minutes / 60, minutes % 60, seconds, millis)
}
