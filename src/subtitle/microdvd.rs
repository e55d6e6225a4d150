// MicroDVD (.sub) format: {startFrame}{endFrame}text
use super::{sanitize, Cue, CueTrack, Format, SubtitleParser, SubtitlePrinter, Timestamp};
use crate::error::{Result, SubtrackError};
use regex::Regex;
use std::sync::LazyLock;
use tracing::debug;

static ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\{(\d+)\}\{(\d*)\}(.*)$").expect("static MicroDVD pattern")
});

struct Entry {
    begin: u64,
    end: Option<u64>,
    text: String,
}

pub struct MicroDvdParser;

impl SubtitleParser for MicroDvdParser {
    fn parse(&self, text: &str) -> Result<CueTrack> {
        let mut track = CueTrack::new(Format::MicroDvd);
        if text.trim().is_empty() {
            return Ok(track);
        }

        let mut entries: Vec<Entry> = Vec::new();
        let mut saw_entry = false;

        for line in text.lines() {
            let line = line.trim_start_matches('\u{feff}').trim();
            let Some(caps) = ENTRY.captures(line) else {
                if !line.is_empty() {
                    debug!("Skipping MicroDVD line: {:?}", line);
                }
                continue;
            };
            saw_entry = true;

            let group = |i: usize| caps.get(i).map_or("", |m| m.as_str());
            let Ok(begin) = group(1).parse::<u64>() else {
                debug!("Skipping MicroDVD line with bad start frame: {:?}", line);
                continue;
            };
            let end = group(2).parse::<u64>().ok();
            let body = group(3);

            // {1}{1}23.976 declares the frame rate rather than a cue.
            if entries.is_empty() && begin == 1 && end == Some(1) && body.trim().parse::<f64>().is_ok() {
                debug!("MicroDVD frame rate header: {}", body.trim());
                continue;
            }

            entries.push(Entry {
                begin,
                end,
                text: sanitize::strip(&body.replace('|', "\n"), Format::MicroDvd),
            });
        }

        if !saw_entry {
            return Err(SubtrackError::malformed(
                Format::MicroDvd,
                "no '{start}{end}text' entry found",
            ));
        }

        let next_begins: Vec<Option<u64>> = entries
            .iter()
            .skip(1)
            .map(|e| Some(e.begin))
            .chain(std::iter::once(None))
            .collect();

        for (i, (entry, next_begin)) in entries.into_iter().zip(next_begins).enumerate() {
            let end = entry.end.or(next_begin).unwrap_or(entry.begin);
            track.insert(Cue::text(
                i + 1,
                Timestamp::from_frame(entry.begin),
                Timestamp::from_frame(end),
                entry.text,
                Format::MicroDvd,
            ));
        }

        Ok(track)
    }

    fn format(&self) -> Format {
        Format::MicroDvd
    }
}

pub struct MicroDvdPrinter;

impl SubtitlePrinter for MicroDvdPrinter {
    fn print(&self, cue: &Cue) -> Result<String> {
        Ok(format!(
            "{{{}}}{{{}}}{}\n",
            cue.begin.frame()?,
            cue.end.frame()?,
            cue.payload.text().unwrap_or_default().replace('\n', "|")
        ))
    }

    fn extension(&self) -> &'static str {
        "sub"
    }
}
