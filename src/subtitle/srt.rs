// SRT subtitle format
use super::{sanitize, Cue, CueTrack, Format, SubtitleParser, SubtitlePrinter, Timestamp};
use crate::error::{Result, SubtrackError};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::debug;

static TIMING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})\s*-->\s*(\d+):(\d{1,2}):(\d{1,2})[,.](\d{1,3})",
    )
    .expect("static SRT timing pattern")
});

pub struct SrtParser;

impl SubtitleParser for SrtParser {
    fn parse(&self, text: &str) -> Result<CueTrack> {
        let mut track = CueTrack::new(Format::Srt);
        if text.trim().is_empty() {
            return Ok(track);
        }

        let mut saw_timing = false;
        let mut sequence = 0;

        for block in blocks(text) {
            let timings: Vec<usize> = block
                .iter()
                .enumerate()
                .filter(|(_, l)| TIMING.is_match(l))
                .map(|(i, _)| i)
                .collect();

            if timings.is_empty() {
                debug!("Skipping SRT block without timing line: {:?}", block[0]);
                continue;
            }
            saw_timing = true;

            for (k, &pos) in timings.iter().enumerate() {
                let Some(caps) = TIMING.captures(block[pos]) else {
                    continue;
                };

                // A timing line inside a block opens a new cue; its index line goes with it.
                let mut stop = timings.get(k + 1).copied().unwrap_or(block.len());
                if stop < block.len() && stop > pos + 1 && is_index(block[stop - 1]) {
                    stop -= 1;
                }

                sequence += 1;
                track.insert(Cue::text(
                    sequence,
                    timestamp_from(&caps, 1),
                    timestamp_from(&caps, 5),
                    sanitize::strip(&block[pos + 1..stop].join("\n"), Format::Srt),
                    Format::Srt,
                ));
            }
        }

        if !saw_timing {
            return Err(SubtrackError::malformed(
                Format::Srt,
                "no 'HH:MM:SS,mmm --> HH:MM:SS,mmm' timing line found",
            ));
        }

        Ok(track)
    }

    fn format(&self) -> Format {
        Format::Srt
    }
}

/// Non-empty runs of lines separated by blank or whitespace-only lines.
fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        let line = line.trim_start_matches('\u{feff}').trim_end();
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn is_index(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

/// Read four capture groups starting at `first` as h/m/s/ms.
fn timestamp_from(caps: &Captures<'_>, first: usize) -> Timestamp {
    let field = |i: usize| -> u32 {
        caps.get(first + i)
            .map_or("", |m| m.as_str())
            .parse()
            .unwrap_or(0)
    };
    let ms_digits = caps.get(first + 3).map_or("", |m| m.as_str());
    // "5" after the comma means 500 ms, not 5.
    let millis = match ms_digits.len() {
        1 => field(3) * 100,
        2 => field(3) * 10,
        _ => field(3),
    };
    Timestamp::from_components(field(0), field(1), field(2), millis)
}

pub struct SrtPrinter;

impl SubtitlePrinter for SrtPrinter {
    fn print(&self, cue: &Cue) -> Result<String> {
        Ok(format!(
            "{}\n{} --> {}\n{}\n\n",
            cue.sequence,
            cue.begin.to_srt()?,
            cue.end.to_srt()?,
            cue.payload.text().unwrap_or_default()
        ))
    }

    fn extension(&self) -> &'static str {
        "srt"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,500 --> 00:00:04,000\nHello, world!\n\n2\n00:00:04,500 --> 00:00:07,000\n<i>This is</i>\na test.\n";

    #[test]
    fn test_parse_basic() {
        let track = SrtParser.parse(SAMPLE).unwrap();
        assert_eq!(track.len(), 2);

        let first = track.get(0).unwrap();
        assert_eq!(first.begin.total_ms(), 1500);
        assert_eq!(first.end.total_ms(), 4000);
        assert_eq!(first.payload.text(), Some("Hello, world!"));

        let second = track.get(1).unwrap();
        assert_eq!(second.sequence, 2);
        assert_eq!(second.payload.text(), Some("This is\na test."));
    }

    #[test]
    fn test_parse_crlf_and_short_millis() {
        let text = "1\r\n0:00:02.5 --> 0:00:03,25\r\nShort\r\n";
        let track = SrtParser.parse(text).unwrap();
        let cue = track.get(0).unwrap();
        assert_eq!(cue.begin.total_ms(), 2500);
        assert_eq!(cue.end.total_ms(), 3250);
    }

    #[test]
    fn test_parse_skips_bad_block() {
        let text = "1\nnot a timing line\nText\n\n2\n00:00:05,000 --> 00:00:06,000\nKept\n";
        let track = SrtParser.parse(text).unwrap();
        assert_eq!(track.len(), 1);
        assert_eq!(track.get(0).unwrap().payload.text(), Some("Kept"));
    }

    #[test]
    fn test_parse_whitespace_separator_line() {
        let text = "1\n00:00:01,000 --> 00:00:02,000\nOne\n \t\n2\n00:00:03,000 --> 00:00:04,000\nTwo\n";
        let track = SrtParser.parse(text).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.get(0).unwrap().payload.text(), Some("One"));

        let second = track.get(1).unwrap();
        assert_eq!(second.begin.total_ms(), 3000);
        assert_eq!(second.payload.text(), Some("Two"));
    }

    #[test]
    fn test_parse_missing_separator_line() {
        let text = "1\n00:00:01,000 --> 00:00:02,000\nOne\n2\n00:00:03,000 --> 00:00:04,000\nTwo\n";
        let track = SrtParser.parse(text).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.get(0).unwrap().payload.text(), Some("One"));
        assert_eq!(track.get(1).unwrap().payload.text(), Some("Two"));
    }

    #[test]
    fn test_parse_malformed() {
        let result = SrtParser.parse("just some words\nwith no timing\n");
        assert!(matches!(
            result,
            Err(SubtrackError::MalformedInput { format: Format::Srt, .. })
        ));
    }

    #[test]
    fn test_parse_empty_is_ok() {
        assert!(SrtParser.parse("  \n\n").unwrap().is_empty());
    }

    #[test]
    fn test_print() {
        let cue = Cue::text(
            1,
            Timestamp::from_millis(1500),
            Timestamp::from_millis(3_661_123),
            "Hello",
            Format::Srt,
        );
        assert_eq!(
            SrtPrinter.print(&cue).unwrap(),
            "1\n00:00:01,500 --> 01:01:01,123\nHello\n\n"
        );
    }

    #[test]
    fn test_print_unset_time() {
        let cue = Cue::text(1, Timestamp::default(), Timestamp::from_millis(10), "x", Format::Srt);
        assert!(matches!(SrtPrinter.print(&cue), Err(SubtrackError::TimeNotSet)));
    }

    #[test]
    fn test_round_trip() {
        let track = SrtParser.parse(SAMPLE).unwrap();
        let printed = SrtPrinter.print_track(&track).unwrap();
        let reparsed = SrtParser.parse(&printed).unwrap();

        assert_eq!(track.len(), reparsed.len());
        for (a, b) in track.iter().zip(reparsed.iter()) {
            assert_eq!(a.begin.total_ms(), b.begin.total_ms());
            assert_eq!(a.end.total_ms(), b.end.total_ms());
            assert_eq!(a.payload, b.payload);
        }
    }
}
