// TTML-style <p begin end> subtitles
use super::{sanitize, Cue, CueTrack, Format, SubtitleParser, Timestamp};
use crate::error::{Result, SubtrackError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

/// A `<p>` element being collected.
struct Paragraph {
    begin: Option<Timestamp>,
    end: Option<Timestamp>,
    text: String,
    depth: usize,
}

impl Paragraph {
    fn open(element: &BytesStart<'_>) -> Self {
        let mut begin = None;
        let mut end = None;

        for attr in element.attributes().flatten() {
            let Ok(value) = attr.unescape_value() else {
                continue;
            };
            match attr.key.local_name().as_ref() {
                b"begin" => begin = parse_time(&value),
                b"end" => end = parse_time(&value),
                _ => {}
            }
        }

        Paragraph {
            begin,
            end,
            text: String::new(),
            depth: 1,
        }
    }
}

pub struct TtmlParser;

impl SubtitleParser for TtmlParser {
    fn parse(&self, text: &str) -> Result<CueTrack> {
        let mut track = CueTrack::new(Format::Ttml);
        if text.trim().is_empty() {
            return Ok(track);
        }

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(false);

        let mut saw_element = false;
        let mut current: Option<Paragraph> = None;
        let mut sequence = 0;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(SubtrackError::malformed_with(
                        Format::Ttml,
                        format!("invalid XML near byte {}", reader.buffer_position()),
                        e,
                    ))
                }
            };

            match event {
                Event::Start(e) => {
                    saw_element = true;
                    match current.as_mut() {
                        Some(p) => {
                            p.depth += 1;
                            if e.local_name().as_ref() == b"br" {
                                p.text.push('\n');
                            }
                        }
                        None if e.local_name().as_ref() == b"p" => {
                            current = Some(Paragraph::open(&e));
                        }
                        None => {}
                    }
                }
                Event::Empty(e) => {
                    saw_element = true;
                    if let Some(p) = current.as_mut() {
                        if e.local_name().as_ref() == b"br" {
                            p.text.push('\n');
                        }
                    }
                }
                Event::Text(t) => {
                    if let Some(p) = current.as_mut() {
                        match t.unescape() {
                            Ok(chunk) => p.text.push_str(&collapse_whitespace(&chunk)),
                            Err(e) => debug!("Dropping undecodable TTML text: {}", e),
                        }
                    }
                }
                Event::CData(c) => {
                    if let Some(p) = current.as_mut() {
                        p.text.push_str(&String::from_utf8_lossy(&c));
                    }
                }
                Event::End(_) => {
                    let finished = match current.as_mut() {
                        Some(p) => {
                            p.depth -= 1;
                            p.depth == 0
                        }
                        None => false,
                    };
                    if finished {
                        if let Some(p) = current.take() {
                            match (p.begin, p.end) {
                                (Some(begin), Some(end)) => {
                                    sequence += 1;
                                    let text = p
                                        .text
                                        .lines()
                                        .map(str::trim)
                                        .collect::<Vec<_>>()
                                        .join("\n");
                                    track.insert(Cue::text(
                                        sequence,
                                        begin,
                                        end,
                                        sanitize::strip(&text, Format::Ttml),
                                        Format::Ttml,
                                    ));
                                }
                                _ => debug!("Skipping TTML paragraph without usable timing"),
                            }
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_element {
            return Err(SubtrackError::malformed(Format::Ttml, "no XML element found"));
        }

        Ok(track)
    }

    fn format(&self) -> Format {
        Format::Ttml
    }
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_space = false;
    for c in s.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

fn parse_time(value: &str) -> Option<Timestamp> {
    let value = value.trim();

    if value.contains(':') {
        return parse_clock(value);
    }

    if let Some(ms) = value.strip_suffix("ms") {
        return ms.trim().parse::<i64>().ok().map(Timestamp::from_millis);
    }

    // "1.895s" reads as 1895 ms: the dot is dropped, not interpreted.
    let digits = value.strip_suffix('s').unwrap_or(value).replace('.', "");
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<i64>().ok().map(Timestamp::from_millis)
}

/// `HH:MM:SS` with an optional `.fraction`.
fn parse_clock(value: &str) -> Option<Timestamp> {
    let mut parts = value.split(':');
    let hour = parts.next()?.parse().ok()?;
    let minute = parts.next()?.parse().ok()?;
    let seconds = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
    let second = whole.parse().ok()?;
    let mut millis_digits: String = fraction.chars().take(3).collect();
    while millis_digits.len() < 3 {
        millis_digits.push('0');
    }
    let millisecond = millis_digits.parse().ok()?;

    Some(Timestamp::from_components(hour, minute, second, millisecond))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_seconds_quirk() {
        let track = TtmlParser
            .parse(r#"<p begin="0.268s" end="1.895s">Hi</p>"#)
            .unwrap();
        let cue = track.get(0).unwrap();
        assert_eq!(cue.begin.total_ms(), 268);
        assert_eq!(cue.end.total_ms(), 1895);
        assert_eq!(cue.payload.text(), Some("Hi"));
    }

    #[test]
    fn test_full_document() {
        let text = r#"<?xml version="1.0" encoding="utf-8"?>
<tt xmlns="http://www.w3.org/ns/ttml">
  <body>
    <div>
      <p begin="00:00:01.500" end="00:00:03.000">First<br/>line &amp; more</p>
      <p begin="00:00:04.000" end="00:00:05.000"><span>Styled</span> text</p>
    </div>
  </body>
</tt>"#;
        let track = TtmlParser.parse(text).unwrap();
        assert_eq!(track.len(), 2);

        let first = track.get(0).unwrap();
        assert_eq!(first.begin.total_ms(), 1500);
        assert_eq!(first.end.total_ms(), 3000);
        assert_eq!(first.payload.text(), Some("First\nline & more"));

        assert_eq!(track.get(1).unwrap().payload.text(), Some("Styled text"));
    }

    #[test]
    fn test_prefixed_elements() {
        let text = r#"<tt:tt xmlns:tt="x"><tt:p begin="1s" end="2s">Prefixed</tt:p></tt:tt>"#;
        let track = TtmlParser.parse(text).unwrap();
        assert_eq!(track.get(0).unwrap().begin.total_ms(), 1);
        assert_eq!(track.get(0).unwrap().end.total_ms(), 2);
    }

    #[test]
    fn test_paragraph_without_timing_skipped() {
        let text = r#"<tt><p>untimed</p><p begin="1.0s" end="2.0s">timed</p></tt>"#;
        let track = TtmlParser.parse(text).unwrap();
        assert_eq!(track.len(), 1);
        assert_eq!(track.get(0).unwrap().payload.text(), Some("timed"));
    }

    #[test]
    fn test_parse_time_forms() {
        assert_eq!(parse_time("1.895s").unwrap().total_ms(), 1895);
        assert_eq!(parse_time("250ms").unwrap().total_ms(), 250);
        assert_eq!(parse_time("00:01:02.5").unwrap().total_ms(), 62_500);
        assert!(parse_time("soon").is_none());
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            TtmlParser.parse("plain text, no markup"),
            Err(SubtrackError::MalformedInput { format: Format::Ttml, .. })
        ));
        assert!(matches!(
            TtmlParser.parse("<tt><p begin=\"1s\" end=\"2s\">open</tt>"),
            Err(SubtrackError::MalformedInput { format: Format::Ttml, .. })
        ));
    }
}
