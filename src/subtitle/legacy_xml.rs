// Legacy XML schema: one element per cue with Number / StartMilliseconds /
// EndMilliseconds / Text children.
use super::{sanitize, Cue, CueTrack, Format, SubtitleParser, Timestamp};
use crate::error::{Result, SubtrackError};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Child {
    Number,
    Start,
    End,
    Text,
}

impl Child {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"Number" => Some(Child::Number),
            b"StartMilliseconds" => Some(Child::Start),
            b"EndMilliseconds" => Some(Child::End),
            b"Text" => Some(Child::Text),
            _ => None,
        }
    }
}

#[derive(Default)]
struct Entry {
    number: Option<usize>,
    start: Option<i64>,
    end: Option<i64>,
    text: String,
}

pub struct LegacyXmlParser;

impl SubtitleParser for LegacyXmlParser {
    fn parse(&self, text: &str) -> Result<CueTrack> {
        let mut track = CueTrack::new(Format::LegacyXml);
        if text.trim().is_empty() {
            return Ok(track);
        }

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut saw_element = false;
        let mut depth = 0usize;
        // Depth of the element that owns the fields currently being collected.
        let mut entry_depth: Option<usize> = None;
        let mut entry = Entry::default();
        let mut field: Option<Child> = None;
        let mut arrival = 0;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(SubtrackError::malformed_with(
                        Format::LegacyXml,
                        format!("invalid XML near byte {}", reader.buffer_position()),
                        e,
                    ))
                }
            };

            match event {
                Event::Start(e) => {
                    saw_element = true;
                    depth += 1;
                    if let Some(child) = Child::from_name(e.local_name().as_ref()) {
                        entry_depth.get_or_insert(depth - 1);
                        field = Some(child);
                    }
                }
                Event::Empty(_) => saw_element = true,
                Event::Text(t) => {
                    let Some(child) = field else { continue };
                    let value = match t.unescape() {
                        Ok(value) => value.into_owned(),
                        Err(e) => {
                            debug!("Dropping undecodable legacy XML text: {}", e);
                            continue;
                        }
                    };
                    match child {
                        Child::Number => entry.number = value.trim().parse().ok(),
                        Child::Start => entry.start = value.trim().parse().ok(),
                        Child::End => entry.end = value.trim().parse().ok(),
                        Child::Text => {
                            if !entry.text.is_empty() {
                                entry.text.push('\n');
                            }
                            entry.text.push_str(&value);
                        }
                    }
                }
                Event::End(_) => {
                    field = None;
                    let closing = depth;
                    depth = depth.saturating_sub(1);
                    if entry_depth == Some(closing) {
                        arrival += 1;
                        let finished = std::mem::take(&mut entry);
                        entry_depth = None;
                        match (finished.start, finished.end) {
                            (Some(start), Some(end)) => track.insert(Cue::text(
                                finished.number.unwrap_or(arrival),
                                Timestamp::from_millis(start),
                                Timestamp::from_millis(end),
                                sanitize::strip(&finished.text, Format::LegacyXml),
                                Format::LegacyXml,
                            )),
                            _ => debug!("Skipping legacy XML entry {} without timing", arrival),
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !saw_element {
            return Err(SubtrackError::malformed(
                Format::LegacyXml,
                "no XML element found",
            ));
        }

        Ok(track)
    }

    fn format(&self) -> Format {
        Format::LegacyXml
    }
}
