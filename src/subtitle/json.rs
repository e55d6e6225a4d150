// JSON dump of a parsed track
use super::{Cue, CueTrack, Format, Payload, SubtitlePrinter};
use crate::error::Result;
use serde::Serialize;

#[derive(Default)]
pub struct JsonPrinter {
    pub source_file: Option<String>,
}

#[derive(Serialize)]
struct JsonOutput {
    metadata: JsonMetadata,
    cues: Vec<JsonCue>,
}

#[derive(Serialize)]
struct JsonMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    source_file: Option<String>,
    format: Format,
    cue_count: usize,
    overlapping: bool,
}

#[derive(Serialize)]
struct JsonCue {
    sequence: usize,
    begin_ms: i64,
    end_ms: i64,
    begin_formatted: String,
    end_formatted: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<(u64, u64)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bitmap: Option<(u16, u16)>,
}

impl From<&Cue> for JsonCue {
    fn from(cue: &Cue) -> Self {
        let (text, bitmap) = match &cue.payload {
            Payload::Text(text) => (Some(text.clone()), None),
            Payload::Bitmap(b) => (None, Some((b.width, b.height))),
        };
        JsonCue {
            sequence: cue.sequence,
            begin_ms: cue.begin.total_ms(),
            end_ms: cue.end.total_ms(),
            begin_formatted: cue.begin.to_string(),
            end_formatted: cue.end.to_string(),
            frames: cue.begin.frame().ok().zip(cue.end.frame().ok()),
            text,
            bitmap,
        }
    }
}

impl SubtitlePrinter for JsonPrinter {
    /// One cue as a single JSON line.
    fn print(&self, cue: &Cue) -> Result<String> {
        Ok(serde_json::to_string(&JsonCue::from(cue))? + "\n")
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    /// The whole track as one pretty-printed document with metadata.
    fn print_track(&self, track: &CueTrack) -> Result<String> {
        let output = JsonOutput {
            metadata: JsonMetadata {
                source_file: self.source_file.clone(),
                format: track.format(),
                cue_count: track.len(),
                overlapping: track.is_overlapping(),
            },
            cues: track.iter().map(JsonCue::from).collect(),
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }
}
