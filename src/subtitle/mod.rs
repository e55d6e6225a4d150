pub mod bitmap;
pub mod cue;
pub mod json;
pub mod legacy_xml;
pub mod lrc;
pub mod microdvd;
pub mod passthrough;
pub mod query;
pub mod sanitize;
pub mod srt;
pub mod ssa;
pub mod timestamp;
pub mod ttml;

pub use cue::{Bitmap, Cue, CueTrack, Payload};
pub use query::{QueryEngine, Shown};
pub use timestamp::{Field, Timestamp};

use crate::error::{Result, SubtrackError};
use crate::source;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Origin format of a subtitle stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Srt,
    Ssa,
    Lrc,
    MicroDvd,
    Ttml,
    LegacyXml,
    Binary,
    PassThrough,
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Format::Srt => write!(f, "srt"),
            Format::Ssa => write!(f, "ssa"),
            Format::Lrc => write!(f, "lrc"),
            Format::MicroDvd => write!(f, "microdvd"),
            Format::Ttml => write!(f, "ttml"),
            Format::LegacyXml => write!(f, "legacyxml"),
            Format::Binary => write!(f, "binary"),
            Format::PassThrough => write!(f, "passthrough"),
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srt" => Ok(Format::Srt),
            "ssa" | "ass" => Ok(Format::Ssa),
            "lrc" => Ok(Format::Lrc),
            "microdvd" | "sub" => Ok(Format::MicroDvd),
            "ttml" | "xml" | "dfxp" => Ok(Format::Ttml),
            "legacyxml" => Ok(Format::LegacyXml),
            "binary" => Ok(Format::Binary),
            "passthrough" => Ok(Format::PassThrough),
            _ => Err(format!(
                "Unknown format: {}. Use 'srt', 'ssa', 'lrc', 'sub', 'ttml' or 'legacyxml'",
                s
            )),
        }
    }
}

impl Format {
    /// Whether cues of this format may be active at the same time.
    pub fn allows_overlap(&self) -> bool {
        matches!(self, Format::Ssa | Format::PassThrough)
    }

    /// Validity of the empty placeholder returned when nothing matches.
    pub fn placeholder_window(&self) -> i64 {
        match self {
            Format::Binary => 300,
            Format::PassThrough => 1500,
            _ => 30,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "srt" => Some(Format::Srt),
            "ssa" | "ass" => Some(Format::Ssa),
            "lrc" => Some(Format::Lrc),
            "sub" => Some(Format::MicroDvd),
            "xml" | "ttml" | "dfxp" => Some(Format::Ttml),
            _ => None,
        }
    }

    /// Pick a format from the file extension, telling the two XML schemas
    /// apart by content.
    pub fn detect(path: &Path, text: &str) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        match Self::from_extension(ext)? {
            Format::Ttml if text.contains("<StartMilliseconds") => Some(Format::LegacyXml),
            format => Some(format),
        }
    }
}

/// Where parser input comes from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// A file decoded with an explicit encoding name.
    Path { path: &'a Path, encoding: &'a str },
    /// Already-decoded text.
    Text(&'a str),
}

pub trait SubtitleParser {
    fn parse(&self, text: &str) -> Result<CueTrack>;
    fn format(&self) -> Format;
}

pub trait SubtitlePrinter {
    fn print(&self, cue: &Cue) -> Result<String>;
    fn extension(&self) -> &'static str;

    fn print_track(&self, track: &CueTrack) -> Result<String> {
        let mut output = String::new();
        for cue in track {
            output.push_str(&self.print(cue)?);
        }
        Ok(output)
    }
}

/// Text parser for `format`. Binary and pass-through streams have their own
/// entry points in [`bitmap`] and [`passthrough`].
pub fn create_parser(format: Format) -> Result<Box<dyn SubtitleParser>> {
    match format {
        Format::Srt => Ok(Box::new(srt::SrtParser)),
        Format::Ssa => Ok(Box::new(ssa::SsaParser)),
        Format::Lrc => Ok(Box::new(lrc::LrcParser)),
        Format::MicroDvd => Ok(Box::new(microdvd::MicroDvdParser)),
        Format::Ttml => Ok(Box::new(ttml::TtmlParser)),
        Format::LegacyXml => Ok(Box::new(legacy_xml::LegacyXmlParser)),
        Format::Binary | Format::PassThrough => Err(SubtrackError::UnsupportedFormat(format!(
            "{} streams are not parsed from text",
            format
        ))),
    }
}

/// Printer for formats that can be written back out.
pub fn create_printer(format: Format) -> Result<Box<dyn SubtitlePrinter>> {
    match format {
        Format::Srt => Ok(Box::new(srt::SrtPrinter)),
        Format::MicroDvd => Ok(Box::new(microdvd::MicroDvdPrinter)),
        _ => Err(SubtrackError::UnsupportedFormat(format!(
            "no printer for {}",
            format
        ))),
    }
}

/// Parse `source` as `format`.
pub fn parse(source: Source<'_>, format: Format) -> Result<CueTrack> {
    let parser = create_parser(format)?;
    match source {
        Source::Text(text) => parser.parse(text),
        Source::Path { path, encoding } => {
            let text = source::read_text(path, encoding)?;
            parser.parse(&text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_parsing() {
        assert_eq!("srt".parse::<Format>().unwrap(), Format::Srt);
        assert_eq!("ASS".parse::<Format>().unwrap(), Format::Ssa);
        assert_eq!("sub".parse::<Format>().unwrap(), Format::MicroDvd);
        assert!("vtt".parse::<Format>().is_err());
    }

    #[test]
    fn test_placeholder_windows() {
        assert_eq!(Format::Srt.placeholder_window(), 30);
        assert_eq!(Format::Lrc.placeholder_window(), 30);
        assert_eq!(Format::Binary.placeholder_window(), 300);
        assert_eq!(Format::PassThrough.placeholder_window(), 1500);
    }

    #[test]
    fn test_detect_xml_variants() {
        let path = PathBuf::from("/movies/film.xml");
        assert_eq!(
            Format::detect(&path, "<tt><body><p begin=\"1s\"/></body></tt>"),
            Some(Format::Ttml)
        );
        assert_eq!(
            Format::detect(&path, "<Subtitles><StartMilliseconds>1</StartMilliseconds>"),
            Some(Format::LegacyXml)
        );
        assert_eq!(Format::detect(&PathBuf::from("a.mkv"), ""), None);
    }

    #[test]
    fn test_create_parser_rejects_binary() {
        assert!(create_parser(Format::Binary).is_err());
        assert!(create_parser(Format::PassThrough).is_err());
        assert_eq!(create_parser(Format::Lrc).unwrap().format(), Format::Lrc);
    }

    #[test]
    fn test_create_printer() {
        assert_eq!(create_printer(Format::Srt).unwrap().extension(), "srt");
        assert_eq!(create_printer(Format::MicroDvd).unwrap().extension(), "sub");
        assert!(create_printer(Format::Ssa).is_err());
    }
}
