pub mod config;
pub mod error;
pub mod loader;
pub mod source;
pub mod subtitle;

pub use config::Config;
pub use error::{Result, SubtrackError};
pub use loader::{load_bitmap_stream, load_subtitles, print_summary, LoadConfig, LoadResult, LoadStats};
pub use subtitle::{Cue, CueTrack, Format, Payload, QueryEngine, Shown, Timestamp};
