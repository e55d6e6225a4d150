// Pre-decoded subtitles from an external decoder
use super::{Cue, CueTrack, Format};
use crate::error::Result;
use tracing::debug;

/// External decoder that turns a subtitle stream into cues.
pub trait DecodePreprocessor {
    fn decode(&mut self) -> Result<Vec<Cue>>;
}

impl<F> DecodePreprocessor for F
where
    F: FnMut() -> Result<Vec<Cue>>,
{
    fn decode(&mut self) -> Result<Vec<Cue>> {
        self()
    }
}

/// Run `decoder` and collect its cues into a pass-through track.
pub fn parse_decoded(decoder: &mut dyn DecodePreprocessor) -> Result<CueTrack> {
    let cues = decoder.decode()?;
    debug!("Pre-decoded stream produced {} cues", cues.len());

    let mut track = CueTrack::new(Format::PassThrough);
    for (i, mut cue) in cues.into_iter().enumerate() {
        if cue.sequence == 0 {
            cue.sequence = i + 1;
        }
        cue.format = Format::PassThrough;
        track.insert(cue);
    }
    Ok(track)
}
