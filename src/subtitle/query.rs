// Playback-time lookup over a parsed track
use super::{sanitize, Cue, CueTrack, Payload};
use tracing::debug;

/// Separator placed between concurrently active cues.
pub const OVERLAP_SEPARATOR: &str = "\\\n";

/// What to display and for how long the answer stays valid.
///
/// A window of `[0, 0]` means the caller must query again on the next tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Shown {
    pub payload: Payload,
    pub begin: i64,
    pub end: i64,
}

impl Shown {
    fn from_cue(cue: &Cue) -> Self {
        let payload = match &cue.payload {
            Payload::Text(text) => Payload::Text(sanitize::strip(text, cue.format)),
            bitmap => bitmap.clone(),
        };
        Shown {
            payload,
            begin: cue.begin.total_ms(),
            end: cue.end.total_ms(),
        }
    }

    /// Empty text valid from `ms` for `window` milliseconds.
    pub fn placeholder(ms: i64, window: i64) -> Self {
        Shown {
            payload: Payload::empty(),
            begin: ms,
            end: ms.saturating_add(window),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.payload.text()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// No query has run yet.
    Pending,
    NonOverlapping,
    Overlapping,
}

#[derive(Debug)]
pub struct QueryEngine {
    track: CueTrack,
    mode: Mode,
    active: Vec<usize>,
}

impl QueryEngine {
    pub fn new(track: CueTrack) -> Self {
        Self {
            track,
            mode: Mode::Pending,
            active: Vec::new(),
        }
    }

    pub fn track(&self) -> &CueTrack {
        &self.track
    }

    pub fn into_track(self) -> CueTrack {
        self.track
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Forget the cursor position, e.g. after a seek.
    pub fn reset(&mut self) {
        self.track.rewind();
    }

    /// What is showing at `ms`. `None` only when the track has no cues.
    pub fn query(&mut self, ms: i64) -> Option<Shown> {
        if self.track.is_empty() {
            return None;
        }

        if self.mode == Mode::Pending {
            self.mode = if self.track.is_overlapping() {
                Mode::Overlapping
            } else {
                Mode::NonOverlapping
            };
            debug!(
                "Classified {} track with {} cues as {:?}",
                self.track.format(),
                self.track.len(),
                self.mode
            );
        }

        let shown = match self.mode {
            Mode::Overlapping => self.query_overlapping(ms),
            _ => self.query_single(ms),
        };
        Some(shown)
    }

    fn query_single(&mut self, ms: i64) -> Shown {
        if let Some(cue) = self.track.match_at(ms) {
            if cue.contains(ms) {
                return Shown::from_cue(cue);
            }
        }

        // Second pass from the cursor the first one left behind.
        if let Some(cue) = self.track.match_at(ms) {
            if cue.contains(ms) {
                return Shown::from_cue(cue);
            }
        }

        Shown::placeholder(ms, self.track.format().placeholder_window())
    }

    fn query_overlapping(&mut self, ms: i64) -> Shown {
        self.track.active_indices(ms, &mut self.active);

        let texts: Vec<String> = self
            .active
            .iter()
            .filter_map(|&i| self.track.get(i))
            .filter_map(|cue| cue.payload.text().map(|t| sanitize::strip(t, cue.format)))
            .filter(|t| !t.is_empty())
            .collect();

        Shown {
            payload: Payload::Text(texts.join(OVERLAP_SEPARATOR)),
            begin: 0,
            end: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::{Format, Timestamp};

    fn engine(format: Format, cues: &[(i64, i64, &str)]) -> QueryEngine {
        let mut track = CueTrack::new(format);
        for (i, (begin, end, text)) in cues.iter().enumerate() {
            track.insert(Cue::text(
                i + 1,
                Timestamp::from_millis(*begin),
                Timestamp::from_millis(*end),
                *text,
                format,
            ));
        }
        QueryEngine::new(track)
    }

    #[test]
    fn test_single_match_window() {
        let mut e = engine(Format::Lrc, &[(1000, 3500, "Hello"), (3500, 4500, "World")]);
        let shown = e.query(2000).unwrap();
        assert_eq!(shown.text(), Some("Hello"));
        assert_eq!((shown.begin, shown.end), (1000, 3500));
        assert_eq!(e.mode(), Mode::NonOverlapping);
    }

    #[test]
    fn test_placeholder_between_cues() {
        let mut e = engine(Format::Srt, &[(0, 1000, "a"), (5000, 6000, "b")]);
        let shown = e.query(3000).unwrap();
        assert_eq!(shown.text(), Some(""));
        assert_eq!((shown.begin, shown.end), (3000, 3030));
    }

    #[test]
    fn test_placeholder_window_passthrough() {
        let mut e = engine(Format::PassThrough, &[(0, 1000, "a")]);
        let shown = e.query(2000).unwrap();
        assert_eq!((shown.begin, shown.end), (2000, 3500));
    }

    #[test]
    fn test_backward_seek() {
        let mut e = engine(Format::Srt, &[(0, 1000, "a"), (2000, 3000, "b"), (4000, 5000, "c")]);
        assert_eq!(e.query(4500).unwrap().text(), Some("c"));
        assert_eq!(e.query(500).unwrap().text(), Some("a"));
        assert_eq!(e.query(2500).unwrap().text(), Some("b"));
    }

    #[test]
    fn test_gap_keeps_cursor() {
        let mut e = engine(Format::Srt, &[(0, 1000, "a"), (2000, 3000, "b"), (4000, 5000, "c")]);
        assert_eq!(e.query(4500).unwrap().text(), Some("c"));
        assert_eq!(e.query(6500).unwrap().text(), Some(""));
        assert_eq!(e.track().current_index(), 2);
        assert_eq!(e.query(1500).unwrap().text(), Some(""));
        assert_eq!(e.track().current_index(), 0);
    }

    #[test]
    fn test_overlapping_join() {
        let mut e = engine(Format::Ssa, &[(0, 5000, "A"), (2000, 7000, "B")]);
        let shown = e.query(3000).unwrap();
        assert_eq!(shown.text(), Some("A\\\nB"));
        assert_eq!((shown.begin, shown.end), (0, 0));
        assert_eq!(e.mode(), Mode::Overlapping);
    }

    #[test]
    fn test_overlapping_skips_empty_and_strips() {
        let mut e = engine(
            Format::Ssa,
            &[(0, 5000, r"{\i1}A{\i0}"), (1000, 6000, ""), (2000, 7000, "B")],
        );
        assert_eq!(e.query(3000).unwrap().text(), Some("A\\\nB"));
        assert_eq!(e.query(6500).unwrap().text(), Some("B"));
        assert_eq!(e.query(9000).unwrap().text(), Some(""));
    }

    #[test]
    fn test_empty_track() {
        let mut e = engine(Format::Srt, &[]);
        for ms in [i64::MIN, -1, 0, 1000, i64::MAX] {
            assert!(e.query(ms).is_none());
        }
    }

    #[test]
    fn test_inverted_cue_never_matches() {
        let mut e = engine(Format::Srt, &[(5000, 1000, "inverted")]);
        let shown = e.query(3000).unwrap();
        assert_eq!(shown.text(), Some(""));
    }

    #[test]
    fn test_query_never_panics() {
        let layouts: Vec<Vec<(i64, i64, &str)>> = vec![
            vec![],
            vec![(0, 0, "zero")],
            vec![(100, 50, "inverted"), (100, 50, "again")],
            vec![(0, i64::MAX, "forever"), (10, 20, "short")],
            vec![(3000, 4000, "x"), (1000, 9000, "y"), (2000, 2500, "z")],
        ];
        let probes = [i64::MIN, -5000, 0, 1, 99, 100, 2200, 3500, 9000, i64::MAX - 1, i64::MAX];

        for format in [Format::Srt, Format::Ssa, Format::PassThrough, Format::MicroDvd] {
            for cues in &layouts {
                let mut e = engine(format, cues);
                for &ms in &probes {
                    let shown = e.query(ms);
                    assert_eq!(shown.is_none(), cues.is_empty());
                    assert!(e.track().is_empty() || e.track().current_index() < e.track().len());
                }
            }
        }
    }
}
