use super::{Format, Timestamp};
use std::cell::OnceCell;
use std::sync::Arc;

/// Decoded RGBA bitmap from the binary caption stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u16,
    pub height: u16,
    /// Row-major RGBA pixels, `width * height` entries.
    pub pixels: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Text(String),
    Bitmap(Arc<Bitmap>),
}

impl Payload {
    pub fn empty() -> Self {
        Payload::Text(String::new())
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Bitmap(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Payload::Text(text) => text.is_empty(),
            Payload::Bitmap(bitmap) => bitmap.pixels.is_empty(),
        }
    }
}

/// One subtitle entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Cue {
    pub sequence: usize,
    pub begin: Timestamp,
    pub end: Timestamp,
    pub payload: Payload,
    pub format: Format,
}

impl Cue {
    pub fn text(
        sequence: usize,
        begin: Timestamp,
        end: Timestamp,
        text: impl Into<String>,
        format: Format,
    ) -> Self {
        Self {
            sequence,
            begin,
            end,
            payload: Payload::Text(text.into()),
            format,
        }
    }

    /// Inclusive interval test. Inverted intervals never match.
    pub fn contains(&self, ms: i64) -> bool {
        let begin = self.begin.total_ms();
        let end = self.end.total_ms();
        begin <= end && begin <= ms && ms <= end
    }
}

/// Chronologically ordered cues of one subtitle stream plus a playback cursor.
///
/// Cues are kept sorted by begin time through [`CueTrack::insert`], which
/// places a cue after every existing cue with a smaller or equal begin. The
/// cursor is always a valid index once the track holds at least one cue.
#[derive(Debug, Clone)]
pub struct CueTrack {
    format: Format,
    cues: Vec<Cue>,
    current: usize,
    overlapping: OnceCell<bool>,
}

impl CueTrack {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            cues: Vec::new(),
            current: 0,
            overlapping: OnceCell::new(),
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cue> {
        self.cues.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Cue> {
        self.cues.get(index)
    }

    /// Stable insert by ascending begin, scanning from the end toward the start.
    pub fn insert(&mut self, cue: Cue) {
        let begin = cue.begin.total_ms();

        match self.cues.last().map(|last| last.begin.total_ms()) {
            None => self.cues.push(cue),
            Some(last_begin) if begin > last_begin => self.cues.push(cue),
            Some(_) => {
                let mut pos = self.cues.len();
                while pos > 0 && self.cues[pos - 1].begin.total_ms() > begin {
                    pos -= 1;
                }
                self.cues.insert(pos, cue);
            }
        }

        // Classification only describes a finished track.
        self.overlapping = OnceCell::new();
    }

    /// Move the cursor to the last cue whose begin is at or before `ms`.
    ///
    /// Before the first cue the cursor clamps to 0 and that cue is returned;
    /// callers check [`Cue::contains`] themselves.
    pub fn match_at(&mut self, ms: i64) -> Option<&Cue> {
        if self.cues.is_empty() {
            return None;
        }

        self.current = self.current.min(self.cues.len() - 1);

        while self.current + 1 < self.cues.len()
            && self.cues[self.current + 1].begin.total_ms() <= ms
        {
            self.current += 1;
        }
        while self.current > 0 && self.cues[self.current].begin.total_ms() > ms {
            self.current -= 1;
        }

        self.cues.get(self.current)
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_cue(&self) -> Option<&Cue> {
        self.cues.get(self.current)
    }

    /// Step the cursor forward; a no-op on the last cue.
    pub fn advance_to_next(&mut self) -> Option<&Cue> {
        if self.current + 1 < self.cues.len() {
            self.current += 1;
        }
        self.cues.get(self.current)
    }

    pub fn rewind(&mut self) {
        self.current = 0;
    }

    /// Whether any cue ends after the next one begins. Computed once.
    pub fn is_overlapping(&self) -> bool {
        *self.overlapping.get_or_init(|| {
            self.format.allows_overlap()
                && self
                    .cues
                    .windows(2)
                    .any(|pair| pair[0].end.total_ms() > pair[1].begin.total_ms())
        })
    }

    /// Fill `out` with the index of every cue active at `ms`.
    pub fn active_indices(&self, ms: i64, out: &mut Vec<usize>) {
        out.clear();
        for (i, cue) in self.cues.iter().enumerate() {
            if cue.begin.total_ms() > ms {
                break;
            }
            if cue.contains(ms) {
                out.push(i);
            }
        }
    }
}

impl Default for CueTrack {
    fn default() -> Self {
        Self::new(Format::Srt)
    }
}

impl<'a> IntoIterator for &'a CueTrack {
    type Item = &'a Cue;
    type IntoIter = std::slice::Iter<'a, Cue>;

    fn into_iter(self) -> Self::IntoIter {
        self.cues.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(sequence: usize, begin: i64, end: i64, text: &str) -> Cue {
        Cue::text(
            sequence,
            Timestamp::from_millis(begin),
            Timestamp::from_millis(end),
            text,
            Format::Ssa,
        )
    }

    fn track(cues: Vec<Cue>) -> CueTrack {
        let mut track = CueTrack::new(Format::Ssa);
        for c in cues {
            track.insert(c);
        }
        track
    }

    fn begins(track: &CueTrack) -> Vec<i64> {
        track.iter().map(|c| c.begin.total_ms()).collect()
    }

    #[test]
    fn test_insert_appends_in_order() {
        let t = track(vec![cue(1, 0, 1, "a"), cue(2, 10, 11, "b"), cue(3, 20, 21, "c")]);
        assert_eq!(begins(&t), vec![0, 10, 20]);
    }

    #[test]
    fn test_insert_out_of_order() {
        let t = track(vec![cue(1, 30, 31, "a"), cue(2, 10, 11, "b"), cue(3, 20, 21, "c")]);
        assert_eq!(begins(&t), vec![10, 20, 30]);
    }

    #[test]
    fn test_insert_equal_begins_keep_arrival_order() {
        let t = track(vec![
            cue(1, 10, 11, "first"),
            cue(2, 20, 21, "later"),
            cue(3, 10, 12, "second"),
            cue(4, 10, 13, "third"),
        ]);
        let texts: Vec<_> = t.iter().map(|c| c.payload.text().unwrap()).collect();
        assert_eq!(texts, vec!["first", "second", "third", "later"]);
    }

    #[test]
    fn test_insert_ordering_invariant() {
        let starts = [50, 3, 99, 3, 0, 42, 42, 7, 100, 1, 64, 0];
        let mut t = CueTrack::new(Format::Lrc);
        for (i, s) in starts.iter().enumerate() {
            t.insert(cue(i + 1, *s, s + 5, "x"));
            let b = begins(&t);
            assert!(b.windows(2).all(|w| w[0] <= w[1]), "unsorted: {:?}", b);
        }
    }

    #[test]
    fn test_match_at_moves_cursor() {
        let mut t = track(vec![cue(1, 0, 1000, "a"), cue(2, 2000, 3000, "b"), cue(3, 4000, 5000, "c")]);

        assert_eq!(t.match_at(2500).unwrap().sequence, 2);
        assert_eq!(t.current_index(), 1);
        assert_eq!(t.match_at(4500).unwrap().sequence, 3);
        assert_eq!(t.match_at(100).unwrap().sequence, 1);
        assert_eq!(t.current_index(), 0);
    }

    #[test]
    fn test_match_at_clamps() {
        let mut t = track(vec![cue(1, 1000, 2000, "a"), cue(2, 3000, 4000, "b")]);

        for ms in [i64::MIN, -1, 0, 999, 1000, 5000, i64::MAX] {
            t.match_at(ms);
            assert!(t.current_index() < t.len());
        }
        t.match_at(-10);
        assert_eq!(t.current_index(), 0);
        t.match_at(i64::MAX);
        assert_eq!(t.current_index(), 1);
    }

    #[test]
    fn test_match_at_empty_track() {
        let mut t = CueTrack::new(Format::Srt);
        assert!(t.match_at(1000).is_none());
        assert!(t.current_cue().is_none());
        assert!(t.advance_to_next().is_none());
    }

    #[test]
    fn test_advance_to_next_clamps() {
        let mut t = track(vec![cue(1, 0, 1, "a"), cue(2, 5, 6, "b")]);
        assert_eq!(t.advance_to_next().unwrap().sequence, 2);
        assert_eq!(t.advance_to_next().unwrap().sequence, 2);
        assert_eq!(t.current_index(), 1);
    }

    #[test]
    fn test_contains_rejects_inverted() {
        let c = cue(1, 5000, 1000, "inverted");
        assert!(!c.contains(3000));
        assert!(!c.contains(5000));
    }

    #[test]
    fn test_overlap_classification_cached() {
        let t = track(vec![cue(1, 0, 5000, "A"), cue(2, 2000, 7000, "B")]);
        assert!(t.is_overlapping());
        assert!(t.is_overlapping());

        let t = track(vec![cue(1, 0, 1000, "A"), cue(2, 1000, 2000, "B")]);
        assert!(!t.is_overlapping());
    }

    #[test]
    fn test_overlap_ignored_for_single_cue_formats() {
        let mut t = CueTrack::new(Format::Srt);
        t.insert(cue(1, 0, 5000, "A"));
        t.insert(cue(2, 2000, 7000, "B"));
        assert!(!t.is_overlapping());
    }

    #[test]
    fn test_active_indices() {
        let t = track(vec![
            cue(1, 0, 5000, "A"),
            cue(2, 2000, 7000, "B"),
            cue(3, 6000, 8000, "C"),
        ]);
        let mut out = Vec::new();
        t.active_indices(3000, &mut out);
        assert_eq!(out, vec![0, 1]);
        t.active_indices(6500, &mut out);
        assert_eq!(out, vec![1, 2]);
        t.active_indices(9000, &mut out);
        assert!(out.is_empty());
    }
}
