use crate::error::{Result, SubtrackError};
use std::fmt;

const MS_PER_SECOND: i64 = 1000;
const MS_PER_MINUTE: i64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: i64 = 60 * MS_PER_MINUTE;

/// One of the four printable fields of a [`Timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Hour,
    Minute,
    Second,
    Millisecond,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    hour: u32,
    minute: u32,
    second: u32,
    millisecond: u32,
    total_ms: i64,
    frame: Option<u64>,
    is_set: bool,
}

impl Timestamp {
    /// Build a timestamp from explicit fields.
    ///
    /// ```
    /// use subtrack::subtitle::Timestamp;
    ///
    /// let ts = Timestamp::from_components(1, 2, 3, 4);
    /// assert_eq!(ts.total_ms(), 3_723_004);
    /// ```
    pub fn from_components(hour: u32, minute: u32, second: u32, millisecond: u32) -> Self {
        let total_ms = hour as i64 * MS_PER_HOUR
            + minute as i64 * MS_PER_MINUTE
            + second as i64 * MS_PER_SECOND
            + millisecond as i64;

        Self {
            hour,
            minute,
            second,
            millisecond,
            total_ms,
            frame: None,
            is_set: true,
        }
    }

    /// Decompose a millisecond count. Negative input clamps to zero.
    pub fn from_millis(total: i64) -> Self {
        let total = total.max(0);
        let hour = total / MS_PER_HOUR;
        let minute = (total % MS_PER_HOUR) / MS_PER_MINUTE;
        let second = (total % MS_PER_MINUTE) / MS_PER_SECOND;
        let millisecond = total % MS_PER_SECOND;

        Self {
            hour: hour.min(u32::MAX as i64) as u32,
            minute: minute as u32,
            second: second as u32,
            millisecond: millisecond as u32,
            total_ms: total,
            frame: None,
            is_set: true,
        }
    }

    /// Legacy MicroDVD form: the frame index doubles as the millisecond value.
    pub fn from_frame(frame: u64) -> Self {
        let mut ts = Self::from_millis(frame.min(i64::MAX as u64) as i64);
        ts.frame = Some(frame);
        ts
    }

    pub fn total_ms(&self) -> i64 {
        self.total_ms
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn second(&self) -> u32 {
        self.second
    }

    pub fn millisecond(&self) -> u32 {
        self.millisecond
    }

    pub fn is_set(&self) -> bool {
        self.is_set
    }

    /// Frame index recorded by the MicroDVD parser.
    pub fn frame(&self) -> Result<u64> {
        self.frame.ok_or(SubtrackError::FramesNotValid)
    }

    /// Zero-pad one field to `width` digits.
    pub fn padded(&self, field: Field, width: usize) -> Result<String> {
        if !self.is_set {
            return Err(SubtrackError::TimeNotSet);
        }

        let value = match field {
            Field::Hour => self.hour,
            Field::Minute => self.minute,
            Field::Second => self.second,
            Field::Millisecond => self.millisecond,
        };
        Ok(format!("{:0width$}", value, width = width))
    }

    /// Render as `HH:MM:SS,mmm`.
    pub fn to_srt(&self) -> Result<String> {
        Ok(format!(
            "{}:{}:{},{}",
            self.padded(Field::Hour, 2)?,
            self.padded(Field::Minute, 2)?,
            self.padded(Field::Second, 2)?,
            self.padded(Field::Millisecond, 3)?
        ))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_srt() {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "--:--:--,---"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_components() {
        let ts = Timestamp::from_components(0, 1, 2, 345);
        assert_eq!(ts.total_ms(), 62_345);
        assert!(ts.is_set());
    }

    #[test]
    fn test_from_millis_decomposes() {
        let ts = Timestamp::from_millis(3_661_123);
        assert_eq!(ts.hour(), 1);
        assert_eq!(ts.minute(), 1);
        assert_eq!(ts.second(), 1);
        assert_eq!(ts.millisecond(), 123);
        assert_eq!(ts.total_ms(), 3_661_123);
    }

    #[test]
    fn test_from_millis_negative_clamps() {
        let ts = Timestamp::from_millis(-500);
        assert_eq!(ts.total_ms(), 0);
        assert_eq!(ts.hour(), 0);
        assert_eq!(ts.millisecond(), 0);
    }

    #[test]
    fn test_from_frame() {
        let ts = Timestamp::from_frame(75);
        assert_eq!(ts.total_ms(), 75);
        assert_eq!(ts.frame().unwrap(), 75);
    }

    #[test]
    fn test_frame_missing() {
        let ts = Timestamp::from_millis(75);
        assert!(matches!(ts.frame(), Err(SubtrackError::FramesNotValid)));
    }

    #[test]
    fn test_padded() {
        let ts = Timestamp::from_components(1, 2, 3, 4);
        assert_eq!(ts.padded(Field::Hour, 2).unwrap(), "01");
        assert_eq!(ts.padded(Field::Millisecond, 3).unwrap(), "004");
    }

    #[test]
    fn test_unset_fails_to_print() {
        let ts = Timestamp::default();
        assert!(!ts.is_set());
        assert!(matches!(
            ts.padded(Field::Second, 2),
            Err(SubtrackError::TimeNotSet)
        ));
        assert!(ts.to_srt().is_err());
    }

    #[test]
    fn test_to_srt() {
        let ts = Timestamp::from_millis(83_456);
        assert_eq!(ts.to_srt().unwrap(), "00:01:23,456");
        assert_eq!(ts.to_string(), "00:01:23,456");
    }
}
