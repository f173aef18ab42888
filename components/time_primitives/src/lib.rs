use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TimeError {
    #[error("cannot parse '{0}' as a timestamp (expected seconds, MM:SS or HH:MM:SS)")]
    Unparseable(String),
    #[error("timestamp must not be negative: {0}")]
    Negative(f64),
    #[error("end time {end} must be greater than start time {start}")]
    EmptyRange { start: MediaTime, end: MediaTime },
    #[error("end time {end} is beyond the end of the source ({duration})")]
    ExceedsSource { end: MediaTime, duration: MediaTime },
}

/// Position in a media file, millisecond resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaTime(u64);

impl MediaTime {
    pub const ZERO: Self = Self(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * 1_000)
    }

    /// Fractional seconds, rounded to the nearest millisecond
    pub fn from_secs_f64(secs: f64) -> Result<Self, TimeError> {
        if !secs.is_finite() {
            return Err(TimeError::Unparseable(secs.to_string()));
        }
        if secs < 0.0 {
            return Err(TimeError::Negative(secs));
        }
        Ok(Self((secs * 1_000.0).round() as u64))
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1_000.0
    }

    /// Seconds with millisecond precision, the form ffmpeg takes for `-ss`/`-t`
    pub fn to_ffmpeg_arg(&self) -> String {
        format!("{}.{:03}", self.0 / 1_000, self.0 % 1_000)
    }
}

impl Add for MediaTime {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Sub for MediaTime {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl From<Duration> for MediaTime {
    fn from(duration: Duration) -> Self {
        Self(duration.as_millis() as u64)
    }
}

impl From<MediaTime> for Duration {
    fn from(time: MediaTime) -> Self {
        Duration::from_millis(time.0)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_secs = self.0 / 1_000;
        let millis = self.0 % 1_000;
        let hours = total_secs / 3_600;
        let minutes = (total_secs % 3_600) / 60;
        let secs = total_secs % 60;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
    }
}

/// Accepts `90`, `90.5`, `1:30`, `01:01:30.250`
impl FromStr for MediaTime {
    type Err = TimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let unparseable = || TimeError::Unparseable(s.to_string());
        if trimmed.is_empty() {
            return Err(unparseable());
        }

        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() > 3 {
            return Err(unparseable());
        }

        let (seconds_part, unit_parts) = parts.split_last().ok_or_else(unparseable)?;
        let seconds: f64 = seconds_part.parse().map_err(|_| unparseable())?;
        if seconds < 0.0 {
            return Err(TimeError::Negative(seconds));
        }
        if !unit_parts.is_empty() && seconds >= 60.0 {
            return Err(unparseable());
        }

        let mut whole_units = 0u64;
        for (index, part) in unit_parts.iter().enumerate() {
            let value: u64 = part.parse().map_err(|_| unparseable())?;
            // minutes under an hours field must stay below 60
            if unit_parts.len() == 2 && index == 1 && value >= 60 {
                return Err(unparseable());
            }
            whole_units = whole_units * 60 + value;
        }

        Self::from_secs_f64(whole_units as f64 * 60.0 + seconds)
    }
}

/// Half-open `[start, end)` window into a media file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    start: MediaTime,
    end: MediaTime,
}

impl TimeRange {
    pub fn new(start: MediaTime, end: MediaTime) -> Result<Self, TimeError> {
        if end <= start {
            return Err(TimeError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Same as [`TimeRange::new`], additionally rejecting an `end` past a known source duration
    pub fn within(start: MediaTime, end: MediaTime, duration: Option<MediaTime>) -> Result<Self, TimeError> {
        let range = Self::new(start, end)?;
        if let Some(duration) = duration {
            range.check_within(duration)?;
        }
        Ok(range)
    }

    pub fn check_within(&self, duration: MediaTime) -> Result<(), TimeError> {
        if self.end > duration {
            return Err(TimeError::ExceedsSource {
                end: self.end,
                duration,
            });
        }
        Ok(())
    }

    pub fn start(&self) -> MediaTime {
        self.start
    }

    pub fn end(&self) -> MediaTime {
        self.end
    }

    pub fn duration(&self) -> MediaTime {
        self.end - self.start
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[test]
    fn test_media_time_operations() {
        let t1 = MediaTime::from_secs(10);
        let t2 = MediaTime::from_millis(2_500);

        assert_eq!(t1 + t2, MediaTime::from_millis(12_500));
        assert_eq!(t1 - t2, MediaTime::from_millis(7_500));
        assert_eq!(t2 - t1, MediaTime::ZERO); // Tests saturation
    }

    #[rstest]
    #[case("90", 90_000)]
    #[case("90.5", 90_500)]
    #[case(" 5 ", 5_000)]
    #[case("1:30", 90_000)]
    #[case("01:01:30.250", 3_690_250)]
    #[case("0:00:00", 0)]
    fn parses_timestamps(#[case] input: &str, #[case] millis: u64) {
        assert_eq!(input.parse::<MediaTime>().unwrap(), MediaTime::from_millis(millis));
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("1:2:3:4")]
    #[case("1:75")]
    #[case("1:60:00")]
    #[case("1::2")]
    fn rejects_malformed_timestamps(#[case] input: &str) {
        assert_matches!(input.parse::<MediaTime>(), Err(TimeError::Unparseable(_)));
    }

    #[test]
    fn rejects_negative_seconds() {
        assert_matches!("-3".parse::<MediaTime>(), Err(TimeError::Negative(_)));
        assert_matches!(MediaTime::from_secs_f64(-0.5), Err(TimeError::Negative(_)));
    }

    #[test]
    fn test_display_and_ffmpeg_formatting() {
        let time = MediaTime::from_millis(3_723_045);
        assert_eq!(time.to_string(), "01:02:03.045");
        assert_eq!(time.to_ffmpeg_arg(), "3723.045");
        assert_eq!(MediaTime::ZERO.to_ffmpeg_arg(), "0.000");
    }

    #[test]
    fn test_range_validation() {
        let five = MediaTime::from_secs(5);
        let fifteen = MediaTime::from_secs(15);

        let range = TimeRange::new(five, fifteen).unwrap();
        assert_eq!(range.duration(), MediaTime::from_secs(10));

        assert_matches!(
            TimeRange::new(fifteen, five),
            Err(TimeError::EmptyRange { .. })
        );
        assert_matches!(
            TimeRange::new(five, five),
            Err(TimeError::EmptyRange { .. })
        );
    }

    #[test]
    fn test_range_against_source_duration() {
        let duration = Some(MediaTime::from_secs(30));

        assert!(TimeRange::within(MediaTime::from_secs(20), MediaTime::from_secs(30), duration).is_ok());
        assert_matches!(
            TimeRange::within(MediaTime::from_secs(20), MediaTime::from_secs(31), duration),
            Err(TimeError::ExceedsSource { .. })
        );
        // unknown duration only checks ordering
        assert!(TimeRange::within(MediaTime::from_secs(20), MediaTime::from_secs(300), None).is_ok());
    }

    #[test]
    fn test_serialization() {
        let range = TimeRange::new(MediaTime::from_secs(1), MediaTime::from_secs(2)).unwrap();
        let json = serde_json::to_string(&range).unwrap();
        assert_eq!(json, r#"{"start":1000,"end":2000}"#);
        let decoded: TimeRange = serde_json::from_str(&json).unwrap();
        assert_eq!(range, decoded);
    }
}
