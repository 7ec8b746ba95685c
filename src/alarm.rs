use std::{fmt, str::FromStr, time::Duration};

use chrono::{NaiveTime, Timelike};
use thiserror::Error;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// the time of day an alarm should go off at, minute resolution, 24-hour clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlarmTarget {
    hour: u8,
    minute: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("no alarm time given")]
    Empty,
    #[error("missing ':' between hour and minute")]
    MissingSeparator,
    #[error("hour `{0}` is not a number")]
    InvalidHour(String),
    #[error("minute `{0}` is not a number")]
    InvalidMinute(String),
    #[error("hour {0} is out of range (0-23)")]
    HourOutOfRange(u32),
    #[error("minute {0} is out of range (0-59)")]
    MinuteOutOfRange(u32),
}

impl AlarmTarget {
    #[must_use]
    pub const fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    /// parses `HH:MM` (hour and minute may each be one or two digits).
    /// nothing else is allowed around the time, not even whitespace
    ///
    /// # Errors
    /// returns a [`FormatError`] describing the first problem found in `text`
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        if text.is_empty() {
            return Err(FormatError::Empty);
        }
        let (hour, minute) = text
            .split_once(':')
            .ok_or(FormatError::MissingSeparator)?;
        let hour = parse_field(hour).ok_or_else(|| FormatError::InvalidHour(hour.to_string()))?;
        let minute =
            parse_field(minute).ok_or_else(|| FormatError::InvalidMinute(minute.to_string()))?;
        match (u8::try_from(hour), u8::try_from(minute)) {
            (Ok(hour), Ok(minute)) if hour < 24 && minute < 60 => Ok(Self { hour, minute }),
            _ if hour > 23 => Err(FormatError::HourOutOfRange(hour)),
            _ => Err(FormatError::MinuteOutOfRange(minute)),
        }
    }

    #[must_use]
    pub const fn hour(self) -> u8 {
        self.hour
    }

    #[must_use]
    pub const fn minute(self) -> u8 {
        self.minute
    }

    #[must_use]
    pub const fn seconds_from_midnight(self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60
    }

    /// true if `now` falls inside the minute of this alarm
    #[must_use]
    pub fn matches(self, now: NaiveTime) -> bool {
        now.hour() == u32::from(self.hour) && now.minute() == u32::from(self.minute)
    }
}

// one or two ascii digits, like strptime's %H and %M
fn parse_field(field: &str) -> Option<u32> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    field.parse().ok()
}

impl FromStr for AlarmTarget {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AlarmTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// time left until `target`, wrapping forward past midnight.
/// fractions of a second in `now` are ignored, so a target equal to `now` gives zero
#[must_use]
pub fn remaining(now: NaiveTime, target: AlarmTarget) -> Duration {
    let now = now.num_seconds_from_midnight() % SECONDS_PER_DAY;
    let secs = (target.seconds_from_midnight() + SECONDS_PER_DAY - now) % SECONDS_PER_DAY;
    Duration::from_secs(u64::from(secs))
}

/// what the countdown label shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Countdown {
    Remaining(Duration),
    /// the alarm field is empty or not a valid time
    Unknown,
}

impl Countdown {
    /// countdown from `now` to whatever is typed in the alarm field
    #[must_use]
    pub fn from_input(now: NaiveTime, input: &str) -> Self {
        AlarmTarget::parse(input).map_or(Self::Unknown, |target| {
            Self::Remaining(remaining(now, target))
        })
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Remaining(duration) => {
                let secs = duration.as_secs();
                write!(
                    f,
                    "{:02}:{:02}:{:02}",
                    secs / 3600,
                    (secs % 3600) / 60,
                    secs % 60
                )
            }
            Self::Unknown => write!(f, "--:--:--"),
        }
    }
}
