use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors from timeline control.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// The speed selector is locked while auto-play runs
    #[error("Playback speed can only change while stopped")]
    SpeedWhilePlaying,

    #[error("Unknown playback speed '{0}', expected one of 0.5x, 1x, 2x, 4x")]
    InvalidSpeed(String),
}

/// Auto-play speed multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlaybackSpeed {
    Half,
    #[default]
    Normal,
    Double,
    Quadruple,
}

impl PlaybackSpeed {
    /// Time between two auto-play steps.
    pub fn interval(&self) -> Duration {
        match self {
            PlaybackSpeed::Half => Duration::from_millis(1000),
            PlaybackSpeed::Normal => Duration::from_millis(500),
            PlaybackSpeed::Double => Duration::from_millis(250),
            PlaybackSpeed::Quadruple => Duration::from_millis(125),
        }
    }
}

impl FromStr for PlaybackSpeed {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_end_matches(['x', 'X']) {
            "0.5" | ".5" => Ok(PlaybackSpeed::Half),
            "1" => Ok(PlaybackSpeed::Normal),
            "2" => Ok(PlaybackSpeed::Double),
            "4" => Ok(PlaybackSpeed::Quadruple),
            _ => Err(TimelineError::InvalidSpeed(s.to_string())),
        }
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PlaybackSpeed::Half => "0.5x",
            PlaybackSpeed::Normal => "1x",
            PlaybackSpeed::Double => "2x",
            PlaybackSpeed::Quadruple => "4x",
        };
        f.write_str(label)
    }
}
