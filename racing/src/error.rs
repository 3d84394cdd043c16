use std::fmt;
use std::io;
use std::path::PathBuf;

/// Everything that can stop a session from being built.
///
/// These are all detected before the race starts. Once a `Session` exists,
/// gameplay operations never fail; they are accepted or silently declined.
#[derive(Debug)]
pub enum SetupError {
    Io { path: PathBuf, source: io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Serialize(toml::ser::Error),
    NoPlayers,
    TooManyPlayers { requested: usize, configured: usize },
    DuplicatePlayer(u8),
    InvalidPlayerId(u8),
    ZeroLaps,
    NoCheckpoints,
    MissingSpawnPoint(u8),
    EmptyCurve(&'static str),
    UnsortedCurve(&'static str),
    NonPositive(&'static str),
    UnknownKey { player: u8, key: String },
    TrackTooShort(usize),
}

impl fmt::Display for SetupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetupError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            SetupError::Parse { path, source } => {
                write!(f, "failed to parse {}: {}", path.display(), source)
            }
            SetupError::Serialize(e) => write!(f, "failed to serialize config: {e}"),
            SetupError::NoPlayers => write!(f, "a race needs at least one player"),
            SetupError::TooManyPlayers {
                requested,
                configured,
            } => write!(
                f,
                "{requested} players requested but only {configured} player configs exist"
            ),
            SetupError::DuplicatePlayer(id) => write!(f, "player {id} is configured twice"),
            SetupError::InvalidPlayerId(id) => {
                write!(f, "player ids start at 1 and must be contiguous, got {id}")
            }
            SetupError::ZeroLaps => write!(f, "lap count must be at least 1"),
            SetupError::NoCheckpoints => write!(f, "the level must define at least 1 checkpoint"),
            SetupError::MissingSpawnPoint(id) => {
                write!(f, "the level has no starting grid slot for player {id}")
            }
            SetupError::EmptyCurve(name) => write!(f, "curve `{name}` has no keys"),
            SetupError::UnsortedCurve(name) => {
                write!(f, "curve `{name}` keys must be sorted by time")
            }
            SetupError::NonPositive(name) => write!(f, "`{name}` must be greater than zero"),
            SetupError::UnknownKey { player, key } => {
                write!(f, "player {player}: unknown key name `{key}`")
            }
            SetupError::TrackTooShort(n) => {
                write!(f, "a closed track needs at least 4 control points, got {n}")
            }
        }
    }
}

impl std::error::Error for SetupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SetupError::Io { source, .. } => Some(source),
            SetupError::Parse { source, .. } => Some(source),
            SetupError::Serialize(e) => Some(e),
            _ => None,
        }
    }
}

impl From<toml::ser::Error> for SetupError {
    fn from(error: toml::ser::Error) -> SetupError {
        SetupError::Serialize(error)
    }
}
