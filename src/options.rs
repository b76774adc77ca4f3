//! Run configuration parsed from free-form option tokens.

use std::fmt;
use std::str::FromStr;

use crate::dialect::Dialect;
use crate::error::Error;

/// Direction of travel for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Action {
    /// Apply every pending migration, ascending by version.
    #[default]
    Up,
    /// Revert a single step.
    Down,
}

impl Action {
    /// Recognize a configuration token, if it names an action.
    pub(crate) fn token(token: &str) -> Option<Self> {
        match token {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            _ => None,
        }
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::token(s).ok_or_else(|| Error::UnrecognizedAction(s.to_string()))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// A parsed run configuration. Immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub action: Action,
    pub dialect: Dialect,
}

impl Config {
    /// Interpret a sequence of free-form tokens.
    ///
    /// Recognized tokens (`"up"`, `"down"`, and the supported dialect names)
    /// select the matching field; anything else is silently ignored. A
    /// category with no recognized token keeps its default, so an empty
    /// sequence yields `{Up, Postgres}`.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut config = Self::default();
        for token in tokens {
            let token = token.as_ref();
            if let Some(action) = Action::token(token) {
                config.action = action;
            } else if let Some(dialect) = Dialect::token(token) {
                config.dialect = dialect;
            }
        }
        config
    }
}
