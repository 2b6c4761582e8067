//! Error types for the dining engine.

use chrono::Weekday;
use netnutrition::SourceError;

/// Fieldless classification of a [`DiningError`], for callers that branch
/// on the failure without caring about its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    SourceUnavailable,
    NoMealFound,
    MenuNotFound,
    MenuNotAvailable,
    UnitNotFound,
    UnrecognizedArgument,
    NoFacilityProvided,
    TooManySelections,
    MissingScope,
    Config,
    Store,
    Io,
}

/// Top-level error type for the dining engine.
#[derive(Debug, thiserror::Error)]
pub enum DiningError {
    /// The catalog source failed transiently while fetching a facility.
    #[error("catalog source unavailable for {facility}: {reason}")]
    SourceUnavailable { facility: String, reason: String },

    /// Neither resolution pass found an eligible meal within a week.
    #[error("no upcoming meal found for {facility}")]
    NoMealFound { facility: String },

    /// The facility or the requested meal is not in the current snapshot.
    #[error("no {meal} menu for {facility} on {day}")]
    MenuNotFound {
        facility: String,
        day: Weekday,
        meal: String,
    },

    /// The facility publishes hours but no menu.
    #[error("{facility} does not publish a menu")]
    MenuNotAvailable { facility: String },

    /// The upstream catalog does not list the facility's unit.
    #[error("unit not found upstream for {facility}")]
    UnitNotFound { facility: String },

    #[error("unrecognized argument: {token}")]
    UnrecognizedArgument { token: String },

    #[error("no dining facility was provided")]
    NoFacilityProvided,

    /// The query fans out into more results than allowed.
    #[error("too many selections: {requested} results requested, at most {max} allowed")]
    TooManySelections { requested: usize, max: usize },

    /// An alias command was invoked without `menu` or `hours`.
    #[error("{alias} needs a scope: `{alias} menu` or `{alias} hours`")]
    MissingScope { alias: String },

    #[error("config error: {0}")]
    Config(String),

    /// Snapshot persistence failure.
    #[error("snapshot store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DiningError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable { .. } => ErrorKind::SourceUnavailable,
            Self::NoMealFound { .. } => ErrorKind::NoMealFound,
            Self::MenuNotFound { .. } => ErrorKind::MenuNotFound,
            Self::MenuNotAvailable { .. } => ErrorKind::MenuNotAvailable,
            Self::UnitNotFound { .. } => ErrorKind::UnitNotFound,
            Self::UnrecognizedArgument { .. } => ErrorKind::UnrecognizedArgument,
            Self::NoFacilityProvided => ErrorKind::NoFacilityProvided,
            Self::TooManySelections { .. } => ErrorKind::TooManySelections,
            Self::MissingScope { .. } => ErrorKind::MissingScope,
            Self::Config(_) => ErrorKind::Config,
            Self::Store(_) => ErrorKind::Store,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Only upstream outages are retried by the refresh scheduler.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::SourceUnavailable
    }

    /// Attach a facility id to a catalog source failure.
    pub fn from_source(facility: &str, err: SourceError) -> Self {
        match err {
            SourceError::UnitNotFound(_) => Self::UnitNotFound {
                facility: facility.to_owned(),
            },
            SourceError::Config(reason) => Self::Config(reason),
            other if other.is_transient() => Self::SourceUnavailable {
                facility: facility.to_owned(),
                reason: other.to_string(),
            },
            other => Self::Config(other.to_string()),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, DiningError>;
