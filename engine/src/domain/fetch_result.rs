//! Tri-state result of one cached fetch.

use tokio_util::sync::CancellationToken;

use super::ResolutionError;

/// Cancellation handle of one fetch issuance.
///
/// The issuance id is unique per cache and monotonically increasing, so a
/// completion can tell whether the slot it targets still belongs to it.
/// Cancelling is idempotent and safe after the fetch has completed.
#[derive(Debug, Clone)]
pub struct FetchToken {
    issuance: u64,
    cancellation: CancellationToken,
}

impl FetchToken {
    pub(crate) fn new(issuance: u64) -> Self {
        Self {
            issuance,
            cancellation: CancellationToken::new(),
        }
    }

    /// Identifier of the issuance this token belongs to.
    pub fn issuance(&self) -> u64 {
        self.issuance
    }

    /// Abandon the in-flight fetch.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Whether [`FetchToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.cancellation.clone()
    }
}

impl PartialEq for FetchToken {
    fn eq(&self, other: &Self) -> bool {
        self.issuance == other.issuance
    }
}

/// Cached state of a place or route fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult<T> {
    /// A fetch is in flight and may be cancelled through `token`.
    InProgress {
        /// Handle of the in-flight issuance.
        token: FetchToken,
    },
    /// The fetch resolved.
    Success {
        /// Resolved value.
        value: T,
    },
    /// The fetch failed.
    Failed {
        /// Descriptive failure.
        error: ResolutionError,
    },
}

impl<T> FetchResult<T> {
    /// `Success` or `Failed`.
    pub fn is_settled(&self) -> bool {
        !self.is_in_progress()
    }

    /// Whether a fetch is in flight.
    pub fn is_in_progress(&self) -> bool {
        matches!(self, Self::InProgress { .. })
    }

    /// Whether the entry holds a failure.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Resolved value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Success { value } => Some(value),
            _ => None,
        }
    }

    /// Recorded failure, if any.
    pub fn error(&self) -> Option<&ResolutionError> {
        match self {
            Self::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// In-flight token, if any.
    pub fn token(&self) -> Option<&FetchToken> {
        match self {
            Self::InProgress { token } => Some(token),
            _ => None,
        }
    }

    /// Whether this entry already satisfies a fetch request, i.e. it is
    /// resolved or being resolved. Failed entries do not.
    pub fn is_current(&self) -> bool {
        matches!(self, Self::InProgress { .. } | Self::Success { .. })
    }
}

impl<T> From<Result<T, ResolutionError>> for FetchResult<T> {
    fn from(result: Result<T, ResolutionError>) -> Self {
        match result {
            Ok(value) => Self::Success { value },
            Err(error) => Self::Failed { error },
        }
    }
}
