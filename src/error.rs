//! Error types for journey validation and progress synchronization.

use thiserror::Error;

/// Malformed journey input, or a request the progress service refused as invalid.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("route point {index} has invalid coordinates ({latitude}, {longitude})")]
    InvalidPoint {
        index: usize,
        latitude: f64,
        longitude: f64,
    },
    #[error("landmark {id} has invalid cumulative distance {distance_m}")]
    InvalidLandmarkDistance { id: String, distance_m: f64 },
    #[error("landmark {id} has invalid coordinates ({latitude}, {longitude})")]
    InvalidLandmarkPosition {
        id: String,
        latitude: f64,
        longitude: f64,
    },
    #[error("landmark {id} at {distance_m:.1}m precedes previous landmark at {previous_m:.1}m")]
    LandmarkOrder {
        id: String,
        distance_m: f64,
        previous_m: f64,
    },
    #[error("total route distance must be positive and finite (got {0})")]
    InvalidTotalDistance(f64),
    #[error("request rejected by progress service: {0}")]
    Rejected(String),
}

/// Failures reported by a [`crate::ProgressService`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SyncError {
    /// The journey was already started for this user.
    #[error("journey {journey_id} already started for user {user_id}")]
    Conflict { user_id: String, journey_id: String },
    /// Transient transport failure.
    #[error("network error: {0}")]
    Network(String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Unknown journey/user pair.
    #[error("no progress for journey {journey_id} and user {user_id}")]
    NotFound { user_id: String, journey_id: String },
}

impl SyncError {
    /// Whether resending the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Network(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, SyncError::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(SyncError::Network("timeout".into()).is_retryable());
        assert!(!SyncError::NotFound {
            user_id: "u".into(),
            journey_id: "j".into()
        }
        .is_retryable());
        assert!(!SyncError::from(ValidationError::Rejected("bad".into())).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = SyncError::Conflict {
            user_id: "u1".into(),
            journey_id: "camino".into(),
        };
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "journey camino already started for user u1");

        let err = ValidationError::LandmarkOrder {
            id: "b".into(),
            distance_m: 100.0,
            previous_m: 250.0,
        };
        assert_eq!(
            err.to_string(),
            "landmark b at 100.0m precedes previous landmark at 250.0m"
        );
    }
}
