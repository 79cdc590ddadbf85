//! Security alerts filed by users against a booking (wrong vehicle on the
//! spot, suspicious activity) and reviewed by admins.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::status::AlertStatus;
use crate::types::{DbId, Timestamp};

/// Maximum length of an alert description.
pub const MAX_DESCRIPTION_LEN: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityAlert {
    pub id: DbId,
    pub user_id: DbId,
    pub booking_id: DbId,
    pub spot_id: DbId,
    pub vehicle_number: String,
    pub description: String,
    pub screenshot_ref: Option<String>,
    pub status: AlertStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Store command for a new alert. Spot and vehicle are copied from the booking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAlert {
    pub user_id: DbId,
    pub booking_id: DbId,
    pub spot_id: DbId,
    pub vehicle_number: String,
    pub description: String,
    pub screenshot_ref: Option<String>,
}

pub fn validate_description(description: &str) -> Result<String, CoreError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(
            "Please describe the issue".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

pub mod state_machine {
    use crate::status::AlertStatus;

    /// Alerts only move forward; `Resolved` is terminal.
    pub fn valid_transitions(from: AlertStatus) -> &'static [AlertStatus] {
        match from {
            AlertStatus::Pending => &[AlertStatus::Reviewing, AlertStatus::Resolved],
            AlertStatus::Reviewing => &[AlertStatus::Resolved],
            AlertStatus::Resolved => &[],
        }
    }

    pub fn can_transition(from: AlertStatus, to: AlertStatus) -> bool {
        valid_transitions(from).contains(&to)
    }
}

/// Reject backward or repeated status moves.
pub fn validate_status_change(from: AlertStatus, to: AlertStatus) -> Result<(), CoreError> {
    if state_machine::can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Alert cannot move from {from} to {to}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn forward_transitions() {
        assert!(validate_status_change(AlertStatus::Pending, AlertStatus::Reviewing).is_ok());
        assert!(validate_status_change(AlertStatus::Pending, AlertStatus::Resolved).is_ok());
        assert!(validate_status_change(AlertStatus::Reviewing, AlertStatus::Resolved).is_ok());
    }

    #[test]
    fn backward_transitions_rejected() {
        assert_matches!(
            validate_status_change(AlertStatus::Resolved, AlertStatus::Pending),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_status_change(AlertStatus::Reviewing, AlertStatus::Pending),
            Err(CoreError::Validation(_))
        );
        assert_matches!(
            validate_status_change(AlertStatus::Pending, AlertStatus::Pending),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn description_required() {
        assert_matches!(validate_description("  "), Err(CoreError::Validation(_)));
        assert_eq!(validate_description(" wrong car ").unwrap(), "wrong car");
    }
}
