// Moderation gate - status state machine, insertion policy and admin credential checks
use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use std::str::FromStr;
use subtle::ConstantTimeEq;

use crate::config::AdminConfig;
use crate::error::{AppError, Result};
use crate::models::{Message, MessageStatus};

/// Initial status of visitor submissions, set once per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModerationPolicy {
    /// New messages are public immediately.
    AutoApprove,
    /// New messages wait for an admin decision.
    RequireReview,
}

impl FromStr for ModerationPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "approved" | "auto_approve" => Ok(ModerationPolicy::AutoApprove),
            "pending" | "require_review" => Ok(ModerationPolicy::RequireReview),
            other => Err(format!(
                "unknown moderation default status '{}', expected approved or pending",
                other
            )),
        }
    }
}

impl<'de> Deserialize<'de> for ModerationPolicy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl ModerationPolicy {
    pub fn initial_status(&self) -> MessageStatus {
        match self {
            ModerationPolicy::AutoApprove => MessageStatus::Approved,
            ModerationPolicy::RequireReview => MessageStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
}

impl ReviewAction {
    pub fn target_status(&self) -> MessageStatus {
        match self {
            ReviewAction::Approve => MessageStatus::Approved,
            ReviewAction::Reject => MessageStatus::Rejected,
        }
    }
}

impl FromStr for ReviewAction {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "approve" => Ok(ReviewAction::Approve),
            "reject" => Ok(ReviewAction::Reject),
            other => Err(AppError::validation(
                "INVALID_ACTION",
                format!("Unknown review action '{}', expected approve or reject", other),
            )),
        }
    }
}

/// Parse a requested target status. Only decisions are accepted; nothing
/// moves back to `pending`.
pub fn parse_target_status(raw: &str) -> Result<MessageStatus> {
    match raw.trim().parse::<MessageStatus>() {
        Ok(status @ (MessageStatus::Approved | MessageStatus::Rejected)) => Ok(status),
        _ => Err(AppError::validation(
            "INVALID_STATUS",
            "Status must be approved or rejected",
        )),
    }
}

/// Check that `message` may move to `target`.
///
/// Pending messages can be approved or rejected, and decided messages can be
/// re-reviewed. Admin replies stay approved.
pub fn check_transition(message: &Message, target: MessageStatus) -> Result<()> {
    if target == MessageStatus::Pending {
        return Err(AppError::validation(
            "INVALID_STATUS",
            "Status must be approved or rejected",
        ));
    }
    if message.is_admin_reply && target != MessageStatus::Approved {
        return Err(AppError::validation(
            "INVALID_TRANSITION",
            "Admin replies are always approved",
        ));
    }
    Ok(())
}

/// Compares secrets without leaking a matching prefix or the length.
fn secrets_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided.as_slice().ct_eq(expected.as_slice()).into()
}

pub struct AdminGate<'a> {
    admin: &'a AdminConfig,
}

impl<'a> AdminGate<'a> {
    pub fn new(admin: &'a AdminConfig) -> Self {
        Self { admin }
    }

    pub fn verify_bearer(&self, token: Option<&str>) -> Result<()> {
        match token {
            Some(token) if secrets_match(token, &self.admin.api_key) => Ok(()),
            _ => Err(AppError::Unauthorized),
        }
    }

    /// Exchange admin credentials for the bearer secret.
    pub fn login(&self, username: &str, password: &str) -> Result<String> {
        let expected_username = self.admin.username.as_deref().ok_or(AppError::Configuration {
            code: "ADMIN_LOGIN_UNCONFIGURED",
        })?;

        let password_ok = match (&self.admin.password_hash, &self.admin.password) {
            (Some(hash), _) => self.verify_password_hash(password, hash),
            (None, Some(expected)) => secrets_match(password, expected),
            (None, None) => {
                return Err(AppError::Configuration {
                    code: "ADMIN_LOGIN_UNCONFIGURED",
                })
            }
        };
        let username_ok = secrets_match(username, expected_username);

        if username_ok && password_ok {
            Ok(self.admin.api_key.clone())
        } else {
            tracing::warn!("Admin login rejected");
            Err(AppError::Unauthorized)
        }
    }

    fn verify_password_hash(&self, password: &str, hash: &str) -> bool {
        use argon2::{Argon2, PasswordHash, PasswordVerifier};

        match PasswordHash::new(hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(e) => {
                tracing::error!("Invalid admin password hash: {}", e);
                false
            }
        }
    }
}
