//! Rebalance request and its queue message form.

use serde::{Deserialize, Serialize};

use crate::domain::portfolio::{Allocation, WeightOutOfRange};
use crate::domain::shared::{Timestamp, UserId};

/// A request to move a user's portfolio to a new allocation.
///
/// Lives for one processing attempt only. `created_at` is stamped by the
/// intake, never trusted from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalanceRequest {
    /// Owner of the portfolio.
    pub user_id: UserId,
    /// Target allocation in percentage terms.
    pub new_allocation: Allocation,
    /// When the request was accepted or consumed.
    pub created_at: Timestamp,
}

impl RebalanceRequest {
    /// Create a request stamped with `created_at`.
    #[must_use]
    pub const fn new(user_id: UserId, new_allocation: Allocation, created_at: Timestamp) -> Self {
        Self {
            user_id,
            new_allocation,
            created_at,
        }
    }
}

/// Error decoding a rebalance message.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Payload is not a valid rebalance message.
    #[error("malformed rebalance message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Message does not name a user.
    #[error("rebalance message has no user_id")]
    MissingUserId,

    /// A target weight is outside the accepted range.
    #[error(transparent)]
    WeightOutOfRange(#[from] WeightOutOfRange),
}

/// Queue payload shape. Any `created_at` on the wire is ignored since the
/// consumer restamps it.
#[derive(Debug, Deserialize)]
struct RebalanceMessage {
    user_id: UserId,
    #[serde(default)]
    new_allocation: Allocation,
}

impl RebalanceRequest {
    /// Decode a queue payload, stamping it with `consumed_at`.
    pub fn decode(payload: &[u8], consumed_at: Timestamp) -> Result<Self, DecodeError> {
        let message: RebalanceMessage = serde_json::from_slice(payload)?;
        if message.user_id.is_blank() {
            return Err(DecodeError::MissingUserId);
        }
        message.new_allocation.check_weights()?;
        Ok(Self::new(message.user_id, message.new_allocation, consumed_at))
    }

    /// Encode as a queue payload.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn decode_overwrites_created_at() {
        let payload = br#"{"user_id":"1","new_allocation":{"stocks":70},"created_at":"2020-01-01T00:00:00Z"}"#;
        let consumed = ts("2026-01-19T12:00:00Z");

        let request = RebalanceRequest::decode(payload, consumed).unwrap();

        assert_eq!(request.user_id, UserId::new("1"));
        assert_eq!(request.new_allocation.weight("stocks"), dec!(70));
        assert_eq!(request.created_at, consumed);
    }

    #[test]
    fn decode_accepts_missing_created_at() {
        let payload = br#"{"user_id":"1","new_allocation":{"gold":10}}"#;
        assert!(RebalanceRequest::decode(payload, Timestamp::now()).is_ok());
    }

    #[test]
    fn decode_rejects_garbage() {
        let err = RebalanceRequest::decode(b"ping", Timestamp::now()).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn decode_rejects_blank_user() {
        let payload = br#"{"user_id":"","new_allocation":{"gold":10}}"#;
        let err = RebalanceRequest::decode(payload, Timestamp::now()).unwrap_err();
        assert!(matches!(err, DecodeError::MissingUserId));
    }

    #[test]
    fn decode_rejects_extreme_weights() {
        let payload = br#"{"user_id":"1","new_allocation":{"stocks":70000000000000000000000000000}}"#;
        let err = RebalanceRequest::decode(payload, Timestamp::now()).unwrap_err();
        assert!(matches!(err, DecodeError::WeightOutOfRange(_)));
    }

    #[test]
    fn encode_then_decode_keeps_allocation() {
        let request = RebalanceRequest::new(
            UserId::new("1"),
            [("stocks", dec!(70)), ("bonds", dec!(20))].into_iter().collect(),
            ts("2026-01-19T12:00:00Z"),
        );
        let payload = request.encode().unwrap();
        let decoded = RebalanceRequest::decode(&payload, request.created_at).unwrap();
        assert_eq!(decoded, request);
    }
}
