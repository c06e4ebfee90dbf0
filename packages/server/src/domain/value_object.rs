//! Value Objects for domain models.
//!
//! Value Objects are immutable objects that represent values in the domain.
//! They are compared by their value, not by identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::ValueObjectError;

/// Maximum accepted length for client and canvas identifiers.
pub const MAX_ID_LENGTH: usize = 100;

/// Client identifier value object.
///
/// Opaque token assigned by the server to one WebSocket connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClientId(String);

impl ClientId {
    /// Create a new ClientId.
    ///
    /// # Arguments
    ///
    /// * `id` - The client identifier string
    ///
    /// # Returns
    ///
    /// A Result containing the ClientId or an error if validation fails
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::ClientIdEmpty);
        }
        let len = id.len();
        if len > MAX_ID_LENGTH {
            return Err(ValueObjectError::ClientIdTooLong {
                max: MAX_ID_LENGTH,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for ClientId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canvas identifier value object.
///
/// A canvas is the unit of sharing: every connection viewing the same canvas
/// belongs to the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanvasId(String);

impl CanvasId {
    /// Create a new CanvasId.
    pub fn new(id: String) -> Result<Self, ValueObjectError> {
        if id.is_empty() {
            return Err(ValueObjectError::CanvasIdEmpty);
        }
        let len = id.len();
        if len > MAX_ID_LENGTH {
            return Err(ValueObjectError::CanvasIdTooLong {
                max: MAX_ID_LENGTH,
                actual: len,
            });
        }
        Ok(Self(id))
    }

    /// Get the inner string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert to owned String.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for CanvasId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp value object.
///
/// Represents a Unix timestamp in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Create a new Timestamp.
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner i64 value.
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Milliseconds elapsed from `earlier` to `self`, saturating at zero.
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0).max(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_new_success() {
        // テスト項目: 有効なクライアント ID を作成できる
        // given (前提条件):
        let id = "3f0c7d8e-client".to_string();

        // when (操作):
        let result = ClientId::new(id);

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(result.unwrap().as_str(), "3f0c7d8e-client");
    }

    #[test]
    fn test_client_id_new_empty_fails() {
        // テスト項目: 空のクライアント ID は作成できない
        // when (操作):
        let result = ClientId::new(String::new());

        // then (期待する結果):
        assert_eq!(result.unwrap_err(), ValueObjectError::ClientIdEmpty);
    }

    #[test]
    fn test_client_id_new_too_long_fails() {
        // テスト項目: 101 文字以上のクライアント ID は作成できない
        // given (前提条件):
        let id = "a".repeat(101);

        // when (操作):
        let result = ClientId::new(id);

        // then (期待する結果):
        assert_eq!(
            result.unwrap_err(),
            ValueObjectError::ClientIdTooLong {
                max: 100,
                actual: 101
            }
        );
    }

    #[test]
    fn test_canvas_id_new_success() {
        // テスト項目: 有効なキャンバス ID を作成できる
        let result = CanvasId::try_from("c1".to_string());
        assert_eq!(result.unwrap().as_str(), "c1");
    }

    #[test]
    fn test_canvas_id_new_empty_fails() {
        // テスト項目: 空のキャンバス ID は作成できない
        let result = CanvasId::new(String::new());
        assert_eq!(result.unwrap_err(), ValueObjectError::CanvasIdEmpty);
    }

    #[test]
    fn test_canvas_id_equality() {
        // テスト項目: 同じ値を持つ CanvasId は等価
        let id1 = CanvasId::new("c1".to_string()).unwrap();
        let id2 = CanvasId::new("c1".to_string()).unwrap();
        let id3 = CanvasId::new("c2".to_string()).unwrap();

        assert_eq!(id1, id2);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_timestamp_millis_since() {
        // テスト項目: 経過時間を計算でき、過去方向は 0 に丸められる
        // given (前提条件):
        let earlier = Timestamp::new(1_000);
        let later = Timestamp::new(61_000);

        // then (期待する結果):
        assert_eq!(later.millis_since(earlier), 60_000);
        assert_eq!(earlier.millis_since(later), 0);
    }
}
