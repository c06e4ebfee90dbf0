//! Domain factories for creating domain entities and value objects.

use super::{ClientId, error::ValueObjectError};

/// Factory for generating ClientId instances.
///
/// This factory encapsulates the logic for generating new connection
/// identifiers, separating the generation concern from the validation logic
/// in ClientId.
pub struct ClientIdFactory;

impl ClientIdFactory {
    /// Generate a new ClientId with a random UUID v4.
    ///
    /// # Errors
    ///
    /// This method should not fail in practice, but returns Result for consistency
    /// with the domain error handling pattern.
    pub fn generate() -> Result<ClientId, ValueObjectError> {
        let uuid = uuid::Uuid::new_v4();
        ClientId::new(uuid.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_id_factory_generate() {
        // テスト項目: ClientIdFactory::generate() で UUID v4 形式の ClientId を生成できる
        // when (操作):
        let result = ClientIdFactory::generate();

        // then (期待する結果):
        assert!(result.is_ok());
        let client_id = result.unwrap();
        assert_eq!(client_id.as_str().len(), 36); // UUID v4 の標準長（ハイフン含む）
        assert!(uuid::Uuid::parse_str(client_id.as_str()).is_ok());
    }

    #[test]
    fn test_client_id_factory_generate_uniqueness() {
        // テスト項目: ClientIdFactory::generate() は毎回異なる ID を生成する
        let client_id1 = ClientIdFactory::generate().unwrap();
        let client_id2 = ClientIdFactory::generate().unwrap();

        assert_ne!(client_id1, client_id2);
    }
}
