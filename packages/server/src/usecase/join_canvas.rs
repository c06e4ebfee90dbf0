//! UseCase: キャンバス参加処理
//!
//! セッションを指定キャンバスのルームへ移動する。以前のルームからは
//! 先に抜け、ルームが空になればそのルームは削除される。

use std::sync::Arc;

use crate::domain::{CanvasId, ClientId, SessionRegistry};

use super::error::JoinError;

/// キャンバス参加のユースケース
pub struct JoinCanvasUseCase {
    registry: Arc<dyn SessionRegistry>,
}

impl JoinCanvasUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 参加を実行し、参加したキャンバスを返す
    pub async fn execute(
        &self,
        client_id: &ClientId,
        canvas_id: String,
    ) -> Result<CanvasId, JoinError> {
        let canvas_id = CanvasId::try_from(canvas_id)?;
        let previous = self.registry.join(client_id, canvas_id.clone()).await?;

        match previous {
            Some(previous) if previous != canvas_id => tracing::info!(
                "Client '{}' moved from canvas '{}' to '{}'",
                client_id,
                previous,
                canvas_id
            ),
            _ => tracing::info!("Client '{}' joined canvas '{}'", client_id, canvas_id),
        }
        Ok(canvas_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{RegistryError, Timestamp, ValueObjectError},
        infrastructure::repository::InMemorySessionRegistry,
    };
    use tokio::sync::mpsc;

    async fn setup() -> (Arc<InMemorySessionRegistry>, ClientId) {
        let registry = Arc::new(InMemorySessionRegistry::new());
        let client_id = ClientId::new("a".to_string()).unwrap();
        let (tx, _rx) = mpsc::channel(8);
        registry
            .register(client_id.clone(), tx, Timestamp::new(0))
            .await
            .unwrap();
        (registry, client_id)
    }

    #[tokio::test]
    async fn test_join_then_switch_canvas() {
        // テスト項目: 別キャンバスへの参加で以前のルームから抜ける
        // given (前提条件):
        let (registry, client_id) = setup().await;
        let usecase = JoinCanvasUseCase::new(registry.clone());

        // when (操作):
        usecase.execute(&client_id, "c1".to_string()).await.unwrap();
        let joined = usecase.execute(&client_id, "c2".to_string()).await.unwrap();

        // then (期待する結果):
        assert_eq!(joined.as_str(), "c2");
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.active_canvases(), 1);
        assert_eq!(snapshot.canvas_clients.get(&joined), Some(&1));
    }

    #[tokio::test]
    async fn test_join_rejects_empty_canvas_id() {
        // テスト項目: 空のキャンバス ID は拒否され、状態は変わらない
        let (registry, client_id) = setup().await;
        let usecase = JoinCanvasUseCase::new(registry.clone());

        let result = usecase.execute(&client_id, String::new()).await;

        assert_eq!(
            result,
            Err(JoinError::InvalidCanvasId(ValueObjectError::CanvasIdEmpty))
        );
        assert_eq!(registry.canvas_of(&client_id).await, None);
    }

    #[tokio::test]
    async fn test_join_unknown_session() {
        // テスト項目: 登録されていないセッションは参加できない
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = JoinCanvasUseCase::new(registry);
        let ghost = ClientId::new("ghost".to_string()).unwrap();

        let result = usecase.execute(&ghost, "c1".to_string()).await;

        assert_eq!(
            result,
            Err(JoinError::Registry(RegistryError::SessionNotFound(
                "ghost".to_string()
            )))
        );
    }
}
