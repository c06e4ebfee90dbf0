//! UseCase: クライアント切断処理

use std::sync::Arc;

use crate::domain::{CanvasId, ClientId, SessionRegistry};

/// クライアント切断のユースケース
pub struct DisconnectClientUseCase {
    registry: Arc<dyn SessionRegistry>,
}

impl DisconnectClientUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// セッションを削除する。参加中だったキャンバスを返す。
    ///
    /// 既に退去済み（タイムアウトや送信失敗）のセッションに対しては何もしない。
    pub async fn execute(&self, client_id: &ClientId) -> Option<CanvasId> {
        let canvas_id = self.registry.unregister(client_id).await;
        match &canvas_id {
            Some(canvas_id) => {
                tracing::info!("Client '{}' disconnected from canvas '{}'", client_id, canvas_id)
            }
            None => tracing::info!("Client '{}' disconnected", client_id),
        }
        canvas_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Timestamp, infrastructure::repository::InMemorySessionRegistry};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_disconnect_removes_session_and_empty_room() {
        // テスト項目: 切断でセッションが消え、空になったルームも削除される
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let client_id = ClientId::new("a".to_string()).unwrap();
        let canvas_id = CanvasId::new("c1".to_string()).unwrap();
        let (tx, _rx) = mpsc::channel(8);
        registry
            .register(client_id.clone(), tx, Timestamp::new(0))
            .await
            .unwrap();
        registry.join(&client_id, canvas_id.clone()).await.unwrap();
        let usecase = DisconnectClientUseCase::new(registry.clone());

        // when (操作):
        let left = usecase.execute(&client_id).await;

        // then (期待する結果):
        assert_eq!(left, Some(canvas_id));
        let snapshot = registry.snapshot().await;
        assert_eq!(snapshot.total_clients, 0);
        assert_eq!(snapshot.active_canvases(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_twice_is_noop() {
        // テスト項目: 既に退去したセッションの切断は何もしない
        let registry = Arc::new(InMemorySessionRegistry::new());
        let usecase = DisconnectClientUseCase::new(registry);
        let client_id = ClientId::new("ghost".to_string()).unwrap();
        assert_eq!(usecase.execute(&client_id).await, None);
    }
}
