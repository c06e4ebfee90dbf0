//! UseCase: キャンバス退出処理

use std::sync::Arc;

use crate::domain::{CanvasId, ClientId, RegistryError, SessionRegistry};

/// キャンバス退出のユースケース
pub struct LeaveCanvasUseCase {
    registry: Arc<dyn SessionRegistry>,
}

impl LeaveCanvasUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 退出を実行し、抜けたキャンバスを返す。未参加なら `Ok(None)`。
    pub async fn execute(&self, client_id: &ClientId) -> Result<Option<CanvasId>, RegistryError> {
        let left = self.registry.leave(client_id).await?;
        if let Some(canvas_id) = &left {
            tracing::info!("Client '{}' left canvas '{}'", client_id, canvas_id);
        }
        Ok(left)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Timestamp, infrastructure::repository::InMemorySessionRegistry};
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_leave_twice() {
        // テスト項目: 2 回目の退出は何もしない
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let client_id = ClientId::new("a".to_string()).unwrap();
        let (tx, _rx) = mpsc::channel(8);
        registry
            .register(client_id.clone(), tx, Timestamp::new(0))
            .await
            .unwrap();
        registry
            .join(&client_id, CanvasId::new("c1".to_string()).unwrap())
            .await
            .unwrap();
        let usecase = LeaveCanvasUseCase::new(registry.clone());

        // when (操作):
        let first = usecase.execute(&client_id).await.unwrap();
        let second = usecase.execute(&client_id).await.unwrap();

        // then (期待する結果):
        assert_eq!(first.map(CanvasId::into_string), Some("c1".to_string()));
        assert_eq!(second, None);
        assert_eq!(registry.snapshot().await.active_canvases(), 0);
        // セッション自体は残る
        assert_eq!(registry.snapshot().await.total_clients, 1);
    }
}
