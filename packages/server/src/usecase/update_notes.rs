//! UseCase: ノート一覧の中継処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - UpdateNotesUseCase::execute() メソッド
//! - 送信者のルームの他メンバーへの notes_update の配信
//!
//! ### なぜこのテストが必要か
//! - 送信者自身にエコーが返ると、クライアントが編集中の状態を上書きしてしまう
//! - 別キャンバスのクライアントに漏れてはならない
//!
//! ### どのような状況を想定しているか
//! - 正常系：同じルームの N 人中 N-1 人に届く
//! - 異常系：未参加のセッションからの更新は破棄される

use std::sync::Arc;

use noteboard_shared::time::now_millis;

use crate::{
    domain::{BroadcastReport, ClientId, Note, SessionRegistry},
    infrastructure::dto::websocket::WsMessage,
};

use super::error::UpdateError;

/// ノート一覧中継のユースケース
pub struct UpdateNotesUseCase {
    registry: Arc<dyn SessionRegistry>,
}

impl UpdateNotesUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 送信者が参加しているルームの他メンバーへ配信する
    ///
    /// 配信先のルームはセッションの状態から決まり、フレーム中の canvasId は使わない。
    pub async fn execute(
        &self,
        client_id: &ClientId,
        notes: Vec<Note>,
    ) -> Result<BroadcastReport, UpdateError> {
        let canvas_id = self
            .registry
            .canvas_of(client_id)
            .await
            .ok_or_else(|| UpdateError::NotInCanvas(client_id.as_str().to_string()))?;

        let note_count = notes.len();
        let payload = WsMessage::notes_update(canvas_id.as_str(), notes, now_millis()).to_json()?;
        let report = self
            .registry
            .broadcast(&canvas_id, payload, Some(client_id))
            .await;

        tracing::debug!(
            "Relayed {} notes from '{}' to {} peers in canvas '{}'",
            note_count,
            client_id,
            report.delivered,
            canvas_id
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{CanvasId, Position, Size, Timestamp},
        infrastructure::repository::InMemorySessionRegistry,
    };
    use tokio::sync::mpsc::{self, Receiver};

    async fn member(
        registry: &InMemorySessionRegistry,
        id: &str,
        canvas: Option<&str>,
    ) -> (ClientId, Receiver<String>) {
        let client_id = ClientId::new(id.to_string()).unwrap();
        let (tx, rx) = mpsc::channel(8);
        registry
            .register(client_id.clone(), tx, Timestamp::new(0))
            .await
            .unwrap();
        if let Some(canvas) = canvas {
            registry
                .join(&client_id, CanvasId::new(canvas.to_string()).unwrap())
                .await
                .unwrap();
        }
        (client_id, rx)
    }

    #[tokio::test]
    async fn test_update_reaches_other_members_only() {
        // テスト項目: N 人のルームで送信者以外の N-1 人にだけ届く
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let (a, mut rx_a) = member(&registry, "a", Some("c1")).await;
        let (_b, mut rx_b) = member(&registry, "b", Some("c1")).await;
        let (_c, mut rx_c) = member(&registry, "c", Some("c1")).await;
        let (_d, mut rx_d) = member(&registry, "d", Some("c2")).await;
        let usecase = UpdateNotesUseCase::new(registry.clone());
        let notes = vec![Note::new(1, "hi", Position::new(0, 0), Size::new(20, 20), 1)];

        // when (操作):
        let report = usecase.execute(&a, notes.clone()).await.unwrap();

        // then (期待する結果):
        assert_eq!(report.delivered, 2);
        for rx in [&mut rx_b, &mut rx_c] {
            let msg = WsMessage::from_json(&rx.try_recv().unwrap()).unwrap();
            match msg {
                WsMessage::NotesUpdate {
                    canvas_id,
                    notes: received,
                    ..
                } => {
                    assert_eq!(canvas_id.as_deref(), Some("c1"));
                    assert_eq!(received, notes);
                }
                other => panic!("unexpected frame: {:?}", other),
            }
        }
        assert!(rx_a.try_recv().is_err());
        assert!(rx_d.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_update_from_unbound_session_is_dropped() {
        // テスト項目: 未参加のセッションからの更新はエラーになり、誰にも届かない
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let (a, _rx_a) = member(&registry, "a", None).await;
        let (_b, mut rx_b) = member(&registry, "b", Some("c1")).await;
        let usecase = UpdateNotesUseCase::new(registry.clone());

        // when (操作):
        let result = usecase.execute(&a, vec![]).await;

        // then (期待する結果):
        assert!(matches!(result, Err(UpdateError::NotInCanvas(id)) if id == "a"));
        assert!(rx_b.try_recv().is_err());
    }
}
