//! UseCase: 外部からのブロードキャスト受付
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - IngressBroadcastUseCase::parse() / deliver() メソッド
//! - HTTP 経由で受け取ったノート一覧のルームへの配信
//!
//! ### なぜこのテストが必要か
//! - 永続化層が保存後に呼び出す経路であり、不正なリクエストは呼び出し元に
//!   エラーとして返し、正しいリクエストは除外指定を守って配信する必要がある
//!
//! ### どのような状況を想定しているか
//! - 正常系：excludeClientId 以外のメンバーに届く
//! - 異常系：JSON でない、type が違う、canvasId や notes が無い
//! - エッジケース：誰もいないルームへの配信は成功扱い

use std::sync::Arc;

use noteboard_shared::time::now_millis;

use crate::{
    domain::{BroadcastReport, CanvasId, ClientId, Note, SessionRegistry},
    infrastructure::dto::{
        http::{BroadcastRequestDto, NOTES_UPDATE_TYPE},
        websocket::WsMessage,
    },
};

use super::error::IngressError;

/// Validated broadcast request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastCommand {
    pub canvas_id: CanvasId,
    pub notes: Vec<Note>,
    pub exclude: Option<ClientId>,
}

impl TryFrom<BroadcastRequestDto> for BroadcastCommand {
    type Error = IngressError;

    fn try_from(dto: BroadcastRequestDto) -> Result<Self, Self::Error> {
        if dto.r#type.as_deref() != Some(NOTES_UPDATE_TYPE) {
            return Err(IngressError::InvalidData);
        }
        let canvas_id = dto
            .canvas_id
            .ok_or(IngressError::InvalidData)
            .and_then(|id| CanvasId::try_from(id).map_err(|_| IngressError::InvalidData))?;
        let notes = dto.notes.ok_or(IngressError::InvalidData)?;
        let exclude = dto
            .exclude_client_id
            .filter(|id| !id.is_empty())
            .map(ClientId::try_from)
            .transpose()
            .map_err(|_| IngressError::InvalidData)?;

        Ok(Self {
            canvas_id,
            notes,
            exclude,
        })
    }
}

/// 外部ブロードキャストのユースケース
#[derive(Clone)]
pub struct IngressBroadcastUseCase {
    registry: Arc<dyn SessionRegistry>,
}

impl IngressBroadcastUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// リクエストボディを検証する
    ///
    /// 構文として正しい JSON でも、形が合わなければ InvalidData になる。
    pub fn parse(&self, body: &str) -> Result<BroadcastCommand, IngressError> {
        let dto: BroadcastRequestDto = serde_json::from_str(body).map_err(|e| {
            if e.is_data() {
                IngressError::InvalidData
            } else {
                IngressError::InvalidJson
            }
        })?;
        BroadcastCommand::try_from(dto)
    }

    /// 検証済みのリクエストを配信する
    pub async fn deliver(&self, command: BroadcastCommand) -> BroadcastReport {
        let BroadcastCommand {
            canvas_id,
            notes,
            exclude,
        } = command;

        let payload = match WsMessage::notes_update(canvas_id.as_str(), notes, now_millis()).to_json()
        {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!("Failed to encode broadcast for '{}': {}", canvas_id, e);
                return BroadcastReport::default();
            }
        };
        let report = self
            .registry
            .broadcast(&canvas_id, payload, exclude.as_ref())
            .await;
        tracing::info!(
            "Broadcast to canvas '{}' reached {} clients",
            canvas_id,
            report.delivered
        );
        report
    }

    /// 検証してから配信をバックグラウンドで開始する
    ///
    /// 配信の完了は待たない。配信中の失敗はログに残るだけ。
    pub fn execute(&self, body: &str) -> Result<(), IngressError> {
        let command = self.parse(body)?;
        let usecase = self.clone();
        tokio::spawn(async move {
            usecase.deliver(command).await;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Timestamp, infrastructure::repository::InMemorySessionRegistry};
    use tokio::sync::mpsc::{self, Receiver};

    async fn member(
        registry: &InMemorySessionRegistry,
        id: &str,
        canvas: &str,
    ) -> Receiver<String> {
        let client_id = ClientId::new(id.to_string()).unwrap();
        let (tx, rx) = mpsc::channel(8);
        registry
            .register(client_id.clone(), tx, Timestamp::new(0))
            .await
            .unwrap();
        registry
            .join(&client_id, CanvasId::new(canvas.to_string()).unwrap())
            .await
            .unwrap();
        rx
    }

    #[test]
    fn test_parse_rejects_malformed_bodies() {
        // テスト項目: 不正なリクエストは種類に応じたエラーになる
        // given (前提条件):
        let usecase = IngressBroadcastUseCase::new(Arc::new(InMemorySessionRegistry::new()));

        // then (期待する結果):
        assert_eq!(usecase.parse("{not json"), Err(IngressError::InvalidJson));
        assert_eq!(
            usecase.parse(r#"{"type":"join_canvas","canvasId":"c1","notes":[]}"#),
            Err(IngressError::InvalidData)
        );
        assert_eq!(
            usecase.parse(r#"{"type":"notes_update","notes":[]}"#),
            Err(IngressError::InvalidData)
        );
        assert_eq!(
            usecase.parse(r#"{"type":"notes_update","canvasId":"c1"}"#),
            Err(IngressError::InvalidData)
        );
        assert_eq!(
            usecase.parse(r#"{"type":"notes_update","canvasId":"","notes":[]}"#),
            Err(IngressError::InvalidData)
        );
    }

    #[test]
    fn test_parse_rejects_malformed_note_as_invalid_data() {
        // テスト項目: 構文は正しいが notes の中身が不正な場合は InvalidData になる
        // given (前提条件):
        let usecase = IngressBroadcastUseCase::new(Arc::new(InMemorySessionRegistry::new()));

        // when (操作):
        let missing_fields =
            usecase.parse(r#"{"type":"notes_update","canvasId":"c1","notes":[{"id":1}]}"#);
        let wrong_type = usecase.parse(r#"{"type":"notes_update","canvasId":"c1","notes":"x"}"#);
        let truncated = usecase.parse(r#"{"type":"notes_update","canvasId":"c1","notes":["#);

        // then (期待する結果):
        assert_eq!(missing_fields, Err(IngressError::InvalidData));
        assert_eq!(wrong_type, Err(IngressError::InvalidData));
        assert_eq!(truncated, Err(IngressError::InvalidJson));
    }

    #[test]
    fn test_parse_accepts_missing_exclusion() {
        // テスト項目: excludeClientId は省略できる
        let usecase = IngressBroadcastUseCase::new(Arc::new(InMemorySessionRegistry::new()));
        let command = usecase
            .parse(r#"{"type":"notes_update","canvasId":"c1","notes":[]}"#)
            .unwrap();
        assert_eq!(command.canvas_id.as_str(), "c1");
        assert_eq!(command.exclude, None);
    }

    #[tokio::test]
    async fn test_deliver_honours_exclusion() {
        // テスト項目: excludeClientId のクライアント以外に届く
        // given (前提条件):
        let registry = Arc::new(InMemorySessionRegistry::new());
        let mut rx_a = member(&registry, "a", "c1").await;
        let mut rx_b = member(&registry, "b", "c1").await;
        let usecase = IngressBroadcastUseCase::new(registry.clone());
        let command = usecase
            .parse(r#"{"type":"notes_update","canvasId":"c1","notes":[],"excludeClientId":"a"}"#)
            .unwrap();

        // when (操作):
        let report = usecase.deliver(command).await;

        // then (期待する結果):
        assert_eq!(report.delivered, 1);
        assert!(rx_a.try_recv().is_err());
        let msg = WsMessage::from_json(&rx_b.try_recv().unwrap()).unwrap();
        assert!(matches!(msg, WsMessage::NotesUpdate { .. }));
    }

    #[tokio::test]
    async fn test_deliver_to_empty_room() {
        // テスト項目: 誰もいないルームへの配信は何も起きない
        let usecase = IngressBroadcastUseCase::new(Arc::new(InMemorySessionRegistry::new()));
        let command = usecase
            .parse(r#"{"type":"notes_update","canvasId":"nobody","notes":[]}"#)
            .unwrap();
        assert_eq!(usecase.deliver(command).await, BroadcastReport::default());
    }
}
