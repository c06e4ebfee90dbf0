//! UseCase: クライアント接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectClientUseCase::execute() メソッド
//! - セッション ID の払い出しと、最初の ping による ID の通知
//!
//! ### なぜこのテストが必要か
//! - クライアントは最初の ping に含まれる clientId を自分の ID として扱い、
//!   エコー除外に使うため、必ず最初のフレームとして届く必要がある
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続で未参加のセッションが登録される
//! - エッジケース：連続した接続で ID が重複しない

use std::sync::Arc;

use noteboard_shared::time::now_millis;
use tokio::sync::mpsc::Sender;

use crate::{
    domain::{ClientId, ClientIdFactory, SessionRegistry, Timestamp},
    infrastructure::dto::websocket::WsMessage,
};

use super::error::ConnectError;

/// クライアント接続のユースケース
pub struct ConnectClientUseCase {
    registry: Arc<dyn SessionRegistry>,
}

impl ConnectClientUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 新しいセッションを登録し、ID を載せた ping を送信キューに積む
    ///
    /// # Returns
    ///
    /// * `Ok(ClientId)` - 払い出したセッション ID
    /// * `Err(ConnectError)` - 登録失敗
    pub async fn execute(&self, sender: Sender<String>) -> Result<ClientId, ConnectError> {
        let client_id = ClientIdFactory::generate()?;
        let now = now_millis();

        self.registry
            .register(client_id.clone(), sender, Timestamp::new(now))
            .await?;

        let hello = WsMessage::ping(Some(client_id.as_str().to_string()), now).to_json()?;
        if !self.registry.send_to(&client_id, hello).await {
            tracing::warn!("Client '{}' went away before the first ping", client_id);
        }

        Ok(client_id)
    }
}
