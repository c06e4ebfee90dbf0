//! UseCase: ハートビート処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - HeartbeatUseCase::record_pong() / sweep() メソッド
//!
//! ### なぜこのテストが必要か
//! - 応答のないセッションはルームに残り続け、ブロードキャストの度に
//!   無駄な送信が発生するため、タイムアウトで確実に退去させる必要がある
//!
//! ### どのような状況を想定しているか
//! - 正常系：pong で生存時刻が更新され、次のスイープで ping が送られる
//! - 異常系：タイムアウトしたセッションはルームからも削除される
//! - エッジケース：要求していない pong も受け入れる

use std::{sync::Arc, time::Duration};

use noteboard_shared::time::now_millis;

use crate::{
    domain::{ClientId, RegistryError, SessionRegistry, SweepReport, Timestamp},
    infrastructure::dto::websocket::WsMessage,
};

/// ハートビートのユースケース
pub struct HeartbeatUseCase {
    registry: Arc<dyn SessionRegistry>,
    timeout: Duration,
}

impl HeartbeatUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// pong を受信した時刻を生存時刻として記録する
    pub async fn record_pong(&self, client_id: &ClientId) -> Result<(), RegistryError> {
        self.registry
            .touch(client_id, Timestamp::new(now_millis()))
            .await
    }

    /// 現在時刻でスイープを実行する
    pub async fn sweep(&self) -> SweepReport {
        self.sweep_at(Timestamp::new(now_millis())).await
    }

    /// 指定時刻でスイープを実行する
    ///
    /// タイムアウトしたセッションを退去させ、残りのセッションに ping を送る。
    pub async fn sweep_at(&self, now: Timestamp) -> SweepReport {
        let ping = match WsMessage::ping(None, now.value()).to_json() {
            Ok(ping) => ping,
            Err(e) => {
                tracing::error!("Failed to encode ping: {}", e);
                return SweepReport::default();
            }
        };

        let timeout_ms = i64::try_from(self.timeout.as_millis()).unwrap_or(i64::MAX);
        let report = self.registry.sweep(now, timeout_ms, ping).await;
        if !report.expired.is_empty() {
            tracing::info!(
                "Liveness sweep evicted {} clients ({} pinged)",
                report.expired.len(),
                report.pinged
            );
        } else {
            tracing::debug!("Liveness sweep pinged {} clients", report.pinged);
        }
        report
    }
}
