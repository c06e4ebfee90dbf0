//! UseCase 層
//!
//! ビジネスロジックを実装するレイヤー。
//! UI 層から呼び出され、Domain 層（SessionRegistry）を操作します。

pub mod connect_client;
pub mod disconnect_client;
pub mod error;
pub mod heartbeat;
pub mod ingress_broadcast;
pub mod join_canvas;
pub mod leave_canvas;
pub mod update_notes;

pub use connect_client::ConnectClientUseCase;
pub use disconnect_client::DisconnectClientUseCase;
pub use error::{ConnectError, IngressError, JoinError, UpdateError};
pub use heartbeat::HeartbeatUseCase;
pub use ingress_broadcast::{BroadcastCommand, IngressBroadcastUseCase};
pub use join_canvas::JoinCanvasUseCase;
pub use leave_canvas::LeaveCanvasUseCase;
pub use update_notes::UpdateNotesUseCase;
