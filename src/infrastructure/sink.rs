//! イベントシンクアダプタ
//!
//! `EventSinkPort`の実装。構造化ログへの出力と、チャンネル経由で
//! 下流コンシューマへ渡す実装を提供する。

use crossbeam_channel::{Sender, TrySendError};
use tracing::info;

use crate::domain::{DomainError, DomainResult, EventKind, EventSinkPort, GestureEvent};

/// ログ出力シンク
///
/// イベントを構造化ログとして出力するのみ。開発・デモ用。
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TracingEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSinkPort for TracingEventSink {
    fn deliver(&mut self, event: &GestureEvent) -> DomainResult<()> {
        match event.kind {
            EventKind::Started => {
                info!(
                    gesture_type = ?event.gesture.gesture_type,
                    contact_points = event.gesture.contact_points,
                    weight = ?event.gesture.weight_class,
                    x = event.gesture.origin.x,
                    y = event.gesture.origin.y,
                    "Gesture started"
                );
            }
            EventKind::Moved => {
                info!(
                    gesture_type = ?event.gesture.gesture_type,
                    angle = event.gesture.angle,
                    x_direction = ?event.gesture.x_direction,
                    y_direction = ?event.gesture.y_direction,
                    path_len = event.gesture.path.len(),
                    "Gesture moved"
                );
            }
            EventKind::Ended => {
                info!(
                    gesture_type = ?event.gesture.gesture_type,
                    contact_points = event.gesture.contact_points,
                    weight = ?event.gesture.weight_class,
                    "Gesture ended"
                );
            }
        }
        Ok(())
    }
}

/// チャンネル配送シンク
///
/// イベントを`crossbeam_channel`経由で下流へ渡す。受信側が詰まって
/// いる場合はブロックせずに`SinkDelivery`エラーを返す（配送スレッドの
/// ログ方針に委ねる）。
pub struct ChannelEventSink {
    tx: Sender<GestureEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: Sender<GestureEvent>) -> Self {
        Self { tx }
    }
}

impl EventSinkPort for ChannelEventSink {
    fn deliver(&mut self, event: &GestureEvent) -> DomainResult<()> {
        match self.tx.try_send(event.clone()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(DomainError::SinkDelivery(
                "Consumer queue is full".to_string(),
            )),
            Err(TrySendError::Disconnected(_)) => Err(DomainError::SinkDelivery(
                "Consumer disconnected".to_string(),
            )),
        }
    }
}
