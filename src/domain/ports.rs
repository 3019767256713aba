/// Port定義（Clean Architectureのインターフェース）
///
/// Domain層が外部実装に依存するための抽象trait。
/// Infrastructure層がこれらを実装し、Application層がDIで注入する。
use std::time::Instant;

use crate::domain::{ContactFrame, DomainResult, GestureEvent};

/// フレームソースポート: センサーセッションとフレーム取得を抽象化
///
/// 「フレームが未取得」（`Ok(None)`）と「接触点0個のフレーム」
/// （`Ok(Some(空フレーム))`）の区別は負荷のかかる仕様であり、
/// 実装は必ずこれを保持すること。リフトオフ判定が後者に依存する。
pub trait FrameSourcePort: Send {
    /// デバイスセッションを開く
    ///
    /// # Returns
    /// - `Ok(())`: セッション確立
    /// - `Err(DomainError::DeviceUnavailable)`: 致命的（ループは開始されない）
    fn open(&mut self) -> DomainResult<()>;

    /// スキャンを開始する
    fn start_scanning(&mut self) -> DomainResult<()>;

    /// 1サイクル分のフレームを読み取る
    ///
    /// # Returns
    /// - `Ok(Some(frame))`: フレーム取得成功（接触点0個もここに含まれる）
    /// - `Ok(None)`: このサイクルではフレームなし（タイマーは進めない）
    /// - `Err(DomainError)`: 読み取りエラー
    fn read_frame(&mut self) -> DomainResult<Option<ContactFrame>>;

    /// スキャンを停止する
    fn stop_scanning(&mut self) -> DomainResult<()>;

    /// セッションを閉じる
    fn close(&mut self) -> DomainResult<()>;

    /// セッションを再初期化する
    ///
    /// 連続タイムアウトが閾値を超えた場合などに呼び出される。
    fn reinitialize(&mut self) -> DomainResult<()>;

    /// デバイス情報を取得
    fn device_info(&self) -> DeviceInfo;
}

/// デバイス情報
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub name: String,
    /// センサー面の幅（mm）
    pub width_mm: f32,
    /// センサー面の高さ（mm）
    pub height_mm: f32,
    /// スキャンレート（Hz）
    pub scan_rate_hz: u32,
}

/// イベントシンクポート: ジェスチャーイベントの消費側を抽象化
///
/// 受け取る`GestureEvent`は送出時点の不変スナップショットであり、
/// 追跡中ジェスチャーのその後の変更を観測することはない。
/// 配送はingestionとは別スレッドで行われるため、実装が遅くても
/// フレーム読み取りループを停止させない。
pub trait EventSinkPort: Send {
    /// 1イベントを配送する
    ///
    /// # Returns
    /// - `Ok(())`: 配送成功
    /// - `Err(DomainError::SinkDelivery)`: 配送失敗（ログのみ、ループ継続）
    fn deliver(&mut self, event: &GestureEvent) -> DomainResult<()>;
}

/// クロックポート: 単調クロックの注入
///
/// すべてのタイマー判定（START_DELAY、静止マージン）はこのクロックに
/// 対して評価される。壁時計やプロセス時間を直接参照してはならない。
/// テストでは固定・手動進行のクロックを注入できる。
pub trait ClockPort: Send + Sync {
    /// 現在の単調クロック値を取得
    fn now(&self) -> Instant;
}
