/// エラー型定義
///
/// Domain層の統一エラー型。thiserrorを使用して型安全なエラー処理を提供します。
///
/// # 設計方針
/// - unwrap()の使用を禁止し、明示的なエラーハンドリングを強制
/// - Result型でエラー伝播を明示化
/// - 回復可能性をエラー型で表現（DeviceUnavailable vs FrameRead）
use thiserror::Error;

/// Domain層の統一エラー型
#[derive(Error, Debug)]
pub enum DomainError {
    /// デバイスセッションを開始できない（致命的）
    ///
    /// 処理ループの開始前に呼び出し側へ返され、ループは開始されない。
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// フレーム読み取りの一時的エラー（Recoverable）
    ///
    /// 該当サイクルをスキップするのみ。状態変更もイベント送出も行わない。
    #[error("Frame read error: {0}")]
    FrameRead(String),

    /// 不正なフレームデータ（非有限座標・負の圧力）
    ///
    /// 該当フレームのみ棄却し、ジェスチャー状態は保持される。
    #[error("Invalid frame data: {0}")]
    InvalidFrameData(String),

    /// イベント配送エラー（シンク側の失敗）
    ///
    /// ログに記録するのみで、追跡ループは継続する。
    #[error("Sink delivery failed: {0}")]
    SinkDelivery(String),

    /// 設定関連のエラー（起動時に致命的）
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// タイムアウトエラー
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// 再初期化必要
    ///
    /// フレームソースのセッション再構築が必要な状態。
    #[error("Reinitialization required")]
    ReinitializationRequired,
}

impl DomainError {
    /// 処理ループを中断すべき致命的エラーか判定
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DomainError::DeviceUnavailable(_) | DomainError::Configuration(_)
        )
    }
}

/// Domain層の統一Result型
pub type DomainResult<T> = Result<T, DomainError>;
