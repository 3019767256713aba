//! 設定管理
//!
//! TOML設定ファイルの読み込みとDomain型への変換。

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::{DomainError, DomainResult};

/// アプリケーション設定のルート構造
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct AppConfig {
    /// デバイス（フレームソース）設定
    pub device: DeviceConfig,
    /// ジェスチャー追跡設定
    pub tracker: TrackerConfig,
    /// 重さクラス閾値設定
    pub weight: WeightConfig,
    /// パイプライン設定
    pub pipeline: PipelineSettings,
}

/// デバイス設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DeviceConfig {
    /// フレーム読み取りタイムアウト（ミリ秒）
    ///
    /// デフォルト: 8ms
    pub read_timeout_ms: u64,

    /// フレーム未取得時の待機時間（ミリ秒）
    ///
    /// `Ok(None)`（フレームなし）のサイクルで次の読み取りまで待つ時間。
    /// タイトループでのビジーポーリングを防ぐ。
    /// デフォルト: 1ms
    pub idle_wait_ms: u64,

    /// 連続タイムアウト許容回数
    ///
    /// この回数を超えたらセッションの再初期化を実行
    /// デフォルト: 250回
    pub max_consecutive_timeouts: u32,

    /// 再初期化時の初期待機時間（ミリ秒）
    ///
    /// デフォルト: 100ms
    pub reinit_initial_delay_ms: u64,

    /// 再初期化時の最大待機時間（ミリ秒、指数バックオフの上限）
    ///
    /// デフォルト: 5000ms
    pub reinit_max_delay_ms: u64,
}

impl DeviceConfig {
    /// デフォルトの読み取りタイムアウト（ミリ秒）
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 8;
    /// デフォルトのアイドル待機（ミリ秒）
    pub const DEFAULT_IDLE_WAIT_MS: u64 = 1;
    /// デフォルトの連続タイムアウト閾値（約2秒 @ 8ms）
    pub const DEFAULT_MAX_CONSECUTIVE_TIMEOUTS: u32 = 250;
    /// デフォルトの再初期化初期遅延（ミリ秒）
    pub const DEFAULT_REINIT_INITIAL_DELAY_MS: u64 = 100;
    /// デフォルトの再初期化最大遅延（ミリ秒）
    pub const DEFAULT_REINIT_MAX_DELAY_MS: u64 = 5000;

    #[allow(dead_code)]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }

    pub fn reinit_initial_delay(&self) -> Duration {
        Duration::from_millis(self.reinit_initial_delay_ms)
    }

    pub fn reinit_max_delay(&self) -> Duration {
        Duration::from_millis(self.reinit_max_delay_ms)
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: Self::DEFAULT_READ_TIMEOUT_MS,
            idle_wait_ms: Self::DEFAULT_IDLE_WAIT_MS,
            max_consecutive_timeouts: Self::DEFAULT_MAX_CONSECUTIVE_TIMEOUTS,
            reinit_initial_delay_ms: Self::DEFAULT_REINIT_INITIAL_DELAY_MS,
            reinit_max_delay_ms: Self::DEFAULT_REINIT_MAX_DELAY_MS,
        }
    }
}

/// ジェスチャー追跡設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TrackerConfig {
    /// ジェスチャーを`Started`と宣言するまでのデバウンス時間（ミリ秒）
    ///
    /// デフォルト: 200ms
    pub start_delay_ms: u64,

    /// 静止点とみなす位置ジッタの許容誤差（mm）
    ///
    /// この距離以下の位置変化は移動として扱わない。
    /// デフォルト: 1.5mm
    pub moe_stationary_mm: f32,

    /// TapではなくPanと分類するために必要な変位（mm）
    ///
    /// デフォルト: 3.0mm
    pub pan_distance_mm: f32,
}

impl TrackerConfig {
    /// デフォルトのデバウンス時間（ミリ秒）
    pub const DEFAULT_START_DELAY_MS: u64 = 200;
    /// デフォルトの静止マージン（mm）
    pub const DEFAULT_MOE_STATIONARY_MM: f32 = 1.5;
    /// デフォルトのPan判定距離（mm）
    pub const DEFAULT_PAN_DISTANCE_MM: f32 = 3.0;

    pub fn start_delay(&self) -> Duration {
        Duration::from_millis(self.start_delay_ms)
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            start_delay_ms: Self::DEFAULT_START_DELAY_MS,
            moe_stationary_mm: Self::DEFAULT_MOE_STATIONARY_MM,
            pan_distance_mm: Self::DEFAULT_PAN_DISTANCE_MM,
        }
    }
}

/// 重さクラス閾値設定
///
/// `force >= heavy_min → Heavy`、`force >= medium_min → Medium`、
/// それ未満は`Light`。境界は下限を含む。
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WeightConfig {
    /// Mediumクラスの下限圧力値
    ///
    /// デフォルト: 2500
    pub medium_min: f32,

    /// Heavyクラスの下限圧力値
    ///
    /// デフォルト: 6000
    pub heavy_min: f32,
}

impl WeightConfig {
    /// デフォルトのMedium下限
    pub const DEFAULT_MEDIUM_MIN: f32 = 2500.0;
    /// デフォルトのHeavy下限
    pub const DEFAULT_HEAVY_MIN: f32 = 6000.0;
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            medium_min: Self::DEFAULT_MEDIUM_MIN,
            heavy_min: Self::DEFAULT_HEAVY_MIN,
        }
    }
}

/// パイプライン設定
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PipelineSettings {
    /// イベントキューの深さ
    ///
    /// 配送スレッドへのキューの上限。満杯時はイベントを破棄して警告を出す
    /// （フレーム読み取りループを停止させないため）。
    /// デフォルト: 64
    pub event_queue_depth: usize,

    /// 統計情報の出力間隔（秒）
    pub stats_interval_sec: u64,
}

impl PipelineSettings {
    /// デフォルトのイベントキュー深さ
    pub const DEFAULT_EVENT_QUEUE_DEPTH: usize = 64;
    /// デフォルトの統計出力間隔（秒）
    pub const DEFAULT_STATS_INTERVAL_SEC: u64 = 10;

    pub fn stats_interval(&self) -> Duration {
        Duration::from_secs(self.stats_interval_sec)
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            event_queue_depth: Self::DEFAULT_EVENT_QUEUE_DEPTH,
            stats_interval_sec: Self::DEFAULT_STATS_INTERVAL_SEC,
        }
    }
}

impl AppConfig {
    /// TOMLファイルから設定を読み込む
    pub fn from_file<P: AsRef<Path>>(path: P) -> DomainResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DomainError::Configuration(format!("Failed to read config file: {}", e))
        })?;

        toml::from_str(&content)
            .map_err(|e| DomainError::Configuration(format!("Failed to parse config file: {}", e)))
    }

    /// デフォルト設定をTOMLファイルに書き出す
    #[allow(dead_code)]
    pub fn write_default<P: AsRef<Path>>(path: P) -> DomainResult<()> {
        let config = Self::default();
        let content = toml::to_string_pretty(&config).map_err(|e| {
            DomainError::Configuration(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, content)
            .map_err(|e| DomainError::Configuration(format!("Failed to write config file: {}", e)))
    }

    /// 設定の妥当性を検証
    pub fn validate(&self) -> DomainResult<()> {
        // 追跡パラメータの検証
        if self.tracker.start_delay_ms == 0 {
            return Err(DomainError::Configuration(
                "start_delay_ms must be greater than 0".to_string(),
            ));
        }
        if self.tracker.moe_stationary_mm < 0.0 || !self.tracker.moe_stationary_mm.is_finite() {
            return Err(DomainError::Configuration(
                "moe_stationary_mm must be a non-negative finite value".to_string(),
            ));
        }
        if self.tracker.pan_distance_mm <= 0.0 || !self.tracker.pan_distance_mm.is_finite() {
            return Err(DomainError::Configuration(
                "pan_distance_mm must be a positive finite value".to_string(),
            ));
        }

        // 重さ閾値の検証
        if self.weight.medium_min < 0.0 || self.weight.heavy_min < 0.0 {
            return Err(DomainError::Configuration(
                "Weight thresholds must be non-negative".to_string(),
            ));
        }
        if self.weight.medium_min >= self.weight.heavy_min {
            return Err(DomainError::Configuration(
                "medium_min must be less than heavy_min".to_string(),
            ));
        }

        // デバイス設定の検証
        if self.device.read_timeout_ms == 0 {
            return Err(DomainError::Configuration(
                "Read timeout must be greater than 0".to_string(),
            ));
        }

        // パイプライン設定の検証
        if self.pipeline.event_queue_depth == 0 {
            return Err(DomainError::Configuration(
                "event_queue_depth must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
