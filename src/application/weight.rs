//! 重さクラス分類モジュール
//!
//! 平均圧力を設定可能な2閾値で`WeightClass`に写像する純粋関数。

use crate::domain::{WeightClass, WeightConfig};

/// 重さクラスの分類閾値
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightThresholds {
    /// Mediumクラスの下限（この値を含む）
    pub medium_min: f32,
    /// Heavyクラスの下限（この値を含む）
    pub heavy_min: f32,
}

impl WeightThresholds {
    /// 新しい閾値セットを作成
    pub fn new(medium_min: f32, heavy_min: f32) -> Self {
        Self {
            medium_min,
            heavy_min,
        }
    }

    /// 圧力値を重さクラスに分類する
    ///
    /// 境界は下限を含む: `force == medium_min`は`Medium`。
    /// 圧力0は`Light`であってエラーではない。
    pub fn classify(&self, force: f32) -> WeightClass {
        if force >= self.heavy_min {
            WeightClass::Heavy
        } else if force >= self.medium_min {
            WeightClass::Medium
        } else {
            WeightClass::Light
        }
    }
}

impl From<&WeightConfig> for WeightThresholds {
    fn from(config: &WeightConfig) -> Self {
        Self::new(config.medium_min, config.heavy_min)
    }
}
