//! クロックアダプタ
//!
//! `ClockPort`の実装。本番はOSの単調クロック、テストは手動進行クロック。

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::domain::ClockPort;

/// システム単調クロック
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// 手動進行クロック（テスト用）
///
/// 生成時点を基点とし、`advance`した分だけ進んだ`Instant`を返す。
/// 実時間の経過には影響されないため、デバウンス等の時間依存の
/// テストを決定的に書ける。
pub struct ManualClock {
    base: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// クロックを指定時間だけ進める
    pub fn advance(&self, delta: Duration) {
        let mut offset = self.offset.lock().unwrap();
        *offset += delta;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }
}
