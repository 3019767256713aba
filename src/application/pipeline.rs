//! パイプライン制御モジュール
//!
//! Read / Track / Deliver の3スレッド構成でパイプラインを制御します。
//!
//! - Read: フレームソースからの読み取りとセッション再初期化
//! - Track: フレーム集約とジェスチャー状態機械
//! - Deliver: イベントシンクへの配送と統計記録
//!
//! 接触のあるフレームは「最新のみ上書き」ポリシーで渡す（遅延より鮮度を優先）。
//! 空フレームはブロッキング送信する: 空/非空の遷移がリフトオフ判定そのものであり、
//! 1つでも落とすとジェスチャーが終了しないため。

use crate::application::{
    recovery::{RecoveryState, RecoveryStrategy},
    stats::{StatKind, StatsCollector},
    tracker::{GestureTracker, TrackerParams},
    weight::WeightThresholds,
};
use crate::domain::{
    AppConfig, ClockPort, ContactFrame, DomainResult, EventSinkPort, FrameSourcePort, GestureEvent,
};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// パイプライン設定
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// フレーム未取得時の待機時間
    pub idle_wait: Duration,
    /// イベントキューの深さ
    pub event_queue_depth: usize,
    /// 統計出力間隔
    pub stats_interval: Duration,
    /// 追跡パラメータ
    pub tracker: TrackerParams,
    /// 重さクラス閾値
    pub thresholds: WeightThresholds,
    /// 再初期化戦略
    pub recovery: RecoveryStrategy,
}

impl From<&AppConfig> for PipelineConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            idle_wait: config.device.idle_wait(),
            event_queue_depth: config.pipeline.event_queue_depth,
            stats_interval: config.pipeline.stats_interval(),
            tracker: TrackerParams::from(&config.tracker),
            thresholds: WeightThresholds::from(&config.weight),
            recovery: RecoveryStrategy {
                consecutive_timeout_threshold: config.device.max_consecutive_timeouts,
                initial_backoff: config.device.reinit_initial_delay(),
                max_backoff: config.device.reinit_max_delay(),
                ..Default::default()
            },
        }
    }
}

/// 停止ハンドル（スレッド間で共有、ロックフリー）
///
/// 読み取りスレッドはループごとに確認するため、`Ordering::Relaxed`の
/// 読み取りで十分（少し遅れて観測されても無害）。
#[derive(Clone)]
pub struct StopHandle {
    stopping: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn new() -> Self {
        Self {
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// 停止を要求する
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::Relaxed);
    }

    /// 停止が要求されているかを確認
    #[inline]
    pub fn is_stopped(&self) -> bool {
        self.stopping.load(Ordering::Relaxed)
    }
}

impl Default for StopHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// フレームと読み取り時刻のペア
///
/// 追跡のすべてのタイマー判定は`read_at`に対して評価される
/// （キュー滞留時間をデバウンスに混入させない）。
#[derive(Debug, Clone)]
pub struct TimestampedFrame {
    pub frame: ContactFrame,
    pub read_at: Instant,
}

/// イベントと各段階のタイムスタンプ
#[derive(Debug, Clone)]
pub struct TimestampedEvent {
    pub event: GestureEvent,
    pub read_at: Instant,
    pub tracked_at: Instant,
}

/// パイプライン実行コンテキスト
pub struct PipelineRunner<S, K, C>
where
    S: FrameSourcePort,
    K: EventSinkPort,
    C: ClockPort,
{
    source: Arc<Mutex<S>>,
    sink: Arc<Mutex<K>>,
    clock: Arc<C>,
    config: PipelineConfig,
    stats: Arc<Mutex<StatsCollector>>,
    stop: StopHandle,
}

impl<S, K, C> PipelineRunner<S, K, C>
where
    S: FrameSourcePort + Send + 'static,
    K: EventSinkPort + Send + 'static,
    C: ClockPort + Send + Sync + 'static,
{
    /// 新しいPipelineRunnerを作成
    pub fn new(source: S, sink: K, clock: C, config: PipelineConfig, stop: StopHandle) -> Self {
        Self {
            source: Arc::new(Mutex::new(source)),
            sink: Arc::new(Mutex::new(sink)),
            clock: Arc::new(clock),
            stats: Arc::new(Mutex::new(StatsCollector::new(config.stats_interval))),
            config,
            stop,
        }
    }

    /// パイプラインを起動（ブロッキング）
    ///
    /// セッション確立（open / start_scanning）の失敗は致命的で、
    /// ループを開始せずにエラーを返す。起動後は停止要求または
    /// 致命的エラーまで戻らない。
    pub fn run(self) -> DomainResult<()> {
        // セッション確立。ここでの失敗は即座に呼び出し元へ返す
        {
            let mut source = self.source.lock().unwrap();
            source.open()?;
            source.start_scanning()?;

            let device = source.device_info();
            info!(
                name = %device.name,
                width_mm = device.width_mm,
                height_mm = device.height_mm,
                scan_rate_hz = device.scan_rate_hz,
                "Sensor session established"
            );
        }

        let (frame_tx, frame_rx) = bounded::<TimestampedFrame>(1);
        let (event_tx, event_rx) = bounded::<TimestampedEvent>(self.config.event_queue_depth);

        // Read Thread
        let read_handle = {
            let source = Arc::clone(&self.source);
            let clock = Arc::clone(&self.clock);
            let stats = Arc::clone(&self.stats);
            let stop = self.stop.clone();
            let recovery = RecoveryState::new(self.config.recovery.clone());
            let idle_wait = self.config.idle_wait;
            std::thread::spawn(move || {
                Self::read_thread(source, clock, stats, stop, recovery, idle_wait, frame_tx);
            })
        };

        // Track Thread
        let track_handle = {
            let clock = Arc::clone(&self.clock);
            let stats = Arc::clone(&self.stats);
            let tracker = GestureTracker::new(self.config.tracker, self.config.thresholds);
            std::thread::spawn(move || {
                Self::track_thread(clock, stats, tracker, frame_rx, event_tx);
            })
        };

        // Deliver Thread（メインスレッドで実行）
        Self::deliver_thread(
            Arc::clone(&self.sink),
            Arc::clone(&self.clock),
            Arc::clone(&self.stats),
            event_rx,
        );

        // スレッドの終了を待つ
        let _ = read_handle.join();
        let _ = track_handle.join();

        // セッションの後始末。失敗してもシャットダウンは続行する
        let mut source = self.source.lock().unwrap();
        if let Err(e) = source.stop_scanning() {
            warn!("Failed to stop scanning: {}", e);
        }
        if let Err(e) = source.close() {
            warn!("Failed to close sensor session: {}", e);
        }
        info!("Pipeline shut down");

        Ok(())
    }

    /// Readスレッドのメインループ
    ///
    /// `Ok(None)`（フレーム未取得）が連続したら再初期化を試みる。
    /// 空フレームはブロッキング送信、非空フレームは最新のみ上書き。
    fn read_thread(
        source: Arc<Mutex<S>>,
        clock: Arc<C>,
        stats: Arc<Mutex<StatsCollector>>,
        stop: StopHandle,
        mut recovery: RecoveryState,
        idle_wait: Duration,
        tx: Sender<TimestampedFrame>,
    ) {
        loop {
            if stop.is_stopped() {
                break;
            }

            let result = {
                let mut guard = source.lock().unwrap();
                guard.read_frame()
            };

            match result {
                Ok(Some(frame)) => {
                    recovery.record_success();

                    if !frame.is_well_formed() {
                        // 非有限座標や負の圧力を含むフレームは「フレームなし」
                        // と同じ扱いにする。追跡状態には触れない
                        warn!("Rejecting malformed frame (non-finite coordinate or force)");
                        stats.lock().unwrap().record_invalid_frame();
                        continue;
                    }

                    let timestamped = TimestampedFrame {
                        read_at: clock.now(),
                        frame,
                    };

                    if timestamped.frame.is_empty() {
                        // 空フレームはリフトオフの証拠。落とすとジェスチャーが
                        // 終了しないため、スロットが空くまで待つ
                        if tx.send(timestamped).is_err() {
                            break;
                        }
                    } else if !Self::send_latest_only(&tx, timestamped) {
                        break;
                    }
                }
                Ok(None) => {
                    // このサイクルはフレームなし。追跡タイマーは進めない
                    if recovery.record_timeout() {
                        Self::attempt_reinitialization(
                            &source,
                            &stats,
                            &stop,
                            &mut recovery,
                        );
                        if stop.is_stopped() {
                            break;
                        }
                    } else {
                        std::thread::sleep(idle_wait);
                    }
                }
                Err(e) if e.is_fatal() => {
                    error!("Fatal frame source error: {}", e);
                    stop.stop();
                    break;
                }
                Err(e) => {
                    warn!("Frame read error: {}", e);
                    std::thread::sleep(idle_wait);
                }
            }
        }
    }

    /// セッション再初期化を1回試みる
    fn attempt_reinitialization(
        source: &Arc<Mutex<S>>,
        stats: &Arc<Mutex<StatsCollector>>,
        stop: &StopHandle,
        recovery: &mut RecoveryState,
    ) {
        recovery.record_reinitialization_attempt();
        stats.lock().unwrap().record_reinitialization();

        warn!(
            attempt = recovery.total_reinitializations(),
            "Consecutive read timeouts exceeded threshold, reinitializing session"
        );

        let result = {
            let mut guard = source.lock().unwrap();
            guard.reinitialize()
        };

        match result {
            Ok(()) => {
                info!("Session reinitialized");
                recovery.record_success();
            }
            Err(e) => {
                warn!(
                    backoff_ms = recovery.current_backoff().as_millis() as u64,
                    "Reinitialization failed: {}",
                    e
                );
                if recovery.is_cumulative_failure_exceeded() {
                    error!("Cumulative failure duration exceeded, giving up");
                    stop.stop();
                    return;
                }
                std::thread::sleep(recovery.current_backoff());
            }
        }
    }

    /// Trackスレッドのメインループ
    fn track_thread(
        clock: Arc<C>,
        stats: Arc<Mutex<StatsCollector>>,
        mut tracker: GestureTracker,
        rx: Receiver<TimestampedFrame>,
        tx: Sender<TimestampedEvent>,
    ) {
        loop {
            match rx.recv() {
                Ok(timestamped) => {
                    stats.lock().unwrap().record_frame();

                    let events = tracker.process_frame(&timestamped.frame, timestamped.read_at);
                    if events.is_empty() {
                        continue;
                    }

                    let tracked_at = clock.now();
                    for event in events {
                        match tx.try_send(TimestampedEvent {
                            event,
                            read_at: timestamped.read_at,
                            tracked_at,
                        }) {
                            Ok(()) => {}
                            Err(TrySendError::Full(dropped)) => {
                                // 読み取りループを止めないことを優先し、破棄して警告
                                warn!(
                                    kind = ?dropped.event.kind,
                                    "Event queue full, dropping event"
                                );
                                stats.lock().unwrap().record_dropped_event();
                            }
                            Err(TrySendError::Disconnected(_)) => return,
                        }
                    }
                }
                Err(_) => {
                    // Channel closed
                    break;
                }
            }
        }
    }

    /// Deliverスレッド（メインスレッド）
    fn deliver_thread(
        sink: Arc<Mutex<K>>,
        clock: Arc<C>,
        stats: Arc<Mutex<StatsCollector>>,
        rx: Receiver<TimestampedEvent>,
    ) {
        loop {
            match rx.recv() {
                Ok(timestamped) => {
                    let deliver_result = {
                        let mut guard = sink.lock().unwrap();
                        guard.deliver(&timestamped.event)
                    };

                    // 配送失敗はログのみ。パイプラインは継続する
                    if let Err(e) = deliver_result {
                        warn!(
                            kind = ?timestamped.event.kind,
                            "Event delivery failed: {}",
                            e
                        );
                    }

                    let now = clock.now();
                    let mut stats = stats.lock().unwrap();
                    stats.record_duration(
                        StatKind::Track,
                        timestamped.tracked_at.duration_since(timestamped.read_at),
                    );
                    stats.record_duration(
                        StatKind::Deliver,
                        now.duration_since(timestamped.tracked_at),
                    );
                    stats.record_duration(
                        StatKind::EndToEnd,
                        now.duration_since(timestamped.read_at),
                    );

                    // 定期的に統計出力
                    if stats.should_report() {
                        stats.report_and_reset();
                    }
                }
                Err(_) => {
                    // Channel closed
                    break;
                }
            }
        }
    }

    /// 最新のみ上書きポリシーで送信
    ///
    /// # Returns
    /// チャンネルが切断されている場合は false
    fn send_latest_only(tx: &Sender<TimestampedFrame>, value: TimestampedFrame) -> bool {
        match tx.try_send(value) {
            Ok(_) => true,
            Err(TrySendError::Full(_)) => {
                // キューが満杯 - 追跡側が古いフレームを処理中。
                // 非空→非空の遷移は次のフレームで補完されるため破棄してよい
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
