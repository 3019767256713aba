mod application;
mod domain;
mod infrastructure;
mod logging;

use crate::application::pipeline::{PipelineConfig, PipelineRunner, StopHandle};
use crate::domain::config::AppConfig;
use crate::domain::types::{Contact, ContactFrame};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::replay::{ReplayFrameSource, ReplayStep};
use crate::infrastructure::sink::TracingEventSink;
use crate::logging::init_logging;
use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

fn main() {
    // ログシステムの初期化（非同期ファイル出力）
    let log_dir = PathBuf::from("logs");
    let _guard = init_logging("info", false, Some(log_dir));
    // 注意: _guardはmain終了まで保持する必要がある（Dropでログスレッドが終了）

    tracing::info!("TapDancer starting...");

    match run() {
        Ok(_) => {
            tracing::info!("TapDancer terminated gracefully.");
        }
        Err(e) => {
            tracing::error!("Fatal error: {:?}", e);
            std::process::exit(1);
        }
    }
}

/// アプリケーションのメイン処理
fn run() -> anyhow::Result<()> {
    // 設定ファイルの読み込み（存在しない場合はデフォルト設定を使用）
    let config = match AppConfig::from_file("config.toml") {
        Ok(config) => {
            tracing::info!("Loaded configuration from config.toml");
            config
        }
        Err(e) => {
            tracing::warn!("Failed to load config.toml: {:?}, using defaults", e);
            AppConfig::default()
        }
    };

    // 設定の検証
    config.validate().context("Invalid configuration")?;

    tracing::info!("Configuration validated successfully");
    tracing::info!(
        "Tracker: start_delay={}ms, moe_stationary={}mm, pan_distance={}mm",
        config.tracker.start_delay_ms,
        config.tracker.moe_stationary_mm,
        config.tracker.pan_distance_mm
    );
    tracing::info!(
        "Weight: medium_min={}, heavy_min={}",
        config.weight.medium_min,
        config.weight.heavy_min
    );

    // リプレイフレームソースの初期化（実機センサーは未統合）
    tracing::info!("Initializing replay frame source...");
    let source = ReplayFrameSource::new(demo_script());

    // ログ出力シンクの初期化
    tracing::info!("Initializing tracing event sink...");
    let sink = TracingEventSink::new();

    let pipeline_config = PipelineConfig::from(&config);
    let stop = StopHandle::new();

    tracing::info!("Starting pipeline with 3-thread architecture...");
    tracing::info!("Threads: Read -> Track -> Deliver");

    // パイプラインの起動
    let runner = PipelineRunner::new(source, sink, SystemClock::new(), pipeline_config, stop.clone());
    let pipeline = std::thread::spawn(move || runner.run());

    // デモスクリプトを再生しきるまで待ってから停止を要求する
    std::thread::sleep(Duration::from_secs(2));
    stop.stop();

    pipeline
        .join()
        .map_err(|_| anyhow::anyhow!("Pipeline thread panicked"))?
        .context("Pipeline terminated with error")?;

    Ok(())
}

/// デモ用のリプレイスクリプト
///
/// 1本指のクイックタップと、右方向へのパンを再生する。
/// フレームは即座に消費されるため、タップはデバウンス前のリフトオフ
/// （合成Started + Ended）、パンは変位によるStartedとして観測される。
fn demo_script() -> Vec<ReplayStep> {
    let contact = |x: f32, y: f32, force: f32| ContactFrame::new(vec![Contact::new(x, y, force)]);

    vec![
        // クイックタップ: 押下 → 即リフトオフ
        ReplayStep::Frame(contact(50.0, 40.0, 3000.0)),
        ReplayStep::NoFrame,
        ReplayStep::Frame(contact(50.1, 40.0, 3100.0)),
        ReplayStep::Frame(ContactFrame::empty()),
        ReplayStep::NoFrame,
        // パン: 押下 → 右へ10mm移動 → リフトオフ
        ReplayStep::Frame(contact(60.0, 70.0, 7000.0)),
        ReplayStep::Frame(contact(64.0, 70.0, 7000.0)),
        ReplayStep::Frame(contact(70.0, 70.0, 6800.0)),
        ReplayStep::NoFrame,
        ReplayStep::Frame(contact(76.0, 70.0, 6500.0)),
        ReplayStep::Frame(ContactFrame::empty()),
    ]
}
