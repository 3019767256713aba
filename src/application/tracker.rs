//! ジェスチャー追跡モジュール（コア状態機械）
//!
//! 1フレームずつ`process_frame(frame, now)`で駆動し、デバウンス・
//! Tap/Pan分類・移動追跡を行って`GestureEvent`を送出します。
//!
//! `now`は常に呼び出し側が注入する単調クロック値です。内部で時刻を
//! サンプリングしないため、テストは任意の時間経過を合成できます。

use std::time::{Duration, Instant};

use crate::application::aggregate::aggregate;
use crate::application::weight::WeightThresholds;
use crate::domain::{
    ContactFrame, EventKind, FrameAggregate, Gesture, GestureEvent, GestureState, GestureType,
    TrackerConfig,
};

/// 追跡パラメータ
#[derive(Debug, Clone, Copy)]
pub struct TrackerParams {
    /// `Started`宣言までのデバウンス時間
    pub start_delay: Duration,
    /// 静止点とみなす位置ジッタの許容誤差（mm）
    pub moe_stationary_mm: f32,
    /// Pan分類に必要な変位（mm）
    pub pan_distance_mm: f32,
}

impl From<&TrackerConfig> for TrackerParams {
    fn from(config: &TrackerConfig) -> Self {
        Self {
            start_delay: config.start_delay(),
            moe_stationary_mm: config.moe_stationary_mm,
            pan_distance_mm: config.pan_distance_mm,
        }
    }
}

/// ジェスチャー追跡の状態機械
///
/// アクティブなジェスチャーを高々1つ所有する。`Ended`送出後は即座に
/// 破棄されるため、`current`が`Some`であることとアクティブであることは
/// 等価。接触点数や重さクラスの変化だけでジェスチャーが終了・再開される
/// ことはない（終了を駆動するのは接触の有無と空間変位のみ）。
pub struct GestureTracker {
    params: TrackerParams,
    thresholds: WeightThresholds,
    current: Option<Gesture>,
}

impl GestureTracker {
    /// 新しいGestureTrackerを作成
    pub fn new(params: TrackerParams, thresholds: WeightThresholds) -> Self {
        Self {
            params,
            thresholds,
            current: None,
        }
    }

    /// 追跡中のジェスチャーへの参照を取得
    pub fn active_gesture(&self) -> Option<&Gesture> {
        self.current.as_ref()
    }

    /// 追跡状態を破棄する（セッション停止時）
    ///
    /// 進行中のジェスチャーに`Ended`は送出しない。ライフサイクルの正当性は
    /// 実行中セッションに対してのみ保証される。
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// 1フレームを処理し、発生したライフサイクルイベントを返す
    ///
    /// 1サイクルで複数イベントが発生し得る（例: クイックタップのリフトオフで
    /// `[Started, Ended]`、Pan判定距離の通過で`[Started, Moved]`）。
    pub fn process_frame(&mut self, frame: &ContactFrame, now: Instant) -> Vec<GestureEvent> {
        match aggregate(frame) {
            Some(agg) => self.on_contact(agg, now),
            None => self.on_lift_off(now),
        }
    }

    /// 接触あり: ジェスチャーの生成・開始判定・移動追跡
    fn on_contact(&mut self, agg: FrameAggregate, now: Instant) -> Vec<GestureEvent> {
        let Some(mut gesture) = self.current.take() else {
            // 新しいジェスチャーを原点=重心でInited状態に置く。イベントは出さない
            let weight = self.thresholds.classify(agg.avg_force);
            self.current = Some(Gesture::new(&agg, weight, now));
            return Vec::new();
        };

        let mut events = Vec::new();
        let displacement = gesture.displacement_to(agg.centroid);

        if gesture.state == GestureState::Inited {
            // 開始条件: デバウンス経過（境界を含む）またはPan判定距離への到達。
            // 条件成立時点の変位が種別を確定する。Startedへの遷移は一度きりで
            // 再突入しない
            let debounce_elapsed = now.duration_since(gesture.start_time) >= self.params.start_delay;
            let pan_reached = displacement >= self.params.pan_distance_mm;

            if debounce_elapsed || pan_reached {
                gesture.gesture_type = if pan_reached {
                    GestureType::Pan
                } else {
                    GestureType::Tap
                };
                gesture.contact_points = agg.contact_points;
                gesture.weight_class = self.thresholds.classify(agg.avg_force);
                gesture.state = GestureState::Started;
                events.push(GestureEvent::new(EventKind::Started, &gesture, now));
            }
        }

        // 移動判定: 一度Movedになったら以降の全フレームで位置を記録する
        let moved = gesture.state == GestureState::Moved
            || (gesture.state == GestureState::Started
                && displacement > self.params.moe_stationary_mm);
        if moved {
            gesture.state = GestureState::Moved;
            gesture.record_position(agg.centroid);
            events.push(GestureEvent::new(EventKind::Moved, &gesture, now));
        }

        self.current = Some(gesture);
        events
    }

    /// 接触なし（リフトオフ）: ジェスチャーの終了
    fn on_lift_off(&mut self, now: Instant) -> Vec<GestureEvent> {
        let mut events = Vec::new();

        // アクティブなジェスチャーがなければ何もしない（連続空フレームはno-op）
        let Some(mut gesture) = self.current.take() else {
            return events;
        };

        if gesture.state == GestureState::Inited {
            // デバウンス経過前のリフトはTapでしかあり得ない（変位を観測する
            // 時間がなかった）。Endedよりも先にStartedを合成する
            gesture.gesture_type = GestureType::Tap;
            gesture.state = GestureState::Started;
            events.push(GestureEvent::new(EventKind::Started, &gesture, now));
        }

        gesture.state = GestureState::Ended;
        events.push(GestureEvent::new(EventKind::Ended, &gesture, now));

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Contact, Direction, WeightClass};

    const START_DELAY: Duration = Duration::from_millis(200);

    fn tracker() -> GestureTracker {
        let params = TrackerParams {
            start_delay: START_DELAY,
            moe_stationary_mm: 1.5,
            pan_distance_mm: 3.0,
        };
        GestureTracker::new(params, WeightThresholds::new(2500.0, 6000.0))
    }

    fn frame(contacts: &[(f32, f32, f32)]) -> ContactFrame {
        ContactFrame::new(
            contacts
                .iter()
                .map(|&(x, y, f)| Contact::new(x, y, f))
                .collect(),
        )
    }

    fn kinds(events: &[GestureEvent]) -> Vec<EventKind> {
        events.iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_scenario_a_held_tap() {
        // (10,10) 圧力100を0.25秒保持してからリリース
        // → Started(Tap, Light) @≈0.20s、Ended @≈0.25s
        let mut t = tracker();
        let t0 = Instant::now();

        assert!(t.process_frame(&frame(&[(10.0, 10.0, 100.0)]), t0).is_empty());
        assert!(t
            .process_frame(&frame(&[(10.0, 10.0, 100.0)]), t0 + Duration::from_millis(100))
            .is_empty());

        let events = t.process_frame(&frame(&[(10.0, 10.0, 100.0)]), t0 + Duration::from_millis(200));
        assert_eq!(kinds(&events), vec![EventKind::Started]);
        assert_eq!(events[0].gesture.gesture_type, GestureType::Tap);
        assert_eq!(events[0].gesture.weight_class, WeightClass::Light);
        assert_eq!(events[0].gesture.contact_points, 1);

        let events = t.process_frame(&ContactFrame::empty(), t0 + Duration::from_millis(250));
        assert_eq!(kinds(&events), vec![EventKind::Ended]);
        assert_eq!(events[0].gesture.gesture_type, GestureType::Tap);
        assert!(t.active_gesture().is_none());
    }

    #[test]
    fn test_stationary_tap_emits_no_moved() {
        // 静止マージン内のジッタではMovedは発生しない
        let mut t = tracker();
        let t0 = Instant::now();

        t.process_frame(&frame(&[(10.0, 10.0, 100.0)]), t0);
        let events = t.process_frame(&frame(&[(10.5, 10.0, 100.0)]), t0 + Duration::from_millis(210));
        assert_eq!(kinds(&events), vec![EventKind::Started]);

        // 変位1.0mm < 1.5mm → 移動扱いしない
        let events = t.process_frame(&frame(&[(11.0, 10.0, 100.0)]), t0 + Duration::from_millis(220));
        assert!(events.is_empty());

        let events = t.process_frame(&ContactFrame::empty(), t0 + Duration::from_millis(230));
        assert_eq!(kinds(&events), vec![EventKind::Ended]);
    }

    #[test]
    fn test_quick_tap_synthesizes_started_before_ended() {
        // デバウンス前のリフトオフ → 同一サイクルで[Started(Tap), Ended]
        let mut t = tracker();
        let t0 = Instant::now();

        t.process_frame(&frame(&[(5.0, 5.0, 100.0)]), t0);
        let events = t.process_frame(&ContactFrame::empty(), t0 + Duration::from_millis(50));

        assert_eq!(kinds(&events), vec![EventKind::Started, EventKind::Ended]);
        assert_eq!(events[0].gesture.gesture_type, GestureType::Tap);
        assert_eq!(events[1].gesture.gesture_type, GestureType::Tap);
        assert!(t.active_gesture().is_none());
    }

    #[test]
    fn test_scenario_b_pan_before_debounce() {
        // 重心が(0,0)→(5,0)へ0.10秒で移動してからリフトオフ。
        // Pan判定距離3mmの通過時点でStarted(Pan)が発火する（デバウンス前）
        let mut t = tracker();
        let t0 = Instant::now();

        t.process_frame(&frame(&[(0.0, 0.0, 100.0)]), t0);

        // 変位2.5mm < 3mm、まだInited → イベントなし
        let events = t.process_frame(&frame(&[(2.5, 0.0, 100.0)]), t0 + Duration::from_millis(40));
        assert!(events.is_empty());

        // 変位3.5mm >= 3mm → Started(Pan)。同サイクルで静止マージンも超えて
        // いるためMovedも続く
        let events = t.process_frame(&frame(&[(3.5, 0.0, 100.0)]), t0 + Duration::from_millis(70));
        assert_eq!(kinds(&events), vec![EventKind::Started, EventKind::Moved]);
        assert_eq!(events[0].gesture.gesture_type, GestureType::Pan);

        let events = t.process_frame(&frame(&[(5.0, 0.0, 100.0)]), t0 + Duration::from_millis(100));
        assert_eq!(kinds(&events), vec![EventKind::Moved]);

        // 分類はStarted時点で固定
        let events = t.process_frame(&ContactFrame::empty(), t0 + Duration::from_millis(120));
        assert_eq!(kinds(&events), vec![EventKind::Ended]);
        assert_eq!(events[0].gesture.gesture_type, GestureType::Pan);
    }

    #[test]
    fn test_pan_direction_and_path() {
        let mut t = tracker();
        let t0 = Instant::now();

        t.process_frame(&frame(&[(0.0, 0.0, 100.0)]), t0);
        let events = t.process_frame(&frame(&[(4.0, 0.0, 100.0)]), t0 + Duration::from_millis(50));

        // +X方向（右）への移動
        let moved = &events[1].gesture;
        assert_eq!(moved.x_direction, Some(Direction::Right));
        assert_eq!(moved.path.len(), 2);
        assert!(moved.angle.is_some());
    }

    #[test]
    fn test_start_delay_boundary_inclusive() {
        // 経過時間がちょうどstart_delayのフレームでStartedが発火する
        let mut t = tracker();
        let t0 = Instant::now();

        t.process_frame(&frame(&[(1.0, 1.0, 100.0)]), t0);
        let events = t.process_frame(&frame(&[(1.0, 1.0, 100.0)]), t0 + START_DELAY);
        assert_eq!(kinds(&events), vec![EventKind::Started]);
    }

    #[test]
    fn test_weight_snapshot_at_start() {
        // 重さクラスはStarted時点の集約値からスナップショットされる
        let mut t = tracker();
        let t0 = Instant::now();

        t.process_frame(&frame(&[(1.0, 1.0, 100.0)]), t0);
        let events = t.process_frame(&frame(&[(1.0, 1.0, 2500.0)]), t0 + START_DELAY);
        assert_eq!(events[0].gesture.weight_class, WeightClass::Medium);
    }

    #[test]
    fn test_attribute_change_does_not_end_gesture() {
        // 接触点数や重さクラスの変化だけではジェスチャーは終了しない
        let mut t = tracker();
        let t0 = Instant::now();

        t.process_frame(&frame(&[(10.0, 10.0, 100.0)]), t0);
        t.process_frame(&frame(&[(10.0, 10.0, 100.0)]), t0 + START_DELAY);

        // 2点接触・高圧力に変化しても（重心は同じ）追跡は継続
        let events = t.process_frame(
            &frame(&[(9.0, 10.0, 7000.0), (11.0, 10.0, 7000.0)]),
            t0 + Duration::from_millis(250),
        );
        assert!(events.is_empty());
        assert!(t.active_gesture().is_some());
    }

    #[test]
    fn test_empty_frames_are_idempotent() {
        let mut t = tracker();
        let t0 = Instant::now();

        // アクティブなジェスチャーなし → no-op
        assert!(t.process_frame(&ContactFrame::empty(), t0).is_empty());

        // Ended送出後の連続空フレームもno-op
        t.process_frame(&frame(&[(1.0, 1.0, 100.0)]), t0);
        t.process_frame(&ContactFrame::empty(), t0 + Duration::from_millis(10));
        assert!(t
            .process_frame(&ContactFrame::empty(), t0 + Duration::from_millis(20))
            .is_empty());
        assert!(t
            .process_frame(&ContactFrame::empty(), t0 + Duration::from_millis(30))
            .is_empty());
    }

    #[test]
    fn test_next_gesture_starts_fresh() {
        // 終了後の次の接触は、path・方角・種別を引き継がない別ジェスチャー
        let mut t = tracker();
        let t0 = Instant::now();

        t.process_frame(&frame(&[(0.0, 0.0, 100.0)]), t0);
        t.process_frame(&frame(&[(5.0, 0.0, 100.0)]), t0 + Duration::from_millis(50)); // Pan
        t.process_frame(&ContactFrame::empty(), t0 + Duration::from_millis(60));

        t.process_frame(&frame(&[(20.0, 20.0, 100.0)]), t0 + Duration::from_millis(100));
        let g = t.active_gesture().unwrap();
        assert_eq!(g.state, GestureState::Inited);
        assert_eq!(g.gesture_type, GestureType::Undetermined);
        assert_eq!(g.origin, crate::domain::Point::new(20.0, 20.0));
        assert_eq!(g.path.len(), 1);
        assert!(g.x_direction.is_none());
    }

    #[test]
    fn test_at_most_one_active_gesture() {
        // 任意のフレーム列に対してアクティブなジェスチャーは高々1つ
        let mut t = tracker();
        let t0 = Instant::now();

        let sequence: Vec<(u64, ContactFrame)> = vec![
            (0, frame(&[(0.0, 0.0, 100.0)])),
            (50, frame(&[(1.0, 0.0, 100.0)])),
            (100, ContactFrame::empty()),
            (150, frame(&[(5.0, 5.0, 3000.0), (6.0, 6.0, 3000.0)])),
            (400, frame(&[(9.0, 9.0, 3000.0)])),
            (450, ContactFrame::empty()),
            (500, ContactFrame::empty()),
        ];

        for (ms, f) in sequence {
            t.process_frame(&f, t0 + Duration::from_millis(ms));
            // currentがSomeなら必ず未終了
            if let Some(g) = t.active_gesture() {
                assert_ne!(g.state, GestureState::Ended);
            }
        }
    }

    #[test]
    fn test_exactly_one_ended_per_gesture() {
        let mut t = tracker();
        let t0 = Instant::now();

        let mut ended_count = 0;
        let frames: Vec<(u64, ContactFrame)> = vec![
            (0, frame(&[(0.0, 0.0, 100.0)])),
            (250, frame(&[(0.0, 0.0, 100.0)])),
            (300, ContactFrame::empty()),
            (310, ContactFrame::empty()),
            (350, frame(&[(1.0, 1.0, 100.0)])),
            (360, ContactFrame::empty()),
        ];
        for (ms, f) in frames {
            for e in t.process_frame(&f, t0 + Duration::from_millis(ms)) {
                if e.kind == EventKind::Ended {
                    ended_count += 1;
                }
            }
        }

        // 2つのジェスチャーそれぞれにEndedが1回ずつ
        assert_eq!(ended_count, 2);
    }

    #[test]
    fn test_reset_discards_in_flight_gesture() {
        // セッション停止時は強制Endedなしで破棄される
        let mut t = tracker();
        let t0 = Instant::now();

        t.process_frame(&frame(&[(1.0, 1.0, 100.0)]), t0);
        assert!(t.active_gesture().is_some());

        t.reset();
        assert!(t.active_gesture().is_none());

        // リセット後の空フレームはno-op
        assert!(t
            .process_frame(&ContactFrame::empty(), t0 + Duration::from_millis(10))
            .is_empty());
    }
}
