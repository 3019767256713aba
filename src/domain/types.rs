/// コア型定義
///
/// Domain層の中心となるデータ構造。
/// センサーフレームからジェスチャーイベントまで、全処理で共有される型。
use std::time::Instant;

/// センサー座標系の位置（ミリメートル単位）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// 新しいPointを作成
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// 2点間のユークリッド距離（mm）
    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 1つの接触点（1フレーム内でのみ有効）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// X座標（mm）
    pub x_mm: f32,
    /// Y座標（mm）
    pub y_mm: f32,
    /// 法線方向の圧力値
    pub force: f32,
}

impl Contact {
    /// 新しいContactを作成
    pub fn new(x_mm: f32, y_mm: f32, force: f32) -> Self {
        Self { x_mm, y_mm, force }
    }

    /// 接触データが整形式か判定
    ///
    /// 座標が有限値かつ圧力が非負・有限であること。
    /// これを満たさないフレームはAggregatorに到達する前に棄却される。
    pub fn is_well_formed(&self) -> bool {
        self.x_mm.is_finite() && self.y_mm.is_finite() && self.force.is_finite() && self.force >= 0.0
    }

    /// 位置をPointとして取得
    pub fn position(&self) -> Point {
        Point::new(self.x_mm, self.y_mm)
    }
}

/// 1サンプリング時点の全接触点
///
/// 接触点が0個の状態（リフトオフ）は正当な状態であり、
/// 「フレームが取得できなかった」（`Ok(None)`）とは区別される。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContactFrame {
    pub contacts: Vec<Contact>,
}

impl ContactFrame {
    /// 新しいContactFrameを作成
    pub fn new(contacts: Vec<Contact>) -> Self {
        Self { contacts }
    }

    /// 接触点0個のフレーム（リフトオフ）を作成
    pub fn empty() -> Self {
        Self { contacts: Vec::new() }
    }

    /// 接触点が存在しないか
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// 全接触点が整形式か判定
    ///
    /// 空フレームは整形式（リフトオフとして意味を持つ）。
    pub fn is_well_formed(&self) -> bool {
        self.contacts.iter().all(Contact::is_well_formed)
    }
}

/// フレームの集約結果（重心と平均圧力）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameAggregate {
    /// 接触点数
    pub contact_points: usize,
    /// 全接触点の重心位置
    pub centroid: Point,
    /// 平均圧力
    pub avg_force: f32,
}

/// 圧力の重さクラス
///
/// 平均圧力を2つの閾値で3段階に分類する。下限は閾値を含む。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum WeightClass {
    Light,
    Medium,
    Heavy,
}

/// ジェスチャーの種別
///
/// `Inited`を抜ける瞬間に一度だけ確定し、以降変更されない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureType {
    /// 未確定（`Inited`状態の間のみ）
    Undetermined,
    Tap,
    Pan,
}

/// 原点からの累積変位に基づく粗い方角（軸ごと）
///
/// 分類には使わない参考情報。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// ジェスチャーのライフサイクル状態
///
/// `Inited → Started → (Moved)* → Ended` の単調遷移のみ。
/// 後退やEndedの省略は起こらない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GestureState {
    Inited,
    Started,
    Moved,
    Ended,
}

/// 追跡中のジェスチャー
///
/// アクティブなジェスチャーは常に高々1つ。Trackerが生成・更新し、
/// `Ended`イベント送出後に破棄される。
#[derive(Debug, Clone)]
pub struct Gesture {
    /// 接触点数（`Started`時点のスナップショット）
    pub contact_points: usize,
    /// 重さクラス（`Started`時点のスナップショット）
    pub weight_class: WeightClass,
    /// 最初の接触の重心位置（原点）
    pub origin: Point,
    /// 接触開始時刻（呼び出し側が注入した単調クロック値）
    pub start_time: Instant,
    /// ライフサイクル状態
    pub state: GestureState,
    /// ジェスチャー種別
    pub gesture_type: GestureType,
    /// サンプリングされた重心位置の履歴（先頭は原点）
    pub path: Vec<Point>,
    /// X軸方向の方角
    pub x_direction: Option<Direction>,
    /// Y軸方向の方角
    pub y_direction: Option<Direction>,
    /// 原点からの角度（ラジアン）
    pub angle: Option<f32>,
}

impl Gesture {
    /// 集約結果から新しいジェスチャーを`Inited`状態で作成
    pub fn new(aggregate: &FrameAggregate, weight_class: WeightClass, now: Instant) -> Self {
        Self {
            contact_points: aggregate.contact_points,
            weight_class,
            origin: aggregate.centroid,
            start_time: now,
            state: GestureState::Inited,
            gesture_type: GestureType::Undetermined,
            path: vec![aggregate.centroid],
            x_direction: None,
            y_direction: None,
            angle: None,
        }
    }

    /// 新しい重心位置をpathに追加し、方角と角度を再計算する
    ///
    /// 符号規約: `Δ = 原点 − 現在位置`。センサーのY軸は下向きに増加するため
    /// `Δy > 0`（上方向への移動）が`Up`、`Δx > 0`が`Left`に対応する。
    /// 角度は `atan2(Δy, −Δx)`。これにより+X方向（右）への移動が角度0になる。
    pub fn record_position(&mut self, position: Point) {
        self.path.push(position);

        let delta_y = self.origin.y - position.y;
        let delta_x = self.origin.x - position.x;
        self.angle = Some(delta_y.atan2(-delta_x));
        self.y_direction = Some(if delta_y > 0.0 { Direction::Up } else { Direction::Down });
        self.x_direction = Some(if delta_x > 0.0 { Direction::Left } else { Direction::Right });
    }

    /// 原点からの変位（mm）
    pub fn displacement_to(&self, position: Point) -> f32 {
        self.origin.distance_to(position)
    }
}

/// ライフサイクルイベントの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Started,
    Moved,
    Ended,
}

/// Trackerが送出するジェスチャーイベント
///
/// `gesture`は送出時点の不変スナップショット。以降の追跡対象の変更は
/// シンク側から観測されない。
#[derive(Debug, Clone)]
pub struct GestureEvent {
    pub kind: EventKind,
    pub gesture: Gesture,
    /// 送出時刻（注入クロック基準）
    pub timestamp: Instant,
}

impl GestureEvent {
    /// スナップショットを取ってイベントを作成
    pub fn new(kind: EventKind, gesture: &Gesture, timestamp: Instant) -> Self {
        Self {
            kind,
            gesture: gesture.clone(),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert_eq!(a.distance_to(b), 5.0);
        assert_eq!(b.distance_to(a), 5.0);
    }

    #[test]
    fn test_contact_well_formed() {
        assert!(Contact::new(10.0, 20.0, 100.0).is_well_formed());
        assert!(Contact::new(10.0, 20.0, 0.0).is_well_formed());

        // 非有限座標・負の圧力は不正
        assert!(!Contact::new(f32::NAN, 20.0, 100.0).is_well_formed());
        assert!(!Contact::new(10.0, f32::INFINITY, 100.0).is_well_formed());
        assert!(!Contact::new(10.0, 20.0, -1.0).is_well_formed());
        assert!(!Contact::new(10.0, 20.0, f32::NAN).is_well_formed());
    }

    #[test]
    fn test_empty_frame_is_well_formed() {
        // 空フレームはリフトオフとして正当
        let frame = ContactFrame::empty();
        assert!(frame.is_empty());
        assert!(frame.is_well_formed());
    }

    #[test]
    fn test_frame_with_bad_contact_is_rejected() {
        let frame = ContactFrame::new(vec![
            Contact::new(1.0, 1.0, 10.0),
            Contact::new(f32::NAN, 1.0, 10.0),
        ]);
        assert!(!frame.is_well_formed());
    }

    #[test]
    fn test_gesture_starts_inited_with_origin_path() {
        let aggregate = FrameAggregate {
            contact_points: 2,
            centroid: Point::new(5.0, 6.0),
            avg_force: 120.0,
        };
        let gesture = Gesture::new(&aggregate, WeightClass::Light, Instant::now());

        assert_eq!(gesture.state, GestureState::Inited);
        assert_eq!(gesture.gesture_type, GestureType::Undetermined);
        assert_eq!(gesture.path, vec![Point::new(5.0, 6.0)]);
        assert_eq!(gesture.contact_points, 2);
        assert!(gesture.angle.is_none());
    }

    #[test]
    fn test_record_position_direction_and_angle() {
        let aggregate = FrameAggregate {
            contact_points: 1,
            centroid: Point::new(0.0, 0.0),
            avg_force: 100.0,
        };
        let mut gesture = Gesture::new(&aggregate, WeightClass::Light, Instant::now());

        // 右上方向へ移動: +X, -Y（Y軸は下向きに増加）
        gesture.record_position(Point::new(3.0, -4.0));

        assert_eq!(gesture.x_direction, Some(Direction::Right));
        assert_eq!(gesture.y_direction, Some(Direction::Up));

        // Δ = 原点 − 現在 = (-3, 4)、angle = atan2(4, 3)
        let angle = gesture.angle.unwrap();
        assert!((angle - 4.0f32.atan2(3.0)).abs() < 1e-6);
        assert_eq!(gesture.path.len(), 2);
    }

    #[test]
    fn test_record_position_left_down() {
        let aggregate = FrameAggregate {
            contact_points: 1,
            centroid: Point::new(10.0, 10.0),
            avg_force: 100.0,
        };
        let mut gesture = Gesture::new(&aggregate, WeightClass::Light, Instant::now());

        // 左下方向へ移動: -X, +Y
        gesture.record_position(Point::new(5.0, 15.0));

        assert_eq!(gesture.x_direction, Some(Direction::Left));
        assert_eq!(gesture.y_direction, Some(Direction::Down));
    }

    #[test]
    fn test_event_snapshot_is_immutable() {
        let aggregate = FrameAggregate {
            contact_points: 1,
            centroid: Point::new(0.0, 0.0),
            avg_force: 100.0,
        };
        let mut gesture = Gesture::new(&aggregate, WeightClass::Light, Instant::now());
        let event = GestureEvent::new(EventKind::Started, &gesture, Instant::now());

        // スナップショット後の変更はイベント側に反映されない
        gesture.record_position(Point::new(9.0, 9.0));
        gesture.state = GestureState::Moved;

        assert_eq!(event.gesture.path.len(), 1);
        assert_eq!(event.gesture.state, GestureState::Inited);
    }
}
