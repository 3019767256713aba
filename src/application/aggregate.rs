//! フレーム集約モジュール
//!
//! 1フレームの全接触点を単一の重心位置と平均圧力に縮約します。
//! 決定的で副作用なし。

use crate::domain::{ContactFrame, FrameAggregate, Point};

/// フレームを集約する
///
/// # Returns
/// - `Some(FrameAggregate)`: 接触点が1つ以上ある場合（重心と平均圧力）
/// - `None`: 空フレーム（リフトオフ）
///
/// 空フレームは明示的にガードする（0除算を発生させない）。
pub fn aggregate(frame: &ContactFrame) -> Option<FrameAggregate> {
    if frame.is_empty() {
        return None;
    }

    let count = frame.contacts.len();
    let mut sum_x = 0.0f32;
    let mut sum_y = 0.0f32;
    let mut sum_force = 0.0f32;

    for contact in &frame.contacts {
        sum_x += contact.x_mm;
        sum_y += contact.y_mm;
        sum_force += contact.force;
    }

    let n = count as f32;
    Some(FrameAggregate {
        contact_points: count,
        centroid: Point::new(sum_x / n, sum_y / n),
        avg_force: sum_force / n,
    })
}
