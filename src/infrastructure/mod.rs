//! Infrastructure層: 外部技術の統合
//!
//! Domain層のtraitを実装し、クロック・フレームソース・イベントシンクを提供する。

pub mod clock;
pub mod replay;
pub mod sink;
