//! Application層: ユースケースとパイプライン制御
//!
//! Domain層のportを組み合わせてジェスチャー追跡パイプラインを構成する。

pub mod aggregate;
pub mod pipeline;
pub mod recovery;
pub mod stats;
pub mod tracker;
pub mod weight;
