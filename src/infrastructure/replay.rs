//! リプレイフレームソースアダプタ
//!
//! 事前に用意したフレーム列を順に返す`FrameSourcePort`実装。
//! テスト・開発用で、実機センサーなしでパイプライン全体を駆動できる。

use std::collections::VecDeque;

use crate::domain::{ContactFrame, DeviceInfo, DomainError, DomainResult, FrameSourcePort};

/// リプレイの1ステップ
#[derive(Debug)]
pub enum ReplayStep {
    /// フレームを返す（空フレーム＝リフトオフもここで表現する）
    Frame(ContactFrame),
    /// このサイクルはフレームなし（`Ok(None)`）
    NoFrame,
    /// 読み取りエラーを返す
    Fail(DomainError),
}

/// リプレイフレームソース
///
/// スクリプトを消費し尽くした後は`Ok(None)`を返し続ける。
pub struct ReplayFrameSource {
    steps: VecDeque<ReplayStep>,
    opened: bool,
    scanning: bool,
    reinit_count: u32,
}

impl ReplayFrameSource {
    /// 新しいReplayFrameSourceを作成
    pub fn new(steps: Vec<ReplayStep>) -> Self {
        Self {
            steps: steps.into(),
            opened: false,
            scanning: false,
            reinit_count: 0,
        }
    }

    /// 再初期化された回数を取得
    #[allow(dead_code)]
    pub fn reinit_count(&self) -> u32 {
        self.reinit_count
    }

    /// 残りステップ数を取得
    #[allow(dead_code)]
    pub fn remaining_steps(&self) -> usize {
        self.steps.len()
    }
}

impl FrameSourcePort for ReplayFrameSource {
    fn open(&mut self) -> DomainResult<()> {
        self.opened = true;
        Ok(())
    }

    fn start_scanning(&mut self) -> DomainResult<()> {
        if !self.opened {
            return Err(DomainError::DeviceUnavailable(
                "Session not opened".to_string(),
            ));
        }
        self.scanning = true;
        Ok(())
    }

    fn read_frame(&mut self) -> DomainResult<Option<ContactFrame>> {
        if !self.scanning {
            return Err(DomainError::FrameRead("Not scanning".to_string()));
        }

        match self.steps.pop_front() {
            Some(ReplayStep::Frame(frame)) => Ok(Some(frame)),
            Some(ReplayStep::NoFrame) => Ok(None),
            Some(ReplayStep::Fail(e)) => Err(e),
            // スクリプト終端に達したら「フレームなし」を返し続ける
            None => Ok(None),
        }
    }

    fn stop_scanning(&mut self) -> DomainResult<()> {
        self.scanning = false;
        Ok(())
    }

    fn close(&mut self) -> DomainResult<()> {
        self.opened = false;
        Ok(())
    }

    fn reinitialize(&mut self) -> DomainResult<()> {
        self.reinit_count += 1;
        self.opened = true;
        self.scanning = true;
        Ok(())
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            name: "Replay Source".to_string(),
            width_mm: 240.0,
            height_mm: 139.0,
            scan_rate_hz: 125,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Contact;

    #[test]
    fn test_read_requires_scanning() {
        let mut source = ReplayFrameSource::new(vec![]);
        assert!(source.read_frame().is_err());

        source.open().unwrap();
        source.start_scanning().unwrap();
        assert!(source.read_frame().is_ok());
    }

    #[test]
    fn test_scanning_requires_open_session() {
        let mut source = ReplayFrameSource::new(vec![]);
        assert!(matches!(
            source.start_scanning().unwrap_err(),
            DomainError::DeviceUnavailable(_)
        ));
    }

    #[test]
    fn test_steps_are_replayed_in_order() {
        let frame = ContactFrame::new(vec![Contact::new(1.0, 2.0, 300.0)]);
        let mut source = ReplayFrameSource::new(vec![
            ReplayStep::Frame(frame.clone()),
            ReplayStep::NoFrame,
            ReplayStep::Frame(ContactFrame::empty()),
            ReplayStep::Fail(DomainError::Timeout("scripted".to_string())),
        ]);
        source.open().unwrap();
        source.start_scanning().unwrap();

        // 接触フレーム
        let first = source.read_frame().unwrap().unwrap();
        assert_eq!(first.contacts.len(), 1);

        // フレームなしのサイクル
        assert!(source.read_frame().unwrap().is_none());

        // 空フレーム（リフトオフ）はNoneではなくSomeで返る
        let empty = source.read_frame().unwrap().unwrap();
        assert!(empty.is_empty());

        // スクリプトされたエラー
        assert!(source.read_frame().is_err());

        // 終端以降はフレームなし
        assert!(source.read_frame().unwrap().is_none());
    }

    #[test]
    fn test_reinitialize_restores_session() {
        let mut source = ReplayFrameSource::new(vec![]);
        source.open().unwrap();
        source.start_scanning().unwrap();
        source.stop_scanning().unwrap();

        assert!(source.read_frame().is_err());

        source.reinitialize().unwrap();
        assert!(source.read_frame().is_ok());
        assert_eq!(source.reinit_count(), 1);
    }
}
