//! 進捗通知
//!
//! 最新値だけを持つ watch チャネルの薄いラッパー。送信は決してブロック
//! しないので、受信側が遅くても集約ループは止まらない。

use tokio::sync::watch;

pub type ProgressReceiver = watch::Receiver<f64>;

#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: watch::Sender<f64>,
}

/// 進捗チャネルを作る。値は0.0〜1.0の割合。
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    let (tx, rx) = watch::channel(0.0);
    (ProgressSender { tx }, rx)
}

impl ProgressSender {
    /// 最新値を上書き送信する。受信側がいなくてもエラーにしない。
    pub fn publish(&self, fraction: f64) {
        let _ = self.tx.send(fraction);
    }
}
