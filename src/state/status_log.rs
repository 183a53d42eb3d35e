//! 状态通道
//!
//! 安装过程的状态行通过广播通道实时推给订阅者（SSE），同时保留一个
//! 容量固定的滚动窗口，供中途重连的向导补看最近的输出。窗口不是完整
//! 历史，超出容量的旧行会被丢弃。
//!
//! 追加操作是同步的（窗口用 std Mutex，临界区极短），这样进程输出
//! 读取任务和健康检查的进度回调都能直接调用。

use std::collections::VecDeque;
use std::sync::Mutex;

use tokio::sync::broadcast;

use crate::domain::install::LogLine;

/// 广播通道容量
const CHANNEL_CAPACITY: usize = 256;

/// 状态日志
pub struct StatusLog {
    /// 广播发送者
    tx: broadcast::Sender<LogLine>,
    /// 滚动窗口（最近 N 条）
    window: Mutex<VecDeque<LogLine>>,
    /// 窗口容量
    capacity: usize,
}

impl StatusLog {
    /// 创建新的状态日志
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            window: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// 追加一行：写入窗口并广播
    ///
    /// 没有订阅者时广播失败是正常情况，直接忽略
    pub fn append(&self, line: LogLine) {
        {
            let mut window = self.window.lock().expect("status log window poisoned");
            if window.len() == self.capacity {
                window.pop_front();
            }
            window.push_back(line.clone());
        }

        let _ = self.tx.send(line);
    }

    /// 订阅实时状态行
    pub fn subscribe(&self) -> broadcast::Receiver<LogLine> {
        self.tx.subscribe()
    }

    /// 窗口快照
    pub fn snapshot(&self) -> Vec<LogLine> {
        let window = self.window.lock().expect("status log window poisoned");
        window.iter().cloned().collect()
    }

    /// 清空窗口（新会话开始时调用）
    pub fn reset(&self) {
        let mut window = self.window.lock().expect("status log window poisoned");
        window.clear();
    }

    /// 窗口中的行数
    pub fn len(&self) -> usize {
        let window = self.window.lock().expect("status log window poisoned");
        window.len()
    }

    /// 窗口是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
