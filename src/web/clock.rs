//! 时间来源
//!
//! 清单的修改时间与缓存清单的时间戳都从这里取得，测试时可以冻结。

use chrono::{DateTime, FixedOffset, Local};

/// 提供当前时间
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;
}

/// 系统本地时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }
}

/// 固定时间，用于可重复的输出
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<FixedOffset>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        self.0
    }
}
