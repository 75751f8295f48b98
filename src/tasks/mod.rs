//! 后台任务
//!
//! - `counter`：浏览量/点击量的异步更新队列
//! - `sweeper`：定时清理过期内容及其文件

pub mod counter;
pub mod sweeper;

pub use counter::{CounterEvent, CounterHandle, CounterSink, CounterStats, CounterUpdater};
pub use sweeper::{ExpirySweeper, SweepReport, SweeperHandle};
