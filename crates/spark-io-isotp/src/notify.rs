//! 累积事件的观测钩子。
//!
//! 观测者只读取事件，不参与读取结果的计算；投递失败由描述符记录告警后忽略。

use std::borrow::Cow;

use spark_buffer::AccumulateEvent;
use thiserror::Error;
use tracing::info;

/// 观测者上报的失败。
#[derive(Debug, Error)]
#[error("accumulate observer failed: {reason}")]
pub struct ObserverError {
    reason: Cow<'static, str>,
}

impl ObserverError {
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// 每次成功累积后收到 `(sequence, bytes_added, total_size)`。
pub trait AccumulateObserver: Send {
    fn on_accumulate(&mut self, event: &AccumulateEvent) -> Result<(), ObserverError>;
}

impl<F> AccumulateObserver for F
where
    F: FnMut(&AccumulateEvent) -> Result<(), ObserverError> + Send,
{
    fn on_accumulate(&mut self, event: &AccumulateEvent) -> Result<(), ObserverError> {
        self(event)
    }
}

/// 把累积事件转为结构化日志，名称沿用 `nread_<sequence>` 的书签风格，便于在日志中定位每段捕获。
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl AccumulateObserver for TracingObserver {
    fn on_accumulate(&mut self, event: &AccumulateEvent) -> Result<(), ObserverError> {
        info!(
            mark = %format_args!("nread_{}", event.sequence),
            bytes_added = event.bytes_added,
            total_size = event.total_size,
            "isotp capture grew"
        );
        Ok(())
    }
}
