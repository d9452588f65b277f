use std::{collections::TryReserveError, io::SeekFrom};

use bytes::Bytes;
use spark_transport::{ByteTransport, TransportError};
use thiserror::Error;
use tracing::trace;

/// 每次累积向传输请求的默认最大字节数。
pub const DEFAULT_CHUNK_SIZE: usize = 4096;

/// 一次成功累积的观测数据。
///
/// - `sequence`：自打开以来的累积序号，从 0 开始；
/// - `bytes_added`：本次追加的字节数，恒大于 0；
/// - `total_size`：追加后的逻辑长度。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccumulateEvent {
    pub sequence: u64,
    pub bytes_added: usize,
    pub total_size: usize,
}

/// 缓冲自身的失败原因。
#[derive(Debug, Error)]
pub enum BufferError {
    /// 底层分配器无法满足扩容请求。
    #[error("failed to grow buffer to {requested} bytes")]
    AllocationFailed {
        requested: usize,
        #[source]
        source: TryReserveError,
    },
    /// 追加会越过配置的容量上限。
    #[error("appending would grow buffer to {requested} bytes, above the {limit} byte cap")]
    CapacityExceeded { requested: usize, limit: usize },
    /// 定位结果落在地址空间起点之前，或超出可表示范围。
    #[error("seek to position {position} is out of range")]
    InvalidSeek { position: i128 },
}

/// 累积失败：要么传输读失败，要么缓冲无法扩容。
#[derive(Debug, Error)]
pub enum AccumulateError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Buffer(#[from] BufferError),
}

/// `GrowableStreamBuffer` 把顺序到达的字节累积为一段只增不减的地址空间。
///
/// # 设计动机（Why）
/// - 每次读请求都是“排空”传输的机会：新报文被追加到尾部，
///   顺序按偏移读取的调用方看到持续增长的捕获内容，随机读取则作用于已累积的部分。
///
/// # 结构设计（How）
/// - `storage`：逻辑内容，初始为 1 个零字节；
/// - `offset`：调用方游标，只由 [`read`](Self::read)/[`seek`](Self::seek) 改变；
/// - `frame_counter`：成功累积的次数；
/// - `max_size`：可选容量上限，`None` 表示不设上限。
///
/// # 契约说明（What）
/// - **不变量**：`len() == storage.len()`；累积 `n` 字节后长度恰好增加 `n`；
///   累积前后 `offset` 不变；
/// - **前置条件**：同一缓冲不可被并发访问（所有可变操作要求 `&mut self`）。
///
/// # 风险与取舍（Trade-offs）
/// - 未设上限时长连接会无限增长，这与被替代的插件行为一致；需要约束时通过
///   [`with_max_size`](Self::with_max_size) 设置，剩余容量不足一个读块后数据留在内核队列中。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrowableStreamBuffer {
    storage: Vec<u8>,
    offset: u64,
    frame_counter: u64,
    max_size: Option<usize>,
}

impl Default for GrowableStreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl GrowableStreamBuffer {
    /// 以 1 个零字节为基线创建缓冲。
    pub fn new() -> Self {
        Self {
            storage: vec![0],
            offset: 0,
            frame_counter: 0,
            max_size: None,
        }
    }

    /// 以 `initial_size` 个零字节为基线创建缓冲；`0` 按 1 处理。
    pub fn with_initial_size(initial_size: usize) -> Result<Self, BufferError> {
        let mut buffer = Self {
            storage: Vec::new(),
            offset: 0,
            frame_counter: 0,
            max_size: None,
        };
        buffer.resize(initial_size.max(1))?;
        Ok(buffer)
    }

    /// 设置容量上限；上限小于当前长度时以当前长度为准。
    pub fn with_max_size(mut self, max_size: Option<usize>) -> Self {
        self.max_size = max_size.map(|limit| limit.max(self.storage.len()));
        self
    }

    /// 逻辑长度。
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    /// 只有显式 `resize(0)` 之后才为空。
    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    /// 调用方游标。
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 成功累积的次数。
    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    /// 容量上限。
    pub fn max_size(&self) -> Option<usize> {
        self.max_size
    }

    /// 距离上限剩余的字节数；未设上限时为 `None`。
    pub fn remaining_capacity(&self) -> Option<usize> {
        self.max_size
            .map(|limit| limit.saturating_sub(self.storage.len()))
    }

    /// 全部已累积内容。
    pub fn as_slice(&self) -> &[u8] {
        &self.storage
    }

    /// 调整逻辑长度：扩大时尾部补零、原有字节不变；缩小时截断。游标不受影响。
    pub fn resize(&mut self, new_size: usize) -> Result<(), BufferError> {
        let current = self.storage.len();
        if new_size > current {
            self.storage
                .try_reserve_exact(new_size - current)
                .map_err(|source| BufferError::AllocationFailed {
                    requested: new_size,
                    source,
                })?;
        }
        self.storage.resize(new_size, 0);
        Ok(())
    }

    /// 把 `bytes` 按下标追加到尾部，记为一次累积事件。
    ///
    /// 空输入不算事件，返回 `Ok(None)`。越过上限时整体拒绝，缓冲保持不变。
    pub fn append(&mut self, bytes: &[u8]) -> Result<Option<AccumulateEvent>, BufferError> {
        if bytes.is_empty() {
            return Ok(None);
        }
        let old_size = self.storage.len();
        let new_size = old_size.saturating_add(bytes.len());
        if let Some(limit) = self.max_size
            && new_size > limit
        {
            return Err(BufferError::CapacityExceeded {
                requested: new_size,
                limit,
            });
        }
        self.resize(new_size)?;
        self.storage[old_size..new_size].copy_from_slice(bytes);

        let event = AccumulateEvent {
            sequence: self.frame_counter,
            bytes_added: bytes.len(),
            total_size: new_size,
        };
        self.frame_counter += 1;
        trace!(
            sequence = event.sequence,
            bytes_added = event.bytes_added,
            total_size = event.total_size,
            "buffer grew"
        );
        Ok(Some(event))
    }

    /// 从传输读取一次并追加到尾部。
    ///
    /// # 执行步骤（How）
    /// 1. 读窗口固定为整个 `scratch`；报文传输会截断超出读缓冲的部分，因此窗口从不缩小；
    /// 2. 剩余容量不足一个窗口时不发起读取，报文留在传输的接收队列中；
    /// 3. 调用一次 `read_nonblocking`，`0` 字节为正常的“暂无数据”；
    /// 4. 把读到的字节交给 [`append`](Self::append)。
    ///
    /// 游标全程不被触碰。
    pub fn accumulate_from<T>(
        &mut self,
        transport: &mut T,
        scratch: &mut [u8],
    ) -> Result<Option<AccumulateEvent>, AccumulateError>
    where
        T: ByteTransport + ?Sized,
    {
        let window = scratch.len();
        if window == 0 {
            return Ok(None);
        }
        if let Some(remaining) = self.remaining_capacity()
            && remaining < window
        {
            trace!(remaining, window, "buffer cap reached, read deferred");
            return Ok(None);
        }
        let received = transport.read_nonblocking(scratch)?;
        Ok(self.append(&scratch[..received.min(window)])?)
    }

    /// 读取 `[offset, offset + len)` 与 `[0, size)` 的交集；起点越界返回空切片。
    pub fn read_at(&self, offset: u64, len: usize) -> &[u8] {
        let size = self.storage.len();
        let Ok(start) = usize::try_from(offset) else {
            return &[];
        };
        if start >= size {
            return &[];
        }
        let end = start.saturating_add(len).min(size);
        &self.storage[start..end]
    }

    /// 在 `[0, size)` 内原地覆盖，返回实际写入的字节数；不会扩容，也不移动游标。
    pub fn write_at(&mut self, offset: u64, bytes: &[u8]) -> usize {
        let size = self.storage.len();
        let Ok(start) = usize::try_from(offset) else {
            return 0;
        };
        if start >= size {
            return 0;
        }
        let end = start.saturating_add(bytes.len()).min(size);
        let written = end - start;
        self.storage[start..end].copy_from_slice(&bytes[..written]);
        written
    }

    /// 从游标处读取至多 `len` 字节，并按返回长度推进游标。
    pub fn read(&mut self, len: usize) -> Bytes {
        let chunk = Bytes::copy_from_slice(self.read_at(self.offset, len));
        self.offset += chunk.len() as u64;
        chunk
    }

    /// 与 [`read`](Self::read) 相同，但写入调用方提供的切片。
    pub fn read_into(&mut self, dst: &mut [u8]) -> usize {
        let src = self.read_at(self.offset, dst.len());
        let n = src.len();
        dst[..n].copy_from_slice(src);
        self.offset += n as u64;
        n
    }

    /// 以逻辑长度为基准定位游标，允许越过尾部（之后的读取返回空）。
    pub fn seek(&mut self, target: SeekFrom) -> Result<u64, BufferError> {
        let position = match target {
            SeekFrom::Start(absolute) => i128::from(absolute),
            SeekFrom::Current(delta) => i128::from(self.offset) + i128::from(delta),
            SeekFrom::End(delta) => self.storage.len() as i128 + i128::from(delta),
        };
        let offset = u64::try_from(position).map_err(|_| BufferError::InvalidSeek { position })?;
        self.offset = offset;
        Ok(offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_single_zero_byte() {
        let buffer = GrowableStreamBuffer::new();
        assert_eq!(buffer.as_slice(), &[0]);
        assert_eq!(buffer.offset(), 0);
        assert_eq!(buffer.frame_count(), 0);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn zero_initial_size_is_raised_to_one() {
        let buffer = GrowableStreamBuffer::with_initial_size(0).expect("分配 1 字节");
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn append_reports_sequence_before_increment() {
        let mut buffer = GrowableStreamBuffer::new();
        let first = buffer.append(b"ab").expect("追加").expect("非空");
        let second = buffer.append(b"c").expect("追加").expect("非空");
        assert_eq!(first.sequence, 0);
        assert_eq!(first.total_size, 3);
        assert_eq!(second.sequence, 1);
        assert_eq!(second.total_size, 4);
        assert_eq!(buffer.as_slice(), b"\0abc");
    }

    #[test]
    fn append_over_cap_is_rejected_whole() {
        let mut buffer = GrowableStreamBuffer::new().with_max_size(Some(4));
        let err = buffer.append(b"abcd").expect_err("1 + 4 > 4");
        assert!(matches!(
            err,
            BufferError::CapacityExceeded {
                requested: 5,
                limit: 4
            }
        ));
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.frame_count(), 0);
    }

    #[test]
    fn cap_below_current_size_is_clamped() {
        let buffer = GrowableStreamBuffer::with_initial_size(8)
            .expect("分配")
            .with_max_size(Some(2));
        assert_eq!(buffer.max_size(), Some(8));
        assert_eq!(buffer.remaining_capacity(), Some(0));
    }

    #[test]
    fn write_at_is_clamped_and_keeps_size() {
        let mut buffer = GrowableStreamBuffer::with_initial_size(4).expect("分配");
        assert_eq!(buffer.write_at(2, &[7, 8, 9]), 2);
        assert_eq!(buffer.as_slice(), &[0, 0, 7, 8]);
        assert_eq!(buffer.write_at(4, &[1]), 0);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn seek_supports_all_origins() {
        let mut buffer = GrowableStreamBuffer::with_initial_size(10).expect("分配");
        assert_eq!(buffer.seek(SeekFrom::Start(4)).expect("绝对定位"), 4);
        assert_eq!(buffer.seek(SeekFrom::Current(-1)).expect("相对定位"), 3);
        assert_eq!(buffer.seek(SeekFrom::End(-2)).expect("相对尾部"), 8);
        assert_eq!(buffer.seek(SeekFrom::End(5)).expect("允许越过尾部"), 15);
        assert!(buffer.read(4).is_empty());

        let err = buffer.seek(SeekFrom::Current(-100)).expect_err("负位置");
        assert!(matches!(err, BufferError::InvalidSeek { position: -85 }));
        assert_eq!(buffer.offset(), 15, "失败的定位不改变游标");
    }

    #[test]
    fn read_into_advances_by_copied_length() {
        let mut buffer = GrowableStreamBuffer::new();
        buffer.append(b"xyz").expect("追加");
        let mut dst = [0u8; 8];
        assert_eq!(buffer.read_into(&mut dst), 4);
        assert_eq!(&dst[..4], b"\0xyz");
        assert_eq!(buffer.offset(), 4);
        assert_eq!(buffer.read_into(&mut dst), 0);
    }
}
