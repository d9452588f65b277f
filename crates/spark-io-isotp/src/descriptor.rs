use std::{fmt, io};

use bytes::Bytes;
use spark_buffer::{BufferError, GrowableStreamBuffer};
use spark_transport::{ByteTransport, TransportEndpoint};
use tracing::{debug, warn};

use crate::{notify::AccumulateObserver, permissions::Permissions};

/// 已打开的 ISOTP IO 资源：一条连接加一块随读取增长的缓冲。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 宿主按偏移随机读取，而报文只能顺序到达；描述符在每次读取前先“排空”一次连接，
///   再从缓冲按游标返回数据，于是顺序读取者看到一条不断延长的捕获磁带。
///
/// ## 逻辑 (How)
/// - `read`：尽力累积一次（失败仅记告警），随后按游标读取并推进游标；
/// - `write`：原样转发给连接，不触碰缓冲；
/// - `seek`：作用于缓冲的逻辑长度；
/// - `close(self)`：按值消费，连接与缓冲一起释放，重复关闭在类型层面不可表达。
///
/// ## 契约 (What)
/// - 所有操作要求 `&mut self`，同一描述符不存在并发访问；
/// - 累积永远不会改变游标，读取结果只取决于已累积的内容与调用时的游标；
/// - 观测者失败不影响读取结果。
pub struct IsotpDescriptor<T: ByteTransport> {
    transport: T,
    buffer: GrowableStreamBuffer,
    scratch: Vec<u8>,
    permissions: Permissions,
    observer: Option<Box<dyn AccumulateObserver>>,
}

impl<T: ByteTransport> IsotpDescriptor<T> {
    pub(crate) fn new(
        transport: T,
        buffer: GrowableStreamBuffer,
        scratch: Vec<u8>,
        permissions: Permissions,
    ) -> Self {
        Self {
            transport,
            buffer,
            scratch,
            permissions,
            observer: None,
        }
    }

    /// 挂载累积观测者，替换已有的观测者。
    pub fn with_observer(mut self, observer: impl AccumulateObserver + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    /// 累积一次后从游标处读取至多 `max_len` 字节，游标按返回长度推进。
    pub fn read(&mut self, max_len: usize) -> Bytes {
        self.accumulate();
        self.buffer.read(max_len)
    }

    /// 原样转发给连接；短写以 `Ok(n < len)` 返回，不重试。
    pub fn write(&mut self, payload: &[u8]) -> spark_transport::Result<usize> {
        self.transport.write(payload)
    }

    pub fn seek(&mut self, target: io::SeekFrom) -> Result<u64, BufferError> {
        self.buffer.seek(target)
    }

    /// 释放连接与缓冲；关闭失败只记录日志，调用方看到的关闭总是成功的。
    pub fn close(mut self) {
        let endpoint = self.transport.endpoint().clone();
        if let Err(err) = self.transport.close() {
            warn!(endpoint = %endpoint, error = %err, "isotp transport close failed");
        }
        debug!(
            endpoint = %endpoint,
            size = self.buffer.len(),
            frames = self.buffer.frame_count(),
            "isotp resource closed"
        );
    }

    /// 缓冲的逻辑长度。
    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn offset(&self) -> u64 {
        self.buffer.offset()
    }

    pub fn frame_count(&self) -> u64 {
        self.buffer.frame_count()
    }

    pub fn endpoint(&self) -> &TransportEndpoint {
        self.transport.endpoint()
    }

    pub fn permissions(&self) -> Permissions {
        self.permissions
    }

    /// 只读访问已累积内容，不触发累积。
    pub fn buffer(&self) -> &GrowableStreamBuffer {
        &self.buffer
    }

    fn accumulate(&mut self) {
        match self
            .buffer
            .accumulate_from(&mut self.transport, &mut self.scratch)
        {
            Ok(Some(event)) => {
                debug!(
                    sequence = event.sequence,
                    bytes_added = event.bytes_added,
                    total_size = event.total_size,
                    "isotp frames accumulated"
                );
                if event.bytes_added == self.scratch.len() {
                    warn!(
                        sequence = event.sequence,
                        chunk_size = self.scratch.len(),
                        "isotp read filled the whole chunk, message may be truncated"
                    );
                }
                if let Some(observer) = self.observer.as_mut()
                    && let Err(err) = observer.on_accumulate(&event)
                {
                    warn!(sequence = event.sequence, error = %err, "accumulate observer failed");
                }
            }
            Ok(None) => {}
            Err(err) => {
                warn!(
                    endpoint = %self.transport.endpoint(),
                    error = %err,
                    "accumulate failed, serving buffered bytes"
                );
            }
        }
    }
}

impl<T: ByteTransport + fmt::Debug> fmt::Debug for IsotpDescriptor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IsotpDescriptor")
            .field("transport", &self.transport)
            .field("size", &self.buffer.len())
            .field("offset", &self.buffer.offset())
            .field("permissions", &self.permissions)
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl<T: ByteTransport> io::Read for IsotpDescriptor<T> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.accumulate();
        Ok(self.buffer.read_into(buf))
    }
}

impl<T: ByteTransport> io::Write for IsotpDescriptor<T> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.transport.write(buf).map_err(io::Error::from)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: ByteTransport> io::Seek for IsotpDescriptor<T> {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        self.buffer
            .seek(pos)
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))
    }
}
