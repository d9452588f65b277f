//! 脚本化内存传输，仅在 `test-util` 特性下编译。
//!
//! # 模块定位（Why）
//! - 契约测试需要在没有 CAN 硬件的环境中驱动“有数据 / 无数据 / 读失败 / 短写 / 关闭”等分支；
//! - 测试侧通过 [`ScriptHandle`] 预置入站报文并观察写入与关闭，被测代码只看到 [`ByteTransport`]。
//!
//! # 设计要点（How）
//! - 连接器与其产出的全部传输共享同一份 `Arc<Mutex<ScriptState>>`；
//! - `live_transports` 统计尚未释放的传输数量，用于断言失败路径没有泄漏套接字；
//! - 与 `CAN_ISOTP` 套接字一致按报文交付：一次读取取出一整帧，放不下的尾部被丢弃并计入
//!   `truncated_bytes`。

use std::{
    collections::VecDeque,
    io,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{ByteTransport, TransportConnector, TransportEndpoint, TransportError, error};

#[derive(Debug, Default)]
struct ScriptState {
    inbound: VecDeque<Vec<u8>>,
    read_failures: VecDeque<io::ErrorKind>,
    written: Vec<Vec<u8>>,
    write_limit: Option<usize>,
    write_failure: Option<io::ErrorKind>,
    refuse_connect: bool,
    connects: usize,
    read_calls: usize,
    live: usize,
    closes: usize,
    truncated: usize,
}

/// 测试侧控制句柄。
#[derive(Clone, Debug, Default)]
pub struct ScriptHandle {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptHandle {
    /// 创建空脚本：无入站数据、写入全部接受、允许连接。
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成共享本脚本的连接器。
    pub fn connector(&self) -> ScriptedConnector {
        ScriptedConnector {
            handle: self.clone(),
        }
    }

    /// 追加一帧入站数据；下一次读取会取出它，超出读缓冲的部分被丢弃。
    pub fn push_frame(&self, frame: impl Into<Vec<u8>>) {
        self.lock().inbound.push_back(frame.into());
    }

    /// 让下一次读取返回指定类型的 IO 错误。
    pub fn fail_next_read(&self, kind: io::ErrorKind) {
        self.lock().read_failures.push_back(kind);
    }

    /// 每次写入最多接受 `limit` 字节。
    pub fn limit_writes(&self, limit: usize) {
        self.lock().write_limit = Some(limit);
    }

    /// 之后的所有写入都以指定错误失败。
    pub fn fail_writes(&self, kind: io::ErrorKind) {
        self.lock().write_failure = Some(kind);
    }

    /// 拒绝之后的连接请求，模拟端点不可达。
    pub fn refuse_connections(&self) {
        self.lock().refuse_connect = true;
    }

    /// 已接受的写入记录（按调用顺序）。
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.lock().written.clone()
    }

    /// 尚未消费的入站帧数量。
    pub fn pending_frames(&self) -> usize {
        self.lock().inbound.len()
    }

    /// 成功建立的连接次数。
    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// 被调用的读取次数（包括返回空结果与失败的读取）。
    pub fn read_calls(&self) -> usize {
        self.lock().read_calls
    }

    /// 因读缓冲过小而被丢弃的字节总数。
    pub fn truncated_bytes(&self) -> usize {
        self.lock().truncated
    }

    /// 尚未释放的传输数量。
    pub fn live_transports(&self) -> usize {
        self.lock().live
    }

    /// 至少有一个传输被关闭且当前没有存活传输。
    pub fn is_closed(&self) -> bool {
        let state = self.lock();
        state.closes > 0 && state.live == 0
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// 基于 [`ScriptHandle`] 的连接器。
#[derive(Clone, Debug)]
pub struct ScriptedConnector {
    handle: ScriptHandle,
}

impl TransportConnector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn connect(&self, endpoint: &TransportEndpoint) -> crate::Result<ScriptedTransport> {
        endpoint.validate()?;
        let mut state = self.handle.lock();
        if state.refuse_connect {
            return Err(TransportError::from_io(
                error::CONNECT,
                io::Error::from(io::ErrorKind::ConnectionRefused),
            ));
        }
        state.connects += 1;
        state.live += 1;
        drop(state);
        Ok(ScriptedTransport {
            handle: self.handle.clone(),
            endpoint: endpoint.clone(),
            open: true,
        })
    }
}

/// 脚本化传输；`Drop` 时若尚未关闭会自动关闭。
#[derive(Debug)]
pub struct ScriptedTransport {
    handle: ScriptHandle,
    endpoint: TransportEndpoint,
    open: bool,
}

impl ScriptedTransport {
    fn release(&mut self) {
        if self.open {
            self.open = false;
            let mut state = self.handle.lock();
            state.live = state.live.saturating_sub(1);
            state.closes += 1;
        }
    }
}

impl ByteTransport for ScriptedTransport {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> crate::Result<usize> {
        if !self.open {
            return Err(TransportError::from_io(
                error::READ,
                io::Error::from(io::ErrorKind::NotConnected),
            ));
        }
        let mut state = self.handle.lock();
        state.read_calls += 1;
        if let Some(kind) = state.read_failures.pop_front() {
            return Err(TransportError::from_io(error::READ, io::Error::from(kind)));
        }
        let Some(frame) = state.inbound.pop_front() else {
            return Ok(0);
        };
        let n = frame.len().min(buf.len());
        buf[..n].copy_from_slice(&frame[..n]);
        state.truncated += frame.len() - n;
        Ok(n)
    }

    fn write(&mut self, payload: &[u8]) -> crate::Result<usize> {
        if !self.open {
            return Err(TransportError::from_io(
                error::WRITE,
                io::Error::from(io::ErrorKind::NotConnected),
            ));
        }
        let mut state = self.handle.lock();
        if let Some(kind) = state.write_failure {
            return Err(TransportError::from_io(error::WRITE, io::Error::from(kind)));
        }
        let accepted = state
            .write_limit
            .map_or(payload.len(), |limit| limit.min(payload.len()));
        state.written.push(payload[..accepted].to_vec());
        Ok(accepted)
    }

    fn close(&mut self) -> crate::Result<()> {
        self.release();
        Ok(())
    }

    fn endpoint(&self) -> &TransportEndpoint {
        &self.endpoint
    }
}

impl Drop for ScriptedTransport {
    fn drop(&mut self) {
        self.release();
    }
}
