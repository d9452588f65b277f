use crate::TransportEndpoint;

/// 已建立会话的字节传输契约。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - IO 资源适配器把报文协议当作“字节进、字节出”的管道使用，不关心分段与仲裁；
///   本 trait 只保留这一最小面，内核 `CAN_ISOTP` 套接字与测试用脚本传输都能实现。
///
/// ## 契约说明（What）
/// - `read_nonblocking`：立即返回当前可用的数据，最多 `buf.len()` 字节；
///   没有数据时返回 `Ok(0)`，这是正常结果而非错误；
/// - **报文语义**：一次读取至多交付一条完整报文；报文长于 `buf` 时只交付前 `buf.len()`
///   字节，其余部分被丢弃而不会在后续读取中出现。调用方应让读缓冲不小于最大报文长度；
/// - `write`：一次性转交给底层，不做缓冲与重试，短写原样返回；
/// - `close`：释放底层套接字，未读数据被丢弃；重复调用安全；
/// - `endpoint`：建立会话时使用的端点。
///
/// ## 风险提示（Trade-offs）
/// - 所有方法要求 `&mut self`，实现无需内部加锁；同一连接不可被并发使用。
pub trait ByteTransport: Send + 'static {
    /// 非阻塞读取，空结果表示“暂无数据”。
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> crate::Result<usize>;

    /// 转发写入，返回底层实际接受的字节数。
    fn write(&mut self, payload: &[u8]) -> crate::Result<usize>;

    /// 释放底层资源。
    fn close(&mut self) -> crate::Result<()>;

    /// 会话端点。
    fn endpoint(&self) -> &TransportEndpoint;
}

/// 按端点建立 [`ByteTransport`] 的连接器。
///
/// ## 契约说明（What）
/// - 成功返回的传输已处于非阻塞模式；
/// - 失败时不得遗留任何已打开的套接字。
pub trait TransportConnector {
    /// 连接成功后得到的传输类型。
    type Transport: ByteTransport;

    /// 建立会话。
    fn connect(&self, endpoint: &TransportEndpoint) -> crate::Result<Self::Transport>;
}

impl<C> TransportConnector for &C
where
    C: TransportConnector + ?Sized,
{
    type Transport = C::Transport;

    fn connect(&self, endpoint: &TransportEndpoint) -> crate::Result<Self::Transport> {
        (**self).connect(endpoint)
    }
}
