use std::io;

use spark_transport::{ByteTransport, TransportConnector, TransportEndpoint, TransportError};
use tracing::{debug, trace};

use crate::{
    CanId,
    error::{self, from_sys, invalid_id},
    sys::{self, RawSocket},
};

/// `CAN_ISOTP` 连接器。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 把 `interface/source/destination` 端点落地为一个已绑定、非阻塞的 ISOTP 套接字，
///   使上层只看到 [`ByteTransport`]。
///
/// ## 逻辑 (How)
/// 1. 校验接口名非空；
/// 2. 解析 `source`（发送 ID）与 `destination`（接收 ID），两者都在触碰内核之前完成，
///    因此格式错误在任何平台上都得到相同的错误码；
/// 3. 解析接口索引，创建并绑定套接字，切换为非阻塞。
///
/// ## 契约 (What)
/// - 失败时不会遗留已打开的套接字；
/// - 错误码：端点格式错误为 `spark.transport.invalid_endpoint`，接口不存在为
///   `spark.transport.isotp.interface_lookup_failed`，非 Linux 平台为 `spark.transport.unsupported`，
///   其余为 `spark.transport.isotp.connect_failed`。
#[derive(Clone, Copy, Debug, Default)]
pub struct IsotpConnector;

impl IsotpConnector {
    pub fn new() -> Self {
        Self
    }
}

impl TransportConnector for IsotpConnector {
    type Transport = IsotpChannel;

    fn connect(&self, endpoint: &TransportEndpoint) -> spark_transport::Result<IsotpChannel> {
        endpoint.validate()?;
        let tx_id: CanId = endpoint
            .source()
            .parse()
            .map_err(|err| invalid_id("source", err))?;
        let rx_id: CanId = endpoint
            .destination()
            .parse()
            .map_err(|err| invalid_id("destination", err))?;

        let ifindex = sys::interface_index(endpoint.interface())
            .map_err(|err| from_sys(error::RESOLVE_INTERFACE, err))?;
        let socket = sys::open(ifindex, rx_id.socket_id(), tx_id.socket_id())
            .map_err(|err| from_sys(error::CONNECT, err))?;

        debug!(
            endpoint = %endpoint,
            ifindex,
            tx_id = %tx_id,
            rx_id = %rx_id,
            "isotp socket bound"
        );
        Ok(IsotpChannel {
            socket: Some(socket),
            endpoint: endpoint.clone(),
            tx_id,
            rx_id,
        })
    }
}

/// 单个 ISOTP 会话。
///
/// - `read_nonblocking` 每次最多取回一个已重组的报文，`WouldBlock`/`Interrupted` 视为“暂无数据”；
/// - `write` 一次发送一个报文，`WouldBlock` 记为 0 字节短写；
/// - `close` 之后的读写返回 `NotConnected` 错误；`Drop` 自动关闭套接字。
#[derive(Debug)]
pub struct IsotpChannel {
    socket: Option<RawSocket>,
    endpoint: TransportEndpoint,
    tx_id: CanId,
    rx_id: CanId,
}

impl IsotpChannel {
    /// 发送方向使用的标识符。
    pub fn tx_id(&self) -> CanId {
        self.tx_id
    }

    /// 接收方向使用的标识符。
    pub fn rx_id(&self) -> CanId {
        self.rx_id
    }

    /// 套接字是否仍然打开。
    pub fn is_open(&self) -> bool {
        self.socket.is_some()
    }
}

impl ByteTransport for IsotpChannel {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> spark_transport::Result<usize> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(not_connected(error::READ));
        };
        match sys::recv(socket, buf) {
            Ok(n) => {
                trace!(endpoint = %self.endpoint, bytes = n, "isotp frame received");
                Ok(n)
            }
            Err(err)
                if matches!(
                    err.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                Ok(0)
            }
            Err(err) => Err(TransportError::from_io(error::READ, err)),
        }
    }

    fn write(&mut self, payload: &[u8]) -> spark_transport::Result<usize> {
        let Some(socket) = self.socket.as_mut() else {
            return Err(not_connected(error::WRITE));
        };
        if payload.is_empty() {
            return Ok(0);
        }
        match sys::send(socket, payload) {
            Ok(n) => Ok(n),
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                trace!(endpoint = %self.endpoint, "isotp send queue full");
                Ok(0)
            }
            Err(err) => Err(TransportError::from_io(error::WRITE, err)),
        }
    }

    fn close(&mut self) -> spark_transport::Result<()> {
        if self.socket.take().is_some() {
            debug!(endpoint = %self.endpoint, "isotp socket closed");
        }
        Ok(())
    }

    fn endpoint(&self) -> &TransportEndpoint {
        &self.endpoint
    }
}

fn not_connected(kind: spark_transport::error::OperationKind) -> TransportError {
    TransportError::from_io(kind, io::Error::from(io::ErrorKind::NotConnected))
}
