use spark_buffer::BufferError;
use spark_transport::{TransportEndpoint, TransportError};
use thiserror::Error;

/// 打开资源的失败原因；任何失败都不会留下半打开的描述符。
#[derive(Debug, Error)]
pub enum OpenError {
    /// 执行策略禁止网络类资源。
    #[error("the isotp:// uri is not permitted in sandbox mode")]
    PolicyDenied,
    /// 地址不属于本资源。
    #[error("unsupported uri `{uri}`: expected the isotp:// scheme")]
    UnsupportedUri { uri: String },
    /// 端点格式错误或不可达。
    #[error("cannot connect to {endpoint}")]
    ConnectFailed {
        endpoint: TransportEndpoint,
        #[source]
        source: TransportError,
    },
    /// 缓冲或读块无法分配；此前建立的连接已关闭。
    #[error("cannot allocate isotp stream buffer")]
    AllocationFailed(#[source] BufferError),
}
