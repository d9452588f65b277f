#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "spark-transport: ISOTP IO 资源的字节传输契约层。"]
#![doc = ""]
#![doc = "== 使命概述 =="]
#![doc = "- **Why**：让可增长缓冲与 IO 资源适配器只依赖“连接 → 非阻塞读 → 写 → 关闭”这一最小契约，具体套接字实现可替换为内存脚本或 Linux `CAN_ISOTP`。"]
#![doc = "- **What**：定义 [`TransportEndpoint`]、[`ByteTransport`]、[`TransportConnector`] 与统一错误 [`TransportError`]。"]
#![doc = "- **How**：实现 crate 只需依赖本 crate；`test-util` 特性额外暴露脚本化传输，供下游契约测试观察关闭与写入行为；本 crate 自身的测试无需开启该特性。"]

/// `Result` 是传输层契约内部使用的统一返回别名。
///
/// # 使用方式（How）
/// - 与 `core::result::Result` 完全等价，默认不指定错误类型，调用者需在签名中显式声明错误类型。
pub type Result<T, E = TransportError> = core::result::Result<T, E>;

pub mod addr;
pub mod connection;
pub mod error;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;

pub use addr::TransportEndpoint;
pub use connection::{ByteTransport, TransportConnector};
pub use error::{ErrorCategory, TransportError};
