use core::fmt;

use crate::error::{self, TransportError};

/// `TransportEndpoint` 描述一次 ISOTP 会话的寻址三元组。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - URI 层只负责切分 `interface/source/destination`，不理解 CAN 标识符的进制或位宽；
///   将三段原样交给传输实现，避免上层重复解析。
/// - 统一的 `Display` 形式便于日志、错误消息携带完整端点。
///
/// ## 合同（What）
/// - `interface`：网络接口名（如 `can0`），必须非空；
/// - `source`/`destination`：不透明的标识字符串，由具体传输实现解释；
/// - **后置条件**：结构体不可变，格式化输出稳定为 `interface/source/destination`。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransportEndpoint {
    interface: String,
    source: String,
    destination: String,
}

impl TransportEndpoint {
    /// 按三段原始字符串构造端点，不做任何校验。
    pub fn new(
        interface: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            interface: interface.into(),
            source: source.into(),
            destination: destination.into(),
        }
    }

    /// 网络接口名。
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 源标识（发送方向）。
    pub fn source(&self) -> &str {
        &self.source
    }

    /// 目的标识（接收方向）。
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// 校验所有传输实现共享的最小约束：接口名非空。
    ///
    /// 标识符格式由实现自行检查，这里不做假设。
    pub fn validate(&self) -> crate::Result<()> {
        if self.interface.is_empty() {
            return Err(TransportError::invalid_endpoint(
                error::CONNECT,
                format!("{self}: interface name is empty"),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for TransportEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.interface, self.source, self.destination)
    }
}
