#![doc = r#"
# spark-transport-isotp

## 设计动机（Why）
- **定位**：该 crate 提供 [`ByteTransport`](spark_transport::ByteTransport) 在 Linux
  SocketCAN `CAN_ISOTP` 上的实现，封装建连、非阻塞读写与关闭等底层细节。
- **架构角色**：作为 IO 资源适配器的叶子依赖，内核负责 ISO 15765-2 的分段、流控与重组，
  本 crate 只搬运已经重组完成的应用层载荷。

## 核心契约（What）
- **输入条件**：端点为 `interface/source/destination`，标识符按十进制或 `0x` 十六进制解析，
  `source` 作为发送 ID，`destination` 作为接收 ID；
- **输出保障**：连接成功后套接字处于非阻塞模式，读不到数据时返回 `Ok(0)`；
  失败统一映射为带稳定错误码的 [`TransportError`](spark_transport::TransportError)；
- **前置约束**：目标接口存在且内核加载了 `can-isotp` 模块。

## 实现策略（How）
- 使用 `socket2` 创建 `PF_CAN/SOCK_DGRAM/CAN_ISOTP` 套接字，`nix` 解析接口索引，
  绑定地址通过原始 `bind` 写入 `sockaddr_can` 的 `tp` 分支；
- 非 Linux 平台上 `connect` 在完成端点校验后返回 `Unsupported`。

## 风险与考量（Trade-offs）
- 未暴露 `CAN_ISOTP_OPTS`/流控参数，使用内核默认值；
- 单个读缓冲小于报文时，内核会截断该报文，调用方应保证读块不小于预期载荷。
"#]

mod can_id;
mod channel;
mod error;
mod sys;

pub use can_id::{CanId, CanIdError};
pub use channel::{IsotpChannel, IsotpConnector};
