#![doc = r#"
# spark-io-isotp

## 设计动机（Why）
- **定位**：把 CAN/ISOTP 报文流包装成宿主眼中的普通随机访问资源，地址形如
  `isotp://interface/source/destination`。
- **架构角色**：位于链路顶层，组合 [`spark_transport`] 的连接契约与
  [`spark_buffer::GrowableStreamBuffer`]，对宿主暴露 `accepts/open/read/write/seek/close`。

## 核心契约（What）
- **读取**：每次读取先尽力从连接累积一次新报文，再按游标返回缓冲内容；
  累积失败只记录告警，不影响本次读取；
- **写入**：原样转发到连接，不修改缓冲；
- **打开**：执行策略受限时以 [`OpenError::PolicyDenied`] 拒绝，`isotp://?` 返回
  [`OpenOutcome::Usage`]，失败路径不遗留连接或缓冲。

## 实现策略（How）
- [`IsotpIo`] 以泛型连接器与策略构建，生产环境使用
  `spark_transport_isotp::IsotpConnector`，测试使用 `spark-transport` 的脚本化连接器；
- [`IsotpDescriptor`] 同时实现 `std::io::{Read, Write, Seek}`，便于接入通用工具；
- 可选 [`AccumulateObserver`] 接收每次累积的 `(sequence, bytes_added, total_size)`。

## 风险与考量（Trade-offs）
- 数据只在调用方读取时增长，没有后台轮询；长时间不读会让内核队列积压；
- 默认不设容量上限，需要时在 [`IsotpIoConfig::max_buffer_size`] 中配置；剩余容量不足一个读块时
  不再读取，报文留在内核队列中。
"#]

mod config;
mod descriptor;
mod error;
mod notify;
mod permissions;
mod plugin;
mod policy;
mod resource;
pub mod uri;

pub use config::{ConfigError, IsotpIoConfig, MIN_CHUNK_SIZE};
pub use descriptor::IsotpDescriptor;
pub use error::OpenError;
pub use notify::{AccumulateObserver, ObserverError, TracingObserver};
pub use permissions::Permissions;
pub use plugin::{ISOTP_PLUGIN, PluginDescriptor, USAGE};
pub use policy::{ExecutionPolicy, SandboxMode};
pub use resource::{IsotpIo, OpenOutcome};
pub use spark_buffer::AccumulateEvent;
