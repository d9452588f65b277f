//! `spark-buffer` 提供把报文流映射为可随机访问地址空间的累积缓冲。
//!
//! # 模块定位（Why）
//! - ISOTP 之类的报文协议只能顺序读取，而反汇编器、十六进制查看器按偏移随机读取；
//!   [`GrowableStreamBuffer`] 在每次读取前把新到达的报文追加到尾部，
//!   让调用方看到一条持续变长的“磁带”。
//! - 缓冲只依赖 `spark-transport` 的 [`ByteTransport`](spark_transport::ByteTransport) 契约，
//!   与具体套接字解耦。
//!
//! # 设计概要（How）
//! - 存储为 `Vec<u8>`，扩容使用 `try_reserve_exact`，分配失败以错误返回而非中止进程；
//! - 追加按下标写入尾部，与读游标完全解耦，累积不会移动游标；
//! - 读取结果以 `bytes::Bytes` 交付，便于宿主廉价地转手。
//!
//! # 命名约定（Consistency）
//! - `size` 指逻辑长度（始终等于存储长度），`offset` 指调用方游标，两者互不推导。

mod growable;

pub use growable::{
    AccumulateError, AccumulateEvent, BufferError, DEFAULT_CHUNK_SIZE, GrowableStreamBuffer,
};
