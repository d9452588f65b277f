use spark_buffer::{BufferError, GrowableStreamBuffer};
use spark_transport::{ByteTransport, TransportConnector, TransportEndpoint};
use tracing::{debug, info, warn};

use crate::{
    config::IsotpIoConfig,
    descriptor::IsotpDescriptor,
    error::OpenError,
    permissions::Permissions,
    plugin::USAGE,
    policy::{ExecutionPolicy, SandboxMode},
    uri::{self, IsotpTarget},
};

/// `open` 的非错误结果。
#[derive(Debug)]
pub enum OpenOutcome<T: ByteTransport> {
    Opened(IsotpDescriptor<T>),
    /// 调用方请求了用法说明；未建立任何连接。
    Usage(&'static str),
}

impl<T: ByteTransport> OpenOutcome<T> {
    pub fn into_descriptor(self) -> Option<IsotpDescriptor<T>> {
        match self {
            OpenOutcome::Opened(descriptor) => Some(descriptor),
            OpenOutcome::Usage(_) => None,
        }
    }

    pub fn is_usage(&self) -> bool {
        matches!(self, OpenOutcome::Usage(_))
    }
}

/// ISOTP IO 资源工厂：持有连接器、执行策略与缓冲配置。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 宿主通过 `accepts` 选择资源实现，再用 `open` 获得描述符；工厂把这两步与具体套接字解耦，
///   测试可注入脚本化连接器，生产使用 `IsotpConnector`。
///
/// ## 逻辑 (How)
/// 1. 先查询执行策略，受限时无论地址是否合法都直接拒绝；
/// 2. 校验前缀并拆分地址，`?` 形式返回用法说明；
/// 3. 建立连接，成功后才分配缓冲与读块；分配失败时先关闭连接再返回。
///
/// ## 契约 (What)
/// - 任何错误路径都不会留下打开的连接或已分配的缓冲；
/// - 成功打开的描述符 `size == initial_size`（默认 1）、`offset == 0`，
///   授予权限为“请求 ∪ 读写”。
#[derive(Clone, Debug)]
pub struct IsotpIo<C, P = SandboxMode> {
    connector: C,
    policy: P,
    config: IsotpIoConfig,
}

impl<C, P> IsotpIo<C, P>
where
    C: TransportConnector,
    P: ExecutionPolicy,
{
    pub fn new(connector: C, policy: P) -> Self {
        Self {
            connector,
            policy,
            config: IsotpIoConfig::default(),
        }
    }

    /// 替换缓冲配置；调用方应事先通过 [`IsotpIoConfig::validate`] 校验。
    pub fn with_config(mut self, config: IsotpIoConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &IsotpIoConfig {
        &self.config
    }

    pub fn accepts(&self, uri: &str) -> bool {
        uri::accepts(uri)
    }

    /// 按 `isotp://interface/source/destination` 打开资源。
    pub fn open(
        &self,
        uri: &str,
        requested: Permissions,
    ) -> Result<OpenOutcome<C::Transport>, OpenError> {
        self.check_policy()?;
        let target = uri::parse(uri).ok_or_else(|| OpenError::UnsupportedUri {
            uri: uri.to_owned(),
        })?;
        match target {
            IsotpTarget::Help => {
                info!(usage = USAGE, "isotp usage requested");
                Ok(OpenOutcome::Usage(USAGE))
            }
            IsotpTarget::Endpoint(endpoint) => self
                .connect_descriptor(&endpoint, requested)
                .map(OpenOutcome::Opened),
        }
    }

    /// 跳过地址解析，直接以端点打开资源。
    pub fn open_endpoint(
        &self,
        endpoint: &TransportEndpoint,
        requested: Permissions,
    ) -> Result<IsotpDescriptor<C::Transport>, OpenError> {
        self.check_policy()?;
        self.connect_descriptor(endpoint, requested)
    }

    fn check_policy(&self) -> Result<(), OpenError> {
        if self.policy.network_restricted() {
            warn!("the isotp:// uri is not permitted in sandbox mode");
            return Err(OpenError::PolicyDenied);
        }
        Ok(())
    }

    fn connect_descriptor(
        &self,
        endpoint: &TransportEndpoint,
        requested: Permissions,
    ) -> Result<IsotpDescriptor<C::Transport>, OpenError> {
        let mut transport =
            self.connector
                .connect(endpoint)
                .map_err(|source| OpenError::ConnectFailed {
                    endpoint: endpoint.clone(),
                    source,
                })?;

        let allocated = GrowableStreamBuffer::with_initial_size(self.config.initial_size)
            .and_then(|buffer| Ok((buffer, scratch(self.config.chunk_size)?)));
        let (buffer, scratch) = match allocated {
            Ok(parts) => parts,
            Err(err) => {
                if let Err(close_err) = transport.close() {
                    warn!(endpoint = %endpoint, error = %close_err, "isotp transport close failed");
                }
                return Err(OpenError::AllocationFailed(err));
            }
        };
        let buffer = buffer.with_max_size(self.config.max_buffer_size);
        let permissions = requested | Permissions::READ_WRITE;

        debug!(
            endpoint = %endpoint,
            permissions = %permissions,
            chunk_size = scratch.len(),
            "isotp resource opened"
        );
        Ok(IsotpDescriptor::new(transport, buffer, scratch, permissions))
    }
}

fn scratch(chunk_size: usize) -> Result<Vec<u8>, BufferError> {
    let mut scratch = Vec::new();
    scratch
        .try_reserve_exact(chunk_size)
        .map_err(|source| BufferError::AllocationFailed {
            requested: chunk_size,
            source,
        })?;
    scratch.resize(chunk_size, 0);
    Ok(scratch)
}
