use std::{borrow::Cow, io, time::Duration};

use thiserror::Error;

/// 描述一次底层操作对应的稳定错误码与默认文案。
///
/// 传输实现可以定义自己的常量（例如 `spark.transport.isotp.*`），本模块提供通用默认值。
#[derive(Clone, Copy, Debug)]
pub struct OperationKind {
    pub code: &'static str,
    pub message: &'static str,
}

pub const CONNECT: OperationKind = OperationKind {
    code: "spark.transport.connect_failed",
    message: "transport connect",
};
pub const READ: OperationKind = OperationKind {
    code: "spark.transport.read_failed",
    message: "transport read",
};
pub const WRITE: OperationKind = OperationKind {
    code: "spark.transport.write_failed",
    message: "transport write",
};
pub const CLOSE: OperationKind = OperationKind {
    code: "spark.transport.close_failed",
    message: "transport close",
};

/// 端点三元组不合法时使用的稳定错误码。
pub const INVALID_ENDPOINT_CODE: &str = "spark.transport.invalid_endpoint";
/// 当前平台或内核不支持该传输时使用的稳定错误码。
pub const UNSUPPORTED_CODE: &str = "spark.transport.unsupported";

/// 错误分类，驱动调用方的重试或放弃决策。
///
/// - `Retryable`：携带建议的退避时长；
/// - `NonRetryable`：参数或权限类错误，重试无意义；
/// - `Unsupported`：平台/内核缺少能力，需要更换部署环境。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCategory {
    Retryable(Duration),
    NonRetryable,
    Unsupported,
}

/// `TransportError` 是传输契约统一的错误形态。
///
/// # 设计背景（Why）
/// - 连接、读、写在不同实现中产生的故障需要合流为稳定错误码，方便日志检索与上层分类处理；
/// - 保留原始 `io::Error` 作为 `source`，排障时不丢失 errno。
///
/// # 契约说明（What）
/// - `code`：`<域>.<语义>` 形式的稳定字符串；
/// - `message`：面向排障人员的描述；
/// - `category`：见 [`ErrorCategory`]，默认 `NonRetryable`；
/// - `cause`：可选底层 IO 错误。
#[derive(Debug, Error)]
#[error("[{code}] {message}")]
pub struct TransportError {
    code: &'static str,
    message: Cow<'static, str>,
    category: ErrorCategory,
    #[source]
    cause: Option<io::Error>,
}

impl TransportError {
    /// 构造不带底层原因的错误，分类默认为 `NonRetryable`。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            category: ErrorCategory::NonRetryable,
            cause: None,
        }
    }

    /// 覆盖错误分类。
    pub fn with_category(mut self, category: ErrorCategory) -> Self {
        self.category = category;
        self
    }

    /// 附带底层 IO 错误。
    pub fn with_cause(mut self, cause: io::Error) -> Self {
        self.cause = Some(cause);
        self
    }

    /// 将 IO 错误映射为传输错误，并按 `ErrorKind` 推断分类。
    pub fn from_io(kind: OperationKind, error: io::Error) -> Self {
        let category = categorize_io_error(&error);
        Self::new(kind.code, format!("{}: {}", kind.message, error))
            .with_category(category)
            .with_cause(error)
    }

    /// 端点参数不合法。
    pub fn invalid_endpoint(kind: OperationKind, detail: impl Into<Cow<'static, str>>) -> Self {
        let detail = detail.into();
        Self::new(INVALID_ENDPOINT_CODE, format!("{}: {}", kind.message, detail))
    }

    /// 平台或内核不支持该传输。
    pub fn unsupported(kind: OperationKind, detail: impl Into<Cow<'static, str>>) -> Self {
        let detail = detail.into();
        Self::new(UNSUPPORTED_CODE, format!("{}: {}", kind.message, detail))
            .with_category(ErrorCategory::Unsupported)
    }

    /// 获取稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 获取描述。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 获取错误分类。
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// 获取底层 IO 错误。
    pub fn io_cause(&self) -> Option<&io::Error> {
        self.cause.as_ref()
    }
}

impl From<TransportError> for io::Error {
    fn from(error: TransportError) -> Self {
        let kind = match (&error.cause, error.category) {
            (Some(cause), _) => cause.kind(),
            (None, ErrorCategory::Unsupported) => io::ErrorKind::Unsupported,
            (None, _) => io::ErrorKind::Other,
        };
        io::Error::new(kind, error)
    }
}

fn categorize_io_error(error: &io::Error) -> ErrorCategory {
    use io::ErrorKind;
    match error.kind() {
        ErrorKind::WouldBlock | ErrorKind::Interrupted => {
            ErrorCategory::Retryable(Duration::from_millis(5))
        }
        ErrorKind::ConnectionRefused
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::AddrNotAvailable
        | ErrorKind::BrokenPipe => ErrorCategory::Retryable(Duration::from_millis(50)),
        ErrorKind::WriteZero => ErrorCategory::Retryable(Duration::from_millis(10)),
        ErrorKind::Unsupported => ErrorCategory::Unsupported,
        _ => ErrorCategory::NonRetryable,
    }
}
