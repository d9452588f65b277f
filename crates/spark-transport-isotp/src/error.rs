use std::io;

use spark_transport::{TransportError, error::OperationKind};

use crate::CanIdError;

pub(crate) const CONNECT: OperationKind = OperationKind {
    code: "spark.transport.isotp.connect_failed",
    message: "isotp connect",
};
pub(crate) const RESOLVE_INTERFACE: OperationKind = OperationKind {
    code: "spark.transport.isotp.interface_lookup_failed",
    message: "isotp interface lookup",
};
pub(crate) const READ: OperationKind = OperationKind {
    code: "spark.transport.isotp.read_failed",
    message: "isotp read",
};
pub(crate) const WRITE: OperationKind = OperationKind {
    code: "spark.transport.isotp.write_failed",
    message: "isotp write",
};

/// 将标识符解析错误映射为端点错误，保留字段名以便排障。
pub(crate) fn invalid_id(field: &'static str, error: CanIdError) -> TransportError {
    TransportError::invalid_endpoint(CONNECT, format!("{field} id: {error}"))
}

/// 映射套接字层错误；平台不支持 `CAN_ISOTP` 时归为 `Unsupported` 而不是接口或连接故障。
pub(crate) fn from_sys(kind: OperationKind, err: io::Error) -> TransportError {
    if err.kind() == io::ErrorKind::Unsupported {
        let detail = err.to_string();
        return TransportError::unsupported(kind, detail).with_cause(err);
    }
    TransportError::from_io(kind, err)
}
