//! `isotp://` 资源地址的识别与拆分。

use spark_transport::TransportEndpoint;

/// 资源地址前缀，大小写敏感。
pub const ISOTP_SCHEME: &str = "isotp://";

/// 拆分后的打开目标。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IsotpTarget {
    /// `isotp://?`：调用方只想查看用法，不建立会话。
    Help,
    /// `isotp://interface/source/destination`。
    Endpoint(TransportEndpoint),
}

/// 判断地址是否由本资源处理。
pub fn accepts(uri: &str) -> bool {
    uri.starts_with(ISOTP_SCHEME)
}

/// 拆分地址；前缀不匹配时返回 `None`。
///
/// # 契约说明（What）
/// - 路径以 `?` 开头即视为帮助请求，其后的内容被忽略；
/// - 否则以第一个 `/` 分出接口名，剩余部分再以第一个 `/` 分出源与目的标识符；
/// - 缺失的段落以空字符串表示，交由连接器在建连时拒绝，而不是在这里报错。
pub fn parse(uri: &str) -> Option<IsotpTarget> {
    let path = uri.strip_prefix(ISOTP_SCHEME)?;
    if path.starts_with('?') {
        return Some(IsotpTarget::Help);
    }
    let (interface, ids) = path.split_once('/').unwrap_or((path, ""));
    let (source, destination) = ids.split_once('/').unwrap_or((ids, ""));
    Some(IsotpTarget::Endpoint(TransportEndpoint::new(
        interface,
        source,
        destination,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_match_is_case_sensitive() {
        assert!(accepts("isotp://can0/100/101"));
        assert!(accepts("isotp://"));
        assert!(!accepts("ISOTP://can0/100/101"));
        assert!(!accepts("tcp://127.0.0.1:80"));
        assert_eq!(parse("malloc://16"), None);
    }

    #[test]
    fn splits_interface_then_ids() {
        assert_eq!(
            parse("isotp://can0/0x7E0/0x7E8"),
            Some(IsotpTarget::Endpoint(TransportEndpoint::new(
                "can0", "0x7E0", "0x7E8"
            )))
        );
    }

    #[test]
    fn extra_segments_stay_in_destination() {
        let Some(IsotpTarget::Endpoint(endpoint)) = parse("isotp://vcan0/1/2/3") else {
            panic!("应解析为端点");
        };
        assert_eq!(endpoint.destination(), "2/3");
    }

    #[test]
    fn missing_segments_become_empty() {
        let Some(IsotpTarget::Endpoint(endpoint)) = parse("isotp://can0") else {
            panic!("应解析为端点");
        };
        assert_eq!(endpoint.interface(), "can0");
        assert_eq!(endpoint.source(), "");
        assert_eq!(endpoint.destination(), "");
    }

    #[test]
    fn question_mark_requests_help() {
        assert_eq!(parse("isotp://?"), Some(IsotpTarget::Help));
        assert_eq!(parse("isotp://?verbose"), Some(IsotpTarget::Help));
    }
}
