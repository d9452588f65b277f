//! 供外部注册流程消费的静态插件描述。

use crate::uri::ISOTP_SCHEME;

/// 插件元数据记录。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PluginDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub uris: &'static str,
    pub license: &'static str,
    pub version: &'static str,
}

pub static ISOTP_PLUGIN: PluginDescriptor = PluginDescriptor {
    name: "isotp",
    description: "Connect using the ISOTP protocol (isotp://interface/srcid/dstid)",
    uris: ISOTP_SCHEME,
    license: "MIT",
    version: env!("CARGO_PKG_VERSION"),
};

/// `isotp://?` 返回的用法说明。
pub const USAGE: &str = "Usage: isotp://interface/source/destination";
