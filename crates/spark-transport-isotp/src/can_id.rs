use core::{fmt, str::FromStr};

use thiserror::Error;

/// CAN 仲裁标识符。
///
/// # 契约说明（What）
/// - 文本形式接受十进制（`100`）或 `0x`/`0X` 前缀的十六进制（`0x7e0`）；
/// - 取值上限为 29 位扩展帧 `0x1FFF_FFFF`；超过 `0x7FF` 的值按扩展帧发送；
/// - [`CanId::socket_id`] 返回写入 `sockaddr_can` 的形式（扩展帧带 `CAN_EFF_FLAG`）。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanId(u32);

impl CanId {
    /// 11 位标准帧的最大值。
    pub const MAX_STANDARD: u32 = 0x7FF;
    /// 29 位扩展帧的最大值。
    pub const MAX_EXTENDED: u32 = 0x1FFF_FFFF;
    const EFF_FLAG: u32 = 0x8000_0000;

    /// 校验范围后构造标识符。
    pub fn new(raw: u32) -> Result<Self, CanIdError> {
        if raw > Self::MAX_EXTENDED {
            return Err(CanIdError::OutOfRange(raw));
        }
        Ok(Self(raw))
    }

    /// 原始数值（不含标志位）。
    pub fn raw(self) -> u32 {
        self.0
    }

    /// 是否需要以扩展帧发送。
    pub fn is_extended(self) -> bool {
        self.0 > Self::MAX_STANDARD
    }

    /// 写入套接字地址的形式。
    pub fn socket_id(self) -> u32 {
        if self.is_extended() {
            self.0 | Self::EFF_FLAG
        } else {
            self.0
        }
    }
}

impl FromStr for CanId {
    type Err = CanIdError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(CanIdError::Empty);
        }
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => trimmed.parse::<u32>(),
        };
        let raw = parsed.map_err(|_| CanIdError::Malformed(trimmed.to_owned()))?;
        Self::new(raw)
    }
}

impl fmt::Display for CanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// 标识符解析失败的原因。
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CanIdError {
    #[error("identifier is empty")]
    Empty,
    #[error("`{0}` is not a decimal or 0x-prefixed hexadecimal number")]
    Malformed(String),
    #[error("{0:#x} exceeds the 29-bit extended identifier range")]
    OutOfRange(u32),
}
