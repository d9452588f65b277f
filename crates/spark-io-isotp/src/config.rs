use serde::Deserialize;
use spark_buffer::DEFAULT_CHUNK_SIZE;
use thiserror::Error;

/// 经典 ISOTP 单条报文的最大长度（12 位 `FF_DL`）。
///
/// 读块小于该值时，较长的报文会在内核中被截断，因此配置校验以它为下限。
pub const MIN_CHUNK_SIZE: usize = 4095;

/// IO 资源的可调参数。
///
/// # 教案式注释
/// - **Why**：默认值复刻经典行为（单次读取 4096 字节、1 字节基线、无上限），
///   长时间抓包的场景可以通过配置文件加上容量上限；读块是报文的接收缓冲，
///   过小会截断报文，因此下限为 [`MIN_CHUNK_SIZE`]；
/// - **How**：TOML 表中的字段全部可选，未知字段直接拒绝，避免拼写错误被静默忽略；
/// - **What**：[`from_toml_str`](Self::from_toml_str) 解析后立即 [`validate`](Self::validate)。
///
/// ```toml
/// chunk_size = 4096
/// initial_size = 1
/// max_buffer_size = 1048576
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct IsotpIoConfig {
    /// 单次累积向传输请求的最大字节数，不得小于 [`MIN_CHUNK_SIZE`]。
    pub chunk_size: usize,
    /// 打开时缓冲的零字节基线长度。
    pub initial_size: usize,
    /// 缓冲容量上限，`None` 表示不设上限。
    pub max_buffer_size: Option<usize>,
}

impl Default for IsotpIoConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            initial_size: 1,
            max_buffer_size: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid isotp io config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("chunk_size {chunk_size} is below the {min} byte isotp message limit")]
    ChunkTooSmall { chunk_size: usize, min: usize },
    #[error("initial_size must be at least one byte")]
    ZeroInitialSize,
    #[error("max_buffer_size ({max}) must not be smaller than initial_size ({initial})")]
    MaxBelowInitial { max: usize, initial: usize },
}

impl IsotpIoConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::ChunkTooSmall {
                chunk_size: self.chunk_size,
                min: MIN_CHUNK_SIZE,
            });
        }
        if self.initial_size == 0 {
            return Err(ConfigError::ZeroInitialSize);
        }
        if let Some(max) = self.max_buffer_size
            && max < self.initial_size
        {
            return Err(ConfigError::MaxBelowInitial {
                max,
                initial: self.initial_size,
            });
        }
        Ok(())
    }
}
