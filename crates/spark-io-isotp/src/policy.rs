/// 执行策略钩子：打开资源时查询一次“是否禁止网络类资源”。
///
/// # 教案式注释
/// - **Why**：宿主在沙箱模式下不允许脚本打开套接字，适配器必须在触碰任何端点之前拒绝；
/// - **How**：任何 `Fn() -> bool` 都可作为策略，便于宿主把现有的全局开关直接接入；
/// - **What**：返回 `true` 表示受限，`open` 随即以 `PolicyDenied` 失败。
pub trait ExecutionPolicy {
    fn network_restricted(&self) -> bool;
}

/// 静态沙箱开关。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SandboxMode {
    #[default]
    Unrestricted,
    Sandboxed,
}

impl ExecutionPolicy for SandboxMode {
    fn network_restricted(&self) -> bool {
        matches!(self, SandboxMode::Sandboxed)
    }
}

impl<F> ExecutionPolicy for F
where
    F: Fn() -> bool,
{
    fn network_restricted(&self) -> bool {
        self()
    }
}
