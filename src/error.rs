use std::fmt;

/// 环境错误类型
#[derive(Debug)]
pub enum EnvError {
    /// 配置错误
    Config(ConfigError),
    /// 子进程相关错误
    Process(ProcessError),
    /// ROS 服务调用错误
    Service(ServiceError),
    /// 仿真模型描述错误
    Model(ModelError),
    /// 基类未实现的操作（需要由具体环境实现）
    NotImplemented { operation: &'static str },
    /// 动作不在动作空间内
    InvalidAction { action: usize, num_actions: usize },
    /// 环境已关闭后仍被使用
    Closed { operation: &'static str },
    /// 其他错误
    Other(String),
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvError::Config(e) => write!(f, "配置错误: {}", e),
            EnvError::Process(e) => write!(f, "进程错误: {}", e),
            EnvError::Service(e) => write!(f, "服务错误: {}", e),
            EnvError::Model(e) => write!(f, "模型错误: {}", e),
            EnvError::NotImplemented { operation } => {
                write!(f, "{} 未实现，需要由具体环境提供", operation)
            }
            EnvError::InvalidAction {
                action,
                num_actions,
            } => write!(f, "动作 {} 超出动作空间 [0, {})", action, num_actions),
            EnvError::Closed { operation } => write!(f, "环境已关闭，无法执行 {}", operation),
            EnvError::Other(msg) => write!(f, "错误: {}", msg),
        }
    }
}

impl std::error::Error for EnvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EnvError::Config(e) => Some(e),
            EnvError::Process(e) => Some(e),
            EnvError::Service(e) => Some(e),
            EnvError::Model(e) => Some(e),
            EnvError::NotImplemented { .. }
            | EnvError::InvalidAction { .. }
            | EnvError::Closed { .. }
            | EnvError::Other(_) => None,
        }
    }
}

/// 配置错误
#[derive(Debug)]
pub enum ConfigError {
    /// launch 文件不存在
    LaunchFileNotFound { path: String },
    /// 环境变量解析失败
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 读取配置文件失败
    FileReadFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    TomlParseFailed {
        path: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 未注册的环境 ID
    UnknownEnvId { id: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::LaunchFileNotFound { path } => {
                write!(f, "{} 不是有效的 launch 文件路径", path)
            }
            ConfigError::EnvVarParseFailed {
                var_name,
                value,
                expected_type,
            } => {
                write!(
                    f,
                    "环境变量 {} 解析失败: 值 '{}' 无法转换为 {}",
                    var_name, value, expected_type
                )
            }
            ConfigError::FileReadFailed { path, source } => {
                write!(f, "读取配置文件失败 ({}): {}", path, source)
            }
            ConfigError::TomlParseFailed { path, source } => {
                write!(f, "TOML解析失败 ({}): {}", path, source)
            }
            ConfigError::UnknownEnvId { id } => write!(f, "未注册的环境: {}", id),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::FileReadFailed { source, .. }
            | ConfigError::TomlParseFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 子进程相关错误
#[derive(Debug)]
pub enum ProcessError {
    /// 启动进程失败
    SpawnFailed {
        program: String,
        source: std::io::Error,
    },
    /// 发送终止信号失败
    TerminateFailed {
        program: String,
        source: std::io::Error,
    },
    /// 等待进程退出失败
    WaitFailed {
        program: String,
        source: std::io::Error,
    },
    /// 写入进程标准输入失败
    StdinWriteFailed {
        program: String,
        source: std::io::Error,
    },
}

impl fmt::Display for ProcessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessError::SpawnFailed { program, source } => {
                write!(f, "启动 {} 失败: {}", program, source)
            }
            ProcessError::TerminateFailed { program, source } => {
                write!(f, "终止 {} 失败: {}", program, source)
            }
            ProcessError::WaitFailed { program, source } => {
                write!(f, "等待 {} 退出失败: {}", program, source)
            }
            ProcessError::StdinWriteFailed { program, source } => {
                write!(f, "写入 {} 标准输入失败: {}", program, source)
            }
        }
    }
}

impl std::error::Error for ProcessError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessError::SpawnFailed { source, .. }
            | ProcessError::TerminateFailed { source, .. }
            | ProcessError::WaitFailed { source, .. }
            | ProcessError::StdinWriteFailed { source, .. } => Some(source),
        }
    }
}

/// ROS 服务调用错误
#[derive(Debug)]
pub enum ServiceError {
    /// 调用 ROS master 失败
    MasterCallFailed {
        method: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务调用失败
    CallFailed {
        service: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// 服务未注册
    NotRegistered { service: String },
    /// 服务端返回失败
    Rejected { service: String, message: String },
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::MasterCallFailed { method, source } => {
                write!(f, "调用 ROS master 方法 {} 失败: {}", method, source)
            }
            ServiceError::CallFailed { service, source } => {
                write!(f, "调用服务 {} 失败: {}", service, source)
            }
            ServiceError::NotRegistered { service } => write!(f, "服务 {} 未注册", service),
            ServiceError::Rejected { service, message } => {
                write!(f, "服务 {} 返回失败: {}", service, message)
            }
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::MasterCallFailed { source, .. }
            | ServiceError::CallFailed { source, .. } => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}

/// 仿真模型描述错误
#[derive(Debug)]
pub enum ModelError {
    /// SDF 文件不存在
    NotFound { path: String },
    /// 读取 SDF 文件失败
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// SDF 中缺少元素
    ElementNotFound { path: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NotFound { path } => write!(f, "{} 不是有效路径", path),
            ModelError::ReadFailed { path, source } => {
                write!(f, "读取 SDF 文件失败 ({}): {}", path, source)
            }
            ModelError::ElementNotFound { path } => write!(f, "SDF 中缺少元素: {}", path),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::ReadFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ========== 从常见错误类型转换 ==========

impl From<ConfigError> for EnvError {
    fn from(err: ConfigError) -> Self {
        EnvError::Config(err)
    }
}

impl From<ProcessError> for EnvError {
    fn from(err: ProcessError) -> Self {
        EnvError::Process(err)
    }
}

impl From<ServiceError> for EnvError {
    fn from(err: ServiceError) -> Self {
        EnvError::Service(err)
    }
}

impl From<ModelError> for EnvError {
    fn from(err: ModelError) -> Self {
        EnvError::Model(err)
    }
}

// ========== 便捷构造函数 ==========

impl EnvError {
    /// 创建 launch 文件不存在错误
    pub fn launch_file_not_found(path: impl Into<String>) -> Self {
        EnvError::Config(ConfigError::LaunchFileNotFound { path: path.into() })
    }

    /// 创建进程启动失败错误
    pub fn spawn_failed(program: impl Into<String>, source: std::io::Error) -> Self {
        EnvError::Process(ProcessError::SpawnFailed {
            program: program.into(),
            source,
        })
    }

    /// 创建 ROS master 调用失败错误
    pub fn master_call_failed(
        method: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        EnvError::Service(ServiceError::MasterCallFailed {
            method: method.into(),
            source: Box::new(source),
        })
    }

    /// 创建服务调用失败错误
    pub fn service_call_failed(
        service: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        EnvError::Service(ServiceError::CallFailed {
            service: service.into(),
            source: Box::new(source),
        })
    }

    /// 创建 SDF 元素缺失错误
    pub fn element_not_found(path: impl Into<String>) -> Self {
        EnvError::Model(ModelError::ElementNotFound { path: path.into() })
    }

    /// 是否为配置错误
    pub fn is_config(&self) -> bool {
        matches!(self, EnvError::Config(_))
    }

    /// 是否为未实现错误
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, EnvError::NotImplemented { .. })
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, EnvError::Closed { .. })
    }
}

// ========== Result 类型别名 ==========

/// 环境操作结果类型
pub type EnvResult<T> = Result<T, EnvError>;
