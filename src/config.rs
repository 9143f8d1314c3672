//! 环境配置
//!
//! 默认值 → TOML 文件 / 环境变量覆盖

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tokio::process::Command;

use crate::error::{ConfigError, EnvError, EnvResult};

/// 外部可执行程序及其前置参数
///
/// 派生参数（端口、launch 文件等）会追加在前置参数之后
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// 构造 tokio 命令
    ///
    /// # 参数
    /// - `extra_args`: 追加在前置参数之后的派生参数
    pub fn command<S: AsRef<str>>(&self, extra_args: &[S]) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        for arg in extra_args {
            let arg: &str = arg.as_ref();
            command.arg(arg);
        }
        command
    }
}

/// 环境配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 启动 ROPOD 仿真的 launch 文件
    pub launch_file_path: PathBuf,
    /// roscore 端口
    pub roscore_port: u16,
    /// 重置仿真的服务名
    pub reset_sim_srv_name: String,
    /// 本节点的 caller id
    pub node_name: String,
    /// 启动 roscore 后等待端口绑定的时间（毫秒）
    pub roscore_startup_delay_ms: u64,
    /// 等待服务时的轮询间隔（毫秒）
    pub service_poll_interval_ms: u64,
    pub roscore_command: CommandSpec,
    pub roslaunch_command: CommandSpec,
    pub gzclient_command: CommandSpec,
    pub rostopic_command: CommandSpec,
    /// 底盘速度指令话题
    pub cmd_vel_topic: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            launch_file_path: PathBuf::new(),
            roscore_port: 11311,
            reset_sim_srv_name: "/gazebo/reset_world".to_string(),
            node_name: "/gym".to_string(),
            roscore_startup_delay_ms: 1000,
            service_poll_interval_ms: 300,
            roscore_command: CommandSpec::new("roscore"),
            roslaunch_command: CommandSpec::new("roslaunch"),
            gzclient_command: CommandSpec::new("gzclient"),
            rostopic_command: CommandSpec::new("rostopic"),
            cmd_vel_topic: "/ropod/cmd_vel".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 使用指定 launch 文件和默认值创建配置
    pub fn new(launch_file_path: impl Into<PathBuf>) -> Self {
        Self {
            launch_file_path: launch_file_path.into(),
            ..Self::default()
        }
    }

    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> EnvResult<Self> {
        let default = Self::default();
        Ok(Self {
            launch_file_path: std::env::var("ROPOD_LAUNCH_FILE")
                .map(PathBuf::from)
                .unwrap_or(default.launch_file_path),
            roscore_port: parse_env_var("ROPOD_ROSCORE_PORT", "u16")?
                .unwrap_or(default.roscore_port),
            reset_sim_srv_name: std::env::var("ROPOD_RESET_SIM_SRV")
                .unwrap_or(default.reset_sim_srv_name),
            node_name: std::env::var("ROPOD_NODE_NAME").unwrap_or(default.node_name),
            roscore_startup_delay_ms: parse_env_var("ROPOD_ROSCORE_STARTUP_DELAY_MS", "u64")?
                .unwrap_or(default.roscore_startup_delay_ms),
            service_poll_interval_ms: parse_env_var("ROPOD_SERVICE_POLL_INTERVAL_MS", "u64")?
                .unwrap_or(default.service_poll_interval_ms),
            roscore_command: default.roscore_command,
            roslaunch_command: default.roslaunch_command,
            gzclient_command: default.gzclient_command,
            rostopic_command: default.rostopic_command,
            cmd_vel_topic: std::env::var("ROPOD_CMD_VEL_TOPIC").unwrap_or(default.cmd_vel_topic),
            verbose_logging: parse_env_var("VERBOSE_LOGGING", "bool")?
                .unwrap_or(default.verbose_logging),
        })
    }

    /// 从 TOML 文件加载配置
    pub async fn from_toml_file(path: &Path) -> EnvResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            EnvError::Config(ConfigError::FileReadFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            EnvError::Config(ConfigError::TomlParseFailed { source, .. }) => {
                EnvError::Config(ConfigError::TomlParseFailed {
                    path: path.display().to_string(),
                    source,
                })
            }
            other => other,
        })
    }

    /// 从 TOML 字符串解析配置
    pub fn from_toml_str(content: &str) -> EnvResult<Self> {
        toml::from_str(content).map_err(|e| {
            EnvError::Config(ConfigError::TomlParseFailed {
                path: String::new(),
                source: Box::new(e),
            })
        })
    }

    pub fn with_roscore_port(mut self, port: u16) -> Self {
        self.roscore_port = port;
        self
    }

    pub fn with_reset_sim_srv_name(mut self, name: impl Into<String>) -> Self {
        self.reset_sim_srv_name = name.into();
        self
    }

    /// 检查 launch 文件是否存在
    pub fn validate(&self) -> EnvResult<()> {
        if !self.launch_file_path.exists() {
            return Err(EnvError::launch_file_not_found(
                self.launch_file_path.display().to_string(),
            ));
        }
        Ok(())
    }

    /// ROS master 的 XML-RPC 地址
    pub fn master_uri(&self) -> String {
        format!("http://localhost:{}", self.roscore_port)
    }

    pub fn roscore_startup_delay(&self) -> Duration {
        Duration::from_millis(self.roscore_startup_delay_ms)
    }

    pub fn service_poll_interval(&self) -> Duration {
        Duration::from_millis(self.service_poll_interval_ms)
    }
}

fn parse_env_var<T: std::str::FromStr>(
    var_name: &str,
    expected_type: &str,
) -> EnvResult<Option<T>> {
    match std::env::var(var_name) {
        Ok(value) => value.parse().map(Some).map_err(|_| {
            EnvError::Config(ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            })
        }),
        Err(_) => Ok(None),
    }
}
