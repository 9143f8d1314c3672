//! 环境层
//!
//! - `GymEnv`：强化学习环境的四个标准操作
//! - `RopodEnv`：管理 roscore / 仿真器 / 可视化进程的基础环境
//! - `RopodNavDiscreteEnv`：离散动作空间的导航环境
//! - `registry`：按 ID 创建环境

pub mod registry;
pub mod ropod_env;
pub mod ropod_nav_env;

use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value as JsonValue};

use crate::error::{EnvError, EnvResult};

pub use registry::{make, RegisteredEnv, ROPOD_ENV_ID, ROPOD_NAV_DISCRETE_ENV_ID};
pub use ropod_env::RopodEnv;
pub use ropod_nav_env::{NavAction, RopodNavDiscreteEnv};

/// 强化学习环境接口
#[allow(async_fn_in_trait)]
pub trait GymEnv {
    type Action;
    type Observation;

    /// 执行一步仿真
    async fn step(&mut self, action: Self::Action) -> EnvResult<StepOutcome<Self::Observation>>;

    /// 重置仿真环境
    async fn reset(&mut self) -> EnvResult<Self::Observation>;

    /// 显示当前环境
    async fn render(&mut self, mode: RenderMode) -> EnvResult<()>;

    /// 关闭环境并释放所有外部进程
    async fn close(&mut self) -> EnvResult<()>;
}

/// 单步结果
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome<O> {
    pub observation: O,
    pub reward: f64,
    pub done: bool,
    pub info: Map<String, JsonValue>,
}

impl<O> StepOutcome<O> {
    pub fn new(observation: O, reward: f64, done: bool) -> Self {
        Self {
            observation,
            reward,
            done,
            info: Map::new(),
        }
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.info.insert(key.into(), value.into());
        self
    }
}

/// 渲染模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderMode {
    /// 打开 gzclient 图形界面
    #[default]
    Human,
}

impl FromStr for RenderMode {
    type Err = EnvError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(RenderMode::Human),
            other => Err(EnvError::Other(format!("不支持的渲染模式: {}", other))),
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderMode::Human => write!(f, "human"),
        }
    }
}

/// 离散动作空间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Discrete {
    pub n: usize,
}

impl Discrete {
    pub const fn new(n: usize) -> Self {
        Self { n }
    }

    pub fn contains(&self, action: usize) -> bool {
        action < self.n
    }

    /// 均匀随机采样一个动作，空动作空间返回 None
    pub fn sample(&self) -> Option<usize> {
        (self.n > 0).then(|| fastrand::usize(..self.n))
    }
}
