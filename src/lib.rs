//! # ROPOD Gym
//!
//! 用于控制仿真 ROPOD 移动机器人的强化学习环境
//!
//! ## 架构设计
//!
//! 本库采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（子进程），只暴露能力
//! - `ManagedProcess` - 唯一的 Child owner，提供启动 / 终止 / 等待能力
//!
//! ### ② 客户端层（Clients）
//! - `clients/` - 描述"我能和 ROS 做什么"
//! - `MasterClient` - 通过 XML-RPC 查询 master
//! - `ServiceClient` - 等待服务、调用 Empty 服务
//! - `VelocityPublisher` - 发布底盘速度指令
//!
//! ### ③ 模型层（Models）
//! - `models/` - SDF 模型描述、环境边界
//!
//! ### ④ 环境层（Envs）
//! - `envs/ropod_env` - 基础环境，按顺序启动并关闭所有外部进程
//! - `envs/ropod_nav_env` - 离散动作导航环境
//! - `envs/registry` - 按 ID 创建环境
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod envs;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod utils;

// 重新导出常用类型
pub use config::{CommandSpec, Config};
pub use envs::{make, GymEnv, RegisteredEnv, RenderMode, RopodEnv, RopodNavDiscreteEnv, StepOutcome};
pub use error::{EnvError, EnvResult};
pub use utils::logging;
