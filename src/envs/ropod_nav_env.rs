//! ROPOD 离散导航环境
//!
//! 每个动作映射为一条底盘速度指令 `[x, y, theta]`

use std::fmt;

use tracing::debug;

use crate::clients::{RostopicPublisher, VelocityCommand, VelocityPublisher};
use crate::config::Config;
use crate::envs::{Discrete, GymEnv, RenderMode, RopodEnv, StepOutcome};
use crate::error::{EnvError, EnvResult};

/// 导航动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavAction {
    Straight,
    Left,
    Right,
    LeftTurn,
    RightTurn,
}

impl NavAction {
    /// 按动作编号排列
    pub const ALL: [NavAction; 5] = [
        NavAction::Straight,
        NavAction::Left,
        NavAction::Right,
        NavAction::LeftTurn,
        NavAction::RightTurn,
    ];

    pub fn from_index(action: usize) -> EnvResult<Self> {
        Self::ALL
            .get(action)
            .copied()
            .ok_or(EnvError::InvalidAction {
                action,
                num_actions: Self::ALL.len(),
            })
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            NavAction::Straight => "straight",
            NavAction::Left => "left",
            NavAction::Right => "right",
            NavAction::LeftTurn => "left_turn",
            NavAction::RightTurn => "right_turn",
        }
    }

    pub fn velocity(self) -> VelocityCommand {
        match self {
            NavAction::Straight => VelocityCommand::new(0.1, 0.0, 0.0),
            NavAction::Left => VelocityCommand::new(0.0, 0.1, 0.0),
            NavAction::Right => VelocityCommand::new(0.0, -0.1, 0.0),
            NavAction::LeftTurn => VelocityCommand::new(0.1, 0.0, 0.1),
            NavAction::RightTurn => VelocityCommand::new(0.1, 0.0, -0.1),
        }
    }
}

impl fmt::Display for NavAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 离散动作空间的导航环境
pub struct RopodNavDiscreteEnv {
    base: RopodEnv,
    vel_pub: Box<dyn VelocityPublisher>,
    action_space: Discrete,
}

impl RopodNavDiscreteEnv {
    /// 启动基础环境，并在配置的话题上启动速度指令发布者
    pub async fn launch(config: Config) -> EnvResult<Self> {
        let base = RopodEnv::launch(config).await?;
        let config = base.config();
        let vel_pub = RostopicPublisher::spawn(
            &config.rostopic_command,
            &config.cmd_vel_topic,
            &config.master_uri(),
        )?;
        Ok(Self::from_parts(base, Box::new(vel_pub)))
    }

    /// 由已启动的基础环境和发布者组装
    pub fn from_parts(base: RopodEnv, vel_pub: Box<dyn VelocityPublisher>) -> Self {
        Self {
            base,
            vel_pub,
            action_space: Discrete::new(NavAction::ALL.len()),
        }
    }

    pub fn action_space(&self) -> Discrete {
        self.action_space
    }

    pub fn base(&self) -> &RopodEnv {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut RopodEnv {
        &mut self.base
    }
}

impl GymEnv for RopodNavDiscreteEnv {
    type Action = usize;
    type Observation = ();

    /// 发布动作对应的速度指令
    async fn step(&mut self, action: usize) -> EnvResult<StepOutcome<()>> {
        let nav_action = NavAction::from_index(action)?;
        debug!("执行动作 {} ({})", action, nav_action);
        self.vel_pub.publish(nav_action.velocity()).await?;
        Ok(StepOutcome::new((), 0.0, false).with_info("action", nav_action.name()))
    }

    async fn reset(&mut self) -> EnvResult<()> {
        self.base.reset_simulation().await
    }

    async fn render(&mut self, mode: RenderMode) -> EnvResult<()> {
        self.base.render(mode).await
    }

    async fn close(&mut self) -> EnvResult<()> {
        if !self.base.is_closed() {
            self.vel_pub.shutdown().await?;
        }
        self.base.close().await
    }
}
