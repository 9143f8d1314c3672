use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use ropod_gym::envs::{NavAction, ROPOD_NAV_DISCRETE_ENV_ID};
use ropod_gym::{logging, Config, GymEnv, RenderMode, RopodNavDiscreteEnv};
use tokio::process::Command;
use tokio::time::sleep;
use tracing::{info, warn};

/// 仿真步数
const NUMBER_OF_STEPS: usize = 500;

/// 仿真模型所在的 ROS 包及 launch 文件
const SIM_MODEL_PKG: &str = "ropod_sim_model";
const SIM_LAUNCH_FILE: &str = "launch/simulator/gazebo_simulator.launch";

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let mut config = Config::from_env()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    if config.launch_file_path.as_os_str().is_empty() {
        config.launch_file_path = default_launch_file().await?;
    }

    let mut env = ropod_gym::make(ROPOD_NAV_DISCRETE_ENV_ID, config)
        .await?
        .into_nav_discrete()
        .context("环境类型不匹配")?;

    tokio::select! {
        result = run_demo(&mut env) => result?,
        _ = tokio::signal::ctrl_c() => info!("收到中断信号"),
    }

    info!("正在关闭仿真器");
    env.close().await?;
    Ok(())
}

/// 通过 rospack 查找默认的仿真 launch 文件
async fn default_launch_file() -> Result<PathBuf> {
    let output = Command::new("rospack")
        .args(["find", SIM_MODEL_PKG])
        .output()
        .await
        .context("无法执行 rospack")?;
    if !output.status.success() {
        anyhow::bail!("rospack 找不到 ROS 包: {}", SIM_MODEL_PKG);
    }
    let pkg_path = String::from_utf8(output.stdout).context("rospack 输出不是 UTF-8")?;
    Ok(PathBuf::from(pkg_path.trim()).join(SIM_LAUNCH_FILE))
}

/// 随机动作跑完固定步数，然后等待 Ctrl-C
async fn run_demo(env: &mut RopodNavDiscreteEnv) -> Result<()> {
    env.render(RenderMode::Human).await?;
    sleep(Duration::from_secs(5)).await;
    env.reset().await?;

    info!("▶️ 运行仿真 {} 步", NUMBER_OF_STEPS);
    let action_space = env.action_space();
    let mut episode_step_count = 0;
    for _ in 0..NUMBER_OF_STEPS {
        let action = action_space.sample().context("动作空间为空")?;
        let outcome = env.step(action).await?;
        info!(
            "\"{}\" -> reward {}",
            NavAction::from_index(action)?,
            outcome.reward
        );

        episode_step_count += 1;
        if outcome.done {
            warn!("回合在 {} 步后结束", episode_step_count);
            warn!("正在重置环境");
            env.reset().await?;
            episode_step_count = 0;
        } else {
            sleep(Duration::from_millis(50)).await;
        }
    }

    env.reset().await?;
    info!("✓ 仿真完成，按 Ctrl-C 关闭");
    std::future::pending::<()>().await;
    Ok(())
}
