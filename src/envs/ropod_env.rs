//! ROPOD 基础环境
//!
//! ## 职责
//!
//! 管理仿真所依赖的外部进程，是环境层唯一持有进程句柄的地方。
//!
//! ## 启动顺序
//!
//! 1. 检查 launch 文件（失败时不启动任何进程）
//! 2. 启动 roscore，等待其绑定端口
//! 3. 无界面启动仿真器（`gui:=false`）
//! 4. 阻塞等待重置服务可用（无超时）
//!
//! ## 关闭顺序
//!
//! 可视化客户端 → 仿真器 + roscore（先全部发终止信号，再逐个等待退出）

use std::sync::Arc;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::clients::{MasterClient, RosServiceClient, ServiceClient, ServiceProxy};
use crate::config::Config;
use crate::envs::{GymEnv, RenderMode, StepOutcome};
use crate::error::{EnvError, EnvResult};
use crate::infrastructure::ManagedProcess;
use crate::utils::logging;

/// ROPOD 基础环境
///
/// `step` / `reset` 由具体环境实现，本类型上调用会返回未实现错误
#[derive(Debug)]
pub struct RopodEnv {
    config: Config,
    roscore_process: ManagedProcess,
    sim_process: ManagedProcess,
    sim_vis_process: Option<ManagedProcess>,
    reset_sim_proxy: ServiceProxy,
    closed: bool,
}

impl RopodEnv {
    /// 启动环境，通过 ROS master 等待重置服务
    pub async fn launch(config: Config) -> EnvResult<Self> {
        let master = MasterClient::new(config.master_uri(), config.node_name.clone());
        let client = RosServiceClient::new(master, config.service_poll_interval());
        Self::launch_with_client(config, Arc::new(client)).await
    }

    /// 使用指定的服务客户端启动环境
    ///
    /// # 参数
    /// - `config`: 环境配置
    /// - `service_client`: 用于等待和调用重置服务
    pub async fn launch_with_client(
        config: Config,
        service_client: Arc<dyn ServiceClient>,
    ) -> EnvResult<Self> {
        config.validate()?;

        logging::log_startup(
            &config.launch_file_path.display().to_string(),
            config.roscore_port,
        );
        let port = config.roscore_port.to_string();

        info!("[RopodEnv] 🚀 正在启动 roscore...");
        let mut roscore_process =
            ManagedProcess::spawn(&config.roscore_command, &["-p", port.as_str()])?;
        sleep(config.roscore_startup_delay()).await;
        info!("[RopodEnv] ✓ roscore 已启动 (pid: {:?})", roscore_process.pid());

        info!("[RopodEnv] 🚀 正在启动仿真器...");
        let launch_file = config.launch_file_path.display().to_string();
        let mut sim_process = match ManagedProcess::spawn(
            &config.roslaunch_command,
            &["-p", port.as_str(), launch_file.as_str(), "gui:=false"],
        ) {
            Ok(process) => process,
            Err(e) => {
                abort_startup(&mut [&mut roscore_process]).await;
                return Err(e);
            }
        };
        info!("[RopodEnv] ✓ 仿真器已启动 (pid: {:?})", sim_process.pid());

        info!("[RopodEnv] ⏳ 正在等待服务 {}", config.reset_sim_srv_name);
        if let Err(e) = service_client
            .wait_for_service(&config.reset_sim_srv_name)
            .await
        {
            abort_startup(&mut [&mut sim_process, &mut roscore_process]).await;
            return Err(e);
        }
        let reset_sim_proxy = ServiceProxy::new(config.reset_sim_srv_name.clone(), service_client);
        info!("[RopodEnv] ✓ 服务 {} 已可用", config.reset_sim_srv_name);

        Ok(Self {
            config,
            roscore_process,
            sim_process,
            sim_vis_process: None,
            reset_sim_proxy,
            closed: false,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 调用仿真器的重置服务
    pub async fn reset_simulation(&self) -> EnvResult<()> {
        self.reset_sim_proxy.call().await
    }

    /// 打开可视化客户端
    ///
    /// 首次调用或上一个客户端已退出时才会启动新进程；环境关闭后返回错误
    pub async fn render(&mut self, mode: RenderMode) -> EnvResult<()> {
        if self.closed {
            return Err(EnvError::Closed { operation: "render" });
        }
        let running = self
            .sim_vis_process
            .as_mut()
            .is_some_and(ManagedProcess::is_running);
        if running {
            debug!("[RopodEnv] 可视化客户端已在运行 (mode: {})", mode);
            return Ok(());
        }

        info!("[RopodEnv] 🖥️ 正在启动可视化客户端 (mode: {})", mode);
        let process = ManagedProcess::spawn::<&str>(&self.config.gzclient_command, &[])?;
        info!("[RopodEnv] ✓ 可视化客户端已启动 (pid: {:?})", process.pid());
        self.sim_vis_process = Some(process);
        Ok(())
    }

    /// 关闭可视化客户端、仿真器和 roscore
    ///
    /// 未调用过 render 也可安全调用；重复调用不做任何事
    pub async fn close(&mut self) -> EnvResult<()> {
        if self.closed {
            debug!("[RopodEnv] 环境已关闭");
            return Ok(());
        }

        self.close_sim_client().await?;

        info!("[RopodEnv] 🛑 正在关闭仿真器和 roscore...");
        self.sim_process.terminate()?;
        self.roscore_process.terminate()?;
        self.sim_process.wait().await?;
        self.roscore_process.wait().await?;
        self.closed = true;

        logging::log_shutdown();
        Ok(())
    }

    /// 停止可视化客户端（如在运行）
    async fn close_sim_client(&mut self) -> EnvResult<()> {
        if let Some(process) = self.sim_vis_process.as_mut() {
            if process.is_running() {
                info!("[RopodEnv] 正在关闭可视化客户端...");
                process.shutdown().await?;
            }
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn roscore_pid(&self) -> Option<u32> {
        self.roscore_process.pid()
    }

    pub fn simulator_pid(&self) -> Option<u32> {
        self.sim_process.pid()
    }

    /// 可视化客户端的进程 ID，从未 render 过或已回收时为 None
    pub fn visualizer_pid(&self) -> Option<u32> {
        self.sim_vis_process.as_ref().and_then(ManagedProcess::pid)
    }

    pub fn is_roscore_running(&mut self) -> bool {
        self.roscore_process.is_running()
    }

    pub fn is_simulator_running(&mut self) -> bool {
        self.sim_process.is_running()
    }

    pub fn is_visualizer_running(&mut self) -> bool {
        self.sim_vis_process
            .as_mut()
            .is_some_and(ManagedProcess::is_running)
    }
}

/// 启动中途失败时终止已启动的进程
///
/// 先全部发 SIGTERM 再逐个等待，让 roscore 有机会回收 rosmaster / rosout
async fn abort_startup(processes: &mut [&mut ManagedProcess]) {
    warn!("[RopodEnv] ⚠️ 启动失败，正在终止已启动的进程...");
    for process in processes.iter_mut() {
        if let Err(e) = process.terminate() {
            warn!("终止 {} 失败: {}", process.name(), e);
        }
    }
    for process in processes.iter_mut() {
        if let Err(e) = process.wait().await {
            warn!("等待 {} 退出失败: {}", process.name(), e);
        }
    }
}

impl GymEnv for RopodEnv {
    type Action = usize;
    type Observation = ();

    async fn step(&mut self, _action: usize) -> EnvResult<StepOutcome<()>> {
        Err(EnvError::NotImplemented { operation: "step" })
    }

    async fn reset(&mut self) -> EnvResult<()> {
        Err(EnvError::NotImplemented { operation: "reset" })
    }

    async fn render(&mut self, mode: RenderMode) -> EnvResult<()> {
        RopodEnv::render(self, mode).await
    }

    async fn close(&mut self) -> EnvResult<()> {
        RopodEnv::close(self).await
    }
}
