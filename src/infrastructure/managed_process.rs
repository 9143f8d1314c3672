//! 受管子进程 - 基础设施层
//!
//! 持有唯一的 Child 资源，只暴露"启动 / 查询 / 终止"的能力

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin};
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::CommandSpec;
use crate::error::{EnvError, EnvResult, ProcessError};

/// 受管子进程
///
/// 职责：
/// - 持有唯一的 Child 句柄
/// - 终止时先发 SIGTERM，再等待退出
/// - 被 drop 时强制杀死仍在运行的进程
#[derive(Debug)]
pub struct ManagedProcess {
    name: String,
    child: Child,
    stdin: Option<ChildStdin>,
    exit_status: Option<ExitStatus>,
}

impl ManagedProcess {
    /// 启动子进程
    ///
    /// # 参数
    /// - `spec`: 可执行程序及前置参数
    /// - `extra_args`: 追加的派生参数
    pub fn spawn<S: AsRef<str>>(spec: &CommandSpec, extra_args: &[S]) -> EnvResult<Self> {
        Self::spawn_with(spec, extra_args, &[], false)
    }

    /// 启动子进程，可附加环境变量并打开标准输入管道
    ///
    /// # 参数
    /// - `spec`: 可执行程序及前置参数
    /// - `extra_args`: 追加的派生参数
    /// - `envs`: 附加的环境变量
    /// - `piped_stdin`: 是否打开标准输入管道
    pub fn spawn_with<S: AsRef<str>>(
        spec: &CommandSpec,
        extra_args: &[S],
        envs: &[(&str, String)],
        piped_stdin: bool,
    ) -> EnvResult<Self> {
        let mut command = spec.command(extra_args);
        command.kill_on_drop(true);
        for (key, value) in envs {
            command.env(key, value);
        }
        if piped_stdin {
            command.stdin(Stdio::piped());
        }

        let mut child = command
            .spawn()
            .map_err(|e| EnvError::spawn_failed(&spec.program, e))?;
        debug!("已启动 {} (pid: {:?})", spec.program, child.id());

        let stdin = child.stdin.take();
        Ok(Self {
            name: spec.program.clone(),
            child,
            stdin,
            exit_status: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 进程 ID，进程已被回收后返回 None
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// 进程是否仍在运行
    pub fn is_running(&mut self) -> bool {
        self.poll().is_none()
    }

    /// 非阻塞地查询退出状态
    pub fn poll(&mut self) -> Option<ExitStatus> {
        if self.exit_status.is_none() {
            match self.child.try_wait() {
                Ok(status) => self.exit_status = status,
                Err(e) => warn!("查询 {} 状态失败: {}", self.name, e),
            }
        }
        self.exit_status
    }

    /// 向标准输入写入数据
    pub async fn write_stdin(&mut self, data: &[u8]) -> EnvResult<()> {
        let program = self.name.clone();
        let stdin = self.stdin.as_mut().ok_or_else(|| {
            EnvError::Process(ProcessError::StdinWriteFailed {
                program: program.clone(),
                source: std::io::Error::new(std::io::ErrorKind::BrokenPipe, "标准输入未打开"),
            })
        })?;
        stdin.write_all(data).await.map_err(|e| {
            EnvError::Process(ProcessError::StdinWriteFailed {
                program: program.clone(),
                source: e,
            })
        })?;
        stdin
            .flush()
            .await
            .map_err(|e| EnvError::Process(ProcessError::StdinWriteFailed { program, source: e }))
    }

    /// 请求进程终止（不等待）
    ///
    /// 已退出的进程直接返回
    pub fn terminate(&mut self) -> EnvResult<()> {
        // 关闭标准输入，读取 stdin 的进程据此退出
        self.stdin = None;
        if !self.is_running() {
            return Ok(());
        }
        debug!("正在终止 {} (pid: {:?})", self.name, self.pid());
        send_terminate(&mut self.child).map_err(|e| {
            EnvError::Process(ProcessError::TerminateFailed {
                program: self.name.clone(),
                source: e,
            })
        })
    }

    /// 阻塞等待进程退出
    pub async fn wait(&mut self) -> EnvResult<ExitStatus> {
        if let Some(status) = self.exit_status {
            return Ok(status);
        }
        let status = self.child.wait().await.map_err(|e| {
            EnvError::Process(ProcessError::WaitFailed {
                program: self.name.clone(),
                source: e,
            })
        })?;
        debug!("{} 已退出: {}", self.name, status);
        self.exit_status = Some(status);
        Ok(status)
    }

    /// 终止并等待退出
    pub async fn shutdown(&mut self) -> EnvResult<ExitStatus> {
        self.terminate()?;
        self.wait().await
    }

    /// 关闭标准输入，给进程 `grace` 时间自行退出，超时后再终止
    pub async fn shutdown_gracefully(&mut self, grace: Duration) -> EnvResult<ExitStatus> {
        self.stdin = None;
        if let Ok(status) = timeout(grace, self.wait()).await {
            return status;
        }
        debug!("{} 未在 {:?} 内退出", self.name, grace);
        self.shutdown().await
    }
}

#[cfg(unix)]
fn send_terminate(child: &mut Child) -> std::io::Result<()> {
    let Some(pid) = child.id() else {
        return Ok(());
    };
    // SIGTERM 让 roscore / roslaunch 有机会清理自己的子进程
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == 0 {
        Ok(())
    } else {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() == Some(libc::ESRCH) {
            Ok(())
        } else {
            Err(err)
        }
    }
}

#[cfg(not(unix))]
fn send_terminate(child: &mut Child) -> std::io::Result<()> {
    child.start_kill()
}
