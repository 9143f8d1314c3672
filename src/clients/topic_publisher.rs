//! 速度指令发布 - 业务能力层
//!
//! 只负责"把一条速度指令发到话题上"，不关心动作含义

use std::time::Duration;

use futures::future::BoxFuture;
use serde_json::json;
use tracing::{debug, info};

use crate::config::CommandSpec;
use crate::error::EnvResult;
use crate::infrastructure::ManagedProcess;

/// 关闭标准输入后等待 rostopic 自行退出的时间
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// 二维底盘速度指令 `[x, y, theta]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityCommand {
    pub linear_x: f64,
    pub linear_y: f64,
    pub angular_z: f64,
}

impl VelocityCommand {
    pub const fn new(linear_x: f64, linear_y: f64, angular_z: f64) -> Self {
        Self {
            linear_x,
            linear_y,
            angular_z,
        }
    }

    /// 转为 `geometry_msgs/Twist` 的 YAML 文档（JSON 是 YAML 的子集）
    pub fn to_twist_yaml(&self) -> String {
        let twist = json!({
            "linear": { "x": self.linear_x, "y": self.linear_y, "z": 0.0 },
            "angular": { "x": 0.0, "y": 0.0, "z": self.angular_z },
        });
        format!("{}\n---\n", twist)
    }
}

/// 速度指令发布能力
pub trait VelocityPublisher: Send {
    fn publish<'a>(&'a mut self, command: VelocityCommand) -> BoxFuture<'a, EnvResult<()>>;

    /// 释放发布者持有的资源
    fn shutdown<'a>(&'a mut self) -> BoxFuture<'a, EnvResult<()>>;
}

/// 基于 `rostopic pub` 的发布者
///
/// 启动一个常驻的 `rostopic pub <topic> geometry_msgs/Twist`，
/// 每条指令作为一个 YAML 文档写入其标准输入
#[derive(Debug)]
pub struct RostopicPublisher {
    topic: String,
    process: ManagedProcess,
}

impl RostopicPublisher {
    /// 启动发布进程
    ///
    /// # 参数
    /// - `rostopic`: rostopic 可执行程序
    /// - `topic`: 目标话题
    /// - `master_uri`: 写入 `ROS_MASTER_URI`
    pub fn spawn(rostopic: &CommandSpec, topic: &str, master_uri: &str) -> EnvResult<Self> {
        info!("📡 启动速度指令发布者: {}", topic);
        let process = ManagedProcess::spawn_with(
            rostopic,
            &["pub", topic, "geometry_msgs/Twist"],
            &[("ROS_MASTER_URI", master_uri.to_string())],
            true,
        )?;
        Ok(Self {
            topic: topic.to_string(),
            process,
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    async fn publish_inner(&mut self, command: VelocityCommand) -> EnvResult<()> {
        debug!("发布速度指令到 {}: {:?}", self.topic, command);
        self.process
            .write_stdin(command.to_twist_yaml().as_bytes())
            .await
    }

    async fn shutdown_inner(&mut self) -> EnvResult<()> {
        self.process.shutdown_gracefully(SHUTDOWN_GRACE).await?;
        Ok(())
    }
}

impl VelocityPublisher for RostopicPublisher {
    fn publish<'a>(&'a mut self, command: VelocityCommand) -> BoxFuture<'a, EnvResult<()>> {
        Box::pin(self.publish_inner(command))
    }

    fn shutdown<'a>(&'a mut self) -> BoxFuture<'a, EnvResult<()>> {
        Box::pin(self.shutdown_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn twist_yaml_keeps_float_formatting() {
        let yaml = VelocityCommand::new(0.1, 0.0, -0.1).to_twist_yaml();
        assert!(yaml.ends_with("\n---\n"));

        let doc: serde_json::Value = serde_json::from_str(yaml.trim_end_matches("---\n")).unwrap();
        assert_eq!(doc["linear"]["x"], 0.1);
        assert_eq!(doc["linear"]["y"], 0.0);
        assert_eq!(doc["angular"]["z"], -0.1);
        assert!(yaml.contains("\"z\":0.0"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn publishes_documents_to_child_stdin() {
        let dir = std::env::temp_dir().join(format!("ropod_gym_pub_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let out = dir.join("twist.yaml");

        // 把 stdin 原样写入文件，代替 rostopic
        let script = format!("cat > '{}'", out.display());
        let spec = CommandSpec::new("sh").with_args(["-c", script.as_str(), "rostopic"]);
        let mut publisher =
            RostopicPublisher::spawn(&spec, "/ropod/cmd_vel", "http://localhost:11311").unwrap();

        publisher
            .publish(VelocityCommand::new(0.1, 0.0, 0.0))
            .await
            .unwrap();
        publisher.shutdown().await.unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.matches("---").count(), 1);
        assert!(written.contains("\"x\":0.1"));
        std::fs::remove_dir_all(&dir).ok();
    }
}
