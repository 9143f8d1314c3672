//! ROS 服务客户端
//!
//! `ServiceClient` 是环境与 ROS 服务之间的接缝：
//! - `RosServiceClient` 通过 master + TCPROS 访问真实服务
//! - 测试中可替换为内存实现

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

use crate::clients::master_client::MasterClient;
use crate::clients::tcpros;
use crate::error::{EnvError, EnvResult, ServiceError};

/// 单次探测等待服务端回复连接头的上限
const PING_TIMEOUT: Duration = Duration::from_secs(2);

/// ROS 服务能力
pub trait ServiceClient: Send + Sync {
    /// 阻塞直到服务可用，没有超时
    fn wait_for_service<'a>(&'a self, service: &'a str) -> BoxFuture<'a, EnvResult<()>>;

    /// 调用无参数服务
    fn call_empty<'a>(&'a self, service: &'a str) -> BoxFuture<'a, EnvResult<()>>;
}

/// 基于 ROS master 和 TCPROS 的服务客户端
#[derive(Clone, Debug)]
pub struct RosServiceClient {
    master: MasterClient,
    poll_interval: Duration,
}

impl RosServiceClient {
    /// 创建新的服务客户端
    ///
    /// # 参数
    /// - `master`: master 客户端
    /// - `poll_interval`: 等待服务时的轮询间隔
    pub fn new(master: MasterClient, poll_interval: Duration) -> Self {
        Self {
            master,
            poll_interval,
        }
    }

    /// 查询服务地址并发送探测连接头
    async fn check_ready(&self, service: &str) -> Option<String> {
        let uri = match self.master.lookup_service(service).await {
            Ok(Some(uri)) => uri,
            Ok(None) => return None,
            Err(e) => {
                // roscore 可能还没启动完成
                debug!("查询服务 {} 失败: {}", service, e);
                return None;
            }
        };

        let ping = tcpros::ping_service(&uri, self.master.caller_id(), service);
        match timeout(PING_TIMEOUT, ping).await {
            Ok(Ok(_)) => Some(uri),
            Ok(Err(e)) => {
                debug!("服务 {} 已注册但探测失败 ({}): {}", service, uri, e);
                None
            }
            Err(_) => {
                debug!("服务 {} 探测超时 ({})", service, uri);
                None
            }
        }
    }

    async fn wait_for_service_inner(&self, service: &str) -> EnvResult<()> {
        let mut attempts: u64 = 0;
        loop {
            attempts += 1;
            if let Some(uri) = self.check_ready(service).await {
                debug!("服务 {} 位于 {} (尝试 {} 次)", service, uri, attempts);
                return Ok(());
            }
            if attempts % 100 == 0 {
                info!("⏳ 仍在等待服务 {} (已尝试 {} 次)", service, attempts);
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn call_empty_inner(&self, service: &str) -> EnvResult<()> {
        let uri = self
            .master
            .lookup_service(service)
            .await?
            .ok_or_else(|| {
                EnvError::Service(ServiceError::NotRegistered {
                    service: service.to_string(),
                })
            })?;

        tcpros::call_empty_service(&uri, self.master.caller_id(), service)
            .await
            .map_err(|e| match e {
                tcpros::TcpRosError::CallFailed(message) => {
                    EnvError::Service(ServiceError::Rejected {
                        service: service.to_string(),
                        message,
                    })
                }
                other => EnvError::service_call_failed(service, other),
            })
    }
}

impl ServiceClient for RosServiceClient {
    fn wait_for_service<'a>(&'a self, service: &'a str) -> BoxFuture<'a, EnvResult<()>> {
        Box::pin(self.wait_for_service_inner(service))
    }

    fn call_empty<'a>(&'a self, service: &'a str) -> BoxFuture<'a, EnvResult<()>> {
        Box::pin(self.call_empty_inner(service))
    }
}

/// 绑定到单个服务名的调用句柄
#[derive(Clone)]
pub struct ServiceProxy {
    service: String,
    client: Arc<dyn ServiceClient>,
}

impl ServiceProxy {
    pub fn new(service: impl Into<String>, client: Arc<dyn ServiceClient>) -> Self {
        Self {
            service: service.into(),
            client,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// 调用服务
    pub async fn call(&self) -> EnvResult<()> {
        debug!("调用服务 {}", self.service);
        self.client.call_empty(&self.service).await
    }
}

impl std::fmt::Debug for ServiceProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceProxy")
            .field("service", &self.service)
            .finish()
    }
}
