/// ROS master API 客户端
///
/// 通过 XML-RPC (HTTP) 与 roscore 交互
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::clients::xmlrpc::{self, MasterResponse};
use crate::error::{EnvError, EnvResult};

/// ROS master 客户端
#[derive(Clone, Debug)]
pub struct MasterClient {
    http: reqwest::Client,
    master_uri: String,
    caller_id: String,
}

impl MasterClient {
    /// 创建新的 master 客户端
    ///
    /// # 参数
    /// - `master_uri`: master 地址，如 `http://localhost:11311`
    /// - `caller_id`: 本节点名称
    pub fn new(master_uri: impl Into<String>, caller_id: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            master_uri: master_uri.into(),
            caller_id: caller_id.into(),
        }
    }

    pub fn master_uri(&self) -> &str {
        &self.master_uri
    }

    pub fn caller_id(&self) -> &str {
        &self.caller_id
    }

    /// 查询服务的 rosrpc 地址
    ///
    /// # 返回
    /// 服务已注册时返回 `Some(rosrpc://host:port)`，否则返回 None
    pub async fn lookup_service(&self, service: &str) -> EnvResult<Option<String>> {
        let response = self.call("lookupService", &[service]).await?;
        if response.is_success() && !response.value.is_empty() {
            Ok(Some(response.value))
        } else {
            debug!("服务 {} 尚未注册: {}", service, response.status_message);
            Ok(None)
        }
    }

    /// 调用 master API，caller_id 作为第一个参数自动加入
    async fn call(&self, method: &str, params: &[&str]) -> EnvResult<MasterResponse> {
        let mut all_params = Vec::with_capacity(params.len() + 1);
        all_params.push(self.caller_id.as_str());
        all_params.extend_from_slice(params);
        let body = xmlrpc::encode_call(method, &all_params);

        debug!("调用 master {}: {}", self.master_uri, method);
        let text = self
            .http
            .post(self.master_uri.as_str())
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .await
            .map_err(|e| EnvError::master_call_failed(method, e))?
            .text()
            .await
            .map_err(|e| EnvError::master_call_failed(method, e))?;

        xmlrpc::decode_master_response(&text).map_err(|e| EnvError::master_call_failed(method, e))
    }
}
