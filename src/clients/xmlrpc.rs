//! XML-RPC 编解码
//!
//! 只覆盖 ROS master API 用到的子集：字符串参数，`[code, status, value]` 返回值

use regex::Regex;
use thiserror::Error;

/// XML-RPC 解析错误
#[derive(Debug, Error)]
pub enum XmlRpcError {
    #[error("XML-RPC 响应为 fault: {0}")]
    Fault(String),
    #[error("XML-RPC 响应格式无效: {0}")]
    Malformed(String),
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

/// ROS master API 的返回值
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterResponse {
    /// 1 成功，0 失败，-1 调用错误
    pub code: i64,
    pub status_message: String,
    pub value: String,
}

impl MasterResponse {
    pub fn is_success(&self) -> bool {
        self.code == 1
    }
}

/// 构造只含字符串参数的 methodCall 请求体
pub fn encode_call(method: &str, params: &[&str]) -> String {
    let params: String = params
        .iter()
        .map(|p| format!("<param><value><string>{}</string></value></param>", escape(p)))
        .collect();
    format!(
        "<?xml version=\"1.0\"?><methodCall><methodName>{}</methodName><params>{}</params></methodCall>",
        escape(method),
        params
    )
}

/// 解析 master API 的 methodResponse
pub fn decode_master_response(body: &str) -> Result<MasterResponse, XmlRpcError> {
    if body.contains("<fault>") {
        let fault_re = Regex::new(
            r"(?s)<name>faultString</name>\s*<value>\s*(?:<string>)?(.*?)(?:</string>)?\s*</value>",
        )?;
        let message = fault_re
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| unescape(m.as_str()))
            .unwrap_or_default();
        return Err(XmlRpcError::Fault(message));
    }

    let data_re = Regex::new(r"(?s)<data>(.*)</data>")?;
    let data = data_re
        .captures(body)
        .and_then(|c| c.get(1))
        .ok_or_else(|| XmlRpcError::Malformed("缺少 <data> 数组".to_string()))?
        .as_str();

    let values = scalar_values(data)?;
    if values.len() < 3 {
        return Err(XmlRpcError::Malformed(format!(
            "返回数组长度为 {}，应为 3",
            values.len()
        )));
    }

    let code = values[0]
        .trim()
        .parse()
        .map_err(|_| XmlRpcError::Malformed(format!("无效的返回码: {}", values[0])))?;

    Ok(MasterResponse {
        code,
        status_message: values[1].clone(),
        value: values[2].clone(),
    })
}

/// 按出现顺序提取所有标量 `<value>`，去掉类型标签
fn scalar_values(xml: &str) -> Result<Vec<String>, XmlRpcError> {
    let value_re = Regex::new(r"(?s)<value>(.*?)</value>")?;
    let type_tag_re =
        Regex::new(r"(?s)^\s*<(?:i4|int|string|boolean|double)>(.*)</(?:i4|int|string|boolean|double)>\s*$")?;

    Ok(value_re
        .captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .map(|m| {
            let raw = m.as_str();
            let inner = type_tag_re
                .captures(raw)
                .and_then(|c| c.get(1))
                .map_or(raw, |m| m.as_str());
            unescape(inner)
        })
        .collect())
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
