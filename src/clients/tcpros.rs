//! TCPROS 服务调用
//!
//! 只实现 `std_srvs/Empty`：请求和响应都没有字段

use std::collections::HashMap;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

/// `std_srvs/Empty` 的 md5sum
pub const EMPTY_SRV_MD5SUM: &str = "d41d8cd98f00b204e9800998ecf8427e";
pub const EMPTY_SRV_TYPE: &str = "std_srvs/Empty";

/// 连接头最大长度，防止错误数据导致超大分配
const MAX_HEADER_LEN: u32 = 64 * 1024;

#[derive(Debug, Error)]
pub enum TcpRosError {
    #[error("无效的 rosrpc 地址: {0}")]
    InvalidUri(String),
    #[error("连接头无效: {0}")]
    BadHeader(String),
    #[error("服务端拒绝连接: {0}")]
    HandshakeRejected(String),
    #[error("服务返回失败: {0}")]
    CallFailed(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// 把 `rosrpc://host:port` 解析为 `host:port`
pub fn parse_rosrpc_uri(uri: &str) -> Result<String, TcpRosError> {
    let address = uri
        .strip_prefix("rosrpc://")
        .ok_or_else(|| TcpRosError::InvalidUri(uri.to_string()))?
        .trim_end_matches('/');
    match address.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
            Ok(address.to_string())
        }
        _ => Err(TcpRosError::InvalidUri(uri.to_string())),
    }
}

/// 编码连接头：总长度 + 若干 `长度 + key=value`，均为小端 u32
pub fn encode_header(fields: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (key, value) in fields {
        let field = format!("{}={}", key, value);
        body.extend_from_slice(&(field.len() as u32).to_le_bytes());
        body.extend_from_slice(field.as_bytes());
    }
    let mut header = Vec::with_capacity(body.len() + 4);
    header.extend_from_slice(&(body.len() as u32).to_le_bytes());
    header.extend_from_slice(&body);
    header
}

/// 解码连接头（不含最前面的总长度）
pub fn decode_header(mut body: &[u8]) -> Result<HashMap<String, String>, TcpRosError> {
    let mut fields = HashMap::new();
    while !body.is_empty() {
        if body.len() < 4 {
            return Err(TcpRosError::BadHeader("字段长度不完整".to_string()));
        }
        let len = u32::from_le_bytes([body[0], body[1], body[2], body[3]]) as usize;
        body = &body[4..];
        if body.len() < len {
            return Err(TcpRosError::BadHeader("字段内容不完整".to_string()));
        }
        let field = String::from_utf8_lossy(&body[..len]);
        let (key, value) = field
            .split_once('=')
            .ok_or_else(|| TcpRosError::BadHeader(format!("字段缺少 '=': {}", field)))?;
        fields.insert(key.to_string(), value.to_string());
        body = &body[len..];
    }
    Ok(fields)
}

async fn read_u32<R: AsyncRead + Unpin>(reader: &mut R) -> Result<u32, TcpRosError> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf).await?;
    Ok(u32::from_le_bytes(buf))
}

/// 读取一个带长度前缀的连接头
pub async fn read_header<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> Result<HashMap<String, String>, TcpRosError> {
    let len = read_u32(reader).await?;
    if len > MAX_HEADER_LEN {
        return Err(TcpRosError::BadHeader(format!("长度 {} 过大", len)));
    }
    let mut body = vec![0u8; len as usize];
    reader.read_exact(&mut body).await?;
    decode_header(&body)
}

/// 在已建立的连接上完成一次 Empty 服务调用
pub async fn call_empty_on<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    caller_id: &str,
    service: &str,
) -> Result<(), TcpRosError> {
    let header = encode_header(&[
        ("callerid", caller_id),
        ("service", service),
        ("md5sum", EMPTY_SRV_MD5SUM),
        ("type", EMPTY_SRV_TYPE),
    ]);
    stream.write_all(&header).await?;

    let response_header = read_header(stream).await?;
    if let Some(error) = response_header.get("error") {
        return Err(TcpRosError::HandshakeRejected(error.clone()));
    }
    debug!("服务 {} 连接头: {:?}", service, response_header);

    // 空请求：只有长度 0
    stream.write_all(&0u32.to_le_bytes()).await?;
    stream.flush().await?;

    let mut ok = [0u8; 1];
    stream.read_exact(&mut ok).await?;
    let len = read_u32(stream).await?;
    if len > MAX_HEADER_LEN {
        return Err(TcpRosError::BadHeader(format!("响应长度 {} 过大", len)));
    }
    let mut payload = vec![0u8; len as usize];
    stream.read_exact(&mut payload).await?;

    if ok[0] == 1 {
        Ok(())
    } else {
        Err(TcpRosError::CallFailed(
            String::from_utf8_lossy(&payload).into_owned(),
        ))
    }
}

/// 在已建立的连接上探测服务是否就绪
///
/// 发送 `probe=1` 连接头，服务端回复自己的连接头后关闭连接
pub async fn ping_on<S: AsyncRead + AsyncWrite + Unpin>(
    stream: &mut S,
    caller_id: &str,
    service: &str,
) -> Result<HashMap<String, String>, TcpRosError> {
    let header = encode_header(&[
        ("callerid", caller_id),
        ("service", service),
        ("md5sum", "*"),
        ("probe", "1"),
    ]);
    stream.write_all(&header).await?;
    stream.flush().await?;

    let response_header = read_header(stream).await?;
    if let Some(error) = response_header.get("error") {
        return Err(TcpRosError::HandshakeRejected(error.clone()));
    }
    Ok(response_header)
}

/// 连接 rosrpc 地址并探测服务
pub async fn ping_service(
    uri: &str,
    caller_id: &str,
    service: &str,
) -> Result<HashMap<String, String>, TcpRosError> {
    let address = parse_rosrpc_uri(uri)?;
    let mut stream = TcpStream::connect(&address).await?;
    ping_on(&mut stream, caller_id, service).await
}

/// 连接 rosrpc 地址并调用 Empty 服务
///
/// # 参数
/// - `uri`: 服务地址 `rosrpc://host:port`
/// - `caller_id`: 本节点名称
/// - `service`: 服务名
pub async fn call_empty_service(
    uri: &str,
    caller_id: &str,
    service: &str,
) -> Result<(), TcpRosError> {
    let address = parse_rosrpc_uri(uri)?;
    let mut stream = TcpStream::connect(&address).await?;
    stream.set_nodelay(true)?;
    call_empty_on(&mut stream, caller_id, service).await
}
