use serde::{Deserialize, Serialize};

/// 反代服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// 是否允许局域网访问
    /// - false: 仅本机访问 127.0.0.1（默认，隐私优先）
    /// - true: 允许局域网访问 0.0.0.0
    pub allow_lan_access: bool,

    /// 监听端口
    pub port: u16,

    /// API 密钥 (客户端 Bearer Token)
    pub api_key: String,

    /// 上游 API 地址
    pub api_domain: String,

    /// 创建会话 / 建立连接的超时时间(秒)
    pub request_timeout: u64,

    /// 上游流两次读取之间的最长等待(秒)
    pub idle_read_timeout: u64,

    /// 每个 deviceId 最多服务的请求数，达到后轮换
    pub max_conversation_count: u32,

    /// 是否在同一 deviceId 周期内复用会话 ID
    pub reuse_conversation: bool,

    /// 翻译器输出通道容量
    pub channel_capacity: usize,

    /// 上游代理配置
    pub upstream_proxy: UpstreamProxyConfig,
}

/// 上游代理配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpstreamProxyConfig {
    /// 是否启用
    pub enabled: bool,
    /// 代理地址 (http://, https://, socks5://)
    pub url: String,
}

pub const DEFAULT_API_DOMAIN: &str = "https://ai-api.dangbei.net";

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            allow_lan_access: false, // 默认仅本机访问，隐私优先
            port: 8045,
            api_key: format!("sk-{}", uuid::Uuid::new_v4().simple()),
            api_domain: DEFAULT_API_DOMAIN.to_string(),
            request_timeout: 120,
            idle_read_timeout: 60,
            max_conversation_count: 50,
            reuse_conversation: false,
            channel_capacity: 64,
            upstream_proxy: UpstreamProxyConfig::default(),
        }
    }
}

impl ProxyConfig {
    /// 获取实际的监听地址
    /// - allow_lan_access = false: 返回 "127.0.0.1"（默认，隐私优先）
    /// - allow_lan_access = true: 返回 "0.0.0.0"（允许局域网访问）
    pub fn get_bind_address(&self) -> &str {
        if self.allow_lan_access {
            "0.0.0.0"
        } else {
            "127.0.0.1"
        }
    }

    pub fn api_domain_trimmed(&self) -> &str {
        self.api_domain.trim_end_matches('/')
    }
}
