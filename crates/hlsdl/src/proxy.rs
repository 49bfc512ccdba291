use std::str::FromStr;

use reqwest::Proxy;

/// Proxy flavours understood by [`build_proxy_from_config`].
#[derive(Debug, Clone, PartialEq, Eq, Copy)]
pub enum ProxyType {
    /// Proxy plain `http://` requests only
    Http,
    /// Proxy `https://` requests only
    Https,
    /// SOCKS5 proxy for every request
    Socks5,
    /// Proxy every request regardless of scheme
    All,
}

impl FromStr for ProxyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(ProxyType::Http),
            "https" => Ok(ProxyType::Https),
            "socks5" => Ok(ProxyType::Socks5),
            "all" => Ok(ProxyType::All),
            other => Err(format!("Invalid proxy type: '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Proxy server URL (e.g., "http://proxy.example.com:8080")
    pub url: String,
    pub proxy_type: ProxyType,
    pub auth: Option<ProxyAuth>,
}

/// Build a reqwest Proxy object from our proxy configuration
pub fn build_proxy_from_config(config: &ProxyConfig) -> Result<Proxy, String> {
    let proxy_url = config.url.as_str();

    let proxy = match config.proxy_type {
        ProxyType::Http => Proxy::http(proxy_url),
        ProxyType::Https => Proxy::https(proxy_url),
        ProxyType::Socks5 if proxy_url.starts_with("socks5://") => Proxy::all(proxy_url),
        ProxyType::Socks5 => Proxy::all(format!("socks5://{proxy_url}")),
        ProxyType::All => Proxy::all(proxy_url),
    }
    .map_err(|e| format!("Invalid {:?} proxy URL '{proxy_url}': {e}", config.proxy_type))?;

    Ok(match &config.auth {
        Some(auth) => proxy.basic_auth(&auth.username, &auth.password),
        None => proxy,
    })
}
