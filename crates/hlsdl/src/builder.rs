//! Fluent construction of [`DownloaderConfig`].
//!
//! ```
//! use std::time::Duration;
//! use hlsdl_engine::DownloaderConfig;
//!
//! let config = DownloaderConfig::builder()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_system_proxy(false)
//!     .build();
//! assert_eq!(config.timeout, Duration::from_secs(60));
//! assert!(!config.use_system_proxy);
//! ```

use std::time::Duration;

use reqwest::header::HeaderMap;

use crate::{DownloaderConfig, proxy::ProxyConfig};

/// Starts from [`DownloaderConfig::default`] and overrides the knobs a
/// front end exposes.
#[derive(Debug, Clone, Default)]
pub struct DownloaderConfigBuilder {
    config: DownloaderConfig,
}

impl DownloaderConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overall deadline for one request. Zero leaves it unbounded.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Entries in `headers` replace defaults with the same name.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.config.merge_headers(&headers);
        self
    }

    /// An explicit proxy turns the system proxy off.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self.config.use_system_proxy = false;
        self
    }

    /// Ignored once an explicit proxy is set.
    pub fn with_system_proxy(mut self, enabled: bool) -> Self {
        self.config.use_system_proxy = enabled && self.config.proxy.is_none();
        self
    }

    pub fn build(self) -> DownloaderConfig {
        self.config
    }
}
