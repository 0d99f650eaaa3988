//! Layered configuration: defaults -> optional config file -> `VITH_`
//! environment overrides -> CLI flags, mirroring the teacher's
//! `config::Config` layering plus its `clap::Parser` CLI overlay in
//! `main.rs`.

use clap::Parser;
use config::{Config as ConfigBuilder, Environment, File};
use serde::{Deserialize, Serialize};

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub amqp: AmqpConfig,
    pub image_service: ImageServiceConfig,
    pub logging: LoggingConfig,
    pub tools: ToolsConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("server", &self.server)
            .field("store", &self.store)
            .field("amqp", &"<redacted>")
            .field("image_service", &"<redacted>")
            .field("logging", &self.logging)
            .field("tools", &self.tools)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub tmp_folder: String,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            tmp_folder: "/tmp".to_string(),
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKindConfig {
    Local,
    S3,
}

impl Default for StoreKindConfig {
    fn default() -> Self {
        StoreKindConfig::Local
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKindConfig,
    pub local_root: String,
    pub enabled: bool,
    pub s3_endpoint: String,
    pub s3_access_key_id: String,
    pub s3_secret_access_key: String,
    pub s3_bucket: String,
    pub s3_region: Option<String>,
    pub s3_base_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKindConfig::Local,
            local_root: "/data".to_string(),
            enabled: true,
            s3_endpoint: String::new(),
            s3_access_key_id: String::new(),
            s3_secret_access_key: String::new(),
            s3_bucket: String::new(),
            s3_region: None,
            s3_base_path: String::new(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AmqpConfig {
    pub url: String,
    pub exchange: String,
    pub routing_key: String,
    pub stream_queue: String,
    pub thumbnail_queue: String,
}

impl std::fmt::Debug for AmqpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmqpConfig")
            .field("url", &"<redacted>")
            .field("exchange", &self.exchange)
            .field("routing_key", &self.routing_key)
            .field("stream_queue", &self.stream_queue)
            .field("thumbnail_queue", &self.thumbnail_queue)
            .finish()
    }
}

impl Default for AmqpConfig {
    fn default() -> Self {
        Self {
            url: "amqp://127.0.0.1:5672/%2f".to_string(),
            exchange: "fibr".to_string(),
            routing_key: "thumbnail_output".to_string(),
            stream_queue: "vith.stream".to_string(),
            thumbnail_queue: "vith.thumbnail".to_string(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageServiceConfig {
    pub url: String,
    pub basic_auth_user: Option<String>,
    pub basic_auth_pass: Option<String>,
}

impl std::fmt::Debug for ImageServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageServiceConfig")
            .field("url", &self.url)
            .field("basic_auth_user", &self.basic_auth_user)
            .field("basic_auth_pass", &"<redacted>")
            .finish()
    }
}

impl Default for ImageServiceConfig {
    fn default() -> Self {
        Self {
            url: "http://image:9000".to_string(),
            basic_auth_user: None,
            basic_auth_pass: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
        }
    }
}

/// CLI overlay: a handful of values that make sense as flags/env vars on
/// top of the layered file+env config, following the teacher's
/// `clap::Parser` struct shape in `synctv-stream::main`.
#[derive(Parser, Debug)]
#[command(name = "vith", about = "Media thumbnailing and streaming derivation service")]
pub struct Args {
    #[arg(long, env = "VITH_CONFIG")]
    pub config: Option<String>,

    #[arg(long, env = "VITH_SERVER_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "VITH_SERVER_PORT")]
    pub port: Option<u16>,

    #[arg(long, env = "VITH_TMP_FOLDER")]
    pub tmp_folder: Option<String>,
}

impl AppConfig {
    pub fn load(args: &Args) -> anyhow::Result<Self> {
        let mut builder = ConfigBuilder::builder();
        if let Some(path) = &args.config {
            builder = builder.add_source(File::with_name(path));
        }
        builder = builder.add_source(Environment::with_prefix("VITH").separator("__"));

        // Every sub-struct carries #[serde(default)], so fields absent from
        // both the config file and the environment fall back to the same
        // defaults as `AppConfig::default()`.
        let mut config: AppConfig = builder.build()?.try_deserialize()?;

        if let Some(host) = &args.host {
            config.server.host = host.clone();
        }
        if let Some(port) = args.port {
            config.server.port = port;
        }
        if let Some(tmp) = &args.tmp_folder {
            config.server.tmp_folder = tmp.clone();
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = AppConfig::default();
        assert_eq!(config.server.tmp_folder, "/tmp");
        assert_eq!(config.image_service.url, "http://image:9000");
        assert_eq!(config.amqp.exchange, "fibr");
        assert_eq!(config.amqp.routing_key, "thumbnail_output");
    }

    #[test]
    fn debug_redacts_secrets() {
        let mut config = AppConfig::default();
        config.store.s3_secret_access_key = "super-secret".to_string();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
    }
}
