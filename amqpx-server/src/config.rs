use std::env;
use std::time::Duration;

/// Server settings, read from `AMQPX_SERVER_*` environment variables with
/// fixed fallbacks.
#[derive(Clone, Debug)]
pub struct Config {
    pub host_ip: String,
    pub port: u16,
    pub hostname: String,
    pub channel_max: u16,
    pub idle_timeout_ms: u32,
    pub read_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            host_ip: env_or("AMQPX_SERVER_HOSTIP", "0.0.0.0"),
            port: env_or("AMQPX_SERVER_PORT", "10010").parse().unwrap_or(10010),
            hostname: env_or("AMQPX_SERVER_HOSTNAME", "amqpxServer"),
            channel_max: env_or("AMQPX_SERVER_CHANNELMAX", "1").parse().unwrap_or(1),
            idle_timeout_ms: env_or("AMQPX_SERVER_IDLETIMEOUT", "1111")
                .parse()
                .unwrap_or(1111),
            read_timeout: Duration::from_secs(
                env_or("AMQPX_SERVER_READTIMEOUT", "5").parse().unwrap_or(5),
            ),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host_ip: "0.0.0.0".to_string(),
            port: 10010,
            hostname: "amqpxServer".to_string(),
            channel_max: 1,
            idle_timeout_ms: 1111,
            read_timeout: Duration::from_secs(5),
        }
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    env::var(key).unwrap_or_else(|_| fallback.to_string())
}
