use std::time::Duration;

use crate::pipeline::project;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub max_file_size: usize,
    pub cache_ttl: Duration,
    pub route_width: f64,
    pub route_height: f64,
    pub route_padding: f64,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env_or("PORT", 3000);
        let max_file_size_mb: usize = env_or("MAX_FILE_SIZE_MB", 25);
        let cache_ttl_seconds = env_or("CACHE_TTL_SECONDS", 3600);

        let route_padding: f64 = env_or("ROUTE_PADDING", project::DEFAULT_PADDING);

        Self {
            port,
            max_file_size: max_file_size_mb * 1024 * 1024,
            cache_ttl: Duration::from_secs(cache_ttl_seconds),
            route_width: env_or("ROUTE_WIDTH", 1080.0),
            route_height: env_or("ROUTE_HEIGHT", 1080.0),
            route_padding: route_padding.clamp(0.0, 0.45),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            max_file_size: 25 * 1024 * 1024,
            cache_ttl: Duration::from_secs(3600),
            route_width: 1080.0,
            route_height: 1080.0,
            route_padding: project::DEFAULT_PADDING,
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
