//! Gateway configuration.

use std::path::PathBuf;

use clap::Parser;

/// relsearch HTTP/JSON gateway command line arguments.
#[derive(Debug, Parser)]
#[command(name = "relsearch-gateway")]
#[command(about = "HTTP/JSON gateway for the relsearch compiler")]
pub struct Args {
    /// Address to listen on for HTTP requests.
    #[arg(short, long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Path to the search configuration (JSON).
    #[arg(short, long, default_value = "search.json")]
    pub config: PathBuf,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to listen on for HTTP requests.
    pub listen_addr: String,
    /// Search configuration file.
    pub search_config: PathBuf,
}

impl From<&Args> for GatewayConfig {
    fn from(args: &Args) -> Self {
        Self {
            listen_addr: args.listen.clone(),
            search_config: args.config.clone(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            search_config: PathBuf::from("search.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_into_config() {
        let args = Args::parse_from(["relsearch-gateway", "--listen", "127.0.0.1:9090", "-c", "conf.json"]);
        let config = GatewayConfig::from(&args);
        assert_eq!(config.listen_addr, "127.0.0.1:9090");
        assert_eq!(config.search_config, PathBuf::from("conf.json"));
    }

    #[test]
    fn test_defaults_match() {
        let args = Args::parse_from(["relsearch-gateway"]);
        let config = GatewayConfig::from(&args);
        let default = GatewayConfig::default();
        assert_eq!(config.listen_addr, default.listen_addr);
        assert_eq!(config.search_config, default.search_config);
    }
}
