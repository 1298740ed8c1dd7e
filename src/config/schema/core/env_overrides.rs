use super::Config;
use std::path::PathBuf;

impl Config {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(workspace) = std::env::var("SLAWARDEN_WORKSPACE")
            && !workspace.is_empty()
        {
            self.workspace_dir = PathBuf::from(workspace);
        }

        if let Ok(port_str) =
            std::env::var("SLAWARDEN_GATEWAY_PORT").or_else(|_| std::env::var("PORT"))
            && let Ok(port) = port_str.parse::<u16>()
        {
            self.gateway.port = port;
        }

        if let Ok(host) =
            std::env::var("SLAWARDEN_GATEWAY_HOST").or_else(|_| std::env::var("HOST"))
            && !host.is_empty()
        {
            self.gateway.host = host;
        }

        if let Ok(interval_str) = std::env::var("SLAWARDEN_INTERVAL_SECS")
            && let Ok(interval) = interval_str.parse::<u64>()
            && interval > 0
        {
            self.evaluation.interval_secs = interval;
        }

        if let Ok(url) = std::env::var("SLAWARDEN_BUS_URL")
            && !url.is_empty()
        {
            self.bus.url = Some(url);
        }
    }
}
