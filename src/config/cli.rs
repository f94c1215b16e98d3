use crate::config::toml_config::ServerConfig;
use crate::utils::error::Result;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "reservation-desk")]
#[command(about = "Restaurant reservation and table management service")]
pub struct ServerCli {
    #[arg(long, help = "Path to a TOML configuration file")]
    pub config: Option<String>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(long)]
    pub port: Option<u32>,

    #[arg(long, help = "JSON file with reservations and tables to preload")]
    pub seed: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

impl ServerCli {
    /// 讀取設定檔後以命令列參數覆寫
    pub fn load_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_file(path)?,
            None => ServerConfig::default(),
        };
        self.apply_overrides(&mut config);
        Ok(config)
    }

    pub fn apply_overrides(&self, config: &mut ServerConfig) {
        if let Some(host) = &self.host {
            config.server.host = host.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(seed) = &self.seed {
            config.store.seed_path = Some(seed.clone());
        }
        if self.verbose {
            config.logging.verbose = true;
        }
        if self.json_logs {
            config.logging.format = "json".to_string();
        }
    }
}
