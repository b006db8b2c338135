use chrono_tz::Tz;
use clap::Parser;
use log::warn;
use std::path::PathBuf;
use std::time::Duration;

use crate::resolver::DEFAULT_CACHE_INTERVAL;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CHAT_PORT: u16 = 8081;
pub const DEFAULT_ROOT_FOLDER: &str = "./public";

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Folder to serve files from (used only if it is an existing directory)
    #[arg(value_name = "ROOT_FOLDER")]
    pub root_folder: Option<PathBuf>,

    /// Port to listen on, e.g. `-p9000` [default: 8080, or 8081 with --chat]
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// Also accept chat messages on POST /chat
    #[arg(long)]
    pub chat: bool,

    /// Worker threads; 1 handles each connection on the accepting thread
    #[arg(short, long, default_value_t = 1)]
    pub threads: usize,

    /// Minimum time between rescans triggered by unknown paths, in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub cache_interval_ms: u64,

    /// Largest accepted request body in bytes (default: 1 MiB)
    #[arg(long, default_value_t = 1_048_576)]
    pub max_body_size: usize,

    /// Also append log lines to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Timezone used for log timestamps
    #[arg(long, default_value = "UTC", value_parser = parse_timezone)]
    pub timezone: Tz,
}

impl ServerConfig {
    pub fn port(&self) -> u16 {
        match self.port {
            Some(port) => port,
            None if self.chat => DEFAULT_CHAT_PORT,
            None => DEFAULT_PORT,
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port())
    }

    /// The folder that will actually be served. An argument that is not an
    /// existing directory is ignored in favour of the default.
    pub fn root_folder(&self) -> PathBuf {
        match &self.root_folder {
            Some(folder) if folder.is_dir() => folder.clone(),
            Some(folder) => {
                warn!(
                    "{:?} is not a directory, serving {} instead",
                    folder, DEFAULT_ROOT_FOLDER
                );
                PathBuf::from(DEFAULT_ROOT_FOLDER)
            }
            None => PathBuf::from(DEFAULT_ROOT_FOLDER),
        }
    }

    pub fn cache_interval(&self) -> Duration {
        Duration::from_millis(self.cache_interval_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: None,
            host: "0.0.0.0".to_string(),
            chat: false,
            threads: 1,
            cache_interval_ms: DEFAULT_CACHE_INTERVAL.as_millis() as u64,
            max_body_size: 1_048_576,
            log_file: None,
            timezone: Tz::UTC,
        }
    }
}

fn parse_timezone(name: &str) -> Result<Tz, String> {
    name.parse::<Tz>()
        .map_err(|_| format!("unknown timezone `{}`", name))
}
