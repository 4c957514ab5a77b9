pub mod logger;

use crate::{config::logger::LoggerConfig, fs, postgres, usecase};
use envconfig::Envconfig;

#[derive(Envconfig, Debug)]
pub struct Config {
    #[envconfig(nested)]
    pub shortener: usecase::config::Config,
    #[envconfig(nested)]
    pub postgres: postgres::config::Config,
    #[envconfig(nested)]
    pub about: fs::config::Config,
    #[envconfig(nested)]
    pub logger: LoggerConfig,
}

pub fn load() -> Result<Config, envconfig::Error> {
    Config::init_from_env()
}
