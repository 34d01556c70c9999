//! HTTP intake configuration, loaded from the environment.

use core_config::{Environment, FromEnv, env_or_default};
use database::postgres::PostgresConfig;
use database::redis::RedisConfig;

#[derive(Clone, Debug)]
pub struct Config {
    pub environment: Environment,
    pub database: PostgresConfig,
    pub redis: RedisConfig,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let database = PostgresConfig::from_env()?;
        let redis = RedisConfig::from_env()?;
        let port = env_or_default("API_PORT", "3000")
            .parse()
            .unwrap_or(3000);

        Ok(Self {
            environment,
            database,
            redis,
            port,
        })
    }
}
