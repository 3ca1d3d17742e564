use thiserror::Error;

use bytegate_api::config::ConfigError;
use bytegate_core::auth::signing_key::KeyError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("signing key: {0}")]
    Key(#[from] KeyError),

    #[error("database: {0}")]
    Db(#[from] sqlx::Error),

    #[error("migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("logging: {0}")]
    Logging(String),
}
