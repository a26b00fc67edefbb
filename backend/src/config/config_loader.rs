use anyhow::{Context, Result};

use super::{
    config_model::{AuthSecret, BackendServer, Database, DotEnvyConfig},
    stage::Stage,
};

const DEFAULT_MAX_POOL_SIZE: u32 = 10;

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    load_from(|key| std::env::var(key).ok())
}

pub(crate) fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<DotEnvyConfig> {
    let required = |key: &str| lookup(key).with_context(|| format!("{key} is invalid"));

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let max_pool_size = match lookup("DATABASE_MAX_POOL_SIZE") {
        Some(raw) => raw.parse().context("DATABASE_MAX_POOL_SIZE is invalid")?,
        None => DEFAULT_MAX_POOL_SIZE,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
        max_pool_size,
    };

    let auth = AuthSecret {
        jwt_secret: required("JWT_SECRET")?,
    };

    let stage = lookup("STAGE")
        .map(|raw| Stage::try_from(&raw))
        .transpose()?
        .unwrap_or_default();

    Ok(DotEnvyConfig {
        backend_server,
        database,
        auth,
        stage,
    })
}

pub fn get_auth_secret() -> Result<AuthSecret> {
    dotenvy::dotenv().ok();

    Ok(AuthSecret {
        jwt_secret: std::env::var("JWT_SECRET").context("JWT_SECRET is invalid")?,
    })
}
