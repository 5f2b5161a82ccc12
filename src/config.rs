use anyhow::{Context, Result};
use std::env;
use url::Url;

/// Connection settings for an authenticated Commcell webservice, read
/// from the environment (a `.env` file is honored when present).
#[derive(Debug, Clone)]
pub struct CommcellConfig {
    pub webservice_url: String,
    pub auth_token: String,
    pub request_timeout_secs: u64,
}

impl CommcellConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let webservice_url =
            env::var("COMMCELL_WEBSERVICE_URL").context("COMMCELL_WEBSERVICE_URL must be set")?;
        Url::parse(&webservice_url)
            .with_context(|| format!("Invalid COMMCELL_WEBSERVICE_URL: {}", webservice_url))?;

        let auth_token =
            env::var("COMMCELL_AUTH_TOKEN").context("COMMCELL_AUTH_TOKEN must be set")?;

        let request_timeout_secs = env::var("COMMCELL_REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".to_string())
            .parse()
            .context("COMMCELL_REQUEST_TIMEOUT_SECS must be a number of seconds")?;

        Ok(Self {
            webservice_url,
            auth_token,
            request_timeout_secs,
        })
    }
}
