use std::time::Duration;

use reqwest::Client;

const DISABLE_SYSTEM_PROXY_ENV: &str = "GAIA_DISABLE_SYSTEM_PROXY";
const USER_AGENT: &str = concat!("gaia-agent/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_http_client() -> Client {
    let builder = Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(15));

    let builder = if should_disable_system_proxy() {
        builder.no_proxy()
    } else {
        builder
    };

    // Only fails when the TLS backend cannot initialise.
    builder.build().unwrap_or_else(|error| {
        tracing::warn!(error = %error, "Falling back to default HTTP client");
        Client::new()
    })
}

fn should_disable_system_proxy() -> bool {
    if std::env::var_os(DISABLE_SYSTEM_PROXY_ENV).is_some() {
        return true;
    }

    cfg!(test)
}
