use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_ENCODING};
use reqwest::Client;

const APP_USER_AGENT: &str = concat!("packlaunch/", env!("CARGO_PKG_VERSION"));

pub fn build_http_client() -> Result<Client, reqwest::Error> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

    Client::builder()
        .user_agent(APP_USER_AGENT)
        .default_headers(default_headers)
        .build()
}

/// GET `url` and return the body, treating non-2xx statuses as failures.
pub async fn fetch_text(client: &Client, url: &str) -> crate::core::error::LauncherResult<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(crate::core::error::LauncherError::DownloadFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}
