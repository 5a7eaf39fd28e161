//! Loads the content of a sub-sitemap named in a sitemap index
//!
//! Locations may be `http(s)://` URLs, `file://` URLs, or bare filesystem paths.

use crate::discovery::DiscoveryError;
use reqwest::Client;
use std::path::Path;
use url::Url;

/// Reads the document at `location`
///
/// Non-2xx HTTP answers are errors, like any transport failure.
pub async fn load_external(client: &Client, location: &str) -> Result<String, DiscoveryError> {
    match Url::parse(location) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => fetch_remote(client, url).await,
        Ok(url) if url.scheme() == "file" => {
            let path = url
                .to_file_path()
                .map_err(|_| DiscoveryError::InvalidLocation(location.to_string()))?;
            read_local(&path).await
        }
        Ok(url) => Err(DiscoveryError::UnsupportedScheme(url.scheme().to_string())),
        Err(_) => read_local(Path::new(location)).await,
    }
}

async fn fetch_remote(client: &Client, url: Url) -> Result<String, DiscoveryError> {
    let location = url.to_string();
    tracing::debug!("Fetching sitemap {}", location);

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| DiscoveryError::Fetch {
            location: location.clone(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DiscoveryError::Status {
            location,
            status: status.as_u16(),
        });
    }

    response
        .text()
        .await
        .map_err(|source| DiscoveryError::Fetch { location, source })
}

async fn read_local(path: &Path) -> Result<String, DiscoveryError> {
    tracing::debug!("Reading sitemap {}", path.display());

    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| DiscoveryError::ReadLocation {
            location: path.display().to_string(),
            source,
        })?;

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
