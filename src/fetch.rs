//! Blocking page fetch for storefront listings.

use std::io::Read;
use tracing::{debug, info};

use crate::error::{ExtractError, FetchError};
use crate::extract::extract_album;
use crate::models::AlbumData;
use crate::page::Page;

/// Storefronts serve reduced or blocked pages to non-browser agents.
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub fn http_agent() -> ureq::Agent {
    ureq::AgentBuilder::new().user_agent(USER_AGENT).build()
}

fn status_error(response: &ureq::Response) -> FetchError {
    FetchError::Status {
        code: response.status(),
        text: response.status_text().to_string(),
    }
}

/// GET a page body. Anything other than 200 is an error.
pub fn fetch_page(agent: &ureq::Agent, url: &str) -> Result<String, FetchError> {
    let response = match agent.get(url).call() {
        Ok(response) => response,
        Err(ureq::Error::Status(_, response)) => return Err(status_error(&response)),
        Err(ureq::Error::Transport(transport)) => {
            return Err(FetchError::Transport(transport.to_string()))
        }
    };
    if response.status() != 200 {
        return Err(status_error(&response));
    }

    let mut bytes = Vec::new();
    response.into_reader().read_to_end(&mut bytes)?;
    debug!("Fetched {} bytes from {}", bytes.len(), url);
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Fetch a storefront page and extract its listing.
pub fn fetch_album_data(url: &str) -> Result<AlbumData, ExtractError> {
    info!("Fetching listing from {}", url);
    let html = fetch_page(&http_agent(), url)?;
    extract_album(&Page::parse(&html), url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = FetchError::Status {
            code: 404,
            text: "Not Found".to_string(),
        };
        assert_eq!(err.to_string(), "status code error: 404 Not Found");
        let wrapped: ExtractError = err.into();
        assert_eq!(wrapped.to_string(), "status code error: 404 Not Found");
    }

    #[test]
    fn test_user_agent_is_desktop_browser() {
        assert!(USER_AGENT.starts_with("Mozilla/5.0"));
        assert!(USER_AGENT.contains("Chrome/"));
    }
}
