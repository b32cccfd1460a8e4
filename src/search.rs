use std::sync::Arc;

use tracing::{debug, info};

use crate::error::GatewayError;
use crate::normalize;
use crate::types::{ContentType, Endpoint, NaverEnvelope, SearchResult};
use crate::AppState;

/// Fixed upstream page size for the page-based operation.
pub const PAGE_SIZE: u32 = 10;

/// 1-based offset into the upstream result list for a given page:
/// page 1 -> 1, page 3 -> 21.
pub fn start_offset(page: u32) -> u32 {
    (page - 1) * PAGE_SIZE + 1
}

/// Page-based search. Resolves the content type onto an upstream endpoint
/// and translates the page number into the upstream offset convention.
pub async fn search(
    state: &Arc<AppState>,
    query: &str,
    content_type: ContentType,
    page: u32,
) -> Result<Vec<SearchResult>, GatewayError> {
    if query.trim().is_empty() {
        return Err(GatewayError::Validation(
            "query parameter is required".to_string(),
        ));
    }
    if page < 1 {
        return Err(GatewayError::Validation(
            "page must be a positive integer".to_string(),
        ));
    }

    search_endpoint(state, query, content_type.into(), PAGE_SIZE, start_offset(page)).await
}

/// Offset-based search against one upstream endpoint. Attaches the provider
/// credentials from the injected configuration, forwards the query, and
/// returns the normalized result list — never the raw envelope.
pub async fn search_endpoint(
    state: &Arc<AppState>,
    query: &str,
    endpoint: Endpoint,
    display: u32,
    start: u32,
) -> Result<Vec<SearchResult>, GatewayError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(GatewayError::Validation(
            "query parameter is required".to_string(),
        ));
    }

    let (client_id, client_secret) = state
        .config
        .naver
        .credentials()
        .map_err(GatewayError::missing_credentials)?;

    let url = format!("{}/search/{}", state.config.naver.base_url, endpoint.as_str());
    let display_count = display;
    debug!("forwarding search to {} (display={}, start={})", url, display_count, start);

    let response = state
        .http_client
        .get(&url)
        .header("X-Naver-Client-Id", client_id)
        .header("X-Naver-Client-Secret", client_secret)
        .query(&[
            ("query", query.to_string()),
            ("display", display.to_string()),
            ("start", start.to_string()),
        ])
        .send()
        .await
        .map_err(|e| GatewayError::upstream(None, format!("failed to reach search API: {}", e)))?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(GatewayError::upstream(
            Some(status),
            if body.is_empty() {
                format!("search API responded with status {}", status)
            } else {
                body
            },
        ));
    }

    let envelope: NaverEnvelope = response
        .json()
        .await
        .map_err(|e| GatewayError::upstream(None, format!("failed to parse search API response: {}", e)))?;

    let Some(items) = envelope.items else {
        return Err(GatewayError::upstream(
            None,
            "search API response is missing the result list".to_string(),
        ));
    };

    info!("search '{}' on {} returned {} items", query, endpoint.as_str(), items.len());
    Ok(normalize::normalize_items(&items, endpoint))
}
