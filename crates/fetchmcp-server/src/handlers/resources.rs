//! `resources/list` and `resources/read`, scoped to the three-tier
//! scrape store. Synthetic map/search/crawl URIs are embedded directly
//! in their tool responses and are not independently readable here.

use serde_json::{json, Value};

use fetchmcp_store::StoreError;
use fetchmcp_types::error::IngestError;
use fetchmcp_types::resource::ResourceUri;

use crate::error::ServerResult;
use crate::state::AppState;

pub async fn list(state: &AppState) -> ServerResult<Vec<Value>> {
    let headers = state.store.list().await.map_err(|e| IngestError::internal(e.to_string()))?;
    Ok(headers
        .into_iter()
        .map(|h| {
            json!({
                "uri": h.uri.to_string(),
                "name": h.url,
                "mimeType": h.mime_type,
            })
        })
        .collect())
}

pub async fn read(state: &AppState, uri: &str) -> ServerResult<Value> {
    let resource_uri = ResourceUri(uri.to_string());
    let resource = state.store.read(&resource_uri).await.map_err(|err| match err {
        StoreError::NotFound(_) => IngestError::NotFound(uri.to_string()),
        other => IngestError::internal(other.to_string()),
    })?;

    Ok(json!({
        "uri": uri,
        "mimeType": resource.header.mime_type,
        "text": resource.content_as_str(),
    }))
}
