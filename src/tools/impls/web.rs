use crate::tools::error::ToolError;
use crate::tools::result::ToolOutput;
use crate::web::WebClient;
use std::time::Duration;
use tracing::debug;

pub async fn search_web(
    client: &WebClient,
    query: &str,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    let (results, total) = client
        .search(query)
        .await
        .map_err(|e| ToolError::from_web(e, timeout))?;

    debug!("Search for '{}' returned {} results", query, total);
    Ok(ToolOutput::SearchWeb {
        query: query.to_string(),
        results,
        total,
    })
}

pub async fn read_url(
    client: &WebClient,
    url: &str,
    timeout: Duration,
) -> Result<ToolOutput, ToolError> {
    let page = client
        .fetch(url)
        .await
        .map_err(|e| ToolError::from_web(e, timeout))?;
    Ok(ToolOutput::ReadUrl(page))
}
