use axum::{Json, extract::State, http::StatusCode};
use std::sync::Arc;
use std::time::Instant;

use crate::coordinator::SearchCoordinator;
use crate::error::SearchError;

use super::models::{SearchRequest, SearchResponse};

pub async fn search_handler(
    State(coordinator): State<Arc<SearchCoordinator>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let start = Instant::now();

    let query = request
        .to_query()
        .map_err(|e| (StatusCode::BAD_REQUEST, e))?;

    let result = coordinator.search(query).await.map_err(|e| match e {
        SearchError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
        other => {
            log::error!("search failed: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Search error: {}", other),
            )
        }
    })?;

    let total_results = result.products.len();
    let processing_time_ms = start.elapsed().as_millis();

    Ok(Json(SearchResponse {
        query: request.query,
        products: result.products,
        statuses: result.statuses,
        total_results,
        processing_time_ms,
    }))
}
