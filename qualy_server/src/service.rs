use std::sync::Arc;

use axum::{http::StatusCode, Json};
use minisector::{
    compare, Attributor, Comparison, ComparisonConfig, Event, FileTraceSource, MinisectorError,
    TraceCache,
};
use serde_json::json;

use crate::types::CompareRequest;

pub type ApiError = (StatusCode, Json<serde_json::Value>);

/// Everything a request needs; shared read-only between requests.
pub struct ComparisonService {
    source: FileTraceSource,
    config: ComparisonConfig,
    attributor: Attributor,
}

impl ComparisonService {
    pub fn new(source: FileTraceSource, config: ComparisonConfig) -> Self {
        let attributor = Attributor::new(config.boundary);
        Self {
            source,
            config,
            attributor,
        }
    }

    pub fn config(&self) -> &ComparisonConfig {
        &self.config
    }

    pub fn cache(&self) -> &TraceCache {
        self.source.cache()
    }

    /// Parse the event and hold the segment count to the configured range.
    pub fn resolve(&self, req: &CompareRequest) -> Result<(Event, i64), MinisectorError> {
        let event: Event = req.event.parse()?;
        self.config.segments.check(req.segments)?;
        Ok((event, req.segments))
    }

    pub fn compare_blocking(&self, event: Event, segments: i64) -> Result<Comparison, MinisectorError> {
        compare(&self.source, event, segments, &self.attributor)
    }
}

/// Resolve and run one comparison off the async runtime.
pub async fn run_comparison(
    service: Arc<ComparisonService>,
    req: CompareRequest,
) -> Result<Comparison, ApiError> {
    let (event, segments) = service.resolve(&req).map_err(|e| error_response(&e))?;
    tokio::task::spawn_blocking(move || service.compare_blocking(event, segments))
        .await
        .map_err(|e| internal_error(e.to_string()))?
        .map_err(|e| error_response(&e))
}

pub fn status_for(err: &MinisectorError) -> StatusCode {
    match err {
        MinisectorError::UnknownEvent(_)
        | MinisectorError::UnknownCompetitor(_)
        | MinisectorError::InvalidSegmentCount(_)
        | MinisectorError::SegmentCountOutOfRange { .. } => StatusCode::BAD_REQUEST,
        MinisectorError::TraceUnavailable { .. } => StatusCode::NOT_FOUND,
        MinisectorError::EmptyTrace(_) | MinisectorError::DegenerateInput(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        MinisectorError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn error_response(err: &MinisectorError) -> ApiError {
    (status_for(err), Json(json!({ "error": err.to_string() })))
}

pub fn internal_error(message: String) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": message })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> ComparisonService {
        let source = FileTraceSource::new("does-not-exist", TraceCache::disabled());
        ComparisonService::new(source, ComparisonConfig::default())
    }

    fn request(event: &str, segments: i64) -> CompareRequest {
        CompareRequest {
            event: event.to_string(),
            segments,
        }
    }

    #[test]
    fn resolve_validates_event_and_range() {
        let service = service();
        assert_eq!(
            service.resolve(&request("Monza", 30)).unwrap(),
            (Event::Monza, 30)
        );
        assert!(matches!(
            service.resolve(&request("Spa", 30)),
            Err(MinisectorError::UnknownEvent(_))
        ));
        assert!(matches!(
            service.resolve(&request("Monza", 31)),
            Err(MinisectorError::SegmentCountOutOfRange { .. })
        ));
        assert_eq!(
            service.resolve(&request("Monza", -1)),
            Err(MinisectorError::InvalidSegmentCount(-1))
        );
    }

    #[test]
    fn missing_data_is_not_found() {
        let err = service().compare_blocking(Event::Turkey, 25).unwrap_err();
        assert_eq!(status_for(&err), StatusCode::NOT_FOUND);
    }

    #[test]
    fn status_mapping() {
        assert_eq!(
            status_for(&MinisectorError::UnknownCompetitor("BOT".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&MinisectorError::DegenerateInput("zero".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        let (status, Json(body)) = error_response(&MinisectorError::InvalidSegmentCount(0));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("segment count"));
    }
}
