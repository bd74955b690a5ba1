//! HTTP client for the Goszakup risk-analysis backend.
//!
//! `ApiClient` performs one logical request per call: it resolves an
//! `Endpoint` against the configured base URL, bounds every attempt with a
//! timeout, retries transient failures with exponential backoff and turns
//! every failure into an `ApiError`. The network itself sits behind the
//! `Transport` trait so the retry policy can be tested without sockets.

use goszakup_model::{
    AnalyzeTextRequest, CategoryDetail, CategoryListItem, CategoryPricingDetail,
    CategoryPricingQuery, CategoryPricingResponse, CompareRequest, CompareResponse,
    CustomerDetail, CustomerListItem, DashboardStats, DirectoryQuery, ExportFilters,
    FeedbackRequest, FeedbackResponse, FullAnalysis, GetLotsRequest, GetLotsResponse,
    HealthResponse, NetworkAnalysis, NetworkGraph, NetworkGraphQuery, Page, RiskLevel, SortBy,
    TimelineQuery, TimelineResponse,
};
use goszakup_query::{self as query, Endpoint};
use reqwest::{Method, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

mod config;
mod error;
pub mod fake;
mod retry;
mod transport;

pub use config::{ClientConfig, API_URL_ENV, DEFAULT_BASE_URL};
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};

use retry::{next_step, Attempt, Step};

/// Typed client for the backend API.
#[derive(Debug)]
pub struct ApiClient<T = ReqwestTransport> {
    config: ClientConfig,
    base_url: Url,
    transport: T,
}

impl ApiClient<ReqwestTransport> {
    /// Create a client over the network.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> ApiClient<T> {
    /// Create a client over any transport.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| ApiError::Config(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Config(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }

        Ok(Self {
            config,
            base_url,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve an endpoint: path segments are percent-encoded one by one,
    /// query parameters form-encoded.
    pub fn url_for(&self, endpoint: &Endpoint) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Config(format!("{} cannot be used as a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(endpoint.segments());

        if !endpoint.query().is_empty() {
            url.query_pairs_mut()
                .extend_pairs(endpoint.query().iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }

    /// Send one logical request, retrying transient failures.
    ///
    /// Returns the first success response, the first terminal error, or the
    /// last retryable error once `retry_attempts` retries are spent.
    pub async fn execute(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse, ApiError> {
        let request = HttpRequest {
            method,
            url: self.url_for(endpoint)?,
            headers: Vec::new(),
            body,
        };

        let mut attempt = 0;
        loop {
            debug!(
                transport = self.transport.name(),
                method = %request.method,
                url = %request.url,
                attempt,
                "Sending request"
            );

            let outcome = tokio::time::timeout(self.config.timeout, self.transport.send(request.clone()))
                .await
                .ok();

            match next_step(Attempt::classify(outcome, self.config.timeout), attempt, &self.config) {
                Step::Done(result) => {
                    if let Err(error) = &result {
                        debug!(url = %request.url, attempt, error = %error, "Request failed");
                    }
                    return result;
                }
                Step::Retry { delay, error } => {
                    warn!(
                        url = %request.url,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    pub async fn get<R: DeserializeOwned>(&self, endpoint: &Endpoint) -> Result<R, ApiError> {
        let response = self.execute(Method::GET, endpoint, None).await?;
        decode(&response)
    }

    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        body: &B,
    ) -> Result<R, ApiError> {
        let body = serde_json::to_value(body).map_err(|e| ApiError::Config(e.to_string()))?;
        let response = self.execute(Method::POST, endpoint, Some(body)).await?;
        decode(&response)
    }

    /// Binary download (CSV, PDF) through the same retry pipeline.
    pub async fn get_bytes(&self, endpoint: &Endpoint) -> Result<Vec<u8>, ApiError> {
        Ok(self.execute(Method::GET, endpoint, None).await?.body)
    }

    pub async fn health(&self) -> Result<HealthResponse, ApiError> {
        self.get(&query::health()).await
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats, ApiError> {
        self.get(&query::dashboard_stats()).await
    }

    /// Lots with filtering, sorting and pagination.
    pub async fn lots(&self, request: &GetLotsRequest) -> Result<GetLotsResponse, ApiError> {
        self.get(&query::lots(request)?).await
    }

    /// HIGH lots, riskiest first.
    pub async fn high_risk_lots(&self, page: u32, size: u32) -> Result<GetLotsResponse, ApiError> {
        self.lots(
            &GetLotsRequest::page(page, size)
                .with_risk_level(RiskLevel::High)
                .sorted_by(SortBy::RiskScore, true),
        )
        .await
    }

    /// CRITICAL lots, riskiest first.
    pub async fn critical_risk_lots(
        &self,
        page: u32,
        size: u32,
    ) -> Result<GetLotsResponse, ApiError> {
        self.lots(
            &GetLotsRequest::page(page, size)
                .with_risk_level(RiskLevel::Critical)
                .sorted_by(SortBy::RiskScore, true),
        )
        .await
    }

    /// Search lot names and descriptions, 20 per page.
    pub async fn search_lots(
        &self,
        text: &str,
        risk_level: Option<RiskLevel>,
        page: u32,
    ) -> Result<GetLotsResponse, ApiError> {
        let mut request = GetLotsRequest::page(page, 20).with_search(text);
        request.risk_level = risk_level;
        self.lots(&request).await
    }

    pub async fn lot_analysis(&self, lot_id: &str) -> Result<FullAnalysis, ApiError> {
        self.get(&query::lot_analysis(lot_id)?).await
    }

    /// Score an arbitrary specification text.
    pub async fn analyze_text(&self, request: &AnalyzeTextRequest) -> Result<FullAnalysis, ApiError> {
        self.post(&query::analyze(request)?, request).await
    }

    pub async fn submit_feedback(
        &self,
        request: &FeedbackRequest,
    ) -> Result<FeedbackResponse, ApiError> {
        self.post(&query::feedback(request)?, request).await
    }

    pub async fn category_pricing(
        &self,
        params: &CategoryPricingQuery,
    ) -> Result<CategoryPricingResponse, ApiError> {
        self.get(&query::category_pricing(params)).await
    }

    pub async fn category_pricing_detail(
        &self,
        category_code: &str,
    ) -> Result<CategoryPricingDetail, ApiError> {
        self.get(&query::category_pricing_detail(category_code)?).await
    }

    pub async fn categories(
        &self,
        params: &DirectoryQuery,
    ) -> Result<Page<CategoryListItem>, ApiError> {
        self.get(&query::categories(params)?).await
    }

    pub async fn category(&self, category_code: &str) -> Result<CategoryDetail, ApiError> {
        self.get(&query::category(category_code)?).await
    }

    pub async fn customers(
        &self,
        params: &DirectoryQuery,
    ) -> Result<Page<CustomerListItem>, ApiError> {
        self.get(&query::customers(params)?).await
    }

    pub async fn customer(&self, bin: &str) -> Result<CustomerDetail, ApiError> {
        self.get(&query::customer(bin)?).await
    }

    pub async fn network_graph(&self, params: &NetworkGraphQuery) -> Result<NetworkGraph, ApiError> {
        self.get(&query::network_graph(params)).await
    }

    /// Relationship metrics and flags for one organisation.
    pub async fn network_node(&self, bin: &str) -> Result<NetworkAnalysis, ApiError> {
        self.get(&query::network_node(bin)?).await
    }

    pub async fn timeline(&self, params: &TimelineQuery) -> Result<TimelineResponse, ApiError> {
        self.get(&query::timeline(params)).await
    }

    pub async fn compare_lots(&self, request: &CompareRequest) -> Result<CompareResponse, ApiError> {
        self.post(&query::compare(request)?, request).await
    }

    pub async fn export_csv(&self, filters: &ExportFilters) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(&query::export_csv(filters)).await
    }

    pub async fn export_lot_pdf(&self, lot_id: &str) -> Result<Vec<u8>, ApiError> {
        self.get_bytes(&query::export_lot_pdf(lot_id)?).await
    }
}

fn decode<R: DeserializeOwned>(response: &HttpResponse) -> Result<R, ApiError> {
    serde_json::from_slice(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{FakeReply, FakeTransport};
    use goszakup_model::{FeedbackLabel, ServiceStatus};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn client(fake: FakeTransport) -> ApiClient<FakeTransport> {
        ApiClient::with_transport(ClientConfig::default(), fake).unwrap()
    }

    fn analysis_body(score: f64, level: &str) -> serde_json::Value {
        serde_json::json!({
            "lot_id": "TEXT-1",
            "lot_data": {"name_ru": "Ноутбук"},
            "final_score": score,
            "final_level": level,
            "ml_prediction": {}
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_retry_on_404() {
        let api = client(FakeTransport::always(FakeReply::json(
            404,
            serde_json::json!({"detail": "Lot LOT-9 not found"}),
        )));

        let err = api.lot_analysis("LOT-9").await.unwrap_err();

        assert_eq!(err.status_code(), Some(404));
        assert_eq!(err.to_string(), "Lot LOT-9 not found");
        assert_eq!(api.transport().call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_500_with_growing_backoff() {
        let api = client(FakeTransport::always(FakeReply::raw(500, "")));

        let err = api.health().await.unwrap_err();

        assert_eq!(err.to_string(), "HTTP 500");
        let calls = api.transport().calls();
        assert_eq!(calls.len(), 4);
        let expected = [1u64, 2, 4];
        for (pair, secs) in calls.windows(2).zip(expected) {
            let gap = pair[1].at - pair[0].at;
            assert!(gap >= Duration::from_secs(secs), "gap {:?} < {}s", gap, secs);
            assert!(gap < Duration::from_secs(secs) + Duration::from_millis(50));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_503_is_retried_until_ready() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let api = client(FakeTransport::new(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                FakeReply::json(503, serde_json::json!({"detail": "Analyzer not ready"}))
            } else {
                FakeReply::json(200, serde_json::json!({"status": "ok", "total_lots": 57}))
            }
        }));

        let health = api.health().await.unwrap();

        assert_eq!(health.status, ServiceStatus::Ok);
        assert_eq!(health.total_lots, Some(57));
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_429_is_not_retried() {
        let api = client(FakeTransport::always(FakeReply::raw(429, "")));
        let err = api.dashboard_stats().await.unwrap_err();
        assert_eq!(err.status_code(), Some(429));
        assert_eq!(api.transport().call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_then_success() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let api = client(FakeTransport::new(move |_| {
            let reply = FakeReply::json(200, serde_json::json!({"status": "ok"}));
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                reply.delayed(Duration::from_secs(60))
            } else {
                reply
            }
        }));

        assert!(api.health().await.is_ok());
        assert_eq!(api.transport().call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_without_retries() {
        let config = ClientConfig::default()
            .with_retry_attempts(0)
            .with_timeout(Duration::from_secs(5));
        let fake = FakeTransport::always(
            FakeReply::json(200, serde_json::json!({"status": "ok"})).delayed(Duration::from_secs(10)),
        );
        let api = ApiClient::with_transport(config, fake).unwrap();

        let err = api.health().await.unwrap_err();

        assert!(matches!(err, ApiError::Timeout(limit) if limit == Duration::from_secs(5)));
        assert_eq!(err.status_code(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_surface_last_error() {
        let config = ClientConfig::default().with_retry_attempts(2);
        let api = ApiClient::with_transport(config, FakeTransport::always(FakeReply::connection_refused()))
            .unwrap();

        let err = api.health().await.unwrap_err();

        assert!(matches!(err, ApiError::Connection(_)));
        assert_eq!(api.transport().call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_success_body_is_terminal() {
        let api = client(FakeTransport::always(FakeReply::raw(200, "<html>")));
        let err = api.health().await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(api.transport().call_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_request_never_reaches_network() {
        let api = client(FakeTransport::always(FakeReply::raw(200, "{}")));
        let err = api.analyze_text(&AnalyzeTextRequest::new("   ")).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(err.to_string(), "Text cannot be empty");
        assert_eq!(api.transport().call_count(), 0);
    }

    #[tokio::test]
    async fn test_analyze_posts_json_and_keeps_server_level() {
        let api = client(FakeTransport::always(FakeReply::json(200, analysis_body(75.0, "HIGH"))));
        let request = AnalyzeTextRequest::new("Требуется Dell Latitude, аналоги не допускаются");

        let analysis = api.analyze_text(&request).await.unwrap();

        assert_eq!(analysis.final_score, 75.0);
        assert_eq!(analysis.final_level, RiskLevel::High);
        let call = &api.transport().calls()[0];
        assert_eq!(call.method, Method::POST);
        assert_eq!(call.url.path(), "/api/analyze");
        assert_eq!(
            call.body,
            Some(serde_json::json!({"text": "Требуется Dell Latitude, аналоги не допускаются"}))
        );
    }

    #[tokio::test]
    async fn test_analyze_accepts_null_lot_fields() {
        let body = serde_json::json!({
            "lot_id": "MANUAL",
            "lot_data": {
                "name_ru": "Ручной анализ",
                "category_code": null,
                "category_name": "",
                "budget": null,
                "participants_count": null,
                "deadline_days": null,
                "city": ""
            },
            "final_score": 75.0,
            "final_level": "HIGH",
            "rule_analysis": null,
            "features": {
                "lot_id": "MANUAL",
                "has_brand": true,
                "budget": null,
                "participants_count": null,
                "deadline_days": null,
                "category_code": null
            },
            "similar_lots": [],
            "ml_prediction": {},
            "network_flags": [],
            "explanation": []
        });
        let api = client(FakeTransport::always(FakeReply::json(200, body)));
        let request = AnalyzeTextRequest::new("Требуется Dell Latitude, аналоги не допускаются");

        let analysis = api.analyze_text(&request).await.unwrap();

        assert_eq!(analysis.lot_data.budget, 0.0);
        assert_eq!(analysis.lot_data.category_code, "");
        assert_eq!(analysis.final_level, RiskLevel::High);
        assert!(analysis.features.unwrap().has_brand);
        assert_eq!(api.transport().call_count(), 1);
    }

    #[tokio::test]
    async fn test_feedback_body() {
        let api = client(FakeTransport::always(FakeReply::json(200, serde_json::json!({"status": "ok"}))));
        let request = FeedbackRequest {
            lot_id: "LOT-1".into(),
            label: FeedbackLabel::Risky,
            comment: Some("бренд".into()),
        };

        api.submit_feedback(&request).await.unwrap();

        let call = &api.transport().calls()[0];
        assert_eq!(
            call.body,
            Some(serde_json::json!({"lot_id": "LOT-1", "label": 1, "comment": "бренд"}))
        );
    }

    #[test]
    fn test_url_building() {
        let api = ApiClient::with_transport(
            ClientConfig::default().with_base_url("http://77.42.43.153:8080/"),
            FakeTransport::always(FakeReply::raw(200, "")),
        )
        .unwrap();

        let url = api.url_for(&query::lots(&GetLotsRequest::page(0, 20)).unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://77.42.43.153:8080/api/lots?page=0&size=20");

        let url = api.url_for(&query::lot_analysis("LOT/1").unwrap()).unwrap();
        assert_eq!(url.as_str(), "http://77.42.43.153:8080/api/lots/LOT%2F1/analysis");

        let url = api.url_for(&query::health()).unwrap();
        assert_eq!(url.as_str(), "http://77.42.43.153:8080/api/health");
    }

    #[test]
    fn test_base_url_with_prefix() {
        let api = ApiClient::with_transport(
            ClientConfig::default().with_base_url("https://example.kz/risk"),
            FakeTransport::always(FakeReply::raw(200, "")),
        )
        .unwrap();
        let url = api.url_for(&query::dashboard_stats()).unwrap();
        assert_eq!(url.as_str(), "https://example.kz/risk/api/stats/dashboard");
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        let fake = || FakeTransport::always(FakeReply::raw(200, ""));
        assert!(matches!(
            ApiClient::with_transport(ClientConfig::default().with_base_url("not a url"), fake()),
            Err(ApiError::Config(_))
        ));
        assert!(matches!(
            ApiClient::with_transport(ClientConfig::default().with_base_url("mailto:a@b.kz"), fake()),
            Err(ApiError::Config(_))
        ));
    }

    #[tokio::test]
    async fn test_export_returns_raw_bytes() {
        let api = client(FakeTransport::always(FakeReply::raw(200, "lot_id;score\nLOT-1;65.5\n")));
        let csv = api
            .export_csv(&ExportFilters {
                exclude_synthetic: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(csv.starts_with(b"lot_id;score"));
        assert_eq!(
            api.transport().calls()[0].url.query(),
            Some("exclude_synthetic=true")
        );
    }
}
