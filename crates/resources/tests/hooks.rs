use std::sync::Arc;
use std::time::Duration;

use goszakup_client::fake::{FakeReply, FakeTransport};
use goszakup_client::{ApiClient, ClientConfig, HttpRequest};
use goszakup_model::{AnalyzeTextRequest, GetLotsRequest, RiskLevel, SortBy};
use goszakup_resources::{lot_analysis, lots, TextAnalysis};
use pretty_assertions::assert_eq;

fn client(fake: FakeTransport) -> Arc<ApiClient<FakeTransport>> {
    Arc::new(ApiClient::with_transport(ClientConfig::default(), fake).unwrap())
}

fn query_value(request: &HttpRequest, key: &str) -> Option<String> {
    request
        .url
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

fn lots_page(total: u64, page: u32, size: u32) -> serde_json::Value {
    serde_json::json!({
        "total": total,
        "page": page,
        "size": size,
        "items": [{
            "lot_id": format!("LOT-{page}"),
            "name_ru": "Ноутбук",
            "category_code": "26.20",
            "category_name": "Компьютеры",
            "budget": 1_500_000.0,
            "participants_count": 1,
            "deadline_days": 5,
            "city": "Астана",
            "risk_score": 82.0,
            "risk_level": "CRITICAL",
            "rules_count": 4
        }]
    })
}

#[tokio::test(start_paused = true)]
async fn test_latest_page_wins_when_responses_arrive_inverted() {
    // Earlier pages answer later: page 0 after 300ms, page 2 after 100ms.
    let api = client(FakeTransport::new(|request| {
        let page: u32 = query_value(request, "page")
            .and_then(|p| p.parse().ok())
            .unwrap_or(0);
        FakeReply::json(200, lots_page(57, page, 20))
            .delayed(Duration::from_millis(300 - 100 * u64::from(page)))
    }));
    let resource = lots(&api);

    for page in 0..3 {
        resource.set_params(GetLotsRequest::page(page, 20));
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let state = resource.settled().await;
    assert_eq!(state.data.map(|d| d.page), Some(2));

    // Give the superseded fetches time to land if they were still running.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(resource.state().data.map(|d| d.page), Some(2));
    assert_eq!(resource.generation(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_identical_params_fetch_once() {
    let api = client(FakeTransport::always(FakeReply::json(200, lots_page(57, 0, 20))));
    let resource = lots(&api);

    resource.set_params(GetLotsRequest::page(0, 20));
    resource.settled().await;
    resource.set_params(GetLotsRequest::page(0, 20));
    resource.settled().await;

    assert_eq!(api.transport().call_count(), 1);

    resource.refetch();
    resource.settled().await;
    assert_eq!(api.transport().call_count(), 2);
}

#[tokio::test]
async fn test_sorted_lots_listing() {
    let api = client(FakeTransport::always(FakeReply::json(200, lots_page(57, 0, 20))));
    let resource = lots(&api);

    resource.set_params(GetLotsRequest::page(0, 20).sorted_by(SortBy::RiskScore, true));
    let state = resource.settled().await;

    assert!(!state.loading);
    assert_eq!(state.error, None);
    assert_eq!(state.data.map(|d| d.total), Some(57));
    assert_eq!(
        api.transport().calls()[0].url.query(),
        Some("page=0&size=20&sort_by=risk_score&sort_desc=true")
    );
}

#[tokio::test]
async fn test_missing_lot_id_stays_idle() {
    let api = client(FakeTransport::always(FakeReply::raw(200, "{}")));
    let resource = lot_analysis(&api);

    resource.set_params(None);
    assert!(resource.state().is_idle());
    resource.set_params(Some("  ".into()));
    assert!(resource.state().is_idle());

    assert_eq!(api.transport().call_count(), 0);
}

#[tokio::test]
async fn test_lot_analysis_error_replaces_data() {
    let api = client(FakeTransport::new(|request| {
        if request.url.path().contains("LOT-1") {
            FakeReply::json(
                200,
                serde_json::json!({"lot_id": "LOT-1", "final_score": 30.0, "final_level": "MEDIUM"}),
            )
        } else {
            FakeReply::json(404, serde_json::json!({"detail": "Lot LOT-2 not found"}))
        }
    }));
    let resource = lot_analysis(&api);

    resource.set_params(Some("LOT-1".into()));
    assert!(resource.settled().await.data.is_some());

    resource.set_params(Some("LOT-2".into()));
    let state = resource.settled().await;

    assert!(state.data.is_none());
    assert_eq!(state.error.as_deref(), Some("Lot LOT-2 not found"));
}

#[tokio::test]
async fn test_text_analysis_keeps_server_level() {
    let api = client(FakeTransport::always(FakeReply::json(
        200,
        serde_json::json!({
            "lot_id": "TEXT-1",
            "final_score": 75,
            "final_level": "HIGH"
        }),
    )));
    let hook = TextAnalysis::new(api);

    let request = AnalyzeTextRequest::new("Требуется Dell Latitude, аналоги не допускаются");
    hook.analyze(&request).await.unwrap();

    let analysis = hook.state().data.unwrap();
    assert_eq!(analysis.final_score, 75.0);
    assert_eq!(analysis.final_level, RiskLevel::High);
    assert_eq!(request.text, "Требуется Dell Latitude, аналоги не допускаются");
}

#[tokio::test(start_paused = true)]
async fn test_dropping_resource_cancels_fetch() {
    let api = client(FakeTransport::always(
        FakeReply::json(200, lots_page(1, 0, 20)).delayed(Duration::from_secs(5)),
    ));
    let resource = lots(&api);
    let mut updates = resource.subscribe();

    resource.set_params(GetLotsRequest::page(0, 20));
    drop(resource);

    assert!(updates.borrow_and_update().loading);
    // The sender went away with the resource; no completion was published.
    assert!(updates.changed().await.is_err());
}
