//! HTTP clients exercised against a local axum server.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;

use rental_ingest::{
    AddressGeocoder, BatchFetcher, CancellationToken, Coordinate, CountProbe, GeocodeError,
    Geocoder, GeocoderConfig, IngestError, OpenApiSource, PageEnvelope, PageRange, RecordSource,
    RetryPolicy, SourceConfig, TransportError,
};
use test_utils::{
    assert_coords_approx_eq, coords, create_rows, geocode_body, geocode_miss_body, no_data_body,
    page_body, DATASET,
};

#[derive(Clone, Default)]
struct Upstream {
    hits: Arc<AtomicUsize>,
}

async fn dataset_handler(
    State(state): State<Upstream>,
    Path((key, dataset, start, end)): Path<(String, String, u64, u64)>,
) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);

    if key != "KEY" || dataset != DATASET {
        return (StatusCode::NOT_FOUND, "unknown dataset").into_response();
    }
    match start {
        // Always a server error.
        9001 => (StatusCode::SERVICE_UNAVAILABLE, "busy").into_response(),
        // Not JSON at all.
        9101 => (StatusCode::OK, "<html>maintenance</html>").into_response(),
        // Slower than the client timeout.
        9201 => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(page_body(1, create_rows(1, 1))).into_response()
        }
        s if s > 250 => Json(no_data_body()).into_response(),
        s => Json(page_body(250, create_rows(s, end.min(250)))).into_response(),
    }
}

#[derive(Deserialize)]
struct AddressQuery {
    query: String,
}

async fn geocode_handler(headers: HeaderMap, Query(q): Query<AddressQuery>) -> Response {
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some("KakaoAK REST") {
        return (StatusCode::UNAUTHORIZED, "bad key").into_response();
    }
    match q.query.as_str() {
        "서울특별시 중구 태평로1가 31" => {
            Json(geocode_body(coords::CITY_HALL.1, coords::CITY_HALL.0)).into_response()
        }
        "broken" => (StatusCode::INTERNAL_SERVER_ERROR, "oops").into_response(),
        _ => Json::<Value>(geocode_miss_body()).into_response(),
    }
}

async fn serve(state: Upstream) -> String {
    let app = Router::new()
        .route("/:key/json/:dataset/:start/:end", get(dataset_handler))
        .route("/v2/local/search/address.json", get(geocode_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn source_config(base_url: &str) -> SourceConfig {
    let mut config = SourceConfig::new("KEY");
    config.base_url = base_url.to_string();
    config.request_timeout = Duration::from_millis(500);
    config
}

#[tokio::test]
async fn test_source_decodes_pages() {
    let base = serve(Upstream::default()).await;
    let source = OpenApiSource::new(source_config(&base)).unwrap();

    match source.fetch_window(PageRange::new(201, 300)).await.unwrap() {
        PageEnvelope::Rows { total_count, rows } => {
            assert_eq!(total_count, Some(250));
            assert_eq!(rows.len(), 50);
            assert_eq!(rows[0].get_i64("SEQ"), Some(201));
        }
        other => panic!("unexpected envelope: {:?}", other),
    }

    assert_eq!(
        source.fetch_window(PageRange::new(301, 400)).await,
        Ok(PageEnvelope::NoData)
    );
}

#[tokio::test]
async fn test_source_classifies_failures() {
    let base = serve(Upstream::default()).await;
    let source = OpenApiSource::new(source_config(&base)).unwrap();

    assert_eq!(
        source.fetch_window(PageRange::new(9001, 9100)).await,
        Err(TransportError::Status(503))
    );
    assert!(matches!(
        source.fetch_window(PageRange::new(9101, 9200)).await,
        Ok(PageEnvelope::Malformed(_))
    ));
    assert_eq!(
        source.fetch_window(PageRange::new(9201, 9300)).await,
        Err(TransportError::Timeout)
    );
}

#[tokio::test]
async fn test_fetcher_retries_over_http() {
    let state = Upstream::default();
    let base = serve(state.clone()).await;
    let source = Arc::new(OpenApiSource::new(source_config(&base)).unwrap());
    let fetcher = BatchFetcher::new(source, RetryPolicy::new(3, Duration::from_millis(5)));

    let err = fetcher
        .fetch_page(PageRange::new(9001, 9100), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IngestError::Window {
            attempts: 3,
            cause: TransportError::Status(503),
            ..
        }
    ));
    assert_eq!(state.hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_probe_over_http() {
    let base = serve(Upstream::default()).await;
    let source = Arc::new(OpenApiSource::new(source_config(&base)).unwrap());
    let probe = CountProbe::new(source, RetryPolicy::immediate(3), PageRange::new(1, 1000));

    assert_eq!(
        probe.probe_total_count(&CancellationToken::new()).await,
        Ok(250)
    );
}

#[tokio::test]
async fn test_geocoder_over_http() {
    let base = serve(Upstream::default()).await;
    let mut config = GeocoderConfig::new("REST");
    config.endpoint = format!("{}/v2/local/search/address.json", base);
    let geocoder = AddressGeocoder::new(config).unwrap();

    let hit: Coordinate = geocoder.geocode("서울특별시 중구 태평로1가 31").await.unwrap();
    assert_coords_approx_eq!(
        (hit.latitude, hit.longitude),
        (coords::CITY_HALL.0, coords::CITY_HALL.1),
        1e-9
    );

    assert_eq!(
        geocoder.geocode("nowhere").await,
        Err(GeocodeError::NoMatch)
    );
    assert_eq!(
        geocoder.geocode("broken").await,
        Err(GeocodeError::Transport(TransportError::Status(500)))
    );
}

#[tokio::test]
async fn test_geocoder_rejects_wrong_key() {
    let base = serve(Upstream::default()).await;
    let mut config = GeocoderConfig::new("WRONG");
    config.endpoint = format!("{}/v2/local/search/address.json", base);
    let geocoder = AddressGeocoder::new(config).unwrap();

    assert_eq!(
        geocoder.geocode("서울특별시 중구 태평로1가 31").await,
        Err(GeocodeError::Transport(TransportError::Status(401)))
    );
}
