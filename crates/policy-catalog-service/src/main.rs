use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_graphql::http::GraphiQLSource;
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::Serialize;
use time::OffsetDateTime;
use tracing_subscriber::EnvFilter;

use policy_catalog_api::{build_schema, CatalogSchema};
use policy_catalog_core::{
    demo_dataset, generate_dataset, read_snapshot, Dataset, FixtureConfig, PolicyStore, SortCache,
    Timestamp, DEFAULT_FIXTURE_CUSTOMERS, DEFAULT_FIXTURE_POLICIES,
};

#[derive(Debug, Parser)]
#[command(name = "policy-catalog-service")]
#[command(about = "GraphQL service for the insurance policy catalog")]
struct Args {
    /// Address to bind the HTTP listener on.
    #[arg(long, default_value = "127.0.0.1:4000")]
    bind: SocketAddr,
    /// Snapshot directory to serve instead of generated data.
    #[arg(long, conflicts_with = "seed")]
    data_dir: Option<PathBuf>,
    /// Seed for a generated dataset; without it the bundled demo data is
    /// served.
    #[arg(long)]
    seed: Option<u64>,
    /// Customer count for generated datasets.
    #[arg(long, default_value_t = DEFAULT_FIXTURE_CUSTOMERS)]
    customers: usize,
    /// Policy count for generated datasets.
    #[arg(long, default_value_t = DEFAULT_FIXTURE_POLICIES)]
    policies: usize,
    /// Generation reference instant as RFC 3339; defaults to the wall
    /// clock.
    #[arg(long)]
    now: Option<String>,
    /// Number of sort permutations the cache keeps.
    #[arg(long, default_value_t = 16)]
    cache_capacity: usize,
}

#[derive(Clone)]
struct ServiceState {
    schema: CatalogSchema,
    store: Arc<PolicyStore>,
}

fn app(state: ServiceState) -> Router {
    Router::new()
        .route("/graphql", post(graphql_handler).get(graphiql))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn graphql_handler(
    State(state): State<ServiceState>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let operation = request.operation_name.clone().unwrap_or_default();
    let response = state.schema.execute(request).await;
    if response.errors.is_empty() {
        tracing::debug!(%operation, "graphql request served");
    } else {
        tracing::warn!(%operation, errors = response.errors.len(), "graphql request failed");
    }
    Json(response)
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}

#[derive(Debug, Serialize)]
struct HealthBody {
    status: &'static str,
    policies: usize,
    customers: usize,
}

async fn healthz(State(state): State<ServiceState>) -> Json<HealthBody> {
    Json(HealthBody {
        status: "ok",
        policies: state.store.policy_count(),
        customers: state.store.customer_count(),
    })
}

fn load_dataset(args: &Args) -> Result<Dataset> {
    if let Some(dir) = &args.data_dir {
        let dataset = read_snapshot(dir)?;
        tracing::info!(dir = %dir.display(), "loaded snapshot dataset");
        return Ok(dataset);
    }
    if let Some(seed) = args.seed {
        let now = match &args.now {
            Some(value) => Timestamp::parse_rfc3339(value)?,
            None => Timestamp::from_datetime(OffsetDateTime::now_utc()),
        };
        let config =
            FixtureConfig { seed, now, customers: args.customers, policies: args.policies };
        let dataset = generate_dataset(&config)?;
        tracing::info!(
            seed,
            customers = args.customers,
            policies = args.policies,
            "generated dataset"
        );
        return Ok(dataset);
    }
    tracing::info!("serving bundled demo dataset");
    Ok(demo_dataset())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    let args = Args::parse();

    let dataset = load_dataset(&args)?;
    let store = Arc::new(PolicyStore::from_dataset(dataset)?);
    let cache = Arc::new(SortCache::new(args.cache_capacity)?);
    let state = ServiceState { schema: build_schema(Arc::clone(&store), cache), store };

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    tracing::info!(
        bind = %args.bind,
        policies = state.store.policy_count(),
        customers = state.store.customer_count(),
        "policy catalog service listening"
    );
    axum::serve(listener, app(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::response::Response;
    use tower::ServiceExt;

    use super::*;

    fn demo_state() -> ServiceState {
        let store = match PolicyStore::from_dataset(demo_dataset()) {
            Ok(store) => store,
            Err(err) => panic!("demo dataset should validate: {err}"),
        };
        let cache = match SortCache::new(8) {
            Ok(cache) => cache,
            Err(err) => panic!("cache should build: {err}"),
        };
        let store = Arc::new(store);
        ServiceState { schema: build_schema(Arc::clone(&store), Arc::new(cache)), store }
    }

    async fn response_json(response: Response) -> serde_json::Value {
        let body = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(body) => body,
            Err(err) => panic!("body should collect: {err}"),
        };
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(err) => panic!("body should be JSON: {err}"),
        }
    }

    async fn post_graphql(body: &serde_json::Value) -> Response {
        let request = http::Request::builder()
            .method(http::Method::POST)
            .uri("/graphql")
            .header(http::header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                serde_json::to_vec(body)
                    .unwrap_or_else(|err| panic!("body should serialize: {err}")),
            ))
            .unwrap_or_else(|err| panic!("request should build: {err}"));
        app(demo_state())
            .oneshot(request)
            .await
            .unwrap_or_else(|err| panic!("request should route: {err}"))
    }

    // Test IDs: TSVC-001
    #[tokio::test]
    async fn healthz_reports_catalog_counts() {
        let request = http::Request::builder()
            .uri("/healthz")
            .body(Body::empty())
            .unwrap_or_else(|err| panic!("request should build: {err}"));
        let response = app(demo_state())
            .oneshot(request)
            .await
            .unwrap_or_else(|err| panic!("request should route: {err}"));

        assert_eq!(response.status(), http::StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(body["status"], serde_json::json!("ok"));
        assert_eq!(body["policies"], serde_json::json!(7));
        assert_eq!(body["customers"], serde_json::json!(4));
    }

    // Test IDs: TSVC-002
    #[tokio::test]
    async fn graphql_endpoint_serves_a_sorted_page() {
        let response = post_graphql(&serde_json::json!({
            "query": policy_catalog_api::POLICY_LIST_QUERY,
            "variables": {
                "offset": 0,
                "limit": 3,
                "sort": { "fields": ["policyNumber"], "order": "ASC" },
            },
        }))
        .await;

        assert_eq!(response.status(), http::StatusCode::OK);
        let body = response_json(response).await;
        let list = &body["data"]["policyList"];
        assert_eq!(list["total"], serde_json::json!(7));
        assert_eq!(list["hasNextPage"], serde_json::json!(true));
        assert_eq!(list["policies"][0]["policyNumber"], serde_json::json!("a1"));
        assert_eq!(list["policies"][0]["customer"]["lastName"], serde_json::json!("Ames"));
    }

    // Test IDs: TSVC-003
    #[tokio::test]
    async fn graphql_errors_carry_machine_readable_codes() {
        let response = post_graphql(&serde_json::json!({
            "query": policy_catalog_api::POLICY_LIST_QUERY,
            "variables": { "sort": { "fields": ["nonexistent"] } },
        }))
        .await;

        assert_eq!(response.status(), http::StatusCode::OK);
        let body = response_json(response).await;
        assert_eq!(
            body["errors"][0]["extensions"]["code"],
            serde_json::json!("UNKNOWN_SORT_FIELD")
        );
    }

    // Test IDs: TSVC-004
    #[tokio::test]
    async fn graphiql_is_served_on_get() {
        let request = http::Request::builder()
            .uri("/graphql")
            .body(Body::empty())
            .unwrap_or_else(|err| panic!("request should build: {err}"));
        let response = app(demo_state())
            .oneshot(request)
            .await
            .unwrap_or_else(|err| panic!("request should route: {err}"));

        assert_eq!(response.status(), http::StatusCode::OK);
        let content_type = response
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("text/html"), "got content type {content_type}");
        let body = match to_bytes(response.into_body(), 1024 * 1024).await {
            Ok(body) => body,
            Err(err) => panic!("body should collect: {err}"),
        };
        let html = String::from_utf8_lossy(&body);
        assert!(html.contains("GraphiQL"), "expected the GraphiQL page");
    }

    // Test IDs: TSVC-005
    #[tokio::test]
    async fn unknown_routes_return_not_found() {
        let request = http::Request::builder()
            .uri("/nope")
            .body(Body::empty())
            .unwrap_or_else(|err| panic!("request should build: {err}"));
        let response = app(demo_state())
            .oneshot(request)
            .await
            .unwrap_or_else(|err| panic!("request should route: {err}"));

        assert_eq!(response.status(), http::StatusCode::NOT_FOUND);
    }

    // Test IDs: TSVC-006
    #[test]
    fn dataset_selection_follows_the_arguments() {
        let demo_args = Args::try_parse_from(["policy-catalog-service"])
            .unwrap_or_else(|err| panic!("bare invocation should parse: {err}"));
        let dataset = match load_dataset(&demo_args) {
            Ok(dataset) => dataset,
            Err(err) => panic!("demo dataset should load: {err}"),
        };
        assert_eq!(dataset.policies.len(), 7);

        let seeded_args = Args::try_parse_from([
            "policy-catalog-service",
            "--seed",
            "7",
            "--now",
            "2021-08-01T00:00:00Z",
            "--customers",
            "5",
            "--policies",
            "20",
        ])
        .unwrap_or_else(|err| panic!("seeded invocation should parse: {err}"));
        let seeded = match load_dataset(&seeded_args) {
            Ok(dataset) => dataset,
            Err(err) => panic!("seeded dataset should load: {err}"),
        };
        assert_eq!(seeded.customers.len(), 5);
        assert_eq!(seeded.policies.len(), 20);

        let conflict = Args::try_parse_from([
            "policy-catalog-service",
            "--data-dir",
            "/tmp/somewhere",
            "--seed",
            "7",
        ]);
        assert!(conflict.is_err(), "data-dir and seed should conflict");
    }
}
