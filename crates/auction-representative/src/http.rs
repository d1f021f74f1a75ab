//! The HTTP reference transport for a representative.
//!
//! One route per [`Representative`] operation, matching the verbs a pool
//! client fans requests out to. Kept deliberately thin: all the bookkeeping
//! lives on [`Representative`] itself, this module only translates it to and
//! from JSON over HTTP.

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse,
        Response,
    },
    routing::{
        get,
        post,
    },
    Json,
    Router,
};
use auction_types::Instance;

use crate::Representative;

/// Builds the router for a single representative.
///
/// The caller is responsible for binding and serving it (see
/// `auction-rep-node` for the reference binary).
#[must_use]
pub fn router(rep: Representative) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/total_resources", get(total_resources))
        .route("/instances", get(instances))
        .route("/reset", get(reset))
        .route("/set_instances", post(set_instances))
        .route("/vote", post(vote))
        .route("/reserve_and_recast_vote", post(reserve_and_recast_vote))
        .route("/release", post(release))
        .route("/claim", post(claim))
        .with_state(rep)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn total_resources(State(rep): State<Representative>) -> Json<u32> {
    Json(rep.total_resources())
}

async fn instances(State(rep): State<Representative>) -> Json<Vec<Instance>> {
    Json(rep.instances())
}

async fn reset(State(rep): State<Representative>) -> StatusCode {
    rep.reset();
    StatusCode::OK
}

async fn set_instances(
    State(rep): State<Representative>,
    Json(instances): Json<Vec<Instance>>,
) -> StatusCode {
    rep.set_instances(instances);
    StatusCode::OK
}

async fn vote(State(rep): State<Representative>, Json(instance): Json<Instance>) -> Response {
    match rep.vote(&instance) {
        Ok(score) => Json(score).into_response(),
        Err(_insufficient_resources) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn reserve_and_recast_vote(
    State(rep): State<Representative>,
    Json(instance): Json<Instance>,
) -> Response {
    match rep.reserve_and_recast_vote(&instance) {
        Ok(score) => Json(score).into_response(),
        Err(_insufficient_resources) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

async fn release(State(rep): State<Representative>, Json(instance): Json<Instance>) -> StatusCode {
    rep.release(&instance);
    StatusCode::OK
}

async fn claim(State(rep): State<Representative>, Json(instance): Json<Instance>) -> StatusCode {
    rep.claim(&instance);
    StatusCode::OK
}

#[cfg(test)]
mod tests {
    use auction_types::AppGuid;

    use super::*;
    use crate::Representative;

    /// Binds `router(rep)` on an ephemeral loopback port and serves it on a
    /// background task, returning the base URL to hit it at.
    async fn spawn_server(rep: Representative) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = router(rep);
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn instance(app: &str, resources: u32) -> Instance {
        Instance::new(AppGuid::new(app), resources)
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let base = spawn_server(Representative::new("rep-1", 100)).await;
        let response = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn total_resources_and_instances_reflect_server_state() {
        let rep = Representative::new("rep-1", 100);
        let inst = instance("app", 10);
        rep.set_instances(vec![inst.clone()]);
        let base = spawn_server(rep).await;

        let total: u32 =
            reqwest::get(format!("{base}/total_resources")).await.unwrap().json().await.unwrap();
        assert_eq!(total, 100);

        let listed: Vec<Instance> =
            reqwest::get(format!("{base}/instances")).await.unwrap().json().await.unwrap();
        assert_eq!(listed, vec![inst]);
    }

    #[tokio::test]
    async fn set_instances_then_reset_round_trips_through_instances() {
        let base = spawn_server(Representative::new("rep-1", 100)).await;
        let client = reqwest::Client::new();
        let inst = instance("app", 10);

        client
            .post(format!("{base}/set_instances"))
            .json(&vec![inst.clone()])
            .send()
            .await
            .unwrap();
        let listed: Vec<Instance> =
            reqwest::get(format!("{base}/instances")).await.unwrap().json().await.unwrap();
        assert_eq!(listed, vec![inst]);

        client.get(format!("{base}/reset")).send().await.unwrap();
        let listed: Vec<Instance> =
            reqwest::get(format!("{base}/instances")).await.unwrap().json().await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn vote_on_a_full_representative_is_service_unavailable() {
        let base = spawn_server(Representative::new("rep-1", 5)).await;
        let client = reqwest::Client::new();
        let response =
            client.post(format!("{base}/vote")).json(&instance("app", 10)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn reserve_release_and_claim_round_trip_over_http() {
        let rep = Representative::new("rep-1", 100);
        let rep_clone = rep.clone();
        let base = spawn_server(rep).await;
        let client = reqwest::Client::new();
        let inst = instance("app", 10);

        let response = client
            .post(format!("{base}/reserve_and_recast_vote"))
            .json(&inst)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(rep_clone.instances()[0].tentative);

        client.post(format!("{base}/release")).json(&inst).send().await.unwrap();
        assert!(rep_clone.instances().is_empty());

        client.post(format!("{base}/reserve_and_recast_vote")).json(&inst).send().await.unwrap();
        client.post(format!("{base}/claim")).json(&inst).send().await.unwrap();
        assert!(!rep_clone.instances()[0].tentative);
    }
}
