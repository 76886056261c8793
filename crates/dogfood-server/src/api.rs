use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, Method},
    routing::{get, patch, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use dogfood_feed::{ChangeEvent, LocalFeed};
use dogfood_shared::constants::{DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT};
use dogfood_shared::{
    DeliveryStatus, LinkId, MediaMetadata, Message, MessageId, MessageType, UserId,
};
use dogfood_store::{HistoryQuery, MessageStore, NewMessage};

use crate::auth::TokenMap;
use crate::error::ServerError;

pub struct AppState<S> {
    pub store: Arc<S>,
    pub feed: Arc<LocalFeed>,
    pub auth: Arc<TokenMap>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            feed: self.feed.clone(),
            auth: self.auth.clone(),
        }
    }
}

pub fn build_router<S: MessageStore + 'static>(state: AppState<S>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/messages/send", post(send_message::<S>))
        .route("/api/messages/history", get(message_history::<S>))
        .route("/api/messages/status", patch(update_status::<S>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendRequest {
    link_id: LinkId,
    receiver_id: UserId,
    message_type: String,
    content: Option<String>,
    media_url: Option<String>,
    #[serde(default)]
    media_metadata: MediaMetadata,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryParams {
    link_id: LinkId,
    /// `created_at` of the oldest already-loaded row; pages strictly older.
    cursor: Option<DateTime<Utc>>,
    limit: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest {
    message_ids: Vec<MessageId>,
    status: String,
}

#[derive(Serialize)]
struct StatusResponse {
    updated: usize,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `POST /api/messages/send`
///
/// The sender identity comes from the bearer token, never from the body, so
/// a client cannot write rows on another user's behalf.
async fn send_message<S: MessageStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(req): Json<SendRequest>,
) -> Result<Json<Message>, ServerError> {
    let sender = state.auth.resolve(&headers)?;

    let message_type = MessageType::from_str_opt(&req.message_type).ok_or_else(|| {
        ServerError::BadRequest(format!("unknown message type {:?}", req.message_type))
    })?;

    let new = NewMessage {
        link_id: req.link_id,
        sender_id: sender,
        receiver_id: req.receiver_id,
        message_type,
        content: req.content,
        media_url: req.media_url,
        media_metadata: req.media_metadata,
    };

    let message = state.store.create_message(new).await?;
    info!(msg_id = %message.id, link = %message.link_id, "Message stored");

    // Commit first, then fan out. In a hosted deployment the platform's CDC
    // stream does this; self-hosted, the server is the stream.
    state.feed.publish(ChangeEvent::Inserted(message.clone()));

    Ok(Json(message))
}

/// `GET /api/messages/history?linkId=..&cursor=..&limit=..`
async fn message_history<S: MessageStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<Message>>, ServerError> {
    let user = state.auth.resolve(&headers)?;

    let link = state.store.get_link(params.link_id).await?;
    if !link.contains(user) {
        return Err(ServerError::Forbidden(format!(
            "user {user} is not a participant of link {}",
            params.link_id
        )));
    }

    let limit = params
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let query = HistoryQuery {
        before: params.cursor,
        limit,
        ..HistoryQuery::default()
    };

    let rows = state.store.list_messages(params.link_id, query).await?;
    Ok(Json(rows))
}

/// `PATCH /api/messages/status { messageIds, status }`
///
/// Only `delivered` and `read` are accepted as targets; `sent` exists solely
/// as the creation state. An empty id list is rejected before touching the
/// store. The update is scoped to rows addressed to the caller, so ids
/// belonging to other users are silently skipped.
async fn update_status<S: MessageStore>(
    State(state): State<AppState<S>>,
    headers: HeaderMap,
    Json(req): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, ServerError> {
    let user = state.auth.resolve(&headers)?;

    if req.message_ids.is_empty() {
        return Err(ServerError::BadRequest("missing messageIds".into()));
    }

    let target = match DeliveryStatus::from_str_opt(&req.status) {
        Some(DeliveryStatus::Delivered) => DeliveryStatus::Delivered,
        Some(DeliveryStatus::Read) => DeliveryStatus::Read,
        _ => {
            return Err(ServerError::BadRequest(format!(
                "status must be delivered or read, got {:?}",
                req.status
            )))
        }
    };

    let updated = state
        .store
        .update_status(&req.message_ids, target, user)
        .await?;
    info!(count = updated, status = %target, "Status batch applied");

    if updated > 0 {
        // Fan out the rows that now sit at the target. A row that was
        // already there republishes; consumers treat updates idempotently.
        for id in &req.message_ids {
            if let Ok(row) = state.store.get_message(*id).await {
                if row.receiver_id == user && row.status == target {
                    state.feed.publish(ChangeEvent::Updated(row));
                }
            }
        }
    }

    Ok(Json(StatusResponse { updated }))
}

pub async fn serve<S: MessageStore + 'static>(
    state: AppState<S>,
    addr: std::net::SocketAddr,
) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use dogfood_feed::ChangeFeed;
    use dogfood_shared::Link;
    use dogfood_store::MemoryStore;

    struct TestApp {
        router: Router,
        feed: Arc<LocalFeed>,
        link: Link,
        bea: UserId,
    }

    async fn test_app() -> TestApp {
        let store = Arc::new(MemoryStore::new());
        let alice = UserId::new();
        let bea = UserId::new();
        let link = Link::new(alice, bea);
        store.add_link(link).await;

        let feed = Arc::new(LocalFeed::new());
        let auth = Arc::new(TokenMap::new(vec![
            ("alice-token".into(), alice),
            ("bea-token".into(), bea),
            ("carol-token".into(), UserId::new()),
        ]));

        let state = AppState {
            store,
            feed: feed.clone(),
            auth,
        };
        TestApp {
            router: build_router(state),
            feed,
            link,
            bea,
        }
    }

    fn json_request(method: &str, uri: &str, token: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn send_stores_and_publishes() {
        let app = test_app().await;
        let mut sub = app.feed.subscribe(app.link.id).await.unwrap();

        let response = app
            .router
            .oneshot(json_request(
                "POST",
                "/api/messages/send",
                "alice-token",
                serde_json::json!({
                    "linkId": app.link.id,
                    "receiverId": app.bea,
                    "messageType": "text",
                    "content": "hi",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "sent");
        assert_eq!(body["content"], "hi");

        let event = sub.try_recv().unwrap();
        assert!(matches!(event, ChangeEvent::Inserted(_)));
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/messages/history?linkId={}", app.link.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn history_rejects_non_participant() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri(format!("/api/messages/history?linkId={}", app.link.id))
                    .header("authorization", "Bearer carol-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn status_route_rejects_sent_target() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(json_request(
                "PATCH",
                "/api/messages/status",
                "bea-token",
                serde_json::json!({
                    "messageIds": [MessageId::new()],
                    "status": "sent",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_route_rejects_empty_id_list() {
        let app = test_app().await;
        let response = app
            .router
            .oneshot(json_request(
                "PATCH",
                "/api/messages/status",
                "bea-token",
                serde_json::json!({
                    "messageIds": [],
                    "status": "delivered",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_route_advances_scoped_rows() {
        let app = test_app().await;

        // Seed a message through the API so it exists with status sent.
        let response = app
            .router
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/messages/send",
                "alice-token",
                serde_json::json!({
                    "linkId": app.link.id,
                    "receiverId": app.bea,
                    "messageType": "text",
                    "content": "mark me",
                }),
            ))
            .await
            .unwrap();
        let body = read_json(response).await;
        let id = body["id"].as_str().unwrap().to_string();

        let response = app
            .router
            .oneshot(json_request(
                "PATCH",
                "/api/messages/status",
                "bea-token",
                serde_json::json!({
                    "messageIds": [id],
                    "status": "delivered",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["updated"], 1);
    }
}
