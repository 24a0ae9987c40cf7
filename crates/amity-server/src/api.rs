use std::sync::Arc;

use amity_shared::constants::{IDENTITY_HEADER, MEMBER_FILTER_HEADER, PAGINATION_HEADER};
use amity_shared::{AmityError, MemberOrder, MessageContainer, PageRequest, PagedList};
use amity_store::{
    members, messages, moderation, users, Database, DeleteOutcome, MemberFilter, MemberSummary,
    MessageSummary, PhotoForApproval, PhotoSummary, ProfileUpdate, User,
};
use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::photo_store::PhotoStore;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub photo_store: Arc<PhotoStore>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static("pagination"), HeaderName::from_static("member-filter")]);

    // Room for the multipart framing around the largest accepted photo.
    let body_limit = state.config.max_photo_size + 64 * 1024;

    Router::new()
        .route("/health", get(health_check))
        .route("/users", get(list_members).put(update_profile))
        .route("/users/add-photo", post(add_photo))
        .route("/users/set-main-photo/:photo_id", put(set_main_photo))
        .route("/users/delete-photo/:photo_id", delete(delete_photo))
        .route("/users/:username", get(get_member))
        .route("/messages", get(list_messages).post(send_message))
        .route("/messages/thread/:username", get(message_thread))
        .route("/messages/:id", delete(delete_message))
        .route("/admin/photos-to-moderate", get(photos_to_moderate))
        .route("/admin/approve-photo/:photo_id", post(approve_photo))
        .route("/admin/reject-photo/:photo_id", post(reject_photo))
        .route("/photos/:public_id", get(photo_download))
        .layer(DefaultBodyLimit::max(body_limit))
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
struct MemberParams {
    page_number: Option<i64>,
    page_size: Option<u32>,
    gender: Option<String>,
    min_age: Option<u32>,
    max_age: Option<u32>,
    order_by: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageParams {
    container: Option<String>,
    page_number: Option<i64>,
    page_size: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateMessageRequest {
    recipient_username: String,
    content: String,
}

#[derive(Serialize)]
struct DeleteMessageResponse {
    outcome: DeleteOutcome,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── Identity ───

/// Resolve the requester from the identity header set by the gateway and
/// stamp their activity.
fn requester(db: &mut Database, headers: &HeaderMap) -> Result<User, ServerError> {
    let username = headers
        .get(IDENTITY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ServerError::Unauthorized("Missing identity".into()))?;

    let user = users::user_by_username(db.conn(), username)?
        .ok_or_else(|| ServerError::Unauthorized(format!("Unknown user '{username}'")))?;

    let mut uow = db.unit_of_work()?;
    uow.record_activity(user.id)?;
    uow.complete()?;

    Ok(user)
}

fn require_moderator(db: &Database, user: &User) -> Result<(), ServerError> {
    let roles = users::roles_for_user(db.conn(), user.id)?;
    if !roles.iter().any(|r| r.can_moderate()) {
        return Err(ServerError::Forbidden("Moderator or Admin role required".into()));
    }
    Ok(())
}

/// A `false` commit means nothing was persisted.
fn ensure_saved(saved: bool, what: &str) -> Result<(), ServerError> {
    if saved {
        Ok(())
    } else {
        Err(AmityError::upstream(what).into())
    }
}

/// Page items as the body, page metadata in the `Pagination` header.
fn paged_response<T: Serialize>(
    page: PagedList<T>,
    mut headers: HeaderMap,
) -> Result<(HeaderMap, Json<Vec<T>>), ServerError> {
    insert_json_header(&mut headers, PAGINATION_HEADER, &page.metadata())?;
    Ok((headers, Json(page.items)))
}

fn insert_json_header<T: Serialize>(headers: &mut HeaderMap, name: &'static str, value: &T) -> Result<(), ServerError> {
    let json = serde_json::to_string(value).map_err(|e| ServerError::Internal(e.to_string()))?;
    let value = HeaderValue::from_str(&json).map_err(|e| ServerError::Internal(e.to_string()))?;
    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| ServerError::Internal(e.to_string()))?;
    headers.insert(name, value);
    Ok(())
}

// ─── Members ───

async fn list_members(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(params): Query<MemberParams>,
) -> Result<(HeaderMap, Json<Vec<MemberSummary>>), ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;

    let request = PageRequest::from_params(params.page_number, params.page_size)?;
    let defaults = MemberFilter::default();
    let filter = MemberFilter {
        gender: params.gender,
        min_age: params.min_age.unwrap_or(defaults.min_age),
        max_age: params.max_age.unwrap_or(defaults.max_age),
        order_by: MemberOrder::from_param(params.order_by.as_deref()),
    }
    .resolve(&user.gender)?;

    let page = members::list_members(db.conn(), &user, &filter, request)?;

    let mut response_headers = HeaderMap::new();
    insert_json_header(&mut response_headers, MEMBER_FILTER_HEADER, &filter)?;
    paged_response(page, response_headers)
}

async fn get_member(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<MemberSummary>, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;
    Ok(Json(members::get_member(db.conn(), &username, &user.username)?))
}

async fn update_profile(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<StatusCode, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;

    let mut uow = db.unit_of_work()?;
    uow.update_profile(&user.username, &update)?;
    ensure_saved(uow.complete()?, "Failed to update user")?;

    Ok(StatusCode::NO_CONTENT)
}

// ─── Photos ───

async fn add_photo(
    headers: HeaderMap,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PhotoSummary>), ServerError> {
    let mut data = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {}", e)))?
    {
        if field.name() == Some("file") {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {}", e)))?;
            data = Some(bytes);
            break;
        }
    }
    let data = data.ok_or_else(|| ServerError::BadRequest("Missing 'file' field in multipart form".to_string()))?;

    let max = state.photo_store.max_size();
    if data.len() > max {
        return Err(ServerError::PhotoTooLarge { size: data.len(), max });
    }

    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;

    let mut uow = db.unit_of_work()?;
    let photo = uow.add_photo(&user.username, state.photo_store.as_ref(), data).await?;
    ensure_saved(uow.complete()?, "Problem adding photo")?;

    info!(photo_id = %photo.id, username = %user.username, "Photo uploaded via API");
    Ok((StatusCode::CREATED, Json(PhotoSummary::from(&photo))))
}

async fn set_main_photo(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;

    let mut uow = db.unit_of_work()?;
    uow.set_main_photo(&user.username, photo_id)?;
    ensure_saved(uow.complete()?, "Problem setting the main photo")?;

    Ok(StatusCode::NO_CONTENT)
}

async fn delete_photo(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;

    let mut uow = db.unit_of_work()?;
    uow.delete_photo(&user.username, photo_id, state.photo_store.as_ref())
        .await?;
    ensure_saved(uow.complete()?, "Problem deleting the photo")?;

    Ok(StatusCode::OK)
}

async fn photo_download(
    State(state): State<AppState>,
    Path(public_id): Path<String>,
) -> Result<Vec<u8>, ServerError> {
    state.photo_store.get(&public_id).await
}

// ─── Messages ───

async fn send_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Json(req): Json<CreateMessageRequest>,
) -> Result<Json<MessageSummary>, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;

    let mut uow = db.unit_of_work()?;
    let message = uow.send_message(&user, &req.recipient_username, &req.content)?;
    ensure_saved(uow.complete()?, "Failed to send message")?;

    let summary = messages::summary_by_id(db.conn(), message.id)?
        .ok_or_else(|| ServerError::Internal(format!("message {} vanished after commit", message.id)))?;
    Ok(Json(summary))
}

async fn list_messages(
    headers: HeaderMap,
    State(state): State<AppState>,
    Query(params): Query<MessageParams>,
) -> Result<(HeaderMap, Json<Vec<MessageSummary>>), ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;

    let container = MessageContainer::from_param(params.container.as_deref());
    let request = PageRequest::from_params(params.page_number, params.page_size)?;
    let page = messages::list_for_user(db.conn(), &user.username, container, request)?;

    paged_response(page, HeaderMap::new())
}

async fn message_thread(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<Vec<MessageSummary>>, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;
    Ok(Json(db.get_thread(&user.username, &username)?))
}

async fn delete_message(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeleteMessageResponse>, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;

    let mut uow = db.unit_of_work()?;
    let outcome = uow.delete_message(id, &user.username)?;
    if outcome != DeleteOutcome::AlreadyDeleted {
        ensure_saved(uow.complete()?, "Problem deleting the message")?;
    }

    Ok(Json(DeleteMessageResponse { outcome }))
}

// ─── Moderation ───

async fn photos_to_moderate(
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Result<Json<Vec<PhotoForApproval>>, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;
    require_moderator(&db, &user)?;

    Ok(Json(moderation::photos_for_approval(db.conn())?))
}

async fn approve_photo(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;
    require_moderator(&db, &user)?;

    let mut uow = db.unit_of_work()?;
    uow.approve_photo(photo_id)?;
    ensure_saved(uow.complete()?, "Problem approving the photo")?;

    info!(photo_id = %photo_id, moderator = %user.username, "Photo approved via API");
    Ok(StatusCode::OK)
}

async fn reject_photo(
    headers: HeaderMap,
    State(state): State<AppState>,
    Path(photo_id): Path<Uuid>,
) -> Result<StatusCode, ServerError> {
    let mut db = state.db.lock().await;
    let user = requester(&mut db, &headers)?;
    require_moderator(&db, &user)?;

    let mut uow = db.unit_of_work()?;
    uow.reject_photo(photo_id, state.photo_store.as_ref()).await?;
    ensure_saved(uow.complete()?, "Problem rejecting the photo")?;

    info!(photo_id = %photo_id, moderator = %user.username, "Photo rejected via API");
    Ok(StatusCode::OK)
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use amity_store::{photos, seed};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use axum::response::Response;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const SEED: &str = r#"[
        { "username": "mark", "knownAs": "Mark", "gender": "male", "dateOfBirth": "1990-04-02" },
        { "username": "mike", "knownAs": "Mike", "gender": "male", "dateOfBirth": "1991-08-12" },
        { "username": "fiona", "knownAs": "Fiona", "gender": "female", "dateOfBirth": "1993-01-30",
          "photos": [{ "url": "https://seed.test/fiona.jpg" }] },
        { "username": "freya", "knownAs": "Freya", "gender": "female", "dateOfBirth": "1995-11-05" },
        { "username": "mod", "knownAs": "Mod", "gender": "female", "dateOfBirth": "1985-06-06",
          "roles": ["Member", "Moderator"] }
    ]"#;

    async fn test_app() -> (Router, AppState, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut db = Database::open_in_memory().unwrap();
        seed::seed_users(&mut db, SEED).unwrap();

        let config = ServerConfig {
            photo_storage_path: dir.path().to_path_buf(),
            max_photo_size: 1024,
            ..ServerConfig::default()
        };
        let photo_store = PhotoStore::new(
            config.photo_storage_path.clone(),
            config.public_base_url.clone(),
            config.max_photo_size,
        )
        .await
        .unwrap();

        let state = AppState {
            db: Arc::new(Mutex::new(db)),
            photo_store: Arc::new(photo_store),
            config: Arc::new(config),
        };
        (build_router(state.clone()), state, dir)
    }

    fn request(method: Method, uri: &str, user: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header(IDENTITY_HEADER, user);
        }
        match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    fn multipart_upload(user: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            b"--BOUNDARY\r\nContent-Disposition: form-data; name=\"file\"; filename=\"me.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n--BOUNDARY--\r\n");

        Request::builder()
            .method(Method::POST)
            .uri("/users/add-photo")
            .header(IDENTITY_HEADER, user)
            .header("content-type", "multipart/form-data; boundary=BOUNDARY")
            .body(Body::from(body))
            .unwrap()
    }

    async fn call(app: &Router, req: Request<Body>) -> Response {
        app.clone().oneshot(req).await.unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_header(response: &Response, name: &str) -> serde_json::Value {
        let raw = response.headers().get(name).unwrap().to_str().unwrap();
        serde_json::from_str(raw).unwrap()
    }

    async fn send(app: &Router, from: &str, to: &str, content: &str) -> serde_json::Value {
        let body = serde_json::json!({ "recipientUsername": to, "content": content });
        let response = call(app, request(Method::POST, "/messages", Some(from), Some(body))).await;
        assert_eq!(response.status(), StatusCode::OK);
        json_body(response).await
    }

    #[tokio::test]
    async fn test_health() {
        let (app, _state, _dir) = test_app().await;
        let response = call(&app, request(Method::GET, "/health", None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["status"], "ok");
    }

    #[tokio::test]
    async fn test_identity_is_required() {
        let (app, _state, _dir) = test_app().await;

        let response = call(&app, request(Method::GET, "/messages", None, None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = call(&app, request(Method::GET, "/messages", Some("ghost"), None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_message_flow() {
        let (app, _state, _dir) = test_app().await;

        let sent = send(&app, "mark", "fiona", "hello fiona").await;
        assert_eq!(sent["senderUsername"], "mark");
        assert_eq!(sent["recipientPhotoUrl"], "https://seed.test/fiona.jpg");
        assert!(sent["dateRead"].is_null());

        let response = call(&app, request(Method::GET, "/messages?container=Outbox", Some("mark"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let pagination = json_header(&response, PAGINATION_HEADER);
        assert_eq!(pagination["totalItems"], 1);
        assert_eq!(pagination["currentPage"], 1);
        assert_eq!(pagination["itemsPerPage"], 10);
        let outbox = json_body(response).await;
        assert_eq!(outbox[0]["content"], "hello fiona");

        // no container means unread
        let response = call(&app, request(Method::GET, "/messages", Some("fiona"), None)).await;
        assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);

        let response = call(&app, request(Method::GET, "/messages/thread/mark", Some("fiona"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let thread = json_body(response).await;
        assert!(!thread[0]["dateRead"].is_null());

        let response = call(&app, request(Method::GET, "/messages", Some("fiona"), None)).await;
        assert!(json_body(response).await.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_validation() {
        let (app, _state, _dir) = test_app().await;
        for (to, content) in [("mark", "to myself"), ("nobody", "hi"), ("fiona", "  ")] {
            let body = serde_json::json!({ "recipientUsername": to, "content": content });
            let response = call(&app, request(Method::POST, "/messages", Some("mark"), Some(body))).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn test_delete_message_both_sides() {
        let (app, state, _dir) = test_app().await;
        let sent = send(&app, "mark", "fiona", "bye").await;
        let uri = format!("/messages/{}", sent["id"].as_str().unwrap());

        let response = call(&app, request(Method::DELETE, &uri, Some("mark"), None)).await;
        assert_eq!(json_body(response).await["outcome"], "Marked");

        let response = call(&app, request(Method::DELETE, &uri, Some("mark"), None)).await;
        assert_eq!(json_body(response).await["outcome"], "AlreadyDeleted");

        let response = call(&app, request(Method::DELETE, &uri, Some("freya"), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = call(&app, request(Method::DELETE, &uri, Some("fiona"), None)).await;
        assert_eq!(json_body(response).await["outcome"], "Erased");

        let id = Uuid::parse_str(sent["id"].as_str().unwrap()).unwrap();
        assert!(messages::message_by_id(state.db.lock().await.conn(), id).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_directory_defaults_and_echo() {
        let (app, _state, _dir) = test_app().await;

        let response = call(&app, request(Method::GET, "/users?pageSize=2", Some("mark"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_header(&response, MEMBER_FILTER_HEADER)["gender"], "female");
        let pagination = json_header(&response, PAGINATION_HEADER);
        assert_eq!(pagination["totalItems"], 3);
        assert_eq!(pagination["totalPages"], 2);

        let response = call(&app, request(Method::GET, "/users?gender=male", Some("mark"), None)).await;
        let members = json_body(response).await;
        let names: Vec<_> = members.as_array().unwrap().iter().map(|m| m["username"].clone()).collect();
        assert_eq!(names, vec!["mike"]);

        let response = call(&app, request(Method::GET, "/users?minAge=50&maxAge=20", Some("mark"), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = call(&app, request(Method::GET, "/users?pageSize=0", Some("mark"), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_profile_update_and_lookup() {
        let (app, _state, _dir) = test_app().await;

        let body = serde_json::json!({ "introduction": "Hello!", "city": "Bristol" });
        let response = call(&app, request(Method::PUT, "/users", Some("fiona"), Some(body))).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = call(&app, request(Method::GET, "/users/FIONA", Some("mark"), None)).await;
        let member = json_body(response).await;
        assert_eq!(member["introduction"], "Hello!");
        assert_eq!(member["photoUrl"], "https://seed.test/fiona.jpg");

        let response = call(&app, request(Method::GET, "/users/nobody", Some("mark"), None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_photo_lifecycle() {
        let (app, _state, _dir) = test_app().await;

        let response = call(&app, multipart_upload("mike", b"jpeg")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let photo = json_body(response).await;
        assert_eq!(photo["isApproved"], false);
        let photo_id = photo["id"].as_str().unwrap().to_string();

        let public_id = photo["url"].as_str().unwrap().rsplit('/').next().unwrap().to_string();
        let response = call(&app, request(Method::GET, &format!("/photos/{public_id}"), None, None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(bytes, bytes::Bytes::from_static(b"jpeg"));

        // unapproved photos are hidden from others but not the owner
        let response = call(&app, request(Method::GET, "/users/mike", Some("fiona"), None)).await;
        assert!(json_body(response).await["photos"].as_array().unwrap().is_empty());
        let response = call(&app, request(Method::GET, "/users/mike", Some("mike"), None)).await;
        assert_eq!(json_body(response).await["photos"].as_array().unwrap().len(), 1);

        let set_main = format!("/users/set-main-photo/{photo_id}");
        let response = call(&app, request(Method::PUT, &set_main, Some("mike"), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let approve = format!("/admin/approve-photo/{photo_id}");
        let response = call(&app, request(Method::POST, &approve, Some("mike"), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let response = call(&app, request(Method::POST, &approve, Some("mod"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        // first approved photo became main
        let response = call(&app, request(Method::GET, "/users/mike", Some("fiona"), None)).await;
        let member = json_body(response).await;
        assert_eq!(member["photoUrl"], photo["url"]);

        let response = call(&app, request(Method::PUT, &set_main, Some("mike"), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let remove = format!("/users/delete-photo/{photo_id}");
        let response = call(&app, request(Method::DELETE, &remove, Some("mike"), None)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_upload_rejected() {
        let (app, _state, _dir) = test_app().await;
        let response = call(&app, multipart_upload("mike", &[0u8; 2048])).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_moderation_queue_and_reject() {
        let (app, state, dir) = test_app().await;

        let response = call(&app, multipart_upload("freya", b"pending")).await;
        let photo = json_body(response).await;
        let photo_id = photo["id"].as_str().unwrap().to_string();

        let response = call(&app, request(Method::GET, "/admin/photos-to-moderate", Some("freya"), None)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = call(&app, request(Method::GET, "/admin/photos-to-moderate", Some("mod"), None)).await;
        let queue = json_body(response).await;
        assert_eq!(queue.as_array().unwrap().len(), 1);
        assert_eq!(queue[0]["username"], "freya");

        let reject = format!("/admin/reject-photo/{photo_id}");
        let response = call(&app, request(Method::POST, &reject, Some("mod"), None)).await;
        assert_eq!(response.status(), StatusCode::OK);

        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
        let freya = users::require_user(state.db.lock().await.conn(), "freya").unwrap();
        let db = state.db.lock().await;
        assert!(photos::photos_for_user(db.conn(), freya.id, photos::PhotoVisibility::Owner)
            .unwrap()
            .is_empty());
    }
}
