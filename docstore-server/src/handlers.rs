//! REST handlers that hand each request to the CRUD service on a blocking
//! worker.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use docstore::errors::DocStoreResult;
use docstore::service::{CrudService, Reply, Status};
use serde_json::json;
use std::time::Duration;

/// Shared application state for REST handlers
#[derive(Clone)]
pub struct AppState {
    pub service: CrudService,
    pub request_timeout: Duration,
}

/// A status and JSON body, written as an `application/json` response.
#[derive(Debug)]
pub struct ApiReply {
    status: StatusCode,
    body: serde_json::Value,
}

impl ApiReply {
    pub fn new(status: StatusCode, body: serde_json::Value) -> Self {
        ApiReply { status, body }
    }

    pub fn error(status: StatusCode, message: &str) -> Self {
        ApiReply::new(status, json!({ "error": message }))
    }
}

impl From<Reply> for ApiReply {
    fn from(reply: Reply) -> Self {
        let status = StatusCode::from_u16(reply.status.code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        ApiReply::new(status, reply.body)
    }
}

impl IntoResponse for ApiReply {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/db/search/:collection", post(search))
        .route("/db/:collection", post(create).get(read_all))
        .route(
            "/db/:collection/:id",
            get(read_one).put(update).delete(remove),
        )
        .fallback(no_route)
        .with_state(state)
}

/// Runs `work` on the blocking pool and maps its outcome to a reply.
///
/// A worker that outlives the request timeout answers 504; the work itself is
/// not cancelled.
async fn run<F>(state: &AppState, success: Status, work: F) -> ApiReply
where
    F: FnOnce(CrudService) -> DocStoreResult<serde_json::Value> + Send + 'static,
{
    let service = state.service.clone();
    let task = tokio::task::spawn_blocking(move || work(service));

    match tokio::time::timeout(state.request_timeout, task).await {
        Ok(Ok(result)) => Reply::from_result(success, result).into(),
        Ok(Err(join_error)) => {
            log::error!("Request worker failed: {}", join_error);
            ApiReply::error(StatusCode::INTERNAL_SERVER_ERROR, "request worker failed")
        }
        Err(_) => {
            log::warn!(
                "Request did not finish within {:?}",
                state.request_timeout
            );
            ApiReply::error(StatusCode::GATEWAY_TIMEOUT, "request timed out")
        }
    }
}

async fn create(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Bytes,
) -> ApiReply {
    run(&state, Status::Created, move |service| {
        service
            .create(&collection, &body)
            .map(|document| document.to_json())
    })
    .await
}

async fn read_all(State(state): State<AppState>, Path(collection): Path<String>) -> ApiReply {
    run(&state, Status::Ok, move |service| {
        let documents = service.read_all(&collection)?;
        let results: Vec<serde_json::Value> =
            documents.iter().map(|document| document.to_json()).collect();
        Ok(json!({ "results": results }))
    })
    .await
}

async fn read_one(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiReply {
    run(&state, Status::Ok, move |service| {
        service
            .read_one(&collection, &id)
            .map(|document| document.to_json())
    })
    .await
}

async fn update(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiReply {
    run(&state, Status::Ok, move |service| {
        service
            .update(&collection, &id, &body)
            .map(|document| document.to_json())
    })
    .await
}

async fn remove(
    State(state): State<AppState>,
    Path((collection, id)): Path<(String, String)>,
) -> ApiReply {
    run(&state, Status::Ok, move |service| {
        service.delete(&collection, &id).map(|id| json!({ "id": id }))
    })
    .await
}

async fn search(
    State(state): State<AppState>,
    Path(collection): Path<String>,
    body: Bytes,
) -> ApiReply {
    run(&state, Status::Ok, move |service| {
        let documents = service.search(&collection, &body)?;
        let results: Vec<serde_json::Value> =
            documents.iter().map(|document| document.to_json()).collect();
        Ok(json!({ "results": results }))
    })
    .await
}

async fn no_route(uri: Uri) -> ApiReply {
    ApiReply::error(StatusCode::NOT_FOUND, &format!("no route for {}", uri.path()))
}
