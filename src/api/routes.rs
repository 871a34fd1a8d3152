use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use log::{error, warn};
use serde::Deserialize;
use serde_json::json;

use crate::types::Axis;
use crate::testbed::Testbed;

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ForceRequest {
    pub force: f64,
}

impl Default for ForceRequest {
    fn default() -> Self {
        Self { force: 0.0 }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AutomateRequest {
    pub steps: i64,
    pub push_force: f64,
    pub pull_force: f64,
}

impl Default for AutomateRequest {
    fn default() -> Self {
        Self {
            steps: 0,
            push_force: 10.0,
            pull_force: 50.0,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct MoveRequest {
    pub position: f64,
}

pub fn router(testbed: Testbed) -> Router {
    Router::new()
        .route("/", get(status_handler))
        .route("/force", get(force_handler))
        .route("/apply_push", post(push_handler))
        .route("/apply_pull", post(pull_handler))
        .route("/automate", post(automate_handler))
        .route("/move/{axis}", post(move_handler))
        .route("/results", get(results_handler))
        .with_state(testbed)
}

/// 试验台调用都会阻塞（串口、脉冲、数据库），放到阻塞线程池执行
async fn blocking<T, F>(testbed: Testbed, f: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&Testbed) -> T + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&testbed))
        .await
        .map_err(|e| {
            error!("Blocking testbed call failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "Internal error" })),
            )
                .into_response()
        })
}

async fn status_handler(State(testbed): State<Testbed>) -> Response {
    Json(json!({ "status": testbed.status() })).into_response()
}

async fn force_handler(State(testbed): State<Testbed>) -> Response {
    match blocking(testbed, |t| t.current_force()).await {
        Ok(sample) => Json(sample).into_response(),
        Err(response) => response,
    }
}

/// 请求体解析失败统一返回 400 和 JSON 错误，不把 axum 的纯文本拒绝原样透出
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload.map(|Json(req)| req).map_err(|rejection| {
        warn!("Rejected request body: {}", rejection.body_text());
        bad_request(rejection.body_text())
    })
}

fn bad_request(message: impl Into<String>) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message.into() }))).into_response()
}

async fn push_handler(
    State(testbed): State<Testbed>,
    payload: Result<Json<ForceRequest>, JsonRejection>,
) -> Response {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(response) => return response,
    };
    match blocking(testbed, move |t| t.apply_push(req.force)).await {
        Ok(result) => Json(json!({ "result": result })).into_response(),
        Err(response) => response,
    }
}

async fn pull_handler(
    State(testbed): State<Testbed>,
    payload: Result<Json<ForceRequest>, JsonRejection>,
) -> Response {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(response) => return response,
    };
    match blocking(testbed, move |t| t.apply_pull(req.force)).await {
        Ok(result) => Json(json!({ "result": result })).into_response(),
        Err(response) => response,
    }
}

async fn automate_handler(
    State(testbed): State<Testbed>,
    payload: Result<Json<AutomateRequest>, JsonRejection>,
) -> Response {
    let req = match json_body(payload) {
        Ok(req) => req,
        Err(response) => return response,
    };
    // 负步数按零步处理
    let steps = usize::try_from(req.steps).unwrap_or(0);
    match blocking(testbed, move |t| t.run_automation(steps, req.push_force, req.pull_force)).await {
        Ok(results) => Json(json!({ "results": results })).into_response(),
        Err(response) => response,
    }
}

async fn move_handler(
    State(testbed): State<Testbed>,
    Path(axis): Path<String>,
    payload: Result<Json<MoveRequest>, JsonRejection>,
) -> Response {
    // 先校验轴名，再看请求体
    let axis: Axis = match axis.parse() {
        Ok(axis) => axis,
        Err(e) => {
            warn!("Rejected move: {}", e);
            return bad_request("Invalid axis");
        }
    };
    let position = match json_body(payload) {
        Ok(req) => req.position,
        Err(response) => return response,
    };
    match blocking(testbed, move |t| t.move_axis(axis.name(), position)).await {
        Ok(Ok(_)) => Json(json!({ "status": "Moved to position", "position": position })).into_response(),
        Ok(Err(e)) => {
            error!("Move failed: {}", e);
            bad_request(e.to_string())
        }
        Err(response) => response,
    }
}

async fn results_handler(State(testbed): State<Testbed>) -> Response {
    match blocking(testbed, |t| t.list_results()).await {
        Ok(readings) => Json(readings).into_response(),
        Err(response) => response,
    }
}
