//! API request handlers.
//!
//! Successful requests answer with a JSON `{message}` document; failures
//! answer with a plain-text body (see [`ApiError`]).

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

use orchestrator_core::ActionReport;
use orchestrator_shared_types::{
    AttachDiskRequest, CreateBlockVolumeRequest, CreateVmRequest, MessageResponse,
    RegisterTeamRequest, ResizeVmRequest, ScaleRequest, VmAction,
};

use crate::error::{ApiError, ApiResult};
use crate::state::ApiState;

/// Body extractor that reports decoding failures as 400 plain text.
type Body<T> = Result<Json<T>, JsonRejection>;

pub const LIVENESS_MESSAGE: &str = "Crossplane OpenStack API is running.";

fn message(report: ActionReport) -> Json<MessageResponse> {
    Json(MessageResponse::new(report.message))
}

// ============================================================================
// Service
// ============================================================================

/// Liveness check.
pub async fn hello() -> &'static str {
    LIVENESS_MESSAGE
}

/// Prometheus text exposition of action and command metrics.
pub async fn metrics(State(state): State<ApiState>) -> ApiResult<impl IntoResponse> {
    let handle = state
        .metrics
        .as_ref()
        .ok_or_else(|| ApiError::not_found("metrics recorder not installed"))?;

    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    ))
}

// ============================================================================
// Team Handlers
// ============================================================================

/// Register a team by creating its namespace.
pub async fn register_team(
    State(state): State<ApiState>,
    body: Body<RegisterTeamRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = body?;
    let report = state.orchestrator.register_tenant(&request).await?;
    Ok(message(report))
}

/// Live namespace status, passed through untouched.
pub async fn get_team(
    State(state): State<ApiState>,
    Path(team): Path<String>,
) -> ApiResult<Json<Value>> {
    let status = state.orchestrator.describe_tenant(&team).await?;
    Ok(Json(status))
}

// ============================================================================
// VM Handlers
// ============================================================================

pub async fn create_vm(
    State(state): State<ApiState>,
    Path(team): Path<String>,
    body: Body<CreateVmRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = body?;
    let report = state.orchestrator.create_vm(&team, &request).await?;
    Ok(message(report))
}

pub async fn resize_vm(
    State(state): State<ApiState>,
    Path((team, vm)): Path<(String, String)>,
    body: Body<ResizeVmRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = body?;
    let report = state.orchestrator.resize_vm(&team, &vm, &request).await?;
    Ok(message(report))
}

pub async fn scale_vm(
    State(state): State<ApiState>,
    Path((team, resource)): Path<(String, String)>,
    body: Body<ScaleRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = body?;
    let report = state.orchestrator.scale(&team, &resource, &request).await?;
    Ok(message(report))
}

pub async fn attach_disk(
    State(state): State<ApiState>,
    Path((team, vm)): Path<(String, String)>,
    body: Body<AttachDiskRequest>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = body?;
    let report = state.orchestrator.attach_disk(&team, &vm, &request).await?;
    Ok(message(report))
}

/// Start, stop or delete a VM once it is not mid-transition.
pub async fn vm_action(
    State(state): State<ApiState>,
    Path((team, vm, action)): Path<(String, String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let action: VmAction = action.parse()?;
    let report = state.orchestrator.vm_action(&team, &vm, action).await?;
    Ok(message(report))
}

/// Delete a VM resource without checking its live state.
pub async fn delete_vm(
    State(state): State<ApiState>,
    Path((team, vm)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let report = state.orchestrator.delete_vm(&team, &vm).await?;
    Ok(message(report))
}

// ============================================================================
// Block Storage Handlers
// ============================================================================

pub async fn create_block_volume(
    State(state): State<ApiState>,
    Path(team): Path<String>,
    body: Body<CreateBlockVolumeRequest>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = body?;
    let report = state.orchestrator.create_block_volume(&team, &request).await?;
    let response = MessageResponse {
        message: report.message,
        kubectl_output: report.output,
    };
    Ok((StatusCode::OK, Json(response)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{body::Body as HttpBody, http::Request, Router};
    use http_body_util::BodyExt;
    use serde_json::json;
    use tempfile::TempDir;
    use tower::ServiceExt;

    use command_runner::MockRunner;
    use facade_config::FacadeConfig;
    use orchestrator_core::{ActionOrchestrator, OrchestratorSettings};
    use orchestrator_shared_types::{ControlCommand, ResourceManifest};

    use crate::routes::build_router;
    use crate::state::ApiState;

    struct TestApp {
        _dir: TempDir,
        runner: Arc<MockRunner>,
        router: Router,
    }

    fn test_app(runner: MockRunner) -> TestApp {
        let dir = tempfile::tempdir().unwrap();
        let mut config = FacadeConfig::default();
        config.paths.manifest_dir = dir.path().join("manifests");
        config.paths.scratch_dir = dir.path().join("scratch");

        let runner = Arc::new(runner);
        let orchestrator = Arc::new(ActionOrchestrator::new(
            runner.clone(),
            OrchestratorSettings::from(&config),
        ));
        TestApp {
            _dir: dir,
            runner,
            router: build_router(ApiState::new(orchestrator)),
        }
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<HttpBody> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(HttpBody::from(body.to_string()))
            .unwrap()
    }

    fn empty_request(method: &str, uri: &str) -> Request<HttpBody> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(HttpBody::empty())
            .unwrap()
    }

    async fn send(router: &Router, req: Request<HttpBody>) -> (StatusCode, String) {
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_liveness() {
        let app = test_app(MockRunner::new());
        let (status, body) = send(&app.router, empty_request("GET", "/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, LIVENESS_MESSAGE);
    }

    #[tokio::test]
    async fn test_register_then_create_vm() {
        let app = test_app(MockRunner::new());

        let (status, body) = send(
            &app.router,
            json_request("POST", "/teams", json!({ "name": "teamA" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["message"], "Namespace 'teamA' created successfully.");

        let (status, _) = send(
            &app.router,
            json_request(
                "POST",
                "/teams/teamA/vm",
                json!({ "name": "vm1", "imageId": "img1", "flavorId": "f1", "networkId": "net1" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let docs = app.runner.applied_documents();
        let vm = ResourceManifest::from_yaml(&docs[1]).unwrap();
        assert_eq!(vm.kind().unwrap(), "InstanceV2");
        assert_eq!(vm.namespace(), Some("teamA"));
        assert_eq!(vm.name().unwrap(), "vm1");
        assert_eq!(
            vm.as_value()["spec"]["forProvider"]["securityGroups"],
            json!(["default"])
        );
    }

    #[tokio::test]
    async fn test_resize_without_manifest_is_404() {
        let app = test_app(MockRunner::new());
        let (status, body) = send(
            &app.router,
            json_request("PUT", "/teams/teamA/vm/vm1/resize", json!({ "flavorId": "f2" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.ends_with("teamA/vm1.yaml not found"));
        assert_eq!(app.runner.apply_count(), 0);
    }

    #[tokio::test]
    async fn test_busy_start_is_409() {
        let app = test_app(MockRunner::new().with_task_state("powering-on"));
        let (status, body) =
            send(&app.router, empty_request("PUT", "/teams/teamA/vm/vm1/start")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body.contains("task_state: powering-on"));
        assert!(app.runner.mutating_actions().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_action_is_400() {
        let app = test_app(MockRunner::new());
        let (status, body) =
            send(&app.router, empty_request("PUT", "/teams/teamA/vm/vm1/reboot")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Unsupported action 'reboot'.");
        assert!(app.runner.actions().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_body_is_plain_400() {
        let app = test_app(MockRunner::new());
        let req = Request::builder()
            .method("POST")
            .uri("/teams")
            .header("content-type", "application/json")
            .body(HttpBody::from("{not json"))
            .unwrap();
        let (status, body) = send(&app.router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.starts_with("Error decoding request:"));
    }

    #[tokio::test]
    async fn test_scale_without_replicas_is_400() {
        let app = test_app(MockRunner::new());
        let (status, body) = send(
            &app.router,
            json_request("PUT", "/teams/teamA/vm/web/scale", json!({ "replicas": null })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, "Missing 'replicas' in request");
    }

    #[tokio::test]
    async fn test_block_volume_reports_output() {
        let app = test_app(MockRunner::new().with_apply_output("volumev3 created\n"));
        let (status, body) = send(
            &app.router,
            json_request("POST", "/teams/teamA/block", json!({ "name": "data", "size": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["kubectl_output"], "volumev3 created\n");
    }

    #[tokio::test]
    async fn test_get_team_passes_status_through() {
        let doc = json!({ "kind": "Namespace", "metadata": { "name": "teamA" }, "status": { "phase": "Active" } });
        let app = test_app(MockRunner::new().with_namespace_status(doc.to_string()));
        let (status, body) = send(&app.router, empty_request("GET", "/teams/teamA")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(serde_json::from_str::<serde_json::Value>(&body).unwrap(), doc);
    }

    #[tokio::test]
    async fn test_direct_delete_route() {
        let app = test_app(MockRunner::new());
        let (status, _) = send(&app.router, empty_request("DELETE", "/teams/teamA/vm/vm1")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(matches!(
            app.runner.actions().as_slice(),
            [ControlCommand::DeleteResource { .. }]
        ));
    }

    #[tokio::test]
    async fn test_metrics_without_recorder_is_404() {
        let app = test_app(MockRunner::new());
        let (status, _) = send(&app.router, empty_request("GET", "/metrics")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
