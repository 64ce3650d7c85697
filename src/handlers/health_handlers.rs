//! Health & readiness handlers.
//!
//! - GET /healthz  -> simple liveness ("ok")
//! - GET /readyz   -> readiness that checks the book store and the image area

use crate::services::catalog_service::CatalogService;
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use std::collections::HashMap;
use tokio::fs;
use uuid::Uuid;

#[derive(Serialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct ReadyResponse {
    status: String,
    checks: HashMap<&'static str, CheckStatus>,
}

#[derive(Serialize)]
struct CheckStatus {
    ok: bool,
    error: Option<String>,
}

/// `GET /healthz`
///
/// Very small liveness probe — always returns 200 OK with a plain JSON
/// body. Never performs I/O.
pub async fn healthz() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".into(),
        }),
    )
}

/// `GET /readyz`
///
/// Readiness probe that runs a lightweight `SELECT 1` against the catalog
/// store and a best-effort write/read/delete round through the upload
/// area. HTTP 200 when both checks pass, 503 when either fails.
pub async fn readyz(State(service): State<CatalogService>) -> impl IntoResponse {
    let store = probe_store(&service).await;
    let uploads = probe_uploads(&service).await;

    let overall_ok = store.ok && uploads.ok;
    let mut checks = HashMap::new();
    checks.insert("store", store);
    checks.insert("uploads", uploads);

    let body = ReadyResponse {
        status: if overall_ok {
            "ok".into()
        } else {
            "error".into()
        },
        checks,
    };

    let status = if overall_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(body))
}

async fn probe_store(service: &CatalogService) -> CheckStatus {
    match sqlx::query_scalar::<_, i64>("SELECT 1")
        .fetch_one(&*service.db)
        .await
    {
        Ok(1) => CheckStatus {
            ok: true,
            error: None,
        },
        Ok(other) => CheckStatus {
            ok: false,
            error: Some(format!("unexpected result: {other}")),
        },
        Err(err) => CheckStatus {
            ok: false,
            error: Some(format!("error: {err}")),
        },
    }
}

async fn probe_uploads(service: &CatalogService) -> CheckStatus {
    let probe_path = service
        .upload_dir
        .join(format!(".readyz-{}", Uuid::new_v4()));

    if let Err(err) = fs::write(&probe_path, b"readyz").await {
        return CheckStatus {
            ok: false,
            error: Some(format!("could not write probe file: {err}")),
        };
    }

    let read_back = fs::read(&probe_path).await;
    let removal = fs::remove_file(&probe_path).await;

    match read_back {
        Ok(bytes) if bytes == b"readyz" => CheckStatus {
            ok: true,
            error: removal
                .err()
                .map(|err| format!("could not remove probe file: {err}")),
        },
        Ok(_) => CheckStatus {
            ok: false,
            error: Some("probe file content mismatch".to_string()),
        },
        Err(err) => CheckStatus {
            ok: false,
            error: Some(format!("could not read probe file: {err}")),
        },
    }
}
