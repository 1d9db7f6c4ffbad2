//! Request handling core, independent of HTTP.
//!
//! [`Api::handle`] takes one [`ApiCall`] and the host, and produces an
//! [`ApiResponse`]. It must run on the host thread; the server module makes
//! sure it only ever does.
//!
//! - [`resolve`] - name -> node lookup
//! - [`assemble`] - JSON projections
//! - [`actions`] - script run and scene export
//! - [`ids`] - surrogate numeric ids

pub mod actions;
pub mod assemble;
pub mod ids;
pub mod resolve;

use log::{error, trace};
use serde::Serialize;
use thiserror::Error;

use crate::host::{NodeKind, SceneHost};
use actions::ExportSettings;
use ids::IdTable;

/// Request-level failures. Each maps to a status code and `{"error": msg}`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Named node absent in its collection
    #[error("{kind} '{name}' not found")]
    NotFound { kind: NodeKind, name: String },

    /// Script raised; root cause is only logged
    #[error("Error while running Text '{name}'. Check the system console for error output")]
    ScriptFailed { name: String },

    /// Host export failed; root cause is only logged
    #[error("Error while exporting scene. Check the system console for error output")]
    ExportFailed,

    /// Request cannot run in the current host state
    #[error("{0}")]
    Precondition(String),
}

impl ApiError {
    pub fn not_found(kind: NodeKind, name: &str) -> Self {
        ApiError::NotFound { kind, name: name.to_string() }
    }

    pub fn status(&self) -> u16 {
        match self {
            ApiError::NotFound { .. } => 404,
            ApiError::ScriptFailed { .. } | ApiError::ExportFailed => 500,
            ApiError::Precondition(_) => 400,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Serialize)]
struct Greeting {
    message: String,
}

/// Response payload. JSON is kept serialized so float formatting is exact.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(String),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Body,
}

impl ApiResponse {
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string(value) {
            Ok(json) => Self { status: 200, body: Body::Json(json) },
            Err(e) => {
                error!("Failed to serialize response: {}", e);
                Self::error(500, "Internal error")
            }
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self { status: 200, body: Body::Text(text.into()) }
    }

    /// `{"error": message}` with the given status.
    pub fn error(status: u16, message: &str) -> Self {
        let json = serde_json::to_string(&ErrorBody { error: message })
            .unwrap_or_else(|_| String::from("{\"error\":\"Internal error\"}"));
        Self { status, body: Body::Json(json) }
    }
}

impl From<ApiError> for ApiResponse {
    fn from(err: ApiError) -> Self {
        ApiResponse::error(err.status(), &err.to_string())
    }
}

/// One routed request, ready to run against the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    Version,
    Objects,
    Object(String),
    Collections,
    Collection(String),
    Materials,
    Material(String),
    Texts,
    RunScript(String),
    ExportScene,
    Greeting(String),
}

/// Request dispatcher. Owns the surrogate-id table and export configuration.
#[derive(Debug, Default)]
pub struct Api {
    ids: IdTable,
    export: ExportSettings,
}

impl Api {
    pub fn new(export: ExportSettings) -> Self {
        Self { ids: IdTable::new(), export }
    }

    /// Run `call` against the live host.
    pub fn handle<H: SceneHost + ?Sized>(&mut self, host: &mut H, call: &ApiCall) -> ApiResponse {
        trace!("API call: {:?}", call);
        let ids = &mut self.ids;
        let result = match call {
            ApiCall::Version => Ok(ApiResponse::text(host.version())),
            ApiCall::Objects => Ok(ApiResponse::json(&assemble::objects(&*host, ids))),
            ApiCall::Object(name) => {
                resolve::object(&*host, name).map(|obj| ApiResponse::json(&assemble::object(ids, &obj)))
            }
            ApiCall::Collections => Ok(ApiResponse::json(&assemble::collections(&*host, ids))),
            ApiCall::Collection(name) => {
                resolve::collection(&*host, name).map(|col| ApiResponse::json(&assemble::collection(ids, &col)))
            }
            ApiCall::Materials => Ok(ApiResponse::json(&assemble::materials(&*host, ids))),
            ApiCall::Material(name) => {
                resolve::material(&*host, name).map(|mat| ApiResponse::json(&assemble::material(ids, &mat)))
            }
            ApiCall::Texts => Ok(ApiResponse::json(&assemble::texts(&*host, ids))),
            ApiCall::RunScript(name) => actions::run_script(host, name).map(|r| ApiResponse::json(&r)),
            ApiCall::ExportScene => actions::export_scene(host, &self.export).map(|r| ApiResponse::json(&r)),
            ApiCall::Greeting(name) => Ok(ApiResponse::json(&Greeting { message: format!("Hello, {}", name) })),
        };
        result.unwrap_or_else(ApiResponse::from)
    }
}
