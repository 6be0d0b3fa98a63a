use serde::{Deserialize, Serialize};

use crate::errors::ErrorCode;

/// Uniform success/failure envelope returned by every operation that can fail.
///
/// Fields are private so an envelope cannot be altered after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    success: bool,
    code: ErrorCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    detail: String,
}

impl OperationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: ErrorCode::Success,
            detail: String::new(),
        }
    }

    /// Failure without a specific reason; carries the `UnknownError` sentinel.
    pub fn fail(detail: impl Into<String>) -> Self {
        Self::fail_with(detail, ErrorCode::UnknownError)
    }

    pub fn fail_with(detail: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            success: false,
            code,
            detail: detail.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// Typed payload plus envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(flatten)]
    pub result: OperationResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            result: OperationResult::ok(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn empty() -> Self {
        Self {
            result: OperationResult::ok(),
            data: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub service: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checks: Option<Vec<HealthCheck>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    fn severity(self) -> u8 {
        match self {
            HealthStatus::Healthy => 0,
            HealthStatus::Degraded => 1,
            HealthStatus::Unhealthy => 2,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HealthResponse {
    pub fn healthy(service: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Healthy,
            service: service.into(),
            version: version.into(),
            checks: None,
        }
    }

    /// The overall status is the worst status among `checks`.
    pub fn with_checks(mut self, checks: Vec<HealthCheck>) -> Self {
        self.status = checks
            .iter()
            .map(|c| c.status)
            .max_by_key(|status| status.severity())
            .unwrap_or(HealthStatus::Healthy);
        self.checks = Some(checks);
        self
    }
}
