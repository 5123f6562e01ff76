use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use liteaidetect_core::{JobId, JobStatus};
use liteaidetect_infra::{JobQuery, TransitionReport};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

/// `GET /api/jobs` query string. `status` may repeat, use the `status[]`
/// spelling, or carry a comma-separated list; all values are merged.
#[derive(Debug, Default, Deserialize)]
pub struct ListJobsParams {
    pub q: Option<String>,
    #[serde(default)]
    pub status: Vec<String>,
    #[serde(default, rename = "status[]")]
    pub status_list: Vec<String>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl ListJobsParams {
    pub fn into_query(self) -> Result<JobQuery, axum::response::Response> {
        let defaults = JobQuery::default();
        let mut statuses = Vec::new();
        for raw in self.status.iter().chain(&self.status_list) {
            statuses.extend(parse_statuses(raw)?);
        }

        Ok(JobQuery {
            q: self.q,
            statuses,
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        })
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub id: JobId,
    pub status: JobStatus,
    pub applied: bool,
}

impl From<TransitionReport> for TransitionResponse {
    fn from(report: TransitionReport) -> Self {
        Self {
            id: report.job.id,
            status: report.job.status,
            applied: report.applied,
        }
    }
}

// -------------------------
// Parsing helpers
// -------------------------

pub fn parse_job_id(raw: &str) -> Result<JobId, axum::response::Response> {
    raw.parse::<JobId>()
        .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

/// Parse `QUEUED,running, DONE` into statuses. Empty segments are ignored.
pub fn parse_statuses(raw: &str) -> Result<Vec<JobStatus>, axum::response::Response> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<JobStatus>().map_err(|e| {
                errors::json_error(StatusCode::BAD_REQUEST, "invalid_status", e.to_string())
            })
        })
        .collect()
}
