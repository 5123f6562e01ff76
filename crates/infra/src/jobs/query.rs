//! Listing, filtering and pagination over stored jobs.

use serde::Serialize;

use liteaidetect_core::{Job, JobStatus};

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Filter + page request. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobQuery {
    /// Case-insensitive substring matched against filename or id.
    pub q: Option<String>,
    /// Allowed statuses; empty means any.
    pub statuses: Vec<JobStatus>,
    pub page: usize,
    pub page_size: usize,
}

impl Default for JobQuery {
    fn default() -> Self {
        Self {
            q: None,
            statuses: Vec::new(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl JobQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, q: impl Into<String>) -> Self {
        self.q = Some(q.into());
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Page number actually served; `0` is treated as the first page.
    pub fn effective_page(&self) -> usize {
        self.page.max(1)
    }

    /// Page size actually served: `0` falls back to the default, large values are capped.
    pub fn effective_page_size(&self) -> usize {
        match self.page_size {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        }
    }

    fn needle(&self) -> Option<String> {
        self.q
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, job: &Job) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&job.status) {
            return false;
        }
        match self.needle() {
            Some(needle) => {
                job.filename.to_lowercase().contains(&needle)
                    || job.id.to_string().contains(&needle)
            }
            None => true,
        }
    }

    /// Filter `jobs` (already in listing order) and cut out the requested page.
    pub fn apply(&self, jobs: Vec<Job>) -> JobPage {
        let page = self.effective_page();
        let page_size = self.effective_page_size();
        let matching: Vec<Job> = jobs
            .into_iter()
            .filter(|job| self.matches(job))
            .collect();

        let total = matching.len();
        let items = matching
            .into_iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        JobPage {
            items,
            total,
            page,
            page_size,
        }
    }
}

/// One page of results. `total` counts every match, not just this page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobPage {
    pub items: Vec<Job>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
}
