//! Dashboard aggregation.
//!
//! A snapshot is recomputed from a full scan on every request; nothing here is
//! cached or persisted.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use liteaidetect_core::{Job, JobStatus, Label};

/// Number of probability histogram buckets (width 0.05 over `[0, 1)`).
pub const HISTOGRAM_BUCKETS: usize = 20;

/// Language key used for jobs that did not declare one.
pub const UNKNOWN_LANGUAGE: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusTotals {
    pub all: usize,
    pub pending: usize,
    pub queued: usize,
    pub running: usize,
    pub done: usize,
    pub error: usize,
    pub cancelled: usize,
}

impl StatusTotals {
    fn count(&mut self, status: JobStatus) {
        self.all += 1;
        let slot = match status {
            JobStatus::Pending => &mut self.pending,
            JobStatus::Queued => &mut self.queued,
            JobStatus::Running => &mut self.running,
            JobStatus::Done => &mut self.done,
            JobStatus::Error => &mut self.error,
            JobStatus::Cancelled => &mut self.cancelled,
        };
        *slot += 1;
    }
}

/// Work currently in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    pub running: usize,
    pub queued: usize,
}

/// Running-phase latency over DONE jobs. `samples == 0` means no data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LatencyStats {
    pub avg_ms: u64,
    pub p95_ms: u64,
    pub samples: usize,
}

impl LatencyStats {
    pub fn from_samples(mut samples: Vec<u64>) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        samples.sort_unstable();
        let n = samples.len();
        let sum: u128 = samples.iter().map(|&ms| u128::from(ms)).sum();
        let avg = (sum as f64 / n as f64).round() as u64;
        // floor(0.95 * n) in integer arithmetic.
        let p95 = samples[(n * 95 / 100).min(n - 1)];

        Self {
            avg_ms: avg,
            p95_ms: p95,
            samples: n,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageCount {
    #[serde(rename = "lang")]
    pub language: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelCount {
    pub label: Label,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionCount {
    pub model_version: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    /// Display key, e.g. `"0.15-0.20"`.
    pub bucket: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub total: usize,
    pub done: usize,
    pub error: usize,
}

/// Bucket a probability lands in: `min(19, floor(p * 20))`.
pub fn bucket_index(p: f64) -> usize {
    let raw = (p * HISTOGRAM_BUCKETS as f64).floor();
    if raw.is_nan() || raw < 0.0 {
        0
    } else {
        (raw as usize).min(HISTOGRAM_BUCKETS - 1)
    }
}

fn empty_histogram() -> Vec<HistogramBucket> {
    (0..HISTOGRAM_BUCKETS)
        .map(|i| {
            let lower = i as f64 / HISTOGRAM_BUCKETS as f64;
            let upper = (i + 1) as f64 / HISTOGRAM_BUCKETS as f64;
            HistogramBucket {
                bucket: format!("{lower:.2}-{upper:.2}"),
                lower,
                upper,
                count: 0,
            }
        })
        .collect()
}

/// Aggregate view served to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub totals: StatusTotals,
    pub queue: QueueDepth,
    pub latency: LatencyStats,
    pub languages: Vec<LanguageCount>,
    pub labels: Vec<LabelCount>,
    pub versions: Vec<VersionCount>,
    pub histogram: Vec<HistogramBucket>,
    pub timeseries: Vec<DailyCount>,
}

impl DashboardMetrics {
    pub fn compute(jobs: &[Job]) -> Self {
        let mut totals = StatusTotals::default();
        let mut latencies = Vec::new();
        let mut languages: BTreeMap<&str, usize> = BTreeMap::new();
        let mut labels: BTreeMap<Label, usize> = BTreeMap::new();
        let mut versions: BTreeMap<&str, usize> = BTreeMap::new();
        let mut histogram = empty_histogram();
        let mut days: BTreeMap<NaiveDate, DailyCount> = BTreeMap::new();

        for job in jobs {
            totals.count(job.status);

            if job.status == JobStatus::Done {
                if let Some(ms) = job.latency_ms {
                    latencies.push(ms);
                }
            }

            let language = job.language.as_deref().unwrap_or(UNKNOWN_LANGUAGE);
            *languages.entry(language).or_default() += 1;

            let label = job.effective_label().unwrap_or(Label::Uncertain);
            *labels.entry(label).or_default() += 1;

            *versions.entry(job.model_version.as_str()).or_default() += 1;

            if let Some(p) = job.ai_probability {
                histogram[bucket_index(p)].count += 1;
            }

            let date = job.created_at.date_naive();
            let day = days.entry(date).or_insert_with(|| DailyCount {
                date,
                total: 0,
                done: 0,
                error: 0,
            });
            day.total += 1;
            match job.status {
                JobStatus::Done => day.done += 1,
                JobStatus::Error => day.error += 1,
                _ => {}
            }
        }

        Self {
            queue: QueueDepth {
                running: totals.running,
                queued: totals.queued,
            },
            totals,
            latency: LatencyStats::from_samples(latencies),
            languages: languages
                .into_iter()
                .map(|(language, count)| LanguageCount {
                    language: language.to_string(),
                    count,
                })
                .collect(),
            labels: labels
                .into_iter()
                .map(|(label, count)| LabelCount { label, count })
                .collect(),
            versions: versions
                .into_iter()
                .map(|(model_version, count)| VersionCount {
                    model_version: model_version.to_string(),
                    count,
                })
                .collect(),
            histogram,
            timeseries: days.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use liteaidetect_core::{Classification, FeatureSummary, NewJob};
    use proptest::prelude::*;

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, day, hour, 0, 0).unwrap()
    }

    fn done(p: f64, latency_ms: i64, created: DateTime<Utc>) -> Job {
        let mut job = Job::new(NewJob::new("doc.txt", 1), "m@1", created);
        job.start(created).unwrap();
        let outcome = Classification::new(p, FeatureSummary::new()).unwrap();
        job.complete(outcome, created + chrono::Duration::milliseconds(latency_ms))
            .unwrap();
        job
    }

    fn queued(created: DateTime<Utc>) -> Job {
        Job::new(NewJob::new("doc.txt", 1), "m@1", created)
    }

    #[test]
    fn empty_store_yields_zeroes_and_full_histogram() {
        let metrics = DashboardMetrics::compute(&[]);
        assert_eq!(metrics.totals, StatusTotals::default());
        assert_eq!(metrics.latency, LatencyStats::default());
        assert_eq!(metrics.latency.samples, 0);
        assert_eq!(metrics.histogram.len(), HISTOGRAM_BUCKETS);
        assert!(metrics.histogram.iter().all(|b| b.count == 0));
        assert!(metrics.timeseries.is_empty());
    }

    #[test]
    fn histogram_keys_are_two_decimal_ranges() {
        let histogram = empty_histogram();
        assert_eq!(histogram[0].bucket, "0.00-0.05");
        assert_eq!(histogram[3].bucket, "0.15-0.20");
        assert_eq!(histogram[19].bucket, "0.95-1.00");
        assert_eq!(histogram[3].lower, 0.15);
    }

    #[test]
    fn bucket_edges() {
        assert_eq!(bucket_index(0.0), 0);
        assert_eq!(bucket_index(0.15), 3);
        assert_eq!(bucket_index(0.1999), 3);
        assert_eq!(bucket_index(0.35), 7);
        assert_eq!(bucket_index(0.8499), 16);
        assert_eq!(bucket_index(1.0), 19);
        assert_eq!(bucket_index(f64::NAN), 0);
    }

    #[test]
    fn totals_and_queue_depth() {
        let mut cancelled = queued(at(1, 9));
        cancelled.cancel(at(1, 9)).unwrap();
        let mut running = queued(at(1, 9));
        running.start(at(1, 10)).unwrap();
        let jobs = vec![
            done(0.2, 1_000, at(1, 8)),
            queued(at(1, 9)),
            queued(at(1, 9)),
            running,
            cancelled,
        ];

        let metrics = DashboardMetrics::compute(&jobs);
        assert_eq!(metrics.totals.all, 5);
        assert_eq!(metrics.totals.done, 1);
        assert_eq!(metrics.totals.queued, 2);
        assert_eq!(metrics.totals.running, 1);
        assert_eq!(metrics.totals.cancelled, 1);
        assert_eq!(metrics.queue, QueueDepth { running: 1, queued: 2 });
    }

    #[test]
    fn latency_average_and_p95() {
        let latencies: Vec<u64> = (1..=20).map(|i| i * 100).collect();
        let stats = LatencyStats::from_samples(latencies);
        assert_eq!(stats.samples, 20);
        assert_eq!(stats.avg_ms, 1_050);
        // floor(0.95 * 20) = 19 -> the largest sample.
        assert_eq!(stats.p95_ms, 2_000);

        let single = LatencyStats::from_samples(vec![1_234]);
        assert_eq!((single.avg_ms, single.p95_ms, single.samples), (1_234, 1_234, 1));
    }

    #[test]
    fn latency_only_counts_done_jobs() {
        let jobs = vec![done(0.5, 1_500, at(1, 8)), done(0.5, 2_500, at(1, 8)), queued(at(1, 8))];
        let metrics = DashboardMetrics::compute(&jobs);
        assert_eq!(metrics.latency.samples, 2);
        assert_eq!(metrics.latency.avg_ms, 2_000);
    }

    #[test]
    fn languages_labels_and_versions() {
        let mut french = queued(at(1, 8));
        french.language = Some("fr".into());
        let jobs = vec![done(0.9, 10, at(1, 8)), done(0.1, 10, at(1, 8)), french];

        let metrics = DashboardMetrics::compute(&jobs);
        assert_eq!(
            metrics.languages,
            vec![
                LanguageCount { language: "fr".into(), count: 1 },
                LanguageCount { language: "unknown".into(), count: 2 },
            ]
        );
        assert_eq!(
            metrics.labels,
            vec![
                LabelCount { label: Label::Ai, count: 1 },
                LabelCount { label: Label::Human, count: 1 },
                LabelCount { label: Label::Uncertain, count: 1 },
            ]
        );
        assert_eq!(
            metrics.versions,
            vec![VersionCount { model_version: "m@1".into(), count: 3 }]
        );
    }

    #[test]
    fn timeseries_groups_by_utc_day_ascending() {
        let mut failed = queued(at(2, 23));
        failed.start(at(2, 23)).unwrap();
        failed.fail("boom", at(2, 23)).unwrap();
        let jobs = vec![done(0.5, 10, at(3, 1)), failed, done(0.5, 10, at(2, 0)), queued(at(2, 5))];

        let metrics = DashboardMetrics::compute(&jobs);
        let days: Vec<_> = metrics
            .timeseries
            .iter()
            .map(|d| (d.date.to_string(), d.total, d.done, d.error))
            .collect();
        assert_eq!(
            days,
            vec![
                ("2026-04-02".to_string(), 3, 1, 1),
                ("2026-04-03".to_string(), 1, 1, 0),
            ]
        );
    }

    #[test]
    fn serializes_date_keys() {
        let metrics = DashboardMetrics::compute(&[queued(at(5, 12))]);
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["timeseries"][0]["date"], "2026-04-05");
        assert_eq!(json["labels"][0]["label"], "UNCERTAIN");
        assert_eq!(json["latency"]["samples"], 0);
        assert_eq!(json["languages"][0]["lang"], "unknown");
    }

    proptest! {
        #[test]
        fn histogram_counts_every_probability_once(probabilities in prop::collection::vec(0.0f64..1.0, 0..200)) {
            let jobs: Vec<_> = probabilities
                .iter()
                .map(|&p| done(p, 10, at(1, 8)))
                .collect();

            let metrics = DashboardMetrics::compute(&jobs);
            let counted: usize = metrics.histogram.iter().map(|b| b.count).sum();
            prop_assert_eq!(counted, probabilities.len());

            for &p in &probabilities {
                let bucket = &metrics.histogram[bucket_index(p)];
                prop_assert!(bucket.count > 0);
                prop_assert!(p >= bucket.lower - 1e-9 && p < bucket.upper + 1e-9);
            }
        }
    }
}
