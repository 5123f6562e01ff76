use std::sync::Arc;
use std::time::Duration;

use liteaidetect_api::app::{self, services};
use liteaidetect_api::ApiConfig;
use liteaidetect_core::JobStatus;
use liteaidetect_infra::jobs::DelayRange;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::Value;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, short lifecycle delays, ephemeral port.
        let mut config = ApiConfig::default();
        config.simulator.queue_delay = DelayRange::new(20, 40);
        config.simulator.run_delay = DelayRange::new(30, 60);
        config.simulator.seed = Some(7);

        let app = liteaidetect_api::app::build_app(config)
            .await
            .expect("failed to build app");
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn upload_form(files: &[(&str, usize)]) -> Form {
    files.iter().fold(Form::new(), |form, (name, size)| {
        form.part("files", Part::bytes(vec![b'x'; *size]).file_name(name.to_string()))
    })
}

async fn upload(client: &reqwest::Client, srv: &TestServer, files: &[(&str, usize)]) -> Vec<Value> {
    let res = client
        .post(srv.url("/api/jobs/batch"))
        .multipart(upload_form(files))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    body.as_array().unwrap().clone()
}

async fn get_job(client: &reqwest::Client, srv: &TestServer, id: &str) -> Value {
    let res = client.get(srv.url(&format!("/api/jobs/{id}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    res.json().await.unwrap()
}

async fn wait_for_status(client: &reqwest::Client, srv: &TestServer, id: &str, status: &str) -> Value {
    // Lifecycle runs on real timers here; poll until the job gets there.
    for _ in 0..100 {
        let job = get_job(client, srv, id).await;
        if job["status"] == status {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("job {id} did not reach {status} in time");
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn upload_list_and_complete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = upload(&client, &srv, &[("a.txt", 100)]).await;
    assert_eq!(created.len(), 1);
    let job = &created[0];
    assert_eq!(job["status"], "QUEUED");
    assert_eq!(job["filename"], "a.txt");
    assert_eq!(job["size_bytes"], 100);
    assert_eq!(job["model_version"], "cnn-1d-onnx@0.1.0");
    assert!(job["ai_probability"].is_null());
    let id = job["id"].as_str().unwrap().to_string();
    assert_eq!(job["s3_key"], format!("mock/{id}/a.txt"));

    let res = client.get(srv.url("/api/jobs")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["page"], 1);
    assert_eq!(page["page_size"], 20);

    let done = wait_for_status(&client, &srv, &id, "DONE").await;
    let p = done["ai_probability"].as_f64().unwrap();
    assert!((0.15..0.85).contains(&p));
    let expected_label = if p >= 0.7 {
        "AI"
    } else if p <= 0.3 {
        "HUMAN"
    } else {
        "UNCERTAIN"
    };
    assert_eq!(done["label"], expected_label);
    assert!(done["latency_ms"].as_u64().is_some());
    assert!(done["feature_summary"]["avg_word_len"].as_f64().is_some());
}

#[tokio::test]
async fn batch_keeps_upload_order_and_language() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let form = upload_form(&[("one.txt", 1), ("two.txt", 2)]).text("language", "fr");
    let res = client
        .post(srv.url("/api/jobs/batch"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let jobs: Vec<Value> = res.json().await.unwrap();

    assert_eq!(jobs[0]["filename"], "one.txt");
    assert_eq!(jobs[1]["filename"], "two.txt");
    assert!(jobs.iter().all(|j| j["language"] == "fr"));
}

#[tokio::test]
async fn batch_without_files_is_rejected() {
    let srv = TestServer::spawn().await;
    let res = reqwest::Client::new()
        .post(srv.url("/api/jobs/batch"))
        .multipart(Form::new().text("language", "en"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn cancel_before_running_sticks() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = upload(&client, &srv, &[("a.txt", 100)]).await;
    let id = created[0]["id"].as_str().unwrap().to_string();

    let res = client
        .post(srv.url(&format!("/api/jobs/{id}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], id.as_str());
    assert_eq!(body["status"], "CANCELLED");
    assert_eq!(body["applied"], true);

    // Well past the longest possible lifecycle.
    tokio::time::sleep(Duration::from_millis(250)).await;

    let job = get_job(&client, &srv, &id).await;
    assert_eq!(job["status"], "CANCELLED");
    assert!(job["ai_probability"].is_null());
    assert!(job["finished_at"].is_string());

    let again: Value = client
        .post(srv.url(&format!("/api/jobs/{id}/cancel")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(again["applied"], false);
    assert_eq!(again["status"], "CANCELLED");
}

#[tokio::test]
async fn rerun_after_done_completes_again() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = upload(&client, &srv, &[("a.txt", 10)]).await;
    let id = created[0]["id"].as_str().unwrap().to_string();

    // Not terminal yet: reported, not applied.
    let early: Value = client
        .post(srv.url(&format!("/api/jobs/{id}/rerun")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(early["applied"], false);

    wait_for_status(&client, &srv, &id, "DONE").await;

    let res = client
        .post(srv.url(&format!("/api/jobs/{id}/rerun")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["applied"], true);
    assert_eq!(body["status"], "QUEUED");

    let requeued = get_job(&client, &srv, &id).await;
    assert!(requeued["ai_probability"].is_null());
    assert!(requeued["label"].is_null());

    wait_for_status(&client, &srv, &id, "DONE").await;
}

#[tokio::test]
async fn ids_are_validated() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/api/jobs/not-a-uuid")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_id");

    let unknown = "01890a5d-ac96-774b-bcce-b302099a8057";
    let res = client.get(srv.url(&format!("/api/jobs/{unknown}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .post(srv.url(&format!("/api/jobs/{unknown}/cancel")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn list_filters_by_status_and_text() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = upload(&client, &srv, &[("report.pdf", 5), ("essay.txt", 5), ("notes.md", 5)]).await;
    let essay_id = created[1]["id"].as_str().unwrap();
    client
        .post(srv.url(&format!("/api/jobs/{essay_id}/cancel")))
        .send()
        .await
        .unwrap();

    let page: Value = client
        .get(srv.url("/api/jobs?status=cancelled"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["filename"], "essay.txt");

    let page: Value = client
        .get(srv.url("/api/jobs?q=REPORT"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["items"][0]["filename"], "report.pdf");

    let page: Value = client
        .get(srv.url("/api/jobs?page=2&page_size=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["items"].as_array().unwrap().len(), 1);

    let res = client.get(srv.url("/api/jobs?status=SLEEPING")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_status");
}

async fn list_total(client: &reqwest::Client, srv: &TestServer, query: &str) -> Value {
    let res = client.get(srv.url(&format!("/api/jobs?{query}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "query {query}");
    let page: Value = res.json().await.unwrap();
    page["total"].clone()
}

#[tokio::test]
async fn list_filters_by_several_statuses() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let created = upload(&client, &srv, &[("a.txt", 5), ("b.txt", 5), ("c.txt", 5)]).await;
    let ids: Vec<&str> = created.iter().map(|job| job["id"].as_str().unwrap()).collect();
    client
        .post(srv.url(&format!("/api/jobs/{}/cancel", ids[0])))
        .send()
        .await
        .unwrap();
    wait_for_status(&client, &srv, ids[1], "DONE").await;
    wait_for_status(&client, &srv, ids[2], "DONE").await;

    for query in [
        "status=CANCELLED&status=DONE",
        "status[]=CANCELLED&status[]=DONE",
        "status%5B%5D=cancelled&status=done",
        "status=CANCELLED,DONE",
    ] {
        assert_eq!(list_total(&client, &srv, query).await, 3, "query {query}");
    }

    for query in ["status=CANCELLED&status=RUNNING", "status[]=CANCELLED&status[]=RUNNING"] {
        assert_eq!(list_total(&client, &srv, query).await, 1, "query {query}");
    }

    let res = client
        .get(srv.url("/api/jobs?status=DONE&status[]=SLEEPING"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_status");
}

#[tokio::test]
async fn malformed_list_query_is_json_bad_request() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for query in ["page=abc", "page_size=-1"] {
        let res = client.get(srv.url(&format!("/api/jobs?{query}"))).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "query {query}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "invalid_query");
        assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
    }
}

#[tokio::test]
async fn graceful_shutdown_revokes_pending_timers() {
    let mut config = ApiConfig::default();
    config.simulator.queue_delay = DelayRange::fixed(60_000);
    config.simulator.run_delay = DelayRange::fixed(60_000);
    config.simulator.seed = Some(7);

    let services = Arc::new(services::build_services(&config).expect("failed to build services"));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(app::serve(
        listener,
        Arc::clone(&services),
        config.max_upload_bytes,
        async move {
            let _ = stop_rx.await;
        },
    ));

    let client = reqwest::Client::new();
    let res = client
        .post(format!("http://{addr}/api/jobs/batch"))
        .multipart(upload_form(&[("slow.txt", 5)]))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: Vec<Value> = res.json().await.unwrap();
    let id = created[0]["id"].as_str().unwrap().parse().unwrap();
    drop(client);
    assert_eq!(services.jobs.simulator().armed(), 1);

    stop_tx.send(()).unwrap();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    assert_eq!(services.jobs.simulator().armed(), 0);
    let job = services.jobs.get_job(id).unwrap().unwrap();
    assert_eq!(job.status, JobStatus::Queued);
}

#[tokio::test]
async fn dashboard_aggregates_jobs() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let empty: Value = client
        .get(srv.url("/api/dashboard"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty["totals"]["all"], 0);
    assert_eq!(empty["latency"]["samples"], 0);
    assert_eq!(empty["histogram"].as_array().unwrap().len(), 20);

    let created = upload(&client, &srv, &[("a.txt", 1), ("b.txt", 2)]).await;
    for job in &created {
        wait_for_status(&client, &srv, job["id"].as_str().unwrap(), "DONE").await;
    }

    let res = client.get(srv.url("/api/dashboard")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let metrics: Value = res.json().await.unwrap();
    assert_eq!(metrics["totals"]["all"], 2);
    assert_eq!(metrics["totals"]["done"], 2);
    assert_eq!(metrics["latency"]["samples"], 2);
    let counted: u64 = metrics["histogram"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["count"].as_u64().unwrap())
        .sum();
    assert_eq!(counted, 2);
    assert_eq!(metrics["languages"][0]["lang"], "unknown");
    assert_eq!(metrics["versions"][0]["model_version"], "cnn-1d-onnx@0.1.0");
    assert_eq!(metrics["timeseries"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn events_stream_lifecycle_transitions() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let mut stream = client.get(srv.url("/api/events")).send().await.unwrap();
    assert_eq!(stream.status(), StatusCode::OK);
    assert!(stream.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let created = upload(&client, &srv, &[("a.txt", 1)]).await;
    let id = created[0]["id"].as_str().unwrap().to_string();

    let mut seen = String::new();
    let read = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(chunk) = stream.chunk().await.unwrap() {
            seen.push_str(&String::from_utf8_lossy(&chunk));
            if seen.contains("event: DONE") {
                break;
            }
        }
    })
    .await;

    assert!(read.is_ok(), "no DONE event within timeout; saw: {seen}");
    assert!(seen.contains("event: QUEUED"));
    assert!(seen.contains("event: RUNNING"));
    assert!(seen.contains(&id));
}
