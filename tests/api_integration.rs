//! Integration tests for the HTTP + WebSocket surface.
//!
//! Each test spins up the Axum app on a random port with stub pipelines,
//! drives it with reqwest / tokio-tungstenite and checks the real contract.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use decor_assist::api::{AppState, router};
use decor_assist::config::ServerConfig;
use decor_assist::dialogue::{Catalog, SessionRegistry};
use decor_assist::error::GenerationError;
use decor_assist::pipelines::{
    PlaceholderImagePipeline, Pipelines, SpeechPipeline, VideoOutput, VideoPipeline,
    VideoSettings,
};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Upload limit used by the test server.
const MAX_UPLOAD: usize = 4096;

/// Writes a few bytes and reports the requested frame count.
struct StubVideo;

#[async_trait]
impl VideoPipeline for StubVideo {
    fn name(&self) -> &str {
        "stub-video"
    }

    async fn generate(
        &self,
        _image: &Path,
        settings: &VideoSettings,
        output: &Path,
    ) -> Result<VideoOutput, GenerationError> {
        tokio::fs::write(output, b"\x00\x00\x00\x18ftypmp42").await?;
        Ok(VideoOutput {
            frames: settings.num_frames,
            fps: settings.fps,
            duration: settings.duration(),
            file_size_mb: 0.0,
        })
    }
}

/// Writes a wav header, or fails for the text "fail".
struct StubSpeech;

#[async_trait]
impl SpeechPipeline for StubSpeech {
    fn name(&self) -> &str {
        "stub-speech"
    }

    async fn synthesize(
        &self,
        text: &str,
        _language: &str,
        output: &Path,
    ) -> Result<(), GenerationError> {
        if text == "fail" {
            return Err(GenerationError::RequestFailed {
                backend: "speech".to_string(),
                reason: "model crashed".to_string(),
            });
        }
        tokio::fs::write(output, b"RIFF\x00\x00\x00\x00WAVE").await?;
        Ok(())
    }
}

struct TestServer {
    base: String,
    port: u16,
    state: AppState,
    _tmp: tempfile::TempDir,
}

async fn start_server() -> TestServer {
    let tmp = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        upload_dir: tmp.path().join("uploads"),
        output_dir: tmp.path().join("outputs"),
        images_dir: tmp.path().join("generated_images"),
        tts_dir: tmp.path().join("tts_output"),
        data_dir: tmp.path().join("data"),
        max_upload_bytes: MAX_UPLOAD,
        ..ServerConfig::default()
    };
    std::fs::create_dir_all(&config.tts_dir).unwrap();

    let pipelines = Pipelines::with_backends(
        Arc::new(PlaceholderImagePipeline),
        Arc::new(StubVideo),
        Arc::new(StubSpeech),
    );
    let sessions = SessionRegistry::with_catalog(Catalog::builtin());
    let state = AppState::new(config, pipelines, sessions);
    state.store.dirs().ensure().await.unwrap();

    let app = router(state.clone()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestServer {
        base: format!("http://127.0.0.1:{port}"),
        port,
        state,
        _tmp: tmp,
    }
}

/// Poll the status endpoint until the job is terminal.
async fn wait_for_terminal(client: &reqwest::Client, base: &str, job_id: &str) -> Value {
    loop {
        let job: Value = client
            .get(format!("{base}/api/v1/status/{job_id}"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if job["status"] == "completed" || job["status"] == "failed" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

fn parse_ws_json(msg: &Message) -> Value {
    match msg {
        Message::Text(txt) => serde_json::from_str(txt).expect("invalid JSON from server"),
        other => panic!("expected Text frame, got {:?}", other),
    }
}

// ── Jobs ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn image_job_completes_and_downloads_png() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let client = reqwest::Client::new();

        let resp = client
            .post(format!("{}/api/v1/generate/image", server.base))
            .json(&serde_json::json!({ "prompt": "modern sofa", "width": 256, "height": 256 }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "queued");
        let job_id = body["job_id"].as_str().unwrap().to_string();

        let job = wait_for_terminal(&client, &server.base, &job_id).await;
        assert_eq!(job["status"], "completed");
        assert_eq!(job["progress"], 100);
        assert_eq!(job["job_type"], "image");
        assert_eq!(job["image_url"], format!("/api/v1/download/image/{job_id}"));
        assert!(!job["completed_at"].is_null());

        let download = client
            .get(format!("{}/api/v1/download/image/{job_id}", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(download.status(), 200);
        assert_eq!(download.headers()["content-type"], "image/png");
        let bytes = download.bytes().await.unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));

        // Image jobs have no video
        let video = client
            .get(format!("{}/api/v1/download/video/{job_id}", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(video.status(), 400);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn out_of_range_parameters_are_rejected() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let client = reqwest::Client::new();

        for body in [
            serde_json::json!({ "prompt": "sofa", "num_inference_steps": 5 }),
            serde_json::json!({ "prompt": "sofa", "guidance_scale": 25.0 }),
            serde_json::json!({ "prompt": "sofa", "width": 2048 }),
            serde_json::json!({ "prompt": "   " }),
        ] {
            let resp = client
                .post(format!("{}/api/v1/generate/image", server.base))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 400, "body {body} should be rejected");
        }
        assert!(server.state.store.is_empty().await);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn image_to_video_publishes_both_outputs() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let client = reqwest::Client::new();

        let body: Value = client
            .post(format!("{}/api/v1/generate/image-to-video", server.base))
            .json(&serde_json::json!({ "prompt": "cozy bedroom", "room_type": "bedroom" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let job_id = body["job_id"].as_str().unwrap().to_string();

        let job = wait_for_terminal(&client, &server.base, &job_id).await;
        assert_eq!(job["status"], "completed");
        assert_eq!(job["job_type"], "image-to-video");
        assert_eq!(job["frames"], 14);
        assert_eq!(
            job["image_url"],
            format!("/api/v1/download/image/{job_id}_image")
        );

        let stage = client
            .get(format!("{}/api/v1/download/image/{job_id}_image", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(stage.status(), 200);
        assert_eq!(stage.headers()["content-type"], "image/png");

        let video = client
            .get(format!("{}/api/v1/download/video/{job_id}", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(video.status(), 200);
        assert_eq!(video.headers()["content-type"], "video/mp4");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn video_upload_validates_extension_and_size() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let client = reqwest::Client::new();
        let url = format!("{}/api/v1/generate/video", server.base);

        let gif = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(vec![0u8; 16]).file_name("room.gif"),
        );
        let resp = client.post(&url).multipart(gif).send().await.unwrap();
        assert_eq!(resp.status(), 400);

        let big = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(vec![0u8; MAX_UPLOAD + 1]).file_name("room.png"),
        );
        let resp = client.post(&url).multipart(big).send().await.unwrap();
        assert_eq!(resp.status(), 413);
        assert!(server.state.store.is_empty().await);

        let ok = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(vec![1u8; 64]).file_name("Room.JPG"),
        );
        let body: Value = client
            .post(format!("{url}?room_type=kitchen&motion_style=dynamic"))
            .multipart(ok)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let job_id = body["job_id"].as_str().unwrap().to_string();
        assert!(
            server
                .state
                .store
                .dirs()
                .uploads
                .join(format!("{job_id}.jpg"))
                .exists()
        );

        let job = wait_for_terminal(&client, &server.base, &job_id).await;
        assert_eq!(job["status"], "completed");
        assert_eq!(job["video_url"], format!("/api/v1/download/video/{job_id}"));
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn status_errors_and_delete() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let client = reqwest::Client::new();

        let malformed = client
            .get(format!("{}/api/v1/status/not-a-uuid", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(malformed.status(), 400);

        let missing = client
            .get(format!("{}/api/v1/status/{}", server.base, uuid::Uuid::new_v4()))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);
        let body: Value = missing.json().await.unwrap();
        assert_eq!(body["error"], "Job not found");

        let body: Value = client
            .post(format!("{}/api/v1/generate/image", server.base))
            .json(&serde_json::json!({ "prompt": "modern sofa" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let job_id = body["job_id"].as_str().unwrap().to_string();
        wait_for_terminal(&client, &server.base, &job_id).await;

        let listed: Value = client
            .get(format!("{}/api/v1/jobs", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed["jobs"].as_array().unwrap().len(), 1);

        let deleted: Value = client
            .delete(format!("{}/api/v1/jobs/{job_id}", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(deleted["message"], "Job deleted successfully");
        assert_eq!(deleted["files_removed"], 1);

        let gone = client
            .get(format!("{}/api/v1/status/{job_id}", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(gone.status(), 404);
        let again = client
            .delete(format!("{}/api/v1/jobs/{job_id}", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(again.status(), 404);
    })
    .await
    .expect("test timed out");
}

// ── Service ──────────────────────────────────────────────────────────

#[tokio::test]
async fn health_and_descriptor() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let client = reqwest::Client::new();

        let health: Value = client
            .get(format!("{}/health", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(health["status"], "healthy");
        assert_eq!(health["jobs"], 0);
        assert_eq!(health["image_model_loaded"], false);

        let root: Value = client
            .get(format!("{}/", server.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(root["status"], "active");
        assert_eq!(root["endpoints"]["chat"], "/chat");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn tts_returns_wav_and_reports_failures() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let client = reqwest::Client::new();
        let url = format!("{}/tts", server.base);

        let resp = client
            .post(&url)
            .json(&serde_json::json!({ "text": "أهلا" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.headers()["content-type"], "audio/wav");
        assert!(resp.bytes().await.unwrap().starts_with(b"RIFF"));

        let empty = client
            .post(&url)
            .json(&serde_json::json!({ "text": "  " }))
            .send()
            .await
            .unwrap();
        assert_eq!(empty.status(), 400);

        let failed = client
            .post(&url)
            .json(&serde_json::json!({ "text": "fail" }))
            .send()
            .await
            .unwrap();
        assert_eq!(failed.status(), 500);
        let body: Value = failed.json().await.unwrap();
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("TTS generation failed:")
        );

        // Neither the served nor the failed request leaves audio behind
        let leftover = std::fs::read_dir(&server.state.config.tts_dir)
            .unwrap()
            .count();
        assert_eq!(leftover, 0);
    })
    .await
    .expect("test timed out");
}

// ── Chat ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn chat_add_flow_keeps_session_state() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let client = reqwest::Client::new();
        let url = format!("{}/chat", server.base);

        let first: Value = client
            .post(&url)
            .json(&serde_json::json!({ "message": "أضف كنبة", "session_id": "s1" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(first["response"].as_str().unwrap().contains("بإيه لون"));
        assert!(first.get("image").is_none());

        // Another session is not waiting for a colour
        let other: Value = client
            .post(&url)
            .json(&serde_json::json!({ "message": "أزرق", "session_id": "s2" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(!other["response"].as_str().unwrap().contains("تمت الإضافة"));

        let second: Value = client
            .post(&url)
            .json(&serde_json::json!({ "message": "أزرق", "session_id": "s1" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(second["response"].as_str().unwrap().contains("تمت الإضافة بنجاح"));

        let listing: Value = client
            .post(format!("{}/quick_action", server.base))
            .json(&serde_json::json!({ "action": "my_items", "session_id": "s1" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(listing["response"].as_str().unwrap().contains("كنبة"));

        let cleared: Value = client
            .post(format!("{}/clear", server.base))
            .json(&serde_json::json!({ "session_id": "s1" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(cleared["status"], "success");
        assert_eq!(cleared["message"], "Chat cleared");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn chat_image_request_runs_a_job() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let client = reqwest::Client::new();

        let reply: Value = client
            .post(format!("{}/chat", server.base))
            .json(&serde_json::json!({ "message": "image of a modern sofa" }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(
            reply["response"]
                .as_str()
                .unwrap()
                .starts_with("Successfully generated an image")
        );
        let job_id = reply["job_id"].as_str().unwrap();
        assert_eq!(reply["image"], format!("/api/v1/download/image/{job_id}"));

        let download = client
            .get(format!("{}{}", server.base, reply["image"].as_str().unwrap()))
            .send()
            .await
            .unwrap();
        assert_eq!(download.status(), 200);
        assert_eq!(download.headers()["content-type"], "image/png");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn clear_accepts_empty_body() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;
        let resp = reqwest::Client::new()
            .post(format!("{}/clear", server.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        // Clearing a session nobody used does not start one
        assert!(server.state.sessions.is_empty().await);
    })
    .await
    .expect("test timed out");
}

// ── WebSocket ────────────────────────────────────────────────────────

#[tokio::test]
async fn ws_sync_then_job_events() {
    timeout(TEST_TIMEOUT, async {
        let server = start_server().await;

        let (mut ws, _resp) = connect_async(format!("ws://127.0.0.1:{}/ws/jobs", server.port))
            .await
            .expect("WS connect failed");

        let sync = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(sync["type"], "jobs_sync");
        assert!(sync["jobs"].as_array().unwrap().is_empty());

        let body: Value = reqwest::Client::new()
            .post(format!("{}/api/v1/generate/image", server.base))
            .json(&serde_json::json!({ "prompt": "modern sofa", "width": 256, "height": 256 }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let job_id = body["job_id"].as_str().unwrap().to_string();

        let created = parse_ws_json(&ws.next().await.unwrap().unwrap());
        assert_eq!(created["type"], "job_created");
        assert_eq!(created["job"]["job_id"], job_id);

        // processing, then completed
        let mut last = Value::Null;
        while last["job"]["status"] != "completed" {
            last = parse_ws_json(&ws.next().await.unwrap().unwrap());
            assert_eq!(last["type"], "job_updated");
        }
        assert_eq!(last["job"]["progress"], 100);
    })
    .await
    .expect("test timed out");
}
