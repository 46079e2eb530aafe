#![allow(dead_code)]

use audio_upload_backend::config::UploadConfig;
use audio_upload_backend::infrastructure::storage::setup_storage;
use audio_upload_backend::services::retention::MemoryRetentionSlot;
use audio_upload_backend::{AppState, create_app};
use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use http_body_util::BodyExt;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const BOUNDARY: &str = "----audio-upload-test-boundary";

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, no padding
const FRAME_LEN: usize = 417;

pub struct TestApp {
    pub app: Router,
    pub upload_dir: TempDir,
    pub static_dir: TempDir,
    pub config: UploadConfig,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config(tweak: impl FnOnce(&mut UploadConfig)) -> Self {
        let upload_dir = TempDir::new().unwrap();
        let static_dir = TempDir::new().unwrap();
        std::fs::write(
            static_dir.path().join("index.html"),
            "<!doctype html><audio controls></audio>",
        )
        .unwrap();

        let mut config = UploadConfig::development(upload_dir.path());
        config.static_dir = static_dir.path().to_path_buf();
        tweak(&mut config);

        let storage = setup_storage(&config).await.unwrap();
        let retention = Arc::new(MemoryRetentionSlot::new());
        let state = AppState::new(config.clone(), storage, retention);

        Self {
            app: create_app(state),
            upload_dir,
            static_dir,
            config,
        }
    }

    pub fn stored_files(&self) -> Vec<String> {
        list_names(self.upload_dir.path())
    }

    pub async fn upload(&self, file_name: &str, content_type: &str, bytes: &[u8]) -> Response<Body> {
        self.send(upload_request(
            &self.config.field_name,
            file_name,
            content_type,
            bytes,
        ))
        .await
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        use tower::ServiceExt;
        self.app.clone().oneshot(request).await.unwrap()
    }
}

pub fn list_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

pub fn multipart_body(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n")
            .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

pub fn upload_request(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            "Content-Type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, file_name, content_type, bytes)))
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub fn mpeg_frames(count: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(count * FRAME_LEN);
    for _ in 0..count {
        out.extend_from_slice(&[0xFF, 0xFB, 0x90, 0xC0]);
        out.extend(std::iter::repeat(0u8).take(FRAME_LEN - 4));
    }
    out
}

/// ID3v2.3 tag with Latin-1 text frames
pub fn id3v23(frames: &[(&[u8; 4], &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (id, text) in frames {
        body.extend_from_slice(&id[..]);
        body.extend_from_slice(&((text.len() + 1) as u32).to_be_bytes());
        body.extend_from_slice(&[0, 0, 0]);
        body.extend_from_slice(text.as_bytes());
    }
    let size = body.len() as u32;
    let mut tag = b"ID3\x03\x00\x00".to_vec();
    tag.extend_from_slice(&[
        ((size >> 21) & 0x7F) as u8,
        ((size >> 14) & 0x7F) as u8,
        ((size >> 7) & 0x7F) as u8,
        (size & 0x7F) as u8,
    ]);
    tag.extend(body);
    tag
}

/// 128-byte ID3v1 trailer
pub fn id3v1(title: &str) -> Vec<u8> {
    let mut tag = vec![0u8; 128];
    tag[..3].copy_from_slice(b"TAG");
    let title = title.as_bytes();
    let len = title.len().min(30);
    tag[3..3 + len].copy_from_slice(&title[..len]);
    tag[127] = 0xFF;
    tag
}

/// Tagged MP3 plus the audio bytes expected once metadata is stripped.
pub fn tagged_mp3(title: &str, frames: usize) -> (Vec<u8>, Vec<u8>) {
    let audio = mpeg_frames(frames);
    let mut bytes = id3v23(&[(b"TIT2", title), (b"TPE1", "Field Recorder")]);
    bytes.extend_from_slice(&audio);
    (bytes, audio)
}
