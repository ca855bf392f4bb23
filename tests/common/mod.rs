//! Shared fixtures: generated PDFs, scratch application state and stand-in
//! HTTP servers for the completion API and the document archive.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use axum::{http::StatusCode, response::Json, routing::post, Router};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use pdfchat::config::{Config, LlmConfig};
use pdfchat::AppState;
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub type Recorded = Arc<Mutex<Vec<Value>>>;

/// One-page PDF with a heading and a three-column table drawn in Courier.
pub fn sample_pdf() -> Vec<u8> {
    pdf_with_lines(&[
        "Quarterly report",
        "Item    Qty    Price",
        "Bolt    4    0.50",
        "Nut    10    0.10",
    ])
}

pub fn pdf_with_lines(lines: &[&str]) -> Vec<u8> {
    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let y = 720 - 20 * i as i64;
        operations.push(Operation::new("BT", vec![]));
        operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
        operations.push(Operation::new("Td", vec![72.into(), y.into()]));
        operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
        operations.push(Operation::new("ET", vec![]));
    }
    pdf_with_operations(operations)
}

/// Table drawn the way most producers do it: every cell has its own
/// position and no padding. With `text_block_per_cell` each cell is its own
/// `BT`/`Tm` block; otherwise each row is one block moving with `Td`.
pub fn positioned_table_pdf(text_block_per_cell: bool) -> Vec<u8> {
    let rows = [["Item", "Qty", "Price"], ["Bolt", "4", "0.50"], ["Nut", "10", "0.10"]];
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 12.into()]),
        Operation::new("Td", vec![72.into(), 740.into()]),
        Operation::new("Tj", vec![Object::string_literal("Parts list")]),
        Operation::new("ET", vec![]),
    ];

    for (r, row) in rows.iter().enumerate() {
        let y = 700 - 20 * r as i64;
        if text_block_per_cell {
            for (c, cell) in row.iter().enumerate() {
                let x = 72 + 110 * c as i64;
                operations.push(Operation::new("BT", vec![]));
                operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
                operations.push(Operation::new(
                    "Tm",
                    vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
                ));
                operations.push(Operation::new("Tj", vec![Object::string_literal(*cell)]));
                operations.push(Operation::new("ET", vec![]));
            }
        } else {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), y.into()]));
            for (c, cell) in row.iter().enumerate() {
                if c > 0 {
                    operations.push(Operation::new("Td", vec![110.into(), 0.into()]));
                }
                operations.push(Operation::new("Tj", vec![Object::string_literal(*cell)]));
            }
            operations.push(Operation::new("ET", vec![]));
        }
    }
    pdf_with_operations(operations)
}

fn pdf_with_operations(operations: Vec<Operation>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().expect("encode content stream"),
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("serialize pdf");
    buffer
}

pub fn test_config(dir: &TempDir, api_url: &str) -> Config {
    Config {
        content_dir: dir.path().join("content"),
        upload_dir: dir.path().join("uploads"),
        llm: LlmConfig {
            api_url: api_url.to_string(),
            api_key: Some("test-key".to_string()),
            ..LlmConfig::default()
        },
        ..Config::default()
    }
}

pub async fn test_state(config: Config) -> AppState {
    let state = AppState::new(config).expect("build state");
    state.init().await.expect("init state");
    state
}

/// Serves `app` on an ephemeral local port and returns its base URL.
pub async fn serve(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{}", addr)
}

/// Completion API that records request bodies and answers with `reply`.
pub async fn spawn_completion_api(status: StatusCode, reply: Value) -> (String, Recorded) {
    let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
    let recorder = seen.clone();

    let app = Router::new().route(
        "/v1/chat/completions",
        post(move |Json(body): Json<Value>| {
            let recorder = recorder.clone();
            let reply = reply.clone();
            async move {
                recorder.lock().unwrap().push(body);
                (status, Json(reply))
            }
        }),
    );

    let base = serve(app).await;
    (format!("{}/v1/chat/completions", base), seen)
}

/// Completion API replying with a single choice whose content is `content`.
pub async fn spawn_chat_reply(content: &str) -> (String, Recorded) {
    spawn_completion_api(
        StatusCode::OK,
        json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }),
    )
    .await
}

pub fn multipart_body(boundary: &str, field: &str, file_name: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, file_name
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/pdf\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}

pub fn user_prompt(request: &Value) -> String {
    request["messages"]
        .as_array()
        .and_then(|messages| messages.iter().find(|m| m["role"] == "user"))
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string()
}
