//! Integration tests for manifest resolution.
//!
//! The gateway is wired exactly as in production except that HTTP goes to an
//! in-memory table of canned ModelScope responses.

use async_trait::async_trait;
use gguf_gateway_core::manifest::MediaType;
use gguf_gateway_core::upstream::MetadataRequest;
use gguf_gateway_core::{
    BlobRequest, BlobResponse, Digest, Fetcher, Gateway, GatewayConfig, GatewayError, Result,
    TemplateEntry, TemplateRegistry,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const BASE: &str = "https://hub.test";
const CHATML: &str = "{% for message in messages %}<|im_start|>{{ message.role }}{% endfor %}";

/// Canned upstream responses with per-URL call counts.
#[derive(Default)]
struct FakeHub {
    responses: HashMap<String, String>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeHub {
    fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn lookup(&self, key: &str, url: &str) -> Result<String> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        self.responses
            .get(key)
            .cloned()
            .ok_or(GatewayError::UpstreamStatus {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait]
impl Fetcher for FakeHub {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.lookup(url, url)
    }

    async fn post_json_text(&self, url: &str, body: &str) -> Result<String> {
        self.lookup(&format!("{}#{}", url, body), url)
    }
}

fn sha(byte: &str) -> String {
    byte.repeat(32)
}

fn files_url(ns: &str, repo: &str) -> String {
    format!("{}/api/v1/models/{}/{}/repo/files", BASE, ns, repo)
}

fn metadata_key(ns: &str, repo: &str, file: &str) -> String {
    let body = serde_json::to_string(&MetadataRequest {
        model_path: ns,
        model_name: repo,
        file_path: file,
    })
    .unwrap();
    format!("{}/api/v1/rm/fc?Type=model_view#{}", BASE, body)
}

fn listing(files: Value) -> String {
    json!({"Code": 200, "Data": {"Files": files}, "Message": "success", "Success": true}).to_string()
}

fn metadata(values: Value) -> String {
    json!({"Code": 200, "Data": {"metadata": values.to_string()}, "Success": true}).to_string()
}

fn qwen_hub() -> FakeHub {
    let mut responses = HashMap::new();
    responses.insert(
        files_url("qwen", "Qwen2-GGUF"),
        listing(json!([
            {"Name": "README.md", "Size": 10, "Sha256": sha("01")},
            {"Name": "qwen2-7b-q4_0.gguf", "Size": 600, "Sha256": sha("aa")},
            {"Name": "qwen2-7b-q4_k_m.gguf", "Size": 500, "Sha256": sha("bb")},
            {"Name": "qwen2-7b-q8_0.gguf", "Size": 900, "Sha256": sha("cc")},
            {"Name": "qwen2-7b-Q5_K_S.gguf", "Size": 550, "Sha256": sha("dd")},
            {"Name": "qwen2-7b-f16-00001-of-00002.gguf", "Size": 100, "Sha256": sha("ee")}
        ])),
    );
    responses.insert(
        metadata_key("qwen", "Qwen2-GGUF", "qwen2-7b-q4_k_m.gguf"),
        metadata(json!({
            "general.architecture": "qwen2",
            "general.size_label": "7B",
            "tokenizer.chat_template": format!("{}\n", CHATML)
        })),
    );
    responses.insert(
        metadata_key("qwen", "Qwen2-GGUF", "qwen2-7b-Q5_K_S.gguf"),
        metadata(json!({
            "general.architecture": "qwen2",
            "tokenizer.chat_template": "something nobody knows"
        })),
    );
    responses.insert(
        files_url("split", "Big-GGUF"),
        listing(json!([
            {"Name": "big-00001-of-00002.gguf", "Size": 100, "Sha256": sha("11")},
            {"Name": "big-00002-of-00002.gguf", "Size": 100, "Sha256": sha("22")}
        ])),
    );
    responses.insert(
        files_url("bad", "Hash-GGUF"),
        listing(json!([{"Name": "m-Q4_0.gguf", "Size": 100, "Sha256": "not-a-sha"}])),
    );
    FakeHub {
        responses,
        calls: Mutex::new(HashMap::new()),
    }
}

fn templates() -> TemplateRegistry {
    let mut registry = TemplateRegistry::new();
    registry.insert(TemplateEntry {
        name: "chatml".into(),
        fingerprint: CHATML.into(),
        body: "{{ .System }}<|im_start|>{{ .Prompt }}".into(),
        params: Some(r#"{"stop":["<|im_end|>"]}"#.into()),
    });
    registry.insert(TemplateEntry {
        name: "zephyr".into(),
        fingerprint: "<|user|>".into(),
        body: "<|user|>{{ .Prompt }}".into(),
        params: None,
    });
    registry
}

fn gateway(hub: Arc<FakeHub>) -> Gateway {
    let config = GatewayConfig {
        upstream_base_url: BASE.into(),
        ..GatewayConfig::default()
    };
    Gateway::with_parts(config, hub, templates())
}

#[tokio::test]
async fn test_latest_manifest_has_all_layers() {
    let gateway = gateway(Arc::new(qwen_hub()));
    let manifest = gateway
        .resolver()
        .resolve("qwen", "Qwen2-GGUF", "latest")
        .await
        .unwrap();

    assert_eq!(manifest.schema_version, 2);
    assert_eq!(manifest.media_type, MediaType::MANIFEST_V2);

    let media_types: Vec<&str> = manifest.layers.iter().map(|l| l.media_type.as_str()).collect();
    assert_eq!(media_types, vec![MediaType::MODEL, MediaType::TEMPLATE, MediaType::PARAMS]);

    let model = manifest.model_layer().unwrap();
    assert_eq!(model.size, 500);
    assert_eq!(model.digest, Digest::from_hex(&sha("bb")).unwrap());

    let config = manifest.config.as_ref().unwrap();
    assert_eq!(config.media_type, MediaType::IMAGE_CONFIG);
}

#[tokio::test]
async fn test_manifest_blobs_are_registered() {
    let gateway = gateway(Arc::new(qwen_hub()));
    let manifest = gateway
        .resolver()
        .resolve("qwen", "Qwen2-GGUF", "latest")
        .await
        .unwrap();
    let blobs = gateway.blobs();

    let model = manifest.model_layer().unwrap();
    assert_eq!(
        blobs.resolve(model.digest.as_str(), BlobRequest::Get).await.unwrap(),
        BlobResponse::Redirect {
            url: "https://hub.test/models/qwen/Qwen2-GGUF/resolve/master/qwen2-7b-q4_k_m.gguf".into(),
            length: 500,
        }
    );
    assert_eq!(
        blobs.resolve(model.digest.as_str(), BlobRequest::Head).await.unwrap(),
        BlobResponse::RemoteHead { length: 500 }
    );

    let config = manifest.config.as_ref().unwrap();
    match blobs.resolve(config.digest.as_str(), BlobRequest::Get).await.unwrap() {
        BlobResponse::Inline { length, body: Some(body) } => {
            assert_eq!(length, config.size);
            assert_eq!(Digest::of(&body), config.digest);
            let parsed: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(parsed["model_family"], "qwen2");
            assert_eq!(parsed["model_families"], json!(["qwen2"]));
            assert_eq!(parsed["model_type"], "7B");
        }
        other => panic!("expected inline config, got {:?}", other),
    }

    let template = manifest.layer(MediaType::TEMPLATE).unwrap();
    match blobs.resolve(template.digest.as_str(), BlobRequest::Get).await.unwrap() {
        BlobResponse::Inline { body: Some(body), .. } => {
            assert_eq!(&body[..], b"{{ .System }}<|im_start|>{{ .Prompt }}");
        }
        other => panic!("expected inline template, got {:?}", other),
    }

    let params = manifest.layer(MediaType::PARAMS).unwrap();
    assert_eq!(params.digest, Digest::of(r#"{"stop":["<|im_end|>"]}"#));
}

#[tokio::test]
async fn test_explicit_tag_with_template_override() {
    let gateway = gateway(Arc::new(qwen_hub()));

    let manifest = gateway
        .resolver()
        .resolve("qwen", "Qwen2-GGUF", "q5_k_s--zephyr")
        .await
        .unwrap();
    assert_eq!(manifest.model_layer().unwrap().size, 550);

    let template = manifest.layer(MediaType::TEMPLATE).unwrap();
    assert_eq!(template.digest, Digest::of("<|user|>{{ .Prompt }}"));
    // zephyr publishes no params
    assert!(manifest.layer(MediaType::PARAMS).is_none());
}

#[tokio::test]
async fn test_unrecognized_template_without_override() {
    let gateway = gateway(Arc::new(qwen_hub()));

    let manifest = gateway
        .resolver()
        .resolve("qwen", "Qwen2-GGUF", "Q5_K_S")
        .await
        .unwrap();
    assert!(manifest.config.is_some());
    assert_eq!(manifest.layers.len(), 1);
}

#[tokio::test]
async fn test_metadata_failure_keeps_model_layer() {
    let gateway = gateway(Arc::new(qwen_hub()));

    // No metadata is registered for the Q8_0 file.
    let manifest = gateway
        .resolver()
        .resolve("qwen", "Qwen2-GGUF", "q8_0--chatml")
        .await
        .unwrap();
    assert_eq!(manifest.layers.len(), 1);
    assert!(manifest.config.is_none());

    let value = serde_json::to_value(&manifest).unwrap();
    assert_eq!(value["config"], json!({}));
    assert_eq!(value["layers"][0]["size"], 900);
}

#[tokio::test]
async fn test_unknown_quant_is_manifest_unknown() {
    let gateway = gateway(Arc::new(qwen_hub()));

    let err = gateway
        .resolver()
        .resolve("qwen", "Qwen2-GGUF", "Q3_K_L")
        .await
        .unwrap_err();
    assert_eq!(err.registry_code(), "MANIFEST_UNKNOWN");
}

#[tokio::test]
async fn test_sharded_only_repo_is_manifest_unknown() {
    let gateway = gateway(Arc::new(qwen_hub()));

    for tag in ["latest", "00002"] {
        let err = gateway
            .resolver()
            .resolve("split", "Big-GGUF", tag)
            .await
            .unwrap_err();
        assert_eq!(err.registry_code(), "MANIFEST_UNKNOWN");
    }
}

#[tokio::test]
async fn test_listing_failure_carries_upstream_message() {
    let gateway = gateway(Arc::new(qwen_hub()));

    let err = gateway
        .resolver()
        .resolve("nobody", "Missing-GGUF", "latest")
        .await
        .unwrap_err();
    assert_eq!(err.registry_code(), "MANIFEST_UNKNOWN");
    assert!(err.to_string().contains("404"), "message was {}", err);
}

#[tokio::test]
async fn test_malformed_upstream_hash_is_manifest_unknown() {
    let gateway = gateway(Arc::new(qwen_hub()));

    let err = gateway
        .resolver()
        .resolve("bad", "Hash-GGUF", "q4_0")
        .await
        .unwrap_err();
    assert_eq!(err.registry_code(), "MANIFEST_UNKNOWN");
    assert!(gateway.blobs().is_empty().await);
}

#[tokio::test]
async fn test_repeated_pulls_hit_upstream_once() {
    let hub = Arc::new(qwen_hub());
    let gateway = gateway(hub.clone());

    let first = gateway.resolver().resolve("qwen", "Qwen2-GGUF", "latest").await.unwrap();
    let second = gateway.resolver().resolve("qwen", "Qwen2-GGUF", "latest").await.unwrap();
    assert_eq!(first, second);

    assert_eq!(hub.calls(&files_url("qwen", "Qwen2-GGUF")), 1);
    assert_eq!(hub.calls(&format!("{}/api/v1/rm/fc?Type=model_view", BASE)), 1);
}
