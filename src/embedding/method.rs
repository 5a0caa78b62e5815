//! `getVector` method.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::Embedder;
use crate::bridge::{BridgeError, BridgeResult, CallContext, Method, MethodMetadata};

const NAME: &str = "getVector";

#[derive(Serialize)]
struct VectorResponse {
    vector: Vec<f32>,
}

/// `getVector(text)` → `{"vector": [...]}`.
pub struct GetVector {
    embedder: Arc<dyn Embedder>,
}

impl GetVector {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }
}

/// The input text: a plain string or an object with a `text` field.
fn text_arg(args: &[JsonValue]) -> BridgeResult<String> {
    let invalid = |reason: &str| BridgeError::InvalidArguments {
        method: NAME.to_string(),
        reason: reason.to_string(),
    };
    match args.first() {
        Some(JsonValue::String(s)) => Ok(s.clone()),
        Some(JsonValue::Object(map)) => map
            .get("text")
            .and_then(JsonValue::as_str)
            .map(String::from)
            .ok_or_else(|| invalid("object argument needs a string 'text' field")),
        Some(_) => Err(invalid("argument #0 must be a string")),
        None => Err(invalid("missing argument #0")),
    }
}

#[async_trait]
impl Method for GetVector {
    fn metadata(&self) -> MethodMetadata {
        MethodMetadata {
            name: NAME.to_string(),
            description: "Embed one text into a dense vector".to_string(),
            params: vec!["text".to_string()],
        }
    }

    async fn invoke(&self, _ctx: &CallContext, args: Vec<JsonValue>) -> BridgeResult<String> {
        let text = text_arg(&args)?;
        let embedder = self.embedder.clone();
        let failed = |reason: String| BridgeError::MethodFailed {
            method: NAME.to_string(),
            reason,
        };

        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| failed(e.to_string()))?
            .map_err(|e| failed(e.to_string()))?;

        if vector.len() != self.embedder.dimension() {
            return Err(failed(format!(
                "expected {} dimensions, model returned {}",
                self.embedder.dimension(),
                vector.len()
            )));
        }

        Ok(serde_json::to_string(&VectorResponse { vector })?)
    }
}
