//! Method trait and types
//!
//! Methods are the named operations a callback object exposes to the host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::error::{BridgeError, BridgeResult};

/// Method metadata advertised at registration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodMetadata {
    /// Name the host calls (e.g., "getPapers", "getVector")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Positional parameter names, for logs and error messages
    pub params: Vec<String>,
}

/// Context passed to each invocation
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Call id chosen by the host
    pub call_id: u64,
    /// Request ID for tracing
    pub request_id: String,
}

impl CallContext {
    pub fn new(call_id: u64) -> Self {
        Self {
            call_id,
            request_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// The Method trait
///
/// A method receives the positional JSON arguments of a call and returns a
/// single JSON-encoded string. Failures must be returned as errors so the
/// bridge can report them as call errors; never encode a failure into the
/// success payload.
///
/// # Example
///
/// ```rust,ignore
/// struct Echo;
///
/// #[async_trait]
/// impl Method for Echo {
///     fn metadata(&self) -> MethodMetadata {
///         MethodMetadata {
///             name: "echo".to_string(),
///             params: vec!["text".to_string()],
///             ..Default::default()
///         }
///     }
///
///     async fn invoke(&self, _ctx: &CallContext, args: Vec<JsonValue>) -> BridgeResult<String> {
///         let text = string_arg(&self.metadata().name, &args, 0)?;
///         Ok(serde_json::json!({ "echo": text }).to_string())
///     }
/// }
/// ```
#[async_trait]
pub trait Method: Send + Sync {
    /// Get method metadata
    fn metadata(&self) -> MethodMetadata;

    /// Execute the method to completion
    async fn invoke(&self, ctx: &CallContext, args: Vec<JsonValue>) -> BridgeResult<String>;
}

fn arg<'a>(method: &str, args: &'a [JsonValue], index: usize) -> BridgeResult<&'a JsonValue> {
    args.get(index).ok_or_else(|| BridgeError::InvalidArguments {
        method: method.to_string(),
        reason: format!("missing argument #{}", index),
    })
}

/// Positional integer argument.
pub fn int_arg(method: &str, args: &[JsonValue], index: usize) -> BridgeResult<i64> {
    let value = arg(method, args, index)?;
    value.as_i64().ok_or_else(|| BridgeError::InvalidArguments {
        method: method.to_string(),
        reason: format!("argument #{} must be an integer, got {}", index, value),
    })
}

/// Positional string argument.
pub fn string_arg<'a>(method: &str, args: &'a [JsonValue], index: usize) -> BridgeResult<&'a str> {
    let value = arg(method, args, index)?;
    value.as_str().ok_or_else(|| BridgeError::InvalidArguments {
        method: method.to_string(),
        reason: format!("argument #{} must be a string, got {}", index, value),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_int_arg() {
        let args = vec![json!(2019), json!("2021")];
        assert_eq!(int_arg("getPapers", &args, 0).unwrap(), 2019);

        let err = int_arg("getPapers", &args, 1).unwrap_err();
        assert!(err.to_string().contains("must be an integer"));

        let err = int_arg("getPapers", &args, 2).unwrap_err();
        assert!(err.to_string().contains("missing argument #2"));
    }

    #[test]
    fn test_string_arg() {
        let args = vec![json!("hello"), json!(1)];
        assert_eq!(string_arg("getVector", &args, 0).unwrap(), "hello");
        assert!(matches!(
            string_arg("getVector", &args, 1),
            Err(BridgeError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn test_call_context_request_ids_differ() {
        let a = CallContext::new(1);
        let b = CallContext::new(1);
        assert_ne!(a.request_id, b.request_id);
    }
}
