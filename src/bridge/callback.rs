//! Callback object and builder
//!
//! The callback object is what a worker registers with the gateway: an
//! interface name plus an explicit method-name → handler map.

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::error::{BridgeError, BridgeResult};
use super::method::{CallContext, Method};

/// Builder for creating callback objects
pub struct CallbackBuilder {
    interface: String,
    methods: Vec<Arc<dyn Method>>,
}

impl CallbackBuilder {
    /// Start a callback object implementing `interface`
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            methods: Vec::new(),
        }
    }

    /// Add a method
    pub fn method(mut self, method: Arc<dyn Method>) -> Self {
        self.methods.push(method);
        self
    }

    /// Build the callback object, rejecting duplicate method names
    pub fn build(self) -> BridgeResult<CallbackObject> {
        let mut methods = BTreeMap::new();
        for method in self.methods {
            let name = method.metadata().name;
            if methods.contains_key(&name) {
                return Err(BridgeError::AlreadyRegistered(name));
            }
            methods.insert(name, method);
        }
        Ok(CallbackObject {
            interface: self.interface,
            methods,
        })
    }
}

/// A registered set of named methods
pub struct CallbackObject {
    interface: String,
    methods: BTreeMap<String, Arc<dyn Method>>,
}

impl CallbackObject {
    /// Interface name declared to the host
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Advertised method names, sorted
    pub fn method_names(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Run the named method to completion
    pub async fn dispatch(
        &self,
        ctx: &CallContext,
        name: &str,
        args: Vec<JsonValue>,
    ) -> BridgeResult<String> {
        let method = self
            .methods
            .get(name)
            .ok_or_else(|| BridgeError::UnknownMethod(name.to_string()))?;

        let start = Instant::now();
        let result = method.invoke(ctx, args).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(value) => debug!(
                call_id = ctx.call_id,
                request_id = %ctx.request_id,
                method = name,
                duration_ms,
                bytes = value.len(),
                "Call completed"
            ),
            Err(e) => warn!(
                call_id = ctx.call_id,
                request_id = %ctx.request_id,
                method = name,
                duration_ms,
                "Call failed: {}",
                e
            ),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::method::{string_arg, MethodMetadata};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Method for Echo {
        fn metadata(&self) -> MethodMetadata {
            MethodMetadata {
                name: "echo".to_string(),
                params: vec!["text".to_string()],
                ..Default::default()
            }
        }

        async fn invoke(&self, _ctx: &CallContext, args: Vec<JsonValue>) -> BridgeResult<String> {
            let text = string_arg("echo", &args, 0)?;
            Ok(json!({ "echo": text }).to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl Method for Broken {
        fn metadata(&self) -> MethodMetadata {
            MethodMetadata {
                name: "broken".to_string(),
                ..Default::default()
            }
        }

        async fn invoke(&self, _ctx: &CallContext, _args: Vec<JsonValue>) -> BridgeResult<String> {
            Err(BridgeError::MethodFailed {
                method: "broken".to_string(),
                reason: "always".to_string(),
            })
        }
    }

    #[test]
    fn test_builder_rejects_duplicate_names() {
        let result = CallbackBuilder::new("iface")
            .method(Arc::new(Echo))
            .method(Arc::new(Echo))
            .build();
        assert!(matches!(result, Err(BridgeError::AlreadyRegistered(name)) if name == "echo"));
    }

    #[test]
    fn test_method_names_are_sorted() {
        let callback = CallbackBuilder::new("iface")
            .method(Arc::new(Echo))
            .method(Arc::new(Broken))
            .build()
            .unwrap();
        assert_eq!(callback.interface(), "iface");
        assert_eq!(callback.method_names(), vec!["broken", "echo"]);
        assert!(callback.has_method("echo"));
        assert!(!callback.has_method("getVector"));
    }

    #[tokio::test]
    async fn test_dispatch_routes_by_name() {
        let callback = CallbackBuilder::new("iface")
            .method(Arc::new(Echo))
            .build()
            .unwrap();
        let out = callback
            .dispatch(&CallContext::new(1), "echo", vec![json!("hi")])
            .await
            .unwrap();
        assert_eq!(out, r#"{"echo":"hi"}"#);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method() {
        let callback = CallbackBuilder::new("iface").build().unwrap();
        let err = callback
            .dispatch(&CallContext::new(1), "nope", vec![])
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::UnknownMethod(_)));
    }

    #[tokio::test]
    async fn test_dispatch_propagates_failure() {
        let callback = CallbackBuilder::new("iface")
            .method(Arc::new(Broken))
            .build()
            .unwrap();
        let err = callback
            .dispatch(&CallContext::new(9), "broken", vec![])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Method 'broken' failed: always");
    }
}
