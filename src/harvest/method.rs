//! `getPapers` method.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;

use super::{CanonicalRecord, Harvester};
use crate::bridge::{int_arg, BridgeError, BridgeResult, CallContext, Method, MethodMetadata};

const NAME: &str = "getPapers";

#[derive(Serialize)]
struct PapersResponse<'a> {
    papers: &'a [CanonicalRecord],
}

/// `getPapers(yearFrom, yearTo)` → `{"papers": [...]}`.
pub struct GetPapers {
    harvester: Arc<Harvester>,
}

impl GetPapers {
    pub fn new(harvester: Arc<Harvester>) -> Self {
        Self { harvester }
    }
}

#[async_trait]
impl Method for GetPapers {
    fn metadata(&self) -> MethodMetadata {
        MethodMetadata {
            name: NAME.to_string(),
            description: "Harvest canonical paper records for a year range".to_string(),
            params: vec!["yearFrom".to_string(), "yearTo".to_string()],
        }
    }

    async fn invoke(&self, _ctx: &CallContext, args: Vec<JsonValue>) -> BridgeResult<String> {
        let year_from = int_arg(NAME, &args, 0)?;
        let year_to = int_arg(NAME, &args, 1)?;

        let papers = self
            .harvester
            .harvest(year_from, year_to)
            .await
            .map_err(|e| BridgeError::MethodFailed {
                method: NAME.to_string(),
                reason: e.to_string(),
            })?;

        Ok(serde_json::to_string(&PapersResponse { papers: &papers })?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::harvest::{Corpus, CorpusLoader, JsonlCorpus, RawRecord};
    use serde_json::json;

    struct Fixed(Vec<RawRecord>);

    impl CorpusLoader for Fixed {
        fn open(&self) -> Result<Box<dyn Corpus>> {
            Ok(Box::new(JsonlCorpus::from_records(self.0.clone())))
        }
    }

    struct Unavailable;

    impl CorpusLoader for Unavailable {
        fn open(&self) -> Result<Box<dyn Corpus>> {
            Err(Error::Corpus("clone failed".to_string()))
        }
    }

    fn method(loader: Arc<dyn CorpusLoader>) -> GetPapers {
        GetPapers::new(Arc::new(Harvester::new(loader)))
    }

    #[tokio::test]
    async fn test_returns_papers_object() {
        let loader = Arc::new(Fixed(vec![RawRecord::from(json!({
            "id": "X1",
            "title": "T",
            "year": 2020,
            "venue_ids": ["acl"],
            "web_url": "http://x"
        }))]));
        let out = method(loader)
            .invoke(&CallContext::new(1), vec![json!(2019), json!(2021)])
            .await
            .unwrap();

        let value: JsonValue = serde_json::from_str(&out).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        let papers = obj["papers"].as_array().unwrap();
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0]["pdfUrl"], "http://x");
        assert_eq!(papers[0]["venue"], "ACL");
    }

    #[tokio::test]
    async fn test_inverted_range_returns_empty_list() {
        let out = method(Arc::new(Fixed(vec![])))
            .invoke(&CallContext::new(1), vec![json!(2100), json!(2000)])
            .await
            .unwrap();
        assert_eq!(out, r#"{"papers":[]}"#);
    }

    #[tokio::test]
    async fn test_corpus_failure_is_a_call_error() {
        let err = method(Arc::new(Unavailable))
            .invoke(&CallContext::new(1), vec![json!(2000), json!(2020)])
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::MethodFailed { .. }));
        assert!(err.to_string().contains("clone failed"));
    }

    #[tokio::test]
    async fn test_rejects_non_integer_years() {
        let err = method(Arc::new(Fixed(vec![])))
            .invoke(&CallContext::new(1), vec![json!("2000"), json!(2020)])
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArguments { .. }));
    }
}
