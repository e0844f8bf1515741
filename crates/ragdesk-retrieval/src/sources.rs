use std::collections::HashSet;

use ragdesk_graph::ToolArtifact;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A cited passage in a query response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub source: String,
    pub content: String,
    pub rerank_score: Option<f32>,
}

/// Flattens retrieval artifacts into unique sources, best score first.
///
/// The first occurrence of a `source` wins; artifacts that are not lists of
/// documents are ignored. A missing score sorts as `0`.
pub fn collect_sources(artifacts: &[ToolArtifact]) -> Vec<Source> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for item in artifacts
        .iter()
        .filter_map(|a| a.data.as_array())
        .flatten()
    {
        let source = item
            .get("metadata")
            .and_then(|m| m.get("source"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if !seen.insert(source.clone()) {
            continue;
        }
        sources.push(Source {
            source,
            content: item
                .get("page_content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            rerank_score: item
                .get("rerank_score")
                .and_then(Value::as_f64)
                .map(|s| s as f32),
        });
    }

    sources.sort_by(|a, b| {
        b.rerank_score
            .unwrap_or(0.0)
            .total_cmp(&a.rerank_score.unwrap_or(0.0))
    });
    sources
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn artifact(data: Value) -> ToolArtifact {
        ToolArtifact {
            tool_call_id: "call".into(),
            tool_name: "retrieve_documents".into(),
            data,
        }
    }

    #[test]
    fn test_dedup_keeps_first_and_sorts() {
        let artifacts = vec![
            artifact(json!([
                {"page_content": "a1", "metadata": {"source": "a.pdf"}, "rerank_score": 0.4},
                {"page_content": "b1", "metadata": {"source": "b.pdf"}, "rerank_score": 0.9},
            ])),
            artifact(json!([
                {"page_content": "a2", "metadata": {"source": "a.pdf"}, "rerank_score": 0.99},
                {"page_content": "c1", "metadata": {"source": "c.pdf"}},
            ])),
        ];

        let sources = collect_sources(&artifacts);
        let names: Vec<&str> = sources.iter().map(|s| s.source.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf", "c.pdf"]);
        assert_eq!(sources[1].content, "a1");
        assert_eq!(sources[2].rerank_score, None);
    }

    #[test]
    fn test_equal_scores_keep_artifact_order() {
        let artifacts = vec![artifact(json!([
            {"page_content": "x", "metadata": {"source": "x"}, "rerank_score": 0.5},
            {"page_content": "y", "metadata": {"source": "y"}, "rerank_score": 0.5},
        ]))];
        let sources = collect_sources(&artifacts);
        assert_eq!(sources[0].source, "x");
        assert_eq!(sources[1].source, "y");
    }

    #[test]
    fn test_non_list_artifacts_are_ignored() {
        let artifacts = vec![artifact(json!({"note": "not documents"}))];
        assert!(collect_sources(&artifacts).is_empty());
    }
}
