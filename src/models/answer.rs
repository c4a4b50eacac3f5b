//! Structured query results and the caller-facing wire shape.

use serde::ser::{Serialize, SerializeStruct, Serializer};

/// Name of the retrieval-grounded QA tool.
pub const TOOL_RETRIEVAL_QA: &str = "retrieval_qa";

/// Name of the fallback answering tool.
pub const TOOL_FALLBACK: &str = "fallback";

/// The answer payload of a routed query.
///
/// `Grounded` answers cite the retrieved chunk texts they were synthesized
/// from; `Direct` answers carry no evidence.
#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Grounded { text: String, snippets: Vec<String> },
    Direct { text: String },
}

/// Result of routing one query: the tool that produced the answer plus the
/// answer itself. Transient, never persisted.
///
/// Serializes to the wire shape the caller renders:
/// `{ "tool": ..., "answer": ..., "snippets": [...] }` with `snippets` present
/// only for grounded answers.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub tool: String,
    pub answer: Answer,
}

impl RouteResult {
    pub fn grounded(tool: impl Into<String>, text: String, snippets: Vec<String>) -> Self {
        Self {
            tool: tool.into(),
            answer: Answer::Grounded { text, snippets },
        }
    }

    pub fn direct(tool: impl Into<String>, text: String) -> Self {
        Self {
            tool: tool.into(),
            answer: Answer::Direct { text },
        }
    }

    /// A structured result describing a failure of the attempted tool.
    /// Routing never raises past the boundary; it answers with the problem.
    pub fn failure(tool: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::direct(tool, format!("unable to answer: {}", reason))
    }

    pub fn answer_text(&self) -> &str {
        match &self.answer {
            Answer::Grounded { text, .. } | Answer::Direct { text } => text,
        }
    }

    pub fn snippets(&self) -> Option<&[String]> {
        match &self.answer {
            Answer::Grounded { snippets, .. } => Some(snippets),
            Answer::Direct { .. } => None,
        }
    }
}

impl Serialize for RouteResult {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.answer {
            Answer::Grounded { text, snippets } => {
                let mut s = serializer.serialize_struct("RouteResult", 3)?;
                s.serialize_field("tool", &self.tool)?;
                s.serialize_field("answer", text)?;
                s.serialize_field("snippets", snippets)?;
                s.end()
            }
            Answer::Direct { text } => {
                let mut s = serializer.serialize_struct("RouteResult", 2)?;
                s.serialize_field("tool", &self.tool)?;
                s.serialize_field("answer", text)?;
                s.end()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grounded_wire_shape() {
        let result = RouteResult::grounded(
            TOOL_RETRIEVAL_QA,
            "Refunds take 30 days.".to_string(),
            vec!["Refunds are issued within 30 days of purchase.".to_string()],
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["tool"], "retrieval_qa");
        assert_eq!(json["answer"], "Refunds take 30 days.");
        assert_eq!(
            json["snippets"][0],
            "Refunds are issued within 30 days of purchase."
        );
    }

    #[test]
    fn test_fallback_wire_shape_has_no_snippets_key() {
        let result = RouteResult::direct(TOOL_FALLBACK, "I don't know.".to_string());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["tool"], "fallback");
        assert_eq!(json["answer"], "I don't know.");
        assert!(json.as_object().unwrap().get("snippets").is_none());
    }

    #[test]
    fn test_failure_result_is_structured() {
        let result = RouteResult::failure(TOOL_RETRIEVAL_QA, "embedding timed out");
        assert_eq!(result.tool, TOOL_RETRIEVAL_QA);
        assert_eq!(result.answer_text(), "unable to answer: embedding timed out");
        assert!(result.snippets().is_none());
    }
}
