//! Success/failure classification of opaque tool output.
//!
//! Tools return free-form payloads, so failure is detected by scanning a
//! bounded summary for error markers. The scan is approximate: legitimate
//! content mentioning "error" is reported as a failure.

use serde_json::Value;

/// Maximum summary length in characters, including the truncation marker.
pub const SUMMARY_LIMIT: usize = 200;

const TRUNCATION_MARKER: &str = "...";

const ERROR_MARKERS: [&str; 4] = ["error", "exception", "failed", "traceback"];

/// The verdict for one tool result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub success: bool,
    /// The summary, set only when the result looks like a failure.
    pub error: Option<String>,
    pub summary: Option<String>,
}

/// Reduce tool output to a trimmed, bounded, single string.
///
/// Returns `None` for null and for content that is empty once trimmed.
pub fn summarise(content: &Value) -> Option<String> {
    let text = match content {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => serde_json::to_string(other)
            .unwrap_or_else(|_| other.to_string())
            .trim()
            .to_string(),
    };
    if text.is_empty() {
        return None;
    }
    Some(truncate(text))
}

fn truncate(text: String) -> String {
    if text.chars().count() <= SUMMARY_LIMIT {
        return text;
    }
    let keep = SUMMARY_LIMIT - TRUNCATION_MARKER.len();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}

/// Classify tool output as success or failure.
pub fn classify(content: &Value) -> Classification {
    let Some(summary) = summarise(content) else {
        return Classification {
            success: true,
            error: None,
            summary: None,
        };
    };

    let lowered = summary.to_lowercase();
    let failed = ERROR_MARKERS.iter().any(|marker| lowered.contains(marker));
    Classification {
        success: !failed,
        error: failed.then(|| summary.clone()),
        summary: Some(summary),
    }
}
