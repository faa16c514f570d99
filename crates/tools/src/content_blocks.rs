//! Renderable content blocks attached to search tool output.
//!
//! Clients pick blocks out of the final answer by their `content_type`.
//! Component mode gets a structured table; HTML mode gets a pre-rendered
//! `<table>` snippet for inline chat.

use cypherchat_core::error::ToolError;
use cypherchat_core::graph::Record;
use cypherchat_core::tool::RenderMode;
use serde_json::{Map, Value, json};

pub const DEFAULT_EMPTY_STATE: &str = "No results were returned for this query.";

/// Optional decorations for a table block.
#[derive(Debug, Clone)]
pub struct TableOptions<'a> {
    pub title: Option<&'a str>,
    pub summary: Option<&'a str>,
    pub description: Option<&'a str>,
    /// Extra entries merged into the block's `context`.
    pub context: Option<Map<String, Value>>,
    /// Shown by clients when there are no rows.
    pub empty_state: Option<&'a str>,
}

impl Default for TableOptions<'_> {
    fn default() -> Self {
        Self {
            title: None,
            summary: None,
            description: None,
            context: None,
            empty_state: Some(DEFAULT_EMPTY_STATE),
        }
    }
}

struct Normalised {
    original: Vec<Map<String, Value>>,
    records: Vec<Map<String, Value>>,
    headers: Vec<String>,
    flattened_from: Vec<Option<String>>,
}

fn coerce_mapping(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other.clone());
            map
        }
    }
}

/// A record holding a single map-valued column (`RETURN n`) is flattened
/// to that map so its properties become the table columns.
fn normalise_records(records: &[Value]) -> Normalised {
    let mut out = Normalised {
        original: Vec::with_capacity(records.len()),
        records: Vec::with_capacity(records.len()),
        headers: Vec::new(),
        flattened_from: Vec::with_capacity(records.len()),
    };

    for entry in records {
        let entry = coerce_mapping(entry);
        let (candidate, flattened_key) = match entry.iter().next() {
            Some((key, Value::Object(inner))) if entry.len() == 1 => {
                (inner.clone(), Some(key.clone()))
            }
            _ => (entry.clone(), None),
        };

        for key in candidate.keys() {
            if !out.headers.contains(key) {
                out.headers.push(key.clone());
            }
        }

        out.original.push(entry);
        out.records.push(candidate);
        out.flattened_from.push(flattened_key);
    }

    out
}

fn rows(normalised: &Normalised) -> Vec<Vec<Value>> {
    normalised
        .records
        .iter()
        .map(|record| {
            normalised
                .headers
                .iter()
                .map(|key| record.get(key).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect()
}

/// Build a standardised table block. Returns the original records (as maps)
/// alongside the block.
pub fn tabular_content(
    records: &[Value],
    options: TableOptions<'_>,
) -> (Vec<Map<String, Value>>, Value) {
    let normalised = normalise_records(records);

    let mut context = Map::new();
    context.insert("records".into(), json!(normalised.records));
    if normalised.flattened_from.iter().any(Option::is_some) {
        context.insert("flattened_from".into(), json!(normalised.flattened_from));
        context.insert("original_records".into(), json!(normalised.original));
    }
    if let Some(extra) = options.context {
        context.extend(extra);
    }

    let mut block = json!({
        "content_type": "table",
        "title": options.title,
        "headers": normalised.headers,
        "rows": rows(&normalised),
        "context": context,
    });

    if let Some(summary) = options.summary.filter(|s| !s.is_empty()) {
        block["summary"] = json!(summary);
    }
    if let Some(description) = options.description.filter(|s| !s.is_empty()) {
        block["description"] = json!(description);
    }
    if let Some(empty_state) = options
        .empty_state
        .filter(|_| normalised.records.is_empty())
    {
        block["empty_state"] = json!(empty_state);
    }

    (normalised.original, block)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Build an HTML table block from the same normalised records.
pub fn html_table(records: &[Value], title: Option<&str>) -> Value {
    let normalised = normalise_records(records);

    let html = if normalised.records.is_empty() {
        format!("<p>{}</p>", escape_html(DEFAULT_EMPTY_STATE))
    } else {
        let mut html = String::from("<table>");
        if let Some(title) = title {
            html.push_str(&format!("<caption>{}</caption>", escape_html(title)));
        }
        html.push_str("<thead><tr>");
        for header in &normalised.headers {
            html.push_str(&format!("<th>{}</th>", escape_html(header)));
        }
        html.push_str("</tr></thead><tbody>");
        for row in rows(&normalised) {
            html.push_str("<tr>");
            for cell in &row {
                html.push_str(&format!("<td>{}</td>", escape_html(&cell_text(cell))));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table>");
        html
    };

    json!({
        "content_type": "html",
        "title": title,
        "html": html,
    })
}

/// Serialise search results together with a block shaped for `mode`.
pub fn render_tool_output(
    records: Vec<Record>,
    title: &str,
    mode: RenderMode,
) -> Result<String, ToolError> {
    let values: Vec<Value> = records.into_iter().map(Value::Object).collect();
    let block = match mode {
        RenderMode::Component => {
            tabular_content(
                &values,
                TableOptions {
                    title: Some(title),
                    ..TableOptions::default()
                },
            )
            .1
        }
        RenderMode::Html => html_table(&values, Some(title)),
    };

    let output = json!({
        "records": values,
        "content_block": block,
    });
    serde_json::to_string(&output).map_err(|e| ToolError::ExecutionFailed {
        tool_name: title.to_string(),
        reason: e.to_string(),
    })
}
