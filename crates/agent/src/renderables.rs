//! Harvest UI content blocks from serialized messages.
//!
//! Blocks may sit at any depth of a message's content, including inside
//! strings that hold JSON. Discovery is pre-order and nothing is
//! deduplicated.

use serde_json::{Map, Value};

/// How many layers of JSON-inside-a-string are decoded along one path.
pub const MAX_JSON_UNWRAP_DEPTH: usize = 5;

const HARVESTED_KEYS: [&str; 3] = ["render_hint", "content_blocks", "content_block"];

/// Collect every content block found in the messages' `content`.
pub fn extract_renderables(messages: &[Value]) -> Vec<Map<String, Value>> {
    let mut blocks = Vec::new();
    for message in messages {
        if let Some(content) = message.get("content") {
            walk(content, 0, &mut blocks);
        }
    }
    blocks
}

fn walk(value: &Value, unwrapped: usize, blocks: &mut Vec<Map<String, Value>>) {
    match value {
        Value::String(text) => {
            if unwrapped >= MAX_JSON_UNWRAP_DEPTH {
                return;
            }
            if let Ok(parsed) = serde_json::from_str::<Value>(text) {
                walk(&parsed, unwrapped + 1, blocks);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk(item, unwrapped, blocks);
            }
        }
        Value::Object(map) => {
            harvest(map, blocks);
            for (key, child) in map {
                if !HARVESTED_KEYS.contains(&key.as_str()) {
                    walk(child, unwrapped, blocks);
                }
            }
        }
        _ => {}
    }
}

fn harvest(map: &Map<String, Value>, blocks: &mut Vec<Map<String, Value>>) {
    if let Some(Value::Object(hint)) = map.get("render_hint") {
        blocks.push(hint.clone());
    }
    if let Some(Value::Array(items)) = map.get("content_blocks") {
        blocks.extend(items.iter().filter_map(|item| item.as_object().cloned()));
    }
    if let Some(Value::Object(block)) = map.get("content_block") {
        blocks.push(block.clone());
    }
    if map.get("content_type").is_some_and(Value::is_string) {
        blocks.push(map.clone());
    }
}
