use serde_json::Value;

/// Read a value out of a JSON body by dotted path (`data.id`, `items.0.id`) or
/// JSON pointer (`/data/id`). Strings come back unquoted; null and missing
/// paths yield `None`.
pub fn extract(body: &Value, path: &str) -> Option<String> {
    let found = if path.starts_with('/') {
        body.pointer(path)?
    } else {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .try_fold(body, |current, segment| match current {
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
                Value::Object(map) => map.get(segment),
                _ => None,
            })?
    };

    match found {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}
