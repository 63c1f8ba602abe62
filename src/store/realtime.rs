use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{StoreError, StoreResult, Subscription};

pub type ChildCallback = Box<dyn FnMut(String, Value) + Send + 'static>;

pub type ValueCallback = Box<dyn FnMut(Option<Value>) + Send + 'static>;

/// Path-addressed JSON tree with live change notification.
///
/// Paths are `/`-separated and empty segments are ignored, so `"channels"`,
/// `"/channels"` and `"channels/"` all address the same node. Null values and
/// empty objects are never stored: writing one removes the node.
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    async fn read(&self, path: &str) -> StoreResult<Option<Value>>;

    async fn write(&self, path: &str, value: Value) -> StoreResult<()>;

    /// Merge `fields` into the node at `path`. Keys may be relative
    /// multi-segment paths such as `"members/u1"`.
    async fn update(&self, path: &str, fields: Map<String, Value>) -> StoreResult<()>;

    async fn push(&self, path: &str, value: Value) -> StoreResult<String>;

    async fn subscribe_child_added(
        &self,
        path: &str,
        callback: ChildCallback,
    ) -> StoreResult<Subscription>;

    async fn subscribe_value(&self, path: &str, callback: ValueCallback)
    -> StoreResult<Subscription>;
}

pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

pub fn join_path(base: &str, child: &str) -> String {
    let mut segments = split_path(base);
    segments.extend(split_path(child));
    segments.join("/")
}

pub fn validate_path(path: &str) -> StoreResult<()> {
    for segment in split_path(path) {
        if segment
            .chars()
            .any(|c| matches!(c, '.' | '#' | '$' | '[' | ']') || c.is_control())
        {
            return Err(StoreError::InvalidPath(path.to_string()));
        }
    }
    Ok(())
}

pub(crate) fn paths_overlap(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

pub(crate) fn normalize(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .filter_map(|(k, v)| normalize(v).map(|v| (k, v)))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Object(cleaned))
            }
        }
        other => Some(other),
    }
}

pub(crate) fn value_at<'a>(root: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    let mut node = root;
    for segment in segments {
        node = node.as_object()?.get(*segment)?;
    }
    match node {
        Value::Null => None,
        Value::Object(map) if map.is_empty() => None,
        other => Some(other),
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

fn remove_at(node: &mut Value, segments: &[&str]) -> bool {
    let Value::Object(map) = node else {
        return false;
    };
    match segments {
        [] => {
            map.clear();
        }
        [last] => {
            map.remove(*last);
        }
        [first, rest @ ..] => {
            let emptied = map
                .get_mut(*first)
                .is_some_and(|child| remove_at(child, rest));
            if emptied {
                map.remove(*first);
            }
        }
    }
    map.is_empty()
}

pub(crate) fn set_at(root: &mut Value, segments: &[&str], value: Value) {
    let Some(value) = normalize(value) else {
        remove_at(root, segments);
        return;
    };
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return;
    };
    let mut node = root;
    for segment in parents {
        node = ensure_object(node)
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    ensure_object(node).insert(last.to_string(), value);
}

pub(crate) fn flatten(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                flatten(&join_path(prefix, key), child, out);
            }
        }
        leaf => out.push((prefix.to_string(), leaf.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn split_ignores_empty_segments() {
        assert_eq!(split_path("/channels//a_b/"), vec!["channels", "a_b"]);
        assert!(split_path("").is_empty());
    }

    #[test]
    fn set_and_read_nested() {
        let mut root = json!({});
        set_at(&mut root, &["channels", "a_b", "members", "a"], json!(true));
        set_at(&mut root, &["channels", "a_b", "members", "b"], json!(true));
        assert_eq!(
            value_at(&root, &["channels", "a_b", "members"]),
            Some(&json!({"a": true, "b": true}))
        );
    }

    #[test]
    fn writing_null_prunes_empty_parents() {
        let mut root = json!({"channels": {"x": {"members": {"a": true}}}});
        set_at(&mut root, &["channels", "x", "members", "a"], Value::Null);
        assert_eq!(value_at(&root, &["channels"]), None);
    }

    #[test]
    fn writing_through_a_leaf_replaces_it() {
        let mut root = json!({"a": 5});
        set_at(&mut root, &["a", "b"], json!("x"));
        assert_eq!(root, json!({"a": {"b": "x"}}));
    }

    #[test]
    fn flatten_emits_leaves_only() {
        let mut rows = Vec::new();
        flatten(
            "channels/x",
            &json!({"members": {"a": true}, "createdAt": 5, "empty": {}}),
            &mut rows,
        );
        rows.sort();
        assert_eq!(
            rows,
            vec![
                ("channels/x/createdAt".to_string(), "5".to_string()),
                ("channels/x/members/a".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn rejects_reserved_characters() {
        assert!(validate_path("channels/a.b").is_err());
        assert!(validate_path("channels/a_b/messages").is_ok());
    }

    #[test]
    fn overlap_is_prefix_relation() {
        let a = vec!["channels".to_string()];
        let b = vec!["channels".to_string(), "x".to_string()];
        let c = vec!["users".to_string()];
        assert!(paths_overlap(&a, &b));
        assert!(paths_overlap(&b, &a));
        assert!(!paths_overlap(&a, &c));
    }
}
