use serde_json::Value;

/// Ordered `path -> scalar text` pairs produced from a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlattenedResponse {
    entries: Vec<(String, String)>,
}

impl FlattenedResponse {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, String)> {
        self.entries
    }
}

pub fn flatten(document: &Value, prefix: &str) -> FlattenedResponse {
    let mut out = FlattenedResponse::default();
    walk(document, prefix.to_string(), &mut out.entries);
    out
}

fn walk(value: &Value, key: String, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (name, entry) in map {
                walk(entry, format!("{}.{}", key, name), out);
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                walk(item, format!("{}[{}]", key, index), out);
            }
        }
        scalar => out.push((key, scalar_text(scalar))),
    }
}

/// Host text form of a scalar. Booleans are `True`/`False`, matching how
/// host scripts compare them.
pub fn scalar_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Number(num) => num.to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::flatten;
    use serde_json::json;

    #[test]
    fn flattens_nested_objects_and_arrays() {
        let doc = json!({"a": {"b": 1}, "c": [1, 2]});
        let flat = flatten(&doc, "P");
        assert_eq!(
            flat.into_entries(),
            vec![
                ("P.a.b".to_string(), "1".to_string()),
                ("P.c[0]".to_string(), "1".to_string()),
                ("P.c[1]".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn keeps_document_member_order() {
        let doc: serde_json::Value =
            serde_json::from_str(r#"{"zeta": 1, "alpha": 2, "mid": {"y": 3, "x": 4}}"#)
                .expect("parse json");
        let flat = flatten(&doc, "R");
        let keys: Vec<&str> = flat.keys().collect();
        assert_eq!(keys, vec!["R.zeta", "R.alpha", "R.mid.y", "R.mid.x"]);
    }

    #[test]
    fn scalar_root_is_recorded_under_prefix() {
        let flat = flatten(&json!("hello"), "StreamElements.ParsedResponse");
        assert_eq!(flat.get("StreamElements.ParsedResponse"), Some("hello"));
        assert_eq!(flat.len(), 1);
    }

    #[test]
    fn scalar_kinds_render_as_text() {
        let doc = json!({"s": "x", "n": 1.5, "t": true, "f": false, "z": null});
        let flat = flatten(&doc, "P");
        assert_eq!(flat.get("P.s"), Some("x"));
        assert_eq!(flat.get("P.n"), Some("1.5"));
        assert_eq!(flat.get("P.t"), Some("True"));
        assert_eq!(flat.get("P.f"), Some("False"));
        assert_eq!(flat.get("P.z"), Some(""));
    }

    #[test]
    fn empty_containers_emit_nothing() {
        let doc = json!({"items": [], "meta": {}});
        assert!(flatten(&doc, "P").is_empty());
    }

    #[test]
    fn arrays_of_objects_combine_index_and_member_keys() {
        let doc = json!([{"name": "a"}, {"name": "b", "tags": ["x"]}]);
        let flat = flatten(&doc, "P");
        assert_eq!(flat.get("P[0].name"), Some("a"));
        assert_eq!(flat.get("P[1].name"), Some("b"));
        assert_eq!(flat.get("P[1].tags[0]"), Some("x"));
    }

    #[test]
    fn flattening_is_deterministic() {
        let doc = json!({"a": [{"b": [1, {"c": null}]}], "d": "e"});
        assert_eq!(flatten(&doc, "P"), flatten(&doc, "P"));
    }
}
