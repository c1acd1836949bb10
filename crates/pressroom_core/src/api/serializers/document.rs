use super::{OutputSerializer, SerializerResult};
use crate::api::ApiFrame;
use serde_json::{Map, Value};

/// Wraps responses under their document name.
#[derive(Debug, Clone, Copy)]
pub struct DocumentSerializer {
    name: &'static str,
}

impl DocumentSerializer {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl OutputSerializer for DocumentSerializer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn serialize(&self, response: Value, frame: &ApiFrame) -> SerializerResult<Value> {
        let doc_name = frame.doc_name.as_deref().unwrap_or(self.name);
        Ok(wrap_document(doc_name, response))
    }
}

/// Returns responses unchanged.
#[derive(Debug, Clone, Copy)]
pub struct PassThroughSerializer {
    name: &'static str,
}

impl PassThroughSerializer {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl OutputSerializer for PassThroughSerializer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn serialize(&self, response: Value, _frame: &ApiFrame) -> SerializerResult<Value> {
        Ok(response)
    }
}

/// Builds `{doc_name: [...]}` from a response.
///
/// - arrays are wrapped as-is
/// - `{data, meta}` pagination envelopes become `{doc_name: data, meta}`
/// - any other single value becomes a one-element array
/// - `null` becomes an empty array
pub fn wrap_document(doc_name: &str, response: Value) -> Value {
    let mut document = Map::new();
    match response {
        Value::Null => {
            document.insert(doc_name.to_string(), Value::Array(Vec::new()));
        }
        Value::Array(items) => {
            document.insert(doc_name.to_string(), Value::Array(items));
        }
        Value::Object(mut object) if object.contains_key("data") => {
            let data = object.remove("data").unwrap_or(Value::Null);
            let items = match data {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => vec![other],
            };
            document.insert(doc_name.to_string(), Value::Array(items));
            if let Some(meta) = object.remove("meta") {
                document.insert("meta".to_string(), meta);
            }
        }
        other => {
            document.insert(doc_name.to_string(), Value::Array(vec![other]));
        }
    }
    Value::Object(document)
}

#[cfg(test)]
mod tests {
    use super::wrap_document;
    use serde_json::json;

    #[test]
    fn pagination_envelope_keeps_meta() {
        let wrapped = wrap_document(
            "posts",
            json!({"data": [{"id": "1"}], "meta": {"pagination": {"page": 1}}}),
        );
        assert_eq!(
            wrapped,
            json!({"posts": [{"id": "1"}], "meta": {"pagination": {"page": 1}}})
        );
    }

    #[test]
    fn single_object_and_null_become_arrays() {
        assert_eq!(
            wrap_document("users", json!({"id": "u1"})),
            json!({"users": [{"id": "u1"}]})
        );
        assert_eq!(wrap_document("users", json!(null)), json!({"users": []}));
    }
}
