use super::{wrap_document, OutputSerializer, SerializerError, SerializerResult};
use crate::api::ApiFrame;
use crate::model::tier::Tier;
use serde_json::{Map, Value};

/// Maps `products` rows to tier documents, dropping storage-only columns.
///
/// Registered under both `tiers` and `products`.
#[derive(Debug, Clone, Copy)]
pub struct TiersSerializer {
    name: &'static str,
}

impl TiersSerializer {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }

    fn map_rows(&self, rows: Value) -> SerializerResult<Value> {
        let rows = match rows {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => vec![other],
        };
        let tiers = rows
            .into_iter()
            .map(|row| serde_json::from_value::<Tier>(row).and_then(serde_json::to_value))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| SerializerError::InvalidPayload {
                serializer: self.name,
                message: err.to_string(),
            })?;
        Ok(Value::Array(tiers))
    }
}

impl OutputSerializer for TiersSerializer {
    fn name(&self) -> &'static str {
        self.name
    }

    fn serialize(&self, response: Value, frame: &ApiFrame) -> SerializerResult<Value> {
        let response = match response {
            Value::Object(mut envelope) if envelope.contains_key("data") => {
                let data = envelope.remove("data").unwrap_or(Value::Null);
                let mut mapped = Map::new();
                mapped.insert("data".to_string(), self.map_rows(data)?);
                if let Some(meta) = envelope.remove("meta") {
                    mapped.insert("meta".to_string(), meta);
                }
                Value::Object(mapped)
            }
            rows => self.map_rows(rows)?,
        };
        let doc_name = frame.doc_name.as_deref().unwrap_or(self.name);
        Ok(wrap_document(doc_name, response))
    }
}
