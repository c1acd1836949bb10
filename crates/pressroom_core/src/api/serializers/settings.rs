use super::{wrap_document, OutputSerializer, SerializerError, SerializerResult};
use crate::api::ApiFrame;
use crate::model::setting::Setting;
use crate::service::settings_service::hide_value_if_secret;
use serde_json::{Map, Value};

const NAME: &str = "settings";

/// Emits `{settings: [...], meta}` with secret values obfuscated.
///
/// Accepts bare rows, one row, or a `{data, meta}` envelope; `meta` defaults
/// to `{}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettingsSerializer;

impl OutputSerializer for SettingsSerializer {
    fn name(&self) -> &'static str {
        NAME
    }

    fn serialize(&self, response: Value, frame: &ApiFrame) -> SerializerResult<Value> {
        let (rows, meta) = match response {
            Value::Object(mut envelope) if envelope.contains_key("data") => {
                let data = envelope.remove("data").unwrap_or(Value::Null);
                (data, envelope.remove("meta"))
            }
            rows => (rows, None),
        };

        let settings = match rows {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => serde_json::from_value::<Vec<Setting>>(Value::Array(items)),
            row => serde_json::from_value::<Setting>(row).map(|setting| vec![setting]),
        }
        .map_err(invalid_payload)?;

        let hidden = settings
            .iter()
            .map(hide_value_if_secret)
            .collect::<Vec<_>>();
        let hidden = serde_json::to_value(hidden).map_err(invalid_payload)?;

        let doc_name = frame.doc_name.as_deref().unwrap_or(NAME);
        let mut document = wrap_document(doc_name, hidden);
        if let Value::Object(map) = &mut document {
            map.insert(
                "meta".to_string(),
                meta.unwrap_or_else(|| Value::Object(Map::new())),
            );
        }
        Ok(document)
    }
}

fn invalid_payload(err: serde_json::Error) -> SerializerError {
    SerializerError::InvalidPayload {
        serializer: NAME,
        message: err.to_string(),
    }
}
