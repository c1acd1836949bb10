//! Outward-facing API output shaping.

pub mod serializers;

/// Request context handed to output serializers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiFrame {
    /// Controller method, e.g. `browse`, `read` or `edit`.
    pub method: String,
    /// Overrides the document name a response is wrapped under.
    pub doc_name: Option<String>,
}

impl ApiFrame {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            doc_name: None,
        }
    }

    pub fn with_doc_name(mut self, doc_name: impl Into<String>) -> Self {
        self.doc_name = Some(doc_name.into());
        self
    }
}
