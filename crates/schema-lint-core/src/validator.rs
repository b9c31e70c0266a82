//! The JSON Schema validator behind the orchestrator.
//!
//! Schema semantics are delegated entirely to a [`SchemaValidator`]. The
//! default, [`JsonSchemaValidator`], uses the `jsonschema` crate.

use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::warn;

/// Validator failures.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// The schema could not be compiled.
    #[error("invalid schema: {reason}")]
    InvalidSchema {
        /// Compiler message.
        reason: String,
    },

    /// Validation did not finish within the configured bound.
    #[error("validation timed out after {millis} ms")]
    Timeout {
        /// The bound that expired.
        millis: u128,
    },

    /// The validation worker could not run or died.
    #[error("validation worker failed: {reason}")]
    Worker {
        /// What happened.
        reason: String,
    },
}

/// One violation reported by a validator.
///
/// `message` follows the text contract `"<pointer>": <description>`;
/// `pointer` carries the same location in structured form when the
/// validator can provide it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorMessage {
    /// JSON Pointer of the offending instance location.
    pub pointer: Option<String>,
    /// Full message text.
    pub message: String,
}

impl ValidatorMessage {
    /// A message with a structured pointer, rendered in the text contract.
    #[must_use]
    pub fn at(pointer: impl Into<String>, description: impl std::fmt::Display) -> Self {
        let pointer = pointer.into();
        Self {
            message: format!("\"{pointer}\": {description}"),
            pointer: Some(pointer),
        }
    }

    /// A free-text message; the pointer is recovered from the text later.
    #[must_use]
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            pointer: None,
            message: message.into(),
        }
    }
}

/// A compiled schema, ready to validate documents.
pub trait CompiledSchema: Send {
    /// Validates `document`, returning violations in validator order.
    fn validate(&self, document: &Value) -> Vec<ValidatorMessage>;
}

/// External JSON Schema validator.
pub trait SchemaValidator: Send + Sync {
    /// Compiles `schema`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::InvalidSchema`] if the schema is unusable.
    fn compile(&self, schema: &Value) -> Result<Box<dyn CompiledSchema>, ValidatorError>;
}

/// [`SchemaValidator`] backed by the `jsonschema` crate. The draft is
/// detected from `$schema`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

impl JsonSchemaValidator {
    /// Creates a validator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

struct Compiled(jsonschema::Validator);

impl CompiledSchema for Compiled {
    fn validate(&self, document: &Value) -> Vec<ValidatorMessage> {
        self.0
            .iter_errors(document)
            .map(|e| ValidatorMessage::at(e.instance_path.to_string(), &e))
            .collect()
    }
}

impl SchemaValidator for JsonSchemaValidator {
    fn compile(&self, schema: &Value) -> Result<Box<dyn CompiledSchema>, ValidatorError> {
        let validator = jsonschema::options()
            .build(schema)
            .map_err(|e| ValidatorError::InvalidSchema {
                reason: e.to_string(),
            })?;
        Ok(Box::new(Compiled(validator)))
    }
}

/// Compiles `schema` and validates `document`, bounded by `timeout`.
///
/// With a timeout the work runs on a worker thread; an expired worker is
/// left to finish on its own and its result is discarded.
///
/// # Errors
///
/// Propagates compile failures, and reports [`ValidatorError::Timeout`] or
/// [`ValidatorError::Worker`] for the bounded path.
pub fn run_bounded(
    validator: &Arc<dyn SchemaValidator>,
    schema: Value,
    document: Value,
    timeout: Option<Duration>,
) -> Result<Vec<ValidatorMessage>, ValidatorError> {
    let Some(timeout) = timeout else {
        return Ok(validator.compile(&schema)?.validate(&document));
    };

    let (tx, rx) = mpsc::channel();
    let worker = Arc::clone(validator);
    std::thread::Builder::new()
        .name("schema-validate".to_string())
        .spawn(move || {
            let result = worker
                .compile(&schema)
                .map(|compiled| compiled.validate(&document));
            // The receiver is gone once the caller timed out.
            let _ = tx.send(result);
        })
        .map_err(|e| ValidatorError::Worker {
            reason: e.to_string(),
        })?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            warn!("Validator still running after {timeout:?}, giving up");
            Err(ValidatorError::Timeout {
                millis: timeout.as_millis(),
            })
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ValidatorError::Worker {
            reason: "worker exited without a result".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validate(schema: Value, document: Value) -> Vec<ValidatorMessage> {
        JsonSchemaValidator::new()
            .compile(&schema)
            .unwrap()
            .validate(&document)
    }

    #[test]
    fn empty_schema_accepts_anything() {
        assert!(validate(json!({}), json!({"a": [1, "x", null]})).is_empty());
    }

    #[test]
    fn messages_follow_text_contract() {
        let schema = json!({
            "type": "object",
            "properties": {
                "Products": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {"Name": {"type": "string"}}
                    }
                }
            }
        });
        let messages = validate(schema, json!({"Products": [{"Name": 1}]}));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].pointer.as_deref(), Some("/Products/0/Name"));
        assert!(messages[0].message.starts_with("\"/Products/0/Name\": "));
    }

    #[test]
    fn root_violation_has_empty_pointer() {
        let messages = validate(json!({"required": ["id"]}), json!({}));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].pointer.as_deref(), Some(""));
        assert!(messages[0].message.starts_with("\"\": "));
    }

    #[test]
    fn invalid_schema_is_rejected() {
        let result = JsonSchemaValidator::new().compile(&json!({"type": 12}));
        assert!(matches!(result, Err(ValidatorError::InvalidSchema { .. })));
    }

    struct Slow;

    struct SlowCompiled;

    impl CompiledSchema for SlowCompiled {
        fn validate(&self, _document: &Value) -> Vec<ValidatorMessage> {
            std::thread::sleep(Duration::from_millis(500));
            Vec::new()
        }
    }

    impl SchemaValidator for Slow {
        fn compile(&self, _schema: &Value) -> Result<Box<dyn CompiledSchema>, ValidatorError> {
            Ok(Box::new(SlowCompiled))
        }
    }

    #[test]
    fn bounded_run_times_out() {
        let validator: Arc<dyn SchemaValidator> = Arc::new(Slow);
        let result = run_bounded(
            &validator,
            json!({}),
            json!({}),
            Some(Duration::from_millis(20)),
        );
        assert!(matches!(result, Err(ValidatorError::Timeout { millis: 20 })));
    }

    #[test]
    fn bounded_run_returns_messages() {
        let validator: Arc<dyn SchemaValidator> = Arc::new(JsonSchemaValidator::new());
        let result = run_bounded(
            &validator,
            json!({"type": "object"}),
            json!([]),
            Some(Duration::from_secs(10)),
        )
        .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].pointer.as_deref(), Some(""));
    }
}
