//! Processor component applying attribute actions to an object input.

use crate::component::{Component, ExportValue, UpdateContext, UpdateError, UpdateFuture};
use serde::Deserialize;
use serde_json::json;

/// What to do with an attribute key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Action {
    /// Set the key only if it is absent.
    Insert,
    /// Set the key only if it is present.
    Update,
    /// Set the key unconditionally.
    Upsert,
    /// Remove the key.
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
struct ActionConfig {
    key: String,
    action: Action,
    #[serde(default)]
    value: Option<ExportValue>,
}

#[derive(Debug, Deserialize)]
struct Arguments {
    /// Input object, typically a reference to another component's export.
    input: ExportValue,
    /// Actions applied in declaration order.
    #[serde(default)]
    actions: Vec<ActionConfig>,
}

/// Processor that rewrites attributes of an object input.
///
/// Exports the rewritten object under the `output` field. The input must be
/// a JSON object; set actions require a `value`.
#[derive(Debug, Default)]
pub struct Transform;

impl Transform {
    /// Creates a new instance.
    pub fn new() -> Self {
        Self
    }
}

impl Component for Transform {
    fn kind(&self) -> &str {
        "transform"
    }

    fn update<'a>(&'a mut self, cx: UpdateContext) -> UpdateFuture<'a> {
        Box::pin(async move {
            let args: Arguments = serde_json::from_value(cx.arguments)
                .map_err(|err| UpdateError::new(format!("invalid arguments: {err}")))?;

            let mut output = match args.input {
                ExportValue::Object(map) => map,
                other => {
                    return Err(UpdateError::new(format!(
                        "input must be an object, got {}",
                        value_kind(&other)
                    )))
                }
            };

            for action in &args.actions {
                apply_action(&mut output, action)?;
            }

            Ok(json!({ "output": output }))
        })
    }
}

fn apply_action(
    output: &mut serde_json::Map<String, ExportValue>,
    config: &ActionConfig,
) -> Result<(), UpdateError> {
    match config.action {
        Action::Delete => {
            output.remove(&config.key);
            Ok(())
        }
        set_action => {
            let value = config.value.clone().ok_or_else(|| {
                UpdateError::new(format!("action on `{}` requires a value", config.key))
            })?;
            let present = output.contains_key(&config.key);
            let applies = match set_action {
                Action::Insert => !present,
                Action::Update => present,
                Action::Upsert => true,
                Action::Delete => unreachable!(),
            };
            if applies {
                output.insert(config.key.clone(), value);
            }
            Ok(())
        }
    }
}

fn value_kind(value: &ExportValue) -> &'static str {
    match value {
        ExportValue::Null => "null",
        ExportValue::Bool(_) => "bool",
        ExportValue::Number(_) => "number",
        ExportValue::String(_) => "string",
        ExportValue::Array(_) => "array",
        ExportValue::Object(_) => "object",
    }
}
