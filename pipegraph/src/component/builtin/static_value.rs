//! Source component exporting a configured value.

use crate::component::{Component, ExportValue, UpdateContext, UpdateError, UpdateFuture};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Arguments {
    /// The value to export, verbatim.
    value: ExportValue,
}

/// Leaf source that exports its `value` argument under the `value` field.
///
/// Because the export only changes when the declared value changes,
/// re-evaluating an unchanged `static_value` never re-triggers dependents.
#[derive(Debug, Default)]
pub struct StaticValue;

impl StaticValue {
    /// Creates a new instance.
    pub fn new() -> Self {
        Self
    }
}

impl Component for StaticValue {
    fn kind(&self) -> &str {
        "static_value"
    }

    fn update<'a>(&'a mut self, cx: UpdateContext) -> UpdateFuture<'a> {
        Box::pin(async move {
            let args: Arguments = serde_json::from_value(cx.arguments)
                .map_err(|err| UpdateError::new(format!("invalid arguments: {err}")))?;
            Ok(json!({ "value": args.value }))
        })
    }
}
