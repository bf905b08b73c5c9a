use serde_yaml::Value;


/// Render a value so that it fits on a single `key: <value>` line.
///
/// Scalars are rendered by the YAML encoder (so strings get quoted only when
/// they have to be). Sequences, mappings and multi-line strings are rendered
/// in JSON flow style, which YAML also accepts.
pub fn render_inline(value: &Value) -> Result<String, String> {
    match value {
        Value::Sequence(_) | Value::Mapping(_) => render_flow(value),
        Value::Tagged(_) => Err("tagged values cannot be rendered inline".to_string()),
        _ => {
            let rendered = serde_yaml::to_string(value).map_err(|error| error.to_string())?;
            let rendered = rendered.trim_end_matches('\n');

            if rendered.contains('\n') {
                render_flow(value)
            } else {
                Ok(rendered.to_string())
            }
        }
    }
}

fn render_flow(value: &Value) -> Result<String, String> {
    serde_json::to_string(value).map_err(|error| error.to_string())
}


/// Render a scalar value the way a user would type it on the command line.
///
/// Returns `None` for `null` and non-scalar values, which have no
/// command-line representation.
#[must_use = "function returns the rendered value"]
pub fn render_command_line_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
