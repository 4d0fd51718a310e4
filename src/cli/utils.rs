use serde_json::{json, Map, Value};

use crate::cli::OutputFormat;

/// Report a finished command. JSON output merges `data` into the envelope;
/// text output lists its fields under the message.
pub fn output_success(format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    let extra = match data {
        Some(Value::Object(fields)) => fields,
        _ => Map::new(),
    };

    match format {
        OutputFormat::Json => {
            let mut envelope = Map::new();
            envelope.insert("success".to_string(), json!(true));
            envelope.insert("message".to_string(), json!(message));
            envelope.extend(extra);
            println!("{}", serde_json::to_string_pretty(&Value::Object(envelope))?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
            for (key, value) in &extra {
                match value {
                    Value::String(text) => println!("  {key}: {text}"),
                    other => println!("  {key}: {other}"),
                }
            }
        }
    }
    Ok(())
}
