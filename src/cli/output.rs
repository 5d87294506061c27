use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Prints a result object as pretty JSON or as `key: value` lines
pub fn output_object(output_format: &OutputFormat, title: &str, data: Value) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "success": true, "data": data }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", title);
            if let Value::Object(map) = &data {
                for (key, value) in map {
                    println!("  {}: {}", key, display_value(value));
                }
            }
        }
    }
    Ok(())
}

/// Prints rows as a JSON array or as an aligned two column table
pub fn output_table(
    output_format: &OutputFormat,
    collection_name: &str,
    rows: &[(String, String)],
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let items: Vec<Value> = rows
                .iter()
                .map(|(left, right)| json!([left, right]))
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ collection_name: items }))?
            );
        }
        OutputFormat::Text => {
            let width = rows.iter().map(|(left, _)| left.len()).max().unwrap_or(0);
            for (left, right) in rows {
                println!("{:<width$}  {}", left, right, width = width);
            }
        }
    }
    Ok(())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}
