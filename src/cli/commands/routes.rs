use serde_json::json;

use crate::access::{canonical_path, STANDARD_ROUTES};
use crate::cli::output::{output_object, output_table};
use crate::cli::OutputFormat;

pub fn list(output_format: OutputFormat) -> anyhow::Result<()> {
    let routes = &*STANDARD_ROUTES;

    let mut rows: Vec<(String, String)> = routes
        .public_routes()
        .iter()
        .map(|path| (path.clone(), "public".to_string()))
        .collect();
    rows.extend(
        routes
            .prefixes()
            .iter()
            .map(|(prefix, category)| (prefix.clone(), category.to_string())),
    );

    output_table(&output_format, "routes", &rows)
}

pub fn resolve(path: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let routes = &*STANDARD_ROUTES;
    let canonical = canonical_path(path)?;

    let data = json!({
        "path": path,
        "canonical": canonical,
        "public": routes.is_public(&canonical),
        "category": routes.category_for(&canonical),
    });

    output_object(&output_format, &format!("Route {}", path), data)
}
