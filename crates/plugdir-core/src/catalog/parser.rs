//! TOML parser with helpful error messages

use std::path::Path;

use anyhow::{Context, Result};

use super::schema::CatalogFile;

/// Parse a catalog file with detailed error messages
pub fn parse_catalog(path: &Path) -> Result<CatalogFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;

    parse_catalog_str(&content)
        .with_context(|| format!("Failed to parse catalog file: {}", path.display()))
}

/// Parse catalog content from a string
pub fn parse_catalog_str(content: &str) -> Result<CatalogFile> {
    let catalog: CatalogFile =
        toml::from_str(content).map_err(|e| enhance_toml_error(e, content))?;

    catalog.validate()?;

    Ok(catalog)
}

/// Serialize a catalog to a TOML string
pub fn to_toml(catalog: &CatalogFile) -> Result<String> {
    toml::to_string_pretty(catalog).with_context(|| "Failed to serialize catalog to TOML")
}

/// Point at the offending line when the error carries a location
fn enhance_toml_error(error: toml::de::Error, content: &str) -> anyhow::Error {
    let message = error.message().to_string();

    match error.span() {
        Some(span) => {
            let line_num = content[..span.start.min(content.len())]
                .matches('\n')
                .count()
                + 1;
            let context = get_line_context(content, line_num);
            anyhow::anyhow!(
                "TOML parsing error at line {}:\n{}\n\nError: {}",
                line_num,
                context,
                message
            )
        }
        None => anyhow::anyhow!("TOML parsing error: {}", message),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2).min(lines.len());
    let end = (line_num + 1).min(lines.len());

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
