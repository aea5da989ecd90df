use crate::core::permission::PermissionTree;
use crate::utils::error::{PermagateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

pub fn render_tree(tree: &PermissionTree, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(tree)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&tree.entries())?),
        OutputFormat::Csv => render_csv(tree),
    }
}

fn render_text(tree: &PermissionTree) -> String {
    let mut out = String::new();
    for entry in tree.entries() {
        out.push_str(&"  ".repeat(entry.depth));
        out.push_str(&entry.permission);
        if let Some(name) = &entry.name {
            out.push_str(&format!(" ({})", name));
        }
        if let Some(description) = &entry.description {
            out.push_str(&format!(": {}", description));
        }
        out.push('\n');
    }
    out
}

fn render_csv(tree: &PermissionTree) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in tree.entries() {
        writer.serialize(&entry)?;
    }
    let bytes = writer.into_inner().map_err(|e| PermagateError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| PermagateError::ConfigError {
        message: format!("CSV output is not valid UTF-8: {}", e),
    })
}
