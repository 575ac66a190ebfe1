//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::{Table, Tabled};

use hotplug_plugin::PluginInfo;

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// One row of the plugin table.
#[derive(Debug, Serialize, Tabled)]
pub struct PluginRow {
    #[tabled(rename = "ID")]
    pub id: String,
    #[tabled(rename = "Version")]
    pub version: String,
    #[tabled(rename = "Author")]
    pub author: String,
    #[tabled(rename = "Directory")]
    pub directory: String,
    #[tabled(rename = "Gen")]
    pub generation: String,
    #[tabled(rename = "Enabled")]
    pub enabled: bool,
    #[tabled(rename = "Description")]
    pub description: String,
}

impl From<&PluginInfo> for PluginRow {
    fn from(info: &PluginInfo) -> Self {
        Self {
            id: info.id.clone(),
            version: info.version.clone(),
            author: info.author.clone(),
            directory: info.directory.clone().unwrap_or_else(|| "-".to_string()),
            generation: info
                .generation
                .map(|g| g.to_string())
                .unwrap_or_else(|| "-".to_string()),
            enabled: info.enabled,
            description: info.description.clone(),
        }
    }
}

/// Print plugin records in the selected format.
///
/// JSON output carries the full records, the table a condensed row each.
pub fn print_plugins(plugins: &[PluginInfo], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let rows: Vec<PluginRow> = plugins.iter().map(PluginRow::from).collect();
            print_list(&rows, format);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(plugins).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a list of items in the selected format
pub fn print_list<T: Serialize + Tabled>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("No plugins found.");
            } else {
                let table = Table::new(items).to_string();
                println!("{}", table);
            }
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(items).unwrap_or_else(|_| "[]".to_string());
            println!("{}", json);
        }
    }
}

/// Print a single item in the selected format
pub fn print_item<T: Serialize + std::fmt::Debug>(item: &T, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            println!("{:#?}", item);
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(item).unwrap_or_else(|_| "{}".to_string());
            println!("{}", json);
        }
    }
}

/// Print a success message
pub fn print_success(msg: &str) {
    println!("✓ {}", msg);
}

/// Print a warning message
pub fn print_warning(msg: &str) {
    println!("⚠ {}", msg);
}

/// Print an error message
pub fn print_error(msg: &str) {
    eprintln!("✗ {}", msg);
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", key), value);
}
