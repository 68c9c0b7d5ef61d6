//! Config command implementation

use crate::cli::Cli;
use crate::config_loader::load_config;
use crate::output::OutputWriter;
use crate::output_types::{ConfigValue, InspectConfigOutput};
use anyhow::Result;
use std::collections::BTreeMap;
use tabled::Tabled;

pub fn execute(cli: &Cli, output: &OutputWriter) -> Result<()> {
    let config = load_config(cli)?;

    let values: BTreeMap<String, ConfigValue> = config
        .to_inspection_map()
        .into_iter()
        .map(|(key, (value, source))| {
            (key, ConfigValue { value, source: format!("{:?}", source) })
        })
        .collect();

    if output.is_json() {
        return output.result(InspectConfigOutput { values });
    }

    #[derive(Tabled)]
    struct ConfigRow {
        #[tabled(rename = "Key")]
        key: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Source")]
        source: String,
    }

    output.section("Configuration");
    let rows: Vec<ConfigRow> = values
        .into_iter()
        .map(|(key, entry)| ConfigRow { key, value: entry.value, source: entry.source })
        .collect();
    output.table(rows);
    output.kv(
        "Store",
        if config.is_remote_root() { "http" } else { "directory" },
    );

    Ok(())
}
