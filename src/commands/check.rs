//! Check command implementation.

use anyhow::Result;
use std::path::Path;

use crate::command::CommandFormatter;
use crate::config::Config;
use crate::source::SourceKind;

/// Validate the configuration and print the resulting settings.
pub fn run(config_path: &Path) -> Result<()> {
    let config = Config::load(config_path)?;
    let formatter = config.formatter()?;

    println!("Configuration {} is valid", config_path.display());
    println!();
    for source in config.sources() {
        let origin = match source.kind() {
            SourceKind::Remote { url } => url.clone(),
            SourceKind::Local => "local file".to_string(),
        };
        println!(
            "  {:<8} {} <- {} (every {}s)",
            source.name(),
            source.path().display(),
            origin,
            source.interval().num_seconds()
        );
    }
    println!();
    println!("  method   {}", describe(&formatter));

    Ok(())
}

fn describe(formatter: &CommandFormatter) -> String {
    match formatter {
        CommandFormatter::Unicast {
            next_hop,
            communities,
        } => format!("unicast via {} community [{}]", next_hop, communities),
        CommandFormatter::Flowspec {
            destination_port,
            protocol,
            communities,
        } => format!(
            "flowspec port {} protocol {} community [{}]",
            destination_port.as_deref().unwrap_or("any"),
            protocol,
            communities
        ),
    }
}
