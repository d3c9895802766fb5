//! `engineo playbooks` - list the playbook catalog.

use engineo_core::{EngineoConfig, PlaybookCatalog};

pub fn run(config: &EngineoConfig) {
    let catalog = PlaybookCatalog::from_config(&config.automation);
    println!(
        "{:<26} {:<16} {:>14}  {}",
        "PLAYBOOK", "TARGET FIELD", "TOKENS/ASSET", "NAME"
    );
    for def in catalog.all() {
        println!(
            "{:<26} {:<16} {:>14}  {}",
            def.id, def.target_field, def.tokens_per_asset, def.name
        );
    }
}
