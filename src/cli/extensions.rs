//! `scc extensions` subcommands.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use console::style;
use serde_json::Value;

use super::headless::HeadlessHost;
use super::ExtensionCommands;
use crate::config::Config;
use crate::extensions::builtin::builtin_registry;
use crate::extensions::{
    identifier_for, parse_static, ExtensionManager, ExtensionRecord, ExtensionSource, ExtensionState,
    MarketplaceEntry,
};

type Manager = ExtensionManager<HeadlessHost>;

pub fn run(action: ExtensionCommands, config: &Config) -> Result<()> {
    // `info` never touches the install directory
    if let ExtensionCommands::Info { path } = &action {
        return show_info(path);
    }

    // Only `run` prints what extensions report
    let host = match &action {
        ExtensionCommands::Run { file: Some(file), .. } => HeadlessHost::new().with_text(
            fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))?,
        ),
        ExtensionCommands::Run { file: None, .. } => HeadlessHost::new(),
        _ => HeadlessHost::quiet(),
    };
    let mut manager = ExtensionManager::initialize(host, config.extension_host_config(), builtin_registry());

    match action {
        ExtensionCommands::List => list(&manager),
        ExtensionCommands::Enable { id } => {
            require(&manager, &id)?;
            manager.enable(&id);
            report(&manager, &id)
        }
        ExtensionCommands::Disable { id } => {
            require(&manager, &id)?;
            manager.disable(&id);
            report(&manager, &id)
        }
        ExtensionCommands::Reload { id: Some(id) } => {
            require(&manager, &id)?;
            manager.reload_extension(&id);
            report(&manager, &id)
        }
        ExtensionCommands::Reload { id: None } => {
            manager.reload_all();
            list(&manager)
        }
        ExtensionCommands::Uninstall { id } => {
            if !manager.uninstall(&id) {
                bail!("Extension '{}' is not installed", id);
            }
            println!("{} Uninstalled {}", style("✓").green().bold(), style(&id).bold());
            Ok(())
        }
        ExtensionCommands::Catalog { search, category } => {
            let entries = manager.list_catalog();
            let entries = manager
                .catalog()
                .filter(entries, search.as_deref().unwrap_or(""), &category);
            print_catalog(&entries);
            Ok(())
        }
        ExtensionCommands::Install { id } => install(&mut manager, &id),
        ExtensionCommands::Settings { id, key, value, reset } => {
            if reset {
                let key = key.unwrap_or_default();
                require(&manager, &id)?;
                manager.reset_setting(&id, &key)?;
                println!("{} {} reset", style("✓").green().bold(), style(&key).bold());
                return Ok(());
            }
            settings(&mut manager, &id, key, value)
        }
        ExtensionCommands::Run { id, action, .. } => {
            manager.run_action(&id, &action)?;
            Ok(())
        }
        ExtensionCommands::Info { .. } => Ok(()),
    }
}

fn require(manager: &Manager, id: &str) -> Result<()> {
    if manager.record(id).is_none() {
        bail!("Extension '{}' is not installed", id);
    }
    Ok(())
}

fn state_badge(record: &ExtensionRecord) -> console::StyledObject<&'static str> {
    match record.state() {
        ExtensionState::Active => style("active").green(),
        ExtensionState::Inactive => style("inactive").dim(),
        ExtensionState::Error => style("error").red().bold(),
    }
}

fn list(manager: &Manager) -> Result<()> {
    let records: Vec<&ExtensionRecord> = manager.list_installed().collect();
    if records.is_empty() {
        println!(
            "No extensions installed in {}",
            style(manager.config().install_dir.display()).dim()
        );
        return Ok(());
    }

    for record in records {
        let meta = record.meta();
        println!(
            "{} {:<20} {:<24} {:<10} {}",
            meta.icon,
            style(record.id()).bold(),
            meta.name,
            style(&meta.version).dim(),
            state_badge(record)
        );
        if let Some(error) = record.error() {
            println!("     {}", style(error).red());
        }
    }
    Ok(())
}

fn report(manager: &Manager, id: &str) -> Result<()> {
    let Some(record) = manager.record(id) else {
        bail!("Extension '{}' is not installed", id);
    };
    println!("{} {}", style(id).bold(), state_badge(record));
    for command in manager.host().menu().commands().iter().filter(|c| c.owner == id) {
        println!("  {} {} > {}", style("menu").dim(), command.menu, command.label);
    }
    for (_, sequence, action) in manager.host().bindings_of(id) {
        println!("  {} {} → {}", style("key").dim(), sequence, action);
    }
    manager.health(id).map_err(Into::into)
}

fn print_catalog(entries: &[MarketplaceEntry]) {
    if entries.is_empty() {
        println!("No extensions available");
        return;
    }
    for entry in entries {
        let meta = &entry.meta;
        println!(
            "{} {:<20} {:<10} {:<12} {}",
            meta.icon,
            style(&entry.id).bold(),
            style(&meta.version).dim(),
            style(&meta.category).cyan(),
            meta.description
        );
    }
}

fn install(manager: &mut Manager, id: &str) -> Result<()> {
    let name = manager
        .catalog()
        .find(id, |_| false)
        .map_or_else(|| id.to_string(), |entry| entry.meta.name);

    println!("{} Installing {}...", style("→").cyan(), style(&name).bold());
    manager.install(id)?;
    println!(
        "{} {}",
        style("✓").green().bold(),
        style(format!("Installed to {}", manager.config().install_dir.display())).cyan()
    );
    Ok(())
}

fn settings(manager: &mut Manager, id: &str, key: Option<String>, value: Option<String>) -> Result<()> {
    require(manager, id)?;

    match (key, value) {
        (None, _) => {
            let values = manager.settings(id).unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        (Some(key), None) => match manager.get_setting(id, &key) {
            Some(value) => println!("{value}"),
            None => bail!("Extension '{}' has no setting '{}'", id, key),
        },
        (Some(key), Some(raw)) => {
            let value = parse_value(&raw);
            manager.set_setting(id, &key, value.clone())?;
            println!("{} {} = {}", style("✓").green().bold(), style(&key).bold(), value);
        }
    }
    Ok(())
}

/// JSON if it parses, otherwise a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn show_info(path: &Path) -> Result<()> {
    let Some(id) = identifier_for(path) else {
        bail!("{} is not an extension unit", path.display());
    };
    let meta = parse_static(path);

    println!("{} {} {}", meta.icon, style(&meta.name).bold(), style(&meta.version).dim());
    println!("{} {}", style("Id:").bold(), id);
    println!("{} {}", style("Author:").bold(), meta.author);
    println!("{} {}", style("Category:").bold(), meta.category);
    if !meta.tags.is_empty() {
        println!("{} {}", style("Tags:").bold(), meta.tags.join(", "));
    }
    if !meta.description.is_empty() {
        println!();
        println!("{}", meta.description);
    }

    let source = ExtensionSource::load(&id, path).context("Unit does not parse")?;
    println!();
    match &source.entry {
        Some(entry) => println!("{} {}", style("Entry:").bold(), entry),
        None => println!("{}", style("No entry: not an extension").yellow()),
    }
    if !source.settings.is_empty() {
        println!("{} {}", style("Settings:").bold(), serde_json::to_string(&source.settings)?);
    }
    Ok(())
}
