//! Item command handlers
//!
//! Each handler performs exactly one store operation.

use anyhow::{bail, Context, Result};

use ticklist_core::{Item, ItemId, KvStore, ListStore};

use crate::output::Output;
use crate::prompt::{confirm, prompt_with_default};

/// Add a new item
pub fn add<S: KvStore>(store: &mut ListStore<S>, text: String, output: &Output) -> Result<()> {
    match store.add(&text).context("Failed to add item")? {
        Some(item) => {
            output.success(&format!("Added item: {}", item.id.short()));
            output.print_item(&item);
        }
        None => output.message("Nothing to add: text is blank."),
    }
    Ok(())
}

/// List all items in order
pub fn list<S: KvStore>(store: &ListStore<S>, output: &Output) -> Result<()> {
    output.print_items(store.items());
    Ok(())
}

/// Show a single item
pub fn show<S: KvStore>(store: &ListStore<S>, reference: String, output: &Output) -> Result<()> {
    match resolve_item(store.items(), &reference)? {
        Some(id) => {
            if let Some(item) = store.get(&id) {
                output.print_item(item);
            }
        }
        None => output.message(&format!("No item matches '{}'.", reference)),
    }
    Ok(())
}

/// Edit an item's text
///
/// The draft text is held here, not in the store: it comes from `--text`
/// or from an interactive prompt seeded with the current text.
pub fn edit<S: KvStore>(
    store: &mut ListStore<S>,
    reference: String,
    text: Option<String>,
    output: &Output,
) -> Result<()> {
    let Some(id) = resolve_item(store.items(), &reference)? else {
        output.message(&format!("No item matches '{}'.", reference));
        return Ok(());
    };

    let draft = match text {
        Some(text) => text,
        None => {
            let current = store.get(&id).map(|i| i.text.clone()).unwrap_or_default();
            match prompt_with_default("Text", &current)? {
                Some(new_text) => new_text,
                None => {
                    output.message("No changes.");
                    return Ok(());
                }
            }
        }
    };

    if store.update(&id, &draft).context("Failed to update item")? {
        output.success("Item updated");
        if let Some(item) = store.get(&id) {
            output.print_item(item);
        }
    } else {
        output.message("Nothing to update: text is blank.");
    }

    Ok(())
}

/// Delete an item
pub fn delete<S: KvStore>(
    store: &mut ListStore<S>,
    reference: String,
    yes: bool,
    output: &Output,
) -> Result<()> {
    let Some(id) = resolve_item(store.items(), &reference)? else {
        output.message(&format!("No item matches '{}'.", reference));
        return Ok(());
    };

    if !yes && output.should_prompt() {
        if let Some(item) = store.get(&id) {
            println!("Delete item: {} - {}", item.id.short(), item.text);
        }
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.delete(&id).context("Failed to delete item")?;
    output.success(&format!("Deleted item: {}", id.short()));

    Ok(())
}

/// Discard the stored list, even if it cannot be read
pub fn reset<S: KvStore>(store: &mut ListStore<S>, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            bail!("Refusing to reset without confirmation. Pass --yes.");
        }
        println!("This permanently removes every item in '{}'.", store.key());
        if !confirm("Are you sure?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }

    store.reset().context("Failed to reset list")?;
    output.success("List reset");

    Ok(())
}

/// Resolve a user-supplied reference to an item ID
///
/// Accepts, in order: an exact ID, a 1-based list position, or a unique
/// ID prefix. Returns `None` when nothing matches.
pub fn resolve_item(items: &[Item], reference: &str) -> Result<Option<ItemId>> {
    let reference = reference.trim();
    if reference.is_empty() {
        bail!("Item reference is empty.");
    }

    if let Some(item) = items.iter().find(|i| i.id.as_str() == reference) {
        return Ok(Some(item.id.clone()));
    }

    if let Ok(position) = reference.parse::<usize>() {
        if (1..=items.len()).contains(&position) {
            return Ok(Some(items[position - 1].id.clone()));
        }
    }

    let matches: Vec<_> = items
        .iter()
        .filter(|i| i.id.as_str().starts_with(reference))
        .collect();

    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches[0].id.clone())),
        _ => {
            eprintln!("Multiple items match '{}':", reference);
            for item in &matches {
                eprintln!("  {} - {}", item.id, item.text);
            }
            bail!("Ambiguous ID. Please provide more characters.");
        }
    }
}
