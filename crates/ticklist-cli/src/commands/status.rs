//! Status command handler

use anyhow::Result;

use ticklist_core::{Config, FileKvStore, ListStore};

use crate::output::{Output, OutputFormat};

/// Show where the list lives and how big it is
pub fn show(store: &ListStore<FileKvStore>, config: &Config, output: &Output) -> Result<()> {
    let size = store.backend().size_of(store.key())?;
    let path = store.backend().path_for(store.key())?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "data_dir": config.data_dir,
                    "storage_key": store.key(),
                    "store_path": path,
                    "stored": size.is_some(),
                    "size": size.unwrap_or(0),
                    "items": store.len()
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", store.len());
        }
        OutputFormat::Human => {
            println!("ticklist Status");
            println!("===============");
            println!();
            println!("Storage:");
            println!("  Location: {}", config.data_dir.display());
            println!("  Key:      {}", store.key());
            println!("  File:     {}", path.display());
            match size {
                Some(bytes) => println!("  Size:     {}", format_size(bytes)),
                None => println!("  Size:     (nothing saved yet)"),
            }
            println!();
            println!("Contents:");
            println!("  Items: {}", store.len());
        }
    }

    Ok(())
}

/// Human-readable byte count
fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
