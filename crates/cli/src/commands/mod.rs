//! Subcommand implementations.

pub mod orders;
pub mod quote;
pub mod seed;

use std::path::Path;

/// Read a file, failing with its path in the message.
async fn read_file(file_path: &str) -> Result<String, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }
    Ok(tokio::fs::read_to_string(path).await?)
}
