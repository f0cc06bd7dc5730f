//! Inspect command - decode the header of a code cache.

use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

use kiln_cache::{CacheHeader, placeholder_utf8_len};

#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Cache file
    pub cache: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl InspectCommand {
    pub fn run(&self) -> Result<()> {
        let data = std::fs::read(&self.cache)
            .with_context(|| format!("Failed to read {}", self.cache.display()))?;
        let header = CacheHeader::parse(&data)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&header)?);
        } else {
            println!("File:           {}", self.cache.display());
            println!("Size:           {} bytes", header.total_len);
            println!("Source length:  {}", header.source_length);
            println!("Fingerprint:    {}", header.fingerprint_hex());
            println!(
                "Placeholder:    {} bytes UTF-8",
                placeholder_utf8_len(header.source_length)
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inspect_hostile_length() {
        let dir = tempfile::tempdir().unwrap();
        let cache = dir.path().join("huge.bin");
        let mut data = vec![0u8; 20];
        data[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        std::fs::write(&cache, &data).unwrap();

        let command = InspectCommand { cache, json: false };
        command.run().unwrap();
    }
}
