//! Writes the digest manifest for the exported artifacts.
//!
//! Binds `logistic_regression.json` and `scaler.json` to their SHA-256
//! digests in `manifest.json`, which the store verifies at load time when a
//! manifest is configured.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin digest_artifacts -- <model_dir> [--file <name>]...
//! ```

use std::env;
use std::fs;
use std::path::PathBuf;

use lungrisk::adapters::artifacts::DigestManifest;
use lungrisk::config::DEFAULT_MANIFEST_NAME;

const DEFAULT_FILES: [&str; 2] = ["logistic_regression.json", "scaler.json"];

fn parse_args() -> Result<(PathBuf, Vec<String>), String> {
    let mut args = env::args().skip(1);
    let mut model_dir: Option<PathBuf> = None;
    let mut files = Vec::new();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--file" => {
                let name = args
                    .next()
                    .ok_or_else(|| "--file requires a value".to_string())?;
                files.push(name);
            }
            "-h" | "--help" => {
                return Err(
                    "Usage: digest_artifacts <model_dir> [--file <name>]...".to_string(),
                );
            }
            _ if model_dir.is_none() => model_dir = Some(PathBuf::from(arg)),
            other => return Err(format!("Unexpected argument: {other}")),
        }
    }

    let model_dir = model_dir.ok_or_else(|| "Missing <model_dir>".to_string())?;
    if files.is_empty() {
        files = DEFAULT_FILES.iter().map(|s| (*s).to_string()).collect();
    }
    Ok((model_dir, files))
}

fn main() -> Result<(), String> {
    let (model_dir, names) = parse_args()?;

    let model_dir = if model_dir.is_file() {
        model_dir
            .parent()
            .ok_or_else(|| "Model path has no parent directory".to_string())?
            .to_path_buf()
    } else {
        model_dir
    };

    let mut contents: Vec<(String, Vec<u8>)> = Vec::with_capacity(names.len());
    for name in names {
        let path = model_dir.join(&name);
        let bytes = fs::read(&path).map_err(|e| format!("Failed to read {path:?}: {e}"))?;
        contents.push((name, bytes));
    }

    let pairs: Vec<(&str, &[u8])> = contents
        .iter()
        .map(|(name, bytes)| (name.as_str(), bytes.as_slice()))
        .collect();
    let manifest = DigestManifest::from_contents(&pairs);

    let manifest_bytes = serde_json::to_vec_pretty(&manifest)
        .map_err(|e| format!("Failed to serialize manifest: {e}"))?;
    let manifest_path = model_dir.join(DEFAULT_MANIFEST_NAME);
    fs::write(&manifest_path, &manifest_bytes)
        .map_err(|e| format!("Failed to write {manifest_path:?}: {e}"))?;

    println!("Wrote manifest: {manifest_path:?}");
    for (name, digest) in &manifest.files {
        println!("{digest}  {name}");
    }
    Ok(())
}
