use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct SymbolFile {
    #[serde(default)]
    symbols: Vec<String>,
}

/// Parse an inline comma list such as `"aapl, MSFT,,goog"`.
pub fn parse_symbols(raw: &str) -> Vec<String> {
    normalize(raw.split(','))
}

/// Load symbols from a YAML file (`symbols: [...]`, by `.yaml`/`.yml`
/// extension) or a line-delimited text file.
pub fn load_symbols_file(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("failed to read symbols file '{}': {e}", path.display()))
    })?;

    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"))
        .unwrap_or(false);

    if is_yaml {
        let file: SymbolFile = serde_yaml::from_str(&content).map_err(|e| {
            Error::Config(format!("failed to parse symbols file '{}': {e}", path.display()))
        })?;
        Ok(normalize(file.symbols.iter().map(String::as_str)))
    } else {
        Ok(normalize(content.lines()))
    }
}

/// Reject an empty symbol list before any processing starts.
pub fn require_symbols(symbols: Vec<String>) -> Result<Vec<String>> {
    if symbols.is_empty() {
        return Err(Error::Config("no symbols provided".into()));
    }
    Ok(symbols)
}

/// Trim, upper-case, drop blanks and duplicates; first occurrence keeps its place.
fn normalize<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for entry in raw {
        let symbol = entry.trim().to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        if seen.insert(symbol.clone()) {
            out.push(symbol);
        } else {
            debug!(symbol = %symbol, "Dropping duplicate symbol");
        }
    }
    out
}
