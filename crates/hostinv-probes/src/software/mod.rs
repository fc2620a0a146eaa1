//! Installed software grammars

pub mod linux;
pub mod macos;
pub mod windows;

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput};

/// Summary tag for distribution package managers
pub const SYSTEM_PACKAGE: &str = "system-package";
/// Summary tag for sandboxed app formats
pub const CONTAINER_PACKAGE: &str = "container-package";
/// Summary tag for language ecosystem packages
pub const LANGUAGE_PACKAGE: &str = "language-package";
/// Summary tag for bundled desktop applications
pub const APPLICATION: &str = "application";
/// Summary tag for vendor app stores
pub const STORE_APP: &str = "store-app";

/// Parse `pip list`
///
/// ```text
/// Package    Version
/// ---------- -------
/// requests   2.31.0
/// ```
pub fn parse_pip_list(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with("Package") || line.starts_with("---") {
            continue;
        }
        if line.starts_with('[') || line.starts_with("WARNING") || line.starts_with("DEPRECATION") {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [name, version, rest @ ..] => {
                let record = InventoryRecord::new(*name, "pip")
                    .with_field("version", version)
                    .with_field("package_source", "pip")
                    .with_optional_field("location", rest.first().copied());
                out.push(record);
            }
            _ => out.warn(format!("pip: unexpected line `{line}`")),
        }
    }

    Ok(out)
}
