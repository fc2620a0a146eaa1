//! Windows software: MSI products, uninstall registry keys, PackageManagement, AppX

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput};

use crate::common::{json_objects, json_text};

/// Parse `wmic product get name,version /format:csv`
///
/// ```text
/// Node,Name,Version
/// DESKTOP-1,Microsoft Visual C++ 2019 X64 Runtime,14.29.30133
/// ```
/// Product names may contain commas, so the first column is the node and
/// the last one the version.
pub fn parse_wmic_products(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines().map(|l| l.trim_matches(['\r', '\u{feff}', ' '])) {
        if line.is_empty() || line.starts_with("Node,") {
            continue;
        }
        let Some((_node, rest)) = line.split_once(',') else {
            out.warn(format!("wmic: unexpected row `{line}`"));
            continue;
        };
        let Some((name, version)) = rest.rsplit_once(',') else {
            out.warn(format!("wmic: unexpected row `{line}`"));
            continue;
        };
        if name.trim().is_empty() {
            continue;
        }
        out.push(
            InventoryRecord::new(name.trim(), "wmic")
                .with_field("version", version)
                .with_field("package_source", "msi"),
        );
    }

    Ok(out)
}

/// Parse `Get-ItemProperty <Uninstall key> | Select-Object ... | ConvertTo-Json`
pub fn parse_uninstall_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    let (objects, skipped) = json_objects(output)?;
    let mut out = ParseOutput::new();
    if skipped > 0 {
        out.warn(format!("registry: {skipped} non-object entries ignored"));
    }

    for object in &objects {
        // entries without a display name are updates and components
        let Some(name) = json_text(object, "DisplayName") else {
            continue;
        };
        out.push(
            InventoryRecord::new(name, "registry")
                .with_field("version", json_text(object, "DisplayVersion").unwrap_or_default())
                .with_optional_field("publisher", json_text(object, "Publisher").as_deref())
                .with_optional_field("install_date", json_text(object, "InstallDate").as_deref()),
        );
    }

    Ok(out)
}

/// Parse `Get-Package | Select-Object Name, Version, Source | ConvertTo-Json`
pub fn parse_get_package_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    let (objects, skipped) = json_objects(output)?;
    let mut out = ParseOutput::new();
    if skipped > 0 {
        out.warn(format!("Get-Package: {skipped} non-object entries ignored"));
    }

    for object in &objects {
        let Some(name) = json_text(object, "Name") else {
            out.warn("Get-Package: entry without Name");
            continue;
        };
        out.push(
            InventoryRecord::new(name, "get-package")
                .with_field("version", json_text(object, "Version").unwrap_or_default())
                .with_optional_field("package_source", json_text(object, "Source").as_deref()),
        );
    }

    Ok(out)
}

/// Parse `Get-AppxPackage | Select-Object Name, Version, Publisher | ConvertTo-Json`
pub fn parse_appx_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    let (objects, skipped) = json_objects(output)?;
    let mut out = ParseOutput::new();
    if skipped > 0 {
        out.warn(format!("Get-AppxPackage: {skipped} non-object entries ignored"));
    }

    for object in &objects {
        let Some(name) = json_text(object, "Name") else {
            out.warn("Get-AppxPackage: entry without Name");
            continue;
        };
        out.push(
            InventoryRecord::new(name, "appx")
                .with_field("version", json_text(object, "Version").unwrap_or_default())
                .with_optional_field("publisher", json_text(object, "Publisher").as_deref())
                .with_field("package_source", "store"),
        );
    }

    Ok(out)
}
