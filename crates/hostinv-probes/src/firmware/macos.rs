//! macOS firmware via `system_profiler -json`

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput};
use serde_json::{Map, Value};

use super::{dedupe_identities, device_identity};
use crate::common::json_text;

/// Items array of a `system_profiler <DataType> -json` document
fn data_items(output: &str, data_type: &str) -> Result<Vec<Map<String, Value>>, ParseFailure> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let document: Value = serde_json::from_str(output)
        .map_err(|e| ParseFailure::new(format!("system_profiler: invalid JSON: {e}")))?;

    match document.get(data_type) {
        Some(Value::Array(items)) => Ok(items
            .iter()
            .filter_map(|item| item.as_object().cloned())
            .collect()),
        Some(Value::Object(item)) => Ok(vec![item.clone()]),
        _ => Err(ParseFailure::new(format!("system_profiler: no {data_type} section"))),
    }
}

/// Parse `system_profiler SPHardwareDataType -json`
pub fn parse_hardware_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    if let Some(hw) = data_items(output, "SPHardwareDataType")?.first() {
        out.push(
            InventoryRecord::new("system-firmware", "system_profiler")
                .with_optional_field("model", json_text(hw, "machine_model").as_deref())
                .with_optional_field("chip", json_text(hw, "chip_type").as_deref())
                .with_optional_field("boot_rom_version", json_text(hw, "boot_rom_version").as_deref())
                .with_optional_field("smc_version", json_text(hw, "SMC_version_system").as_deref())
                .with_optional_field("os_loader_version", json_text(hw, "os_loader_version").as_deref())
                .with_optional_field("serial_number", json_text(hw, "serial_number").as_deref()),
        );
    }

    Ok(out)
}

/// Parse `system_profiler SPStorageDataType -json`
pub fn parse_storage_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    let mut records = Vec::new();

    for volume in data_items(output, "SPStorageDataType")? {
        let Some(name) = json_text(&volume, "_name") else {
            out.warn("system_profiler: storage entry without _name");
            continue;
        };
        let drive = volume.get("physical_drive").and_then(Value::as_object);
        let from_drive = |key: &str| drive.and_then(|d| json_text(d, key));

        records.push(
            InventoryRecord::new(device_identity("storage", &name), "system_profiler")
                .with_optional_field("model", from_drive("device_name").as_deref())
                .with_optional_field("medium", from_drive("medium_type").as_deref())
                .with_optional_field("protocol", from_drive("protocol").as_deref())
                .with_optional_field(
                    "firmware_revision",
                    json_text(&volume, "device_revision")
                        .or_else(|| from_drive("device_revision"))
                        .as_deref(),
                )
                .with_optional_field("file_system", json_text(&volume, "file_system").as_deref()),
        );
    }

    for record in dedupe_identities(records) {
        out.push(record);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hardware_json() {
        let output = r#"{"SPHardwareDataType": [{
            "_name": "hardware_overview",
            "machine_model": "Mac14,2",
            "chip_type": "Apple M2",
            "boot_rom_version": "10151.41.12",
            "os_loader_version": "10151.41.12",
            "serial_number": "C02XXXXXXX"
        }]}"#;

        let out = parse_hardware_json(output).expect("hardware json");

        assert_eq!(out.records.len(), 1);
        let fw = &out.records[0];
        assert_eq!(fw.identity(), "system-firmware");
        assert_eq!(fw.field("boot_rom_version"), Some("10151.41.12"));
        assert_eq!(fw.field("smc_version"), None);
    }

    #[test]
    fn test_parse_storage_json() {
        let output = r#"{"SPStorageDataType": [
            {"_name": "Macintosh HD", "file_system": "APFS",
             "physical_drive": {"device_name": "APPLE SSD AP0512Z", "medium_type": "ssd", "protocol": "Apple Fabric"}},
            {"file_system": "APFS"}
        ]}"#;

        let out = parse_storage_json(output).expect("storage json");

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].identity(), "storage:Macintosh HD");
        assert_eq!(out.records[0].field("model"), Some("APPLE SSD AP0512Z"));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_missing_section_is_failure() {
        assert!(parse_hardware_json(r#"{"SPOther": []}"#).is_err());
    }
}
