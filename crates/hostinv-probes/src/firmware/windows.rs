//! Windows firmware via WMI classes serialised with `ConvertTo-Json`

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput};

use super::{dedupe_identities, device_identity};
use crate::common::{json_objects, json_text};

/// Map WMI objects to records
///
/// `identity` is either fixed (`bios`) or, when `name_key` is set, a
/// device identity built from that property.
fn wmi_records(
    output: &str,
    class: &str,
    identity: &str,
    name_key: Option<&str>,
    mapping: &[(&str, &str)],
) -> Result<ParseOutput, ParseFailure> {
    let (objects, skipped) = json_objects(output)?;
    let mut out = ParseOutput::new();
    if skipped > 0 {
        out.warn(format!("{class}: {skipped} non-object entries ignored"));
    }

    let mut records = Vec::new();
    for object in &objects {
        let id = match name_key {
            Some(key) => match json_text(object, key) {
                Some(name) => device_identity(identity, &name),
                None => {
                    out.warn(format!("{class}: entry without {key}"));
                    continue;
                }
            },
            None => identity.to_string(),
        };

        let record = mapping.iter().fold(InventoryRecord::new(id, "wmi"), |record, (key, field)| {
            record.with_optional_field(*field, json_text(object, key).as_deref())
        });
        records.push(record);
    }

    for record in dedupe_identities(records) {
        out.push(record);
    }
    Ok(out)
}

/// Parse `Win32_BIOS`
pub fn parse_bios_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    wmi_records(
        output,
        "Win32_BIOS",
        "bios",
        None,
        &[
            ("Manufacturer", "manufacturer"),
            ("Name", "name"),
            ("SMBIOSBIOSVersion", "version"),
            ("Version", "revision"),
            ("ReleaseDate", "release_date"),
            ("SerialNumber", "serial_number"),
        ],
    )
}

/// Parse `Win32_BaseBoard`
pub fn parse_baseboard_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    wmi_records(
        output,
        "Win32_BaseBoard",
        "baseboard",
        None,
        &[
            ("Manufacturer", "manufacturer"),
            ("Product", "product"),
            ("Version", "version"),
            ("SerialNumber", "serial_number"),
        ],
    )
}

/// Parse physical `Win32_NetworkAdapter` entries
pub fn parse_network_adapter_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    wmi_records(
        output,
        "Win32_NetworkAdapter",
        "network",
        Some("Name"),
        &[
            ("Manufacturer", "manufacturer"),
            ("Description", "description"),
            ("DriverVersion", "driver_version"),
        ],
    )
}

/// Parse `Win32_DiskDrive`
pub fn parse_disk_drive_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    wmi_records(
        output,
        "Win32_DiskDrive",
        "storage",
        Some("Model"),
        &[
            ("Manufacturer", "manufacturer"),
            ("FirmwareRevision", "firmware_revision"),
            ("SerialNumber", "serial_number"),
            ("InterfaceType", "interface"),
        ],
    )
}

/// Parse `Win32_VideoController`
pub fn parse_video_controller_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    wmi_records(
        output,
        "Win32_VideoController",
        "gpu",
        Some("Name"),
        &[
            ("DriverVersion", "driver_version"),
            ("DriverDate", "driver_date"),
            ("VideoProcessor", "video_processor"),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bios_single_object() {
        let output = r#"{
    "Manufacturer":  "LENOVO",
    "Name":  "N2IET98W (1.76 )",
    "SMBIOSBIOSVersion":  "N2IET98W (1.76 )",
    "Version":  "LENOVO - 1760",
    "ReleaseDate":  "20220811000000.000000+000",
    "SerialNumber":  "PF1ABCDE"
}"#;

        let out = parse_bios_json(output).expect("bios json");

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].identity(), "bios");
        assert_eq!(out.records[0].field("serial_number"), Some("PF1ABCDE"));
    }

    #[test]
    fn test_parse_disk_drives_array() {
        let output = r#"[
    {"Model": "Samsung SSD 980 1TB", "Manufacturer": "(Standard disk drives)", "FirmwareRevision": "2B4QFXO7", "SerialNumber": "0025_3852", "InterfaceType": "SCSI"},
    {"Model": "Samsung SSD 980 1TB", "FirmwareRevision": "2B4QFXO7"},
    {"Manufacturer": "nobody"}
]"#;

        let out = parse_disk_drive_json(output).expect("disk json");

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].identity(), "storage:Samsung SSD 980 1TB");
        assert_eq!(out.records[1].identity(), "storage:Samsung SSD 980 1TB:2");
        assert_eq!(out.records[0].field("interface"), Some("SCSI"));
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_parse_video_controller_empty_output() {
        let out = parse_video_controller_json("").expect("empty output");
        assert!(out.records.is_empty());
        assert!(out.warnings.is_empty());
    }
}
