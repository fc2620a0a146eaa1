//! Linux firmware readers: dmidecode, lspci, lsblk

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput};

use super::{dedupe_identities, device_identity};
use crate::common::key_value;

/// One `Handle` section of dmidecode output
#[derive(Debug, Default)]
struct DmiBlock {
    title: String,
    fields: Vec<(String, String)>,
}

/// Split dmidecode output into blocks
///
/// A block starts at a `Handle` line, at a section title following a block
/// that already has one, or when a first-level key repeats. Key lines seen
/// before any `Handle` open an implicit block, so handle-less dumps still
/// parse. List items under keys such as `Characteristics:` are deeper
/// indented and skipped.
fn dmi_blocks(output: &str) -> Vec<DmiBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<DmiBlock> = None;

    for line in output.lines() {
        if line.starts_with("Handle ") {
            blocks.extend(current.replace(DmiBlock::default()));
            continue;
        }
        if line.trim().is_empty() || line.starts_with('#') || line.starts_with("\t\t") {
            continue;
        }

        let indented = line.starts_with(char::is_whitespace);
        if !indented && !line.contains(':') {
            match current.as_mut() {
                Some(block) if block.title.is_empty() => block.title = line.trim().to_string(),
                _ => {
                    let block = DmiBlock {
                        title: line.trim().to_string(),
                        fields: Vec::new(),
                    };
                    blocks.extend(current.replace(block));
                }
            }
            continue;
        }

        let Some((key, value)) = key_value(line, ':') else {
            continue;
        };
        let block = current.get_or_insert_with(DmiBlock::default);
        if block.fields.iter().any(|(k, _)| k == key) {
            let next = DmiBlock {
                title: block.title.clone(),
                fields: Vec::new(),
            };
            blocks.extend(current.replace(next));
        }
        if let Some(block) = current.as_mut() {
            block.fields.push((key.to_string(), value.to_string()));
        }
    }
    blocks.extend(current);

    blocks
}

fn dmi_records(
    output: &str,
    title: &str,
    identity: &str,
    mapping: &[(&str, &str)],
) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    let blocks = dmi_blocks(output);

    let mut records = Vec::new();
    // untitled blocks come from dumps with the section headings stripped
    let mapped = |b: &DmiBlock| b.fields.iter().any(|(k, _)| mapping.iter().any(|(m, _)| m == k));
    for block in blocks
        .iter()
        .filter(|b| b.title == title || (b.title.is_empty() && mapped(b)))
    {
        let record = mapping.iter().fold(
            InventoryRecord::new(identity, "dmidecode"),
            |record, (key, field)| {
                let value = block.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());
                record.with_optional_field(*field, value)
            },
        );
        records.push(record);
    }

    if records.is_empty() && !output.trim().is_empty() {
        let reason = output
            .lines()
            .find(|l| l.starts_with("# No SMBIOS") || l.contains("Permission denied"))
            .unwrap_or("no matching DMI structure");
        out.warn(format!("dmidecode: {}", reason.trim_start_matches("# ")));
    }
    for record in dedupe_identities(records) {
        out.push(record);
    }
    Ok(out)
}

/// Parse `dmidecode -t bios`
pub fn parse_dmidecode_bios(output: &str) -> Result<ParseOutput, ParseFailure> {
    dmi_records(
        output,
        "BIOS Information",
        "bios",
        &[
            ("Vendor", "manufacturer"),
            ("Version", "version"),
            ("Release Date", "release_date"),
            ("BIOS Revision", "bios_revision"),
            ("Firmware Revision", "firmware_revision"),
        ],
    )
}

/// Parse `dmidecode -t baseboard`
pub fn parse_dmidecode_baseboard(output: &str) -> Result<ParseOutput, ParseFailure> {
    dmi_records(
        output,
        "Base Board Information",
        "baseboard",
        &[
            ("Manufacturer", "manufacturer"),
            ("Product Name", "product"),
            ("Version", "version"),
            ("Serial Number", "serial_number"),
        ],
    )
}

/// Parse `lspci -v`, keeping network, display and storage controllers
///
/// ```text
/// 00:1f.6 Ethernet controller: Intel Corporation Ethernet Connection (7) I219-LM (rev 10)
///         Subsystem: Lenovo Device 2292
///         Kernel driver in use: e1000e
/// ```
pub fn parse_lspci(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    let mut records = Vec::new();
    let mut current: Option<InventoryRecord> = None;

    for line in output.lines() {
        if line.trim().is_empty() {
            if let Some(record) = current.take() {
                records.push(record);
            }
            continue;
        }

        if !line.starts_with(char::is_whitespace) {
            if let Some(record) = current.take() {
                records.push(record);
            }
            let Some((slot, rest)) = line.split_once(' ') else {
                out.warn(format!("lspci: unexpected heading `{line}`"));
                continue;
            };
            let Some((class, description)) = rest.split_once(": ") else {
                out.warn(format!("lspci: unexpected heading `{line}`"));
                continue;
            };
            let Some(kind) = device_kind(class) else {
                continue;
            };

            let (description, revision) = match description.split_once(" (rev ") {
                Some((desc, rest)) => (desc, rest.split(')').next()),
                None => (description, None),
            };
            current = Some(
                InventoryRecord::new(device_identity(kind, description), "lspci")
                    .with_field("slot", slot)
                    .with_field("class", class)
                    .with_optional_field("revision", revision),
            );
            continue;
        }

        if let Some(record) = current.take() {
            let record = match key_value(line, ':') {
                Some(("Kernel driver in use", driver)) => record.with_field("driver", driver),
                Some(("Kernel modules", modules)) => record.with_field("kernel_modules", modules),
                Some(("Subsystem", subsystem)) => record.with_field("subsystem", subsystem),
                _ => record,
            };
            current = Some(record);
        }
    }
    if let Some(record) = current {
        records.push(record);
    }

    for record in dedupe_identities(records) {
        out.push(record);
    }
    Ok(out)
}

fn device_kind(class: &str) -> Option<&'static str> {
    match class {
        "Ethernet controller" | "Network controller" => Some("network"),
        "VGA compatible controller" | "3D controller" | "Display controller" => Some("gpu"),
        "Non-Volatile memory controller" | "SATA controller" | "RAID bus controller"
        | "SCSI storage controller" => Some("storage"),
        _ => None,
    }
}

/// Parse `lsblk -d -n -P -o NAME,MODEL,SERIAL,REV`
///
/// ```text
/// NAME="nvme0n1" MODEL="Samsung SSD 980 1TB" SERIAL="S64ANS0T" REV="2B4QFXO7"
/// ```
pub fn parse_lsblk_pairs(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let pairs = quoted_pairs(line);
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .filter(|v| !v.trim().is_empty())
        };

        let Some(device) = get("NAME") else {
            out.warn(format!("lsblk: row without NAME `{line}`"));
            continue;
        };
        if device.starts_with("loop") || device.starts_with("ram") || device.starts_with("zram") {
            continue;
        }

        let name = get("MODEL").unwrap_or(device);
        out.push(
            InventoryRecord::new(device_identity("storage", name), "lsblk")
                .with_field("device", device)
                .with_optional_field("model", get("MODEL"))
                .with_optional_field("serial_number", get("SERIAL"))
                .with_optional_field("firmware_revision", get("REV")),
        );
    }

    Ok(out)
}

/// `KEY="value"` pairs as printed by `lsblk -P`
fn quoted_pairs(line: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut rest = line;

    while let Some((key, after)) = rest.split_once("=\"") {
        let Some((value, tail)) = after.split_once('"') else {
            break;
        };
        pairs.push((key.trim().to_string(), value.to_string()));
        rest = tail;
    }

    pairs
}
