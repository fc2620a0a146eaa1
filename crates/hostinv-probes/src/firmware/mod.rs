//! Firmware and device grammars
//!
//! Identities: `bios`, `baseboard`, `system-firmware`, and
//! `network:<name>`, `storage:<name>`, `gpu:<name>` for devices.

pub mod linux;
pub mod macos;
pub mod windows;

use hostinv_inventory::InventoryRecord;

/// Identity for a device of `kind` named `name`
pub(crate) fn device_identity(kind: &str, name: &str) -> String {
    format!("{kind}:{}", name.trim())
}

/// Give repeated identities a numeric suffix (`baseboard`, `baseboard:2`)
pub(crate) fn dedupe_identities(records: Vec<InventoryRecord>) -> Vec<InventoryRecord> {
    let mut seen: Vec<(String, usize)> = Vec::new();
    records
        .into_iter()
        .map(|record| {
            let identity = record.identity().to_string();
            match seen.iter_mut().find(|(id, _)| *id == identity) {
                Some((_, count)) => {
                    *count += 1;
                    rename(record, format!("{identity}:{count}"))
                }
                None => {
                    seen.push((identity, 1));
                    record
                }
            }
        })
        .collect()
}

fn rename(record: InventoryRecord, identity: String) -> InventoryRecord {
    record
        .fields()
        .iter()
        .fold(InventoryRecord::new(identity, record.source()), |renamed, (k, v)| {
            renamed.with_field(k.as_str(), v)
        })
}
