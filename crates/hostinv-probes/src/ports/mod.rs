//! Listening socket grammars
//!
//! Records are keyed `PROTO:port` with `protocol`, `port`, `address` and
//! `state` always present; `pid` and `process` only when the tool shows
//! them.

pub mod linux;
pub mod macos;
pub mod windows;

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput, is_unset};

/// Normalised state for listening TCP and unconnected UDP sockets
pub const LISTENING: &str = "LISTENING";

/// Build a port record
pub(crate) fn port_record(
    source: &str,
    protocol: &str,
    port: u16,
    address: &str,
    pid: Option<&str>,
    process: Option<&str>,
) -> InventoryRecord {
    let pid = pid.filter(|p| !is_unset(p) && *p != "0");
    InventoryRecord::new(format!("{protocol}:{port}"), source)
        .with_field("protocol", protocol)
        .with_field("port", port.to_string())
        .with_field("address", address)
        .with_field("state", LISTENING)
        .with_optional_field("pid", pid)
        .with_optional_field("process", process)
}

/// Parse `ps -p <pid> -o comm=`
///
/// macOS prints the executable path; only the file name is kept.
pub fn parse_ps_comm(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    if let Some(line) = output.lines().map(str::trim).find(|l| !l.is_empty()) {
        let name = line.rsplit('/').next().unwrap_or(line);
        out.push(InventoryRecord::new(name, "ps").with_field("process", name));
    }

    Ok(out)
}
