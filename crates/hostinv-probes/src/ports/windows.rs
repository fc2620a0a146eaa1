//! Windows socket tools: netstat, Get-NetTCPConnection, tasklist

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput};

use super::port_record;
use crate::common::{csv_fields, json_objects, json_text, normalize_protocol, split_endpoint};

/// Parse `netstat -ano`
///
/// ```text
///   Proto  Local Address          Foreign Address        State           PID
///   TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       1000
///   UDP    0.0.0.0:500            *:*                                    4000
/// ```
pub fn parse_netstat_ano(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(protocol) = parts.first().and_then(|p| normalize_protocol(p)) else {
            continue;
        };

        let pid = match (protocol, parts.as_slice()) {
            ("TCP", [_, _, _, "LISTENING", pid]) => *pid,
            ("TCP", [_, _, _, _, _]) => continue,
            ("UDP", [_, _, "*:*", pid]) => *pid,
            ("UDP", [_, _, _, _]) => continue,
            _ => {
                out.warn(format!("netstat: unexpected row `{}`", line.trim()));
                continue;
            }
        };

        let Some((address, port)) = split_endpoint(parts[1], ':') else {
            out.warn(format!("netstat: bad local address `{}`", parts[1]));
            continue;
        };
        out.push(port_record("netstat", protocol, port, &address, Some(pid), None));
    }

    Ok(out)
}

/// Parse `Get-NetTCPConnection -State Listen | Select-Object LocalAddress,
/// LocalPort, OwningProcess | ConvertTo-Json`
pub fn parse_tcp_connection_json(output: &str) -> Result<ParseOutput, ParseFailure> {
    let (objects, skipped) = json_objects(output)?;
    let mut out = ParseOutput::new();
    if skipped > 0 {
        out.warn(format!("Get-NetTCPConnection: {skipped} non-object entries ignored"));
    }

    for object in &objects {
        let Some(port) = json_text(object, "LocalPort").and_then(|p| p.parse::<u16>().ok()) else {
            out.warn("Get-NetTCPConnection: entry without a valid LocalPort");
            continue;
        };
        let address = json_text(object, "LocalAddress").unwrap_or_else(|| "0.0.0.0".to_string());
        let pid = json_text(object, "OwningProcess");

        out.push(port_record(
            "powershell",
            "TCP",
            port,
            &address,
            pid.as_deref(),
            None,
        ));
    }

    Ok(out)
}

/// Parse `tasklist /FO CSV /NH` into `pid -> process` records
///
/// ```text
/// "svchost.exe","900","Services","0","12,345 K"
/// ```
pub fn parse_tasklist_csv(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        // "INFO: No tasks are running which match the specified criteria."
        if line.starts_with("INFO:") {
            continue;
        }
        let fields = csv_fields(line);
        match fields.as_slice() {
            [image, pid, ..] if pid.parse::<u32>().is_ok() => {
                out.push(InventoryRecord::new(pid.as_str(), "tasklist").with_field("process", image));
            }
            _ => out.warn(format!("tasklist: unexpected row `{line}`")),
        }
    }

    Ok(out)
}
