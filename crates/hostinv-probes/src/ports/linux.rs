//! Linux socket tools: ss and net-tools netstat

use hostinv_inventory::{ParseFailure, ParseOutput};

use super::port_record;
use crate::common::{normalize_protocol, regex, split_endpoint};

/// Parse `ss -tulpn`
///
/// ```text
/// Netid State  Recv-Q Send-Q Local Address:Port Peer Address:Port Process
/// tcp   LISTEN 0      4096   0.0.0.0:22         0.0.0.0:*         users:(("sshd",pid=812,fd=3))
/// ```
pub fn parse_ss(output: &str) -> Result<ParseOutput, ParseFailure> {
    let users = regex(r#"\("([^"]+)",pid=(\d+)"#)?;
    let mut out = ParseOutput::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || parts[0] == "Netid" {
            continue;
        }
        let Some(protocol) = normalize_protocol(parts[0]) else {
            continue;
        };
        if parts.len() < 5 {
            out.warn(format!("ss: truncated row `{}`", line.trim()));
            continue;
        }
        if !matches!(parts[1], "LISTEN" | "UNCONN") {
            continue;
        }
        let Some((address, port)) = split_endpoint(parts[4], ':') else {
            out.warn(format!("ss: bad local address `{}`", parts[4]));
            continue;
        };

        let process_column = parts.get(6..).map(|cols| cols.join(" ")).unwrap_or_default();
        let owner = users.captures(&process_column);
        let process = owner.as_ref().map(|c| c.get(1).map_or("", |m| m.as_str()));
        let pid = owner.as_ref().map(|c| c.get(2).map_or("", |m| m.as_str()));

        out.push(port_record("ss", protocol, port, &address, pid, process));
    }

    Ok(out)
}

/// Parse `netstat -tulpn`
///
/// ```text
/// Proto Recv-Q Send-Q Local Address   Foreign Address State  PID/Program name
/// tcp        0      0 0.0.0.0:22      0.0.0.0:*       LISTEN 812/sshd
/// udp        0      0 0.0.0.0:68      0.0.0.0:*              700/dhclient
/// ```
/// UDP rows have no state column.
pub fn parse_netstat(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(protocol) = parts.first().and_then(|p| normalize_protocol(p)) else {
            continue;
        };
        if parts.len() < 5 {
            out.warn(format!("netstat: truncated row `{}`", line.trim()));
            continue;
        }

        let owner = if protocol == "TCP" {
            if parts.get(5) != Some(&"LISTEN") {
                continue;
            }
            parts.get(6)
        } else {
            match parts.get(5) {
                Some(col) if col.contains('/') || *col == "-" => Some(col),
                Some(_) => continue,
                None => None,
            }
        };

        let Some((address, port)) = split_endpoint(parts[3], ':') else {
            out.warn(format!("netstat: bad local address `{}`", parts[3]));
            continue;
        };
        let (pid, process) = match owner.and_then(|o| o.split_once('/')) {
            Some((pid, process)) => (Some(pid), Some(process)),
            None => (None, None),
        };

        out.push(port_record("netstat", protocol, port, &address, pid, process));
    }

    Ok(out)
}
