//! macOS socket tools: lsof and BSD netstat

use hostinv_inventory::{ParseFailure, ParseOutput};

use super::port_record;
use crate::common::{normalize_protocol, split_endpoint};

/// Parse `lsof -i -P -n`
///
/// ```text
/// COMMAND   PID USER FD  TYPE DEVICE             SIZE/OFF NODE NAME
/// rapportd  512 me   4u  IPv4 0x5f1a2b3c4d5e6f70 0t0      TCP  *:49152 (LISTEN)
/// ```
/// Keeps listening TCP sockets and UDP sockets without a peer.
pub fn parse_lsof(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || parts[0] == "COMMAND" {
            continue;
        }
        if parts.len() < 9 {
            out.warn(format!("lsof: truncated row `{}`", line.trim()));
            continue;
        }

        let Some(protocol) = normalize_protocol(parts[7]) else {
            continue;
        };
        let name = parts[8];
        let listening = parts.get(9) == Some(&"(LISTEN)");
        if name.contains("->") || (protocol == "TCP" && !listening) {
            continue;
        }
        let Some((address, port)) = split_endpoint(name, ':') else {
            out.warn(format!("lsof: bad address `{name}`"));
            continue;
        };

        let process = parts[0].replace("\\x20", " ");
        out.push(port_record(
            "lsof",
            protocol,
            port,
            &address,
            Some(parts[1]),
            Some(&process),
        ));
    }

    Ok(out)
}

/// Parse `netstat -an` on macOS, where ports follow the last `.`
///
/// ```text
/// Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)
/// tcp4       0      0  *.22                   *.*                    LISTEN
/// udp4       0      0  *.5353                 *.*
/// ```
pub fn parse_bsd_netstat(output: &str) -> Result<ParseOutput, ParseFailure> {
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

        let listening = if protocol == "TCP" {
            parts.get(5) == Some(&"LISTEN")
        } else {
            parts[4] == "*.*"
        };
        if !listening {
            continue;
        }

        let Some((address, port)) = split_endpoint(parts[3], '.') else {
            out.warn(format!("netstat: bad local address `{}`", parts[3]));
            continue;
        };
        out.push(port_record("netstat", protocol, port, &address, None, None));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lsof() {
        let output = r"COMMAND     PID USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
rapportd    512 me      4u  IPv4 0x5f1a2b3c4d5e6f70      0t0  TCP *:49152 (LISTEN)
Google\x20  900 me     20u  IPv4 0x5f1a2b3c4d5e6f71      0t0  TCP 10.0.0.5:50000->1.2.3.4:443 (ESTABLISHED)
mDNSRespo   300 _mdns   8u  IPv4 0x5f1a2b3c4d5e6f72      0t0  UDP *:5353
postgres    777 me      7u  IPv6 0x5f1a2b3c4d5e6f73      0t0  TCP [::1]:5432 (LISTEN)";

        let out = parse_lsof(output).expect("lsof output");

        assert_eq!(out.records.len(), 3);
        assert_eq!(out.records[0].identity(), "TCP:49152");
        assert_eq!(out.records[0].field("process"), Some("rapportd"));
        assert_eq!(out.records[0].field("pid"), Some("512"));
        assert_eq!(out.records[1].identity(), "UDP:5353");
        assert_eq!(out.records[2].field("address"), Some("::1"));
    }

    #[test]
    fn test_parse_bsd_netstat() {
        let output = r"Active Internet connections (including servers)
Proto Recv-Q Send-Q  Local Address          Foreign Address        (state)
tcp4       0      0  10.0.0.5.50000         1.2.3.4.443            ESTABLISHED
tcp46      0      0  *.5000                 *.*                    LISTEN
tcp4       0      0  127.0.0.1.631          *.*                    LISTEN
udp4       0      0  *.5353                 *.*
udp4       0      0  10.0.0.5.123           17.253.4.125.123
Active LOCAL (UNIX) domain sockets
Address          Type   Recv-Q Send-Q    Inode     Conn     Refs  Nextref Addr";

        let out = parse_bsd_netstat(output).expect("netstat output");

        assert_eq!(out.records.len(), 3);
        assert_eq!(out.records[0].identity(), "TCP:5000");
        assert_eq!(out.records[1].field("address"), Some("127.0.0.1"));
        assert_eq!(out.records[2].identity(), "UDP:5353");
    }
}
