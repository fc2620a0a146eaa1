//! Well-known port table used to annotate port reports

/// Conventional service on `port`, if it is a common one
#[must_use]
pub fn service_name(port: u16) -> Option<&'static str> {
    let name = match port {
        21 => "FTP",
        22 => "SSH",
        23 => "Telnet",
        25 => "SMTP",
        53 => "DNS",
        80 => "HTTP",
        110 => "POP3",
        143 => "IMAP",
        443 => "HTTPS",
        993 => "IMAPS",
        995 => "POP3S",
        1433 => "MSSQL",
        3306 => "MySQL",
        3389 => "RDP",
        5432 => "PostgreSQL",
        5900 => "VNC",
        6379 => "Redis",
        8080 => "HTTP-Alt",
        8443 => "HTTPS-Alt",
        27017 => "MongoDB",
        _ => return None,
    };
    Some(name)
}

/// Services that are cleartext or commonly attacked when exposed
#[must_use]
pub fn is_risky(port: u16) -> bool {
    matches!(port, 21 | 23 | 1433 | 3389 | 5900)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name() {
        assert_eq!(service_name(22), Some("SSH"));
        assert_eq!(service_name(27017), Some("MongoDB"));
        assert_eq!(service_name(40000), None);
    }

    #[test]
    fn test_is_risky() {
        assert!(is_risky(23));
        assert!(is_risky(3389));
        assert!(!is_risky(22));
        assert!(!is_risky(443));
    }
}
