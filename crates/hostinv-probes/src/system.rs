//! OS and kernel identity grammars
//!
//! Every grammar emits some of the fixed identities `os`, `kernel` and
//! `host`; chains on one platform complement each other through backfill.

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput};

use crate::common::key_value;

/// Parse `/etc/os-release`
///
/// ```text
/// PRETTY_NAME="Ubuntu 22.04.3 LTS"
/// NAME="Ubuntu"
/// VERSION_ID="22.04"
/// ```
pub fn parse_os_release(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    let mut os = InventoryRecord::new("os", "os-release").with_field("family", "linux");
    let mut matched = false;

    for line in output.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = key_value(line, '=') else {
            out.warn(format!("os-release: unexpected line `{line}`"));
            continue;
        };
        let value = value.trim_matches(|c| c == '"' || c == '\'');
        let field = match key {
            "NAME" => "name",
            "VERSION_ID" => "version",
            "PRETTY_NAME" => "pretty_name",
            "ID" => "id",
            "ID_LIKE" => "id_like",
            "VERSION_CODENAME" => "codename",
            "BUILD_ID" => "build",
            _ => continue,
        };
        os = os.with_field(field, value);
        matched = true;
    }

    if matched {
        out.push(os);
    } else if out.warnings.is_empty() {
        out.warn("os-release: no recognised keys");
    }
    Ok(out)
}

/// Parse `uname -snrm`: kernel name, host name, release, machine
pub fn parse_uname(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    let Some(line) = output.lines().map(str::trim).find(|l| !l.is_empty()) else {
        return Ok(out);
    };

    match line.split_whitespace().collect::<Vec<_>>().as_slice() {
        [name, host, release, machine] => {
            out.push(
                InventoryRecord::new("kernel", "uname")
                    .with_field("name", *name)
                    .with_field("release", *release)
                    .with_field("arch", *machine),
            );
            out.push(InventoryRecord::new("host", "uname").with_field("hostname", *host));
        }
        _ => out.warn(format!("uname: unexpected output `{line}`")),
    }

    Ok(out)
}

/// Parse `/proc/version`
///
/// ```text
/// Linux version 6.5.0-14-generic (buildd@lcy02) (gcc ...) #14~22.04.1-Ubuntu SMP PREEMPT_DYNAMIC ...
/// ```
pub fn parse_proc_version(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    let line = output.trim();
    if line.is_empty() {
        return Ok(out);
    }

    let Some(rest) = line.split_once(" version ").map(|(_, rest)| rest) else {
        out.warn(format!("proc/version: unexpected output `{line}`"));
        return Ok(out);
    };
    let release = rest.split_whitespace().next();
    let build = line.find(" #").map(|at| line[at + 1..].trim());

    out.push(
        InventoryRecord::new("kernel", "proc-version")
            .with_optional_field("release", release)
            .with_optional_field("build", build)
            .with_field("details", line),
    );
    Ok(out)
}

/// Parse `sw_vers`
///
/// ```text
/// ProductName:        macOS
/// ProductVersion:     14.2.1
/// BuildVersion:       23C71
/// ```
pub fn parse_sw_vers(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    let mut os = InventoryRecord::new("os", "sw_vers").with_field("family", "macos");

    for (key, value) in output.lines().filter_map(|l| key_value(l, ':')) {
        os = match key {
            "ProductName" => os.with_field("name", value),
            "ProductVersion" => os.with_field("version", value),
            "BuildVersion" => os.with_field("build", value),
            _ => os,
        };
    }

    if os.has_value("name") || os.has_value("version") {
        out.push(os);
    } else if !output.trim().is_empty() {
        out.warn("sw_vers: no product keys");
    }
    Ok(out)
}

/// Parse `systeminfo`
///
/// Only the left-aligned `Key: value` lines are read; indented lines are
/// continuations (hotfix and NIC lists).
pub fn parse_systeminfo(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    let mut os = InventoryRecord::new("os", "systeminfo").with_field("family", "windows");
    let mut kernel = InventoryRecord::new("kernel", "systeminfo");
    let mut host = InventoryRecord::new("host", "systeminfo");

    for line in output.lines().map(|l| l.trim_end_matches('\r')) {
        if line.starts_with(char::is_whitespace) {
            continue;
        }
        let Some((key, value)) = key_value(line, ':') else {
            continue;
        };
        match key {
            "OS Name" => os = os.with_field("name", value),
            "OS Version" => {
                os = os.with_field("version", value);
                let release = value.split_whitespace().next();
                kernel = kernel
                    .with_field("name", "Windows NT")
                    .with_optional_field("release", release);
            }
            "OS Manufacturer" => os = os.with_field("manufacturer", value),
            "Original Install Date" => os = os.with_field("install_date", value),
            "System Type" => kernel = kernel.with_field("arch", value),
            "Host Name" => host = host.with_field("hostname", value),
            "System Boot Time" => host = host.with_field("boot_time", value),
            "System Manufacturer" => host = host.with_field("manufacturer", value),
            "System Model" => host = host.with_field("model", value),
            _ => {}
        }
    }

    if os.has_value("name") || os.has_value("version") {
        out.push(os);
    }
    if kernel.has_value("release") || kernel.has_value("arch") {
        out.push(kernel);
    }
    if host.has_value("hostname") {
        out.push(host);
    }
    if out.records.is_empty() && !output.trim().is_empty() {
        out.warn("systeminfo: no recognised keys");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_os_release() {
        let output = r#"PRETTY_NAME="Ubuntu 22.04.3 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
VERSION_CODENAME=jammy
ID=ubuntu
HOME_URL="https://www.ubuntu.com/"
"#;
        let out = parse_os_release(output).expect("os-release");

        assert_eq!(out.records.len(), 1);
        let os = &out.records[0];
        assert_eq!(os.identity(), "os");
        assert_eq!(os.field("name"), Some("Ubuntu"));
        assert_eq!(os.field("version"), Some("22.04"));
        assert_eq!(os.field("codename"), Some("jammy"));
    }

    #[test]
    fn test_parse_uname() {
        let out = parse_uname("Linux build-01 6.5.0-14-generic x86_64\n").expect("uname");

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].field("release"), Some("6.5.0-14-generic"));
        assert_eq!(out.records[0].field("arch"), Some("x86_64"));
        assert_eq!(out.records[1].field("hostname"), Some("build-01"));

        let bad = parse_uname("Darwin\n").expect("short output");
        assert!(bad.is_unusable());
    }

    #[test]
    fn test_parse_proc_version() {
        let output = "Linux version 6.5.0-14-generic (buildd@lcy02-amd64-110) (gcc 12.3.0) #14~22.04.1-Ubuntu SMP PREEMPT_DYNAMIC Mon Nov 20 18:15:30 UTC 2\n";
        let out = parse_proc_version(output).expect("proc version");

        let kernel = &out.records[0];
        assert_eq!(kernel.field("release"), Some("6.5.0-14-generic"));
        assert!(kernel.field("build").is_some_and(|b| b.starts_with("#14~22.04.1")));
    }

    #[test]
    fn test_parse_sw_vers() {
        let output = "ProductName:\t\tmacOS\nProductVersion:\t\t14.2.1\nBuildVersion:\t\t23C71\n";
        let out = parse_sw_vers(output).expect("sw_vers");

        assert_eq!(out.records[0].field("version"), Some("14.2.1"));
        assert_eq!(out.records[0].field("build"), Some("23C71"));
    }

    #[test]
    fn test_parse_systeminfo() {
        let output = "\r
Host Name:                 DESKTOP-1\r
OS Name:                   Microsoft Windows 11 Pro\r
OS Version:                10.0.22631 N/A Build 22631\r
System Boot Time:          1/15/2024, 9:02:11 AM\r
System Type:               x64-based PC\r
Hotfix(s):                 2 Hotfix(s) Installed.\r
                           [01]: KB5034467\r
";
        let out = parse_systeminfo(output).expect("systeminfo");

        assert_eq!(out.records.len(), 3);
        let by_id = |id: &str| out.records.iter().find(|r| r.identity() == id).expect(id);
        assert_eq!(by_id("os").field("name"), Some("Microsoft Windows 11 Pro"));
        assert_eq!(by_id("kernel").field("release"), Some("10.0.22631"));
        assert_eq!(by_id("kernel").field("arch"), Some("x64-based PC"));
        assert_eq!(by_id("host").field("boot_time"), Some("1/15/2024, 9:02:11 AM"));
    }

    #[test]
    fn test_localised_systeminfo_is_unusable() {
        let out = parse_systeminfo("Hostname:   PC\r\nBetriebssystemname: Windows\r\n").expect("parsed");
        assert!(out.is_unusable());
    }
}
