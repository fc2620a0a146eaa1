//! macOS software: application bundles, Homebrew, MacPorts, App Store

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput};
use indexmap::IndexMap;

use crate::common::{regex, xml_unescape};

/// Parse `system_profiler SPApplicationsDataType -xml`
///
/// Walks the `<key>` / `<string>` pairs of the plist; every `_name` key
/// starts a new application.
pub fn parse_applications_plist(output: &str) -> Result<ParseOutput, ParseFailure> {
    if output.trim().is_empty() {
        return Ok(ParseOutput::new());
    }
    if !output.contains("<plist") {
        return Err(ParseFailure::new("system_profiler: output is not a plist"));
    }

    let pair = regex(r"<key>([^<]*)</key>\s*<string>([^<]*)</string>")?;
    let mut out = ParseOutput::new();
    let mut current: Option<InventoryRecord> = None;

    for caps in pair.captures_iter(output) {
        let value = xml_unescape(&caps[2]);
        match &caps[1] {
            "_name" => {
                if let Some(app) = current.take() {
                    out.push(app);
                }
                current = Some(InventoryRecord::new(value, "system_profiler").with_field("version", ""));
            }
            key @ ("version" | "obtained_from" | "path") => {
                if let Some(app) = current.take() {
                    current = Some(app.with_field(key, value));
                }
            }
            _ => {}
        }
    }
    if let Some(app) = current {
        out.push(app);
    }

    Ok(out)
}

/// Parse `brew list --versions`
///
/// Kegs with several installed versions list all of them.
pub fn parse_brew(output: &str) -> Result<ParseOutput, ParseFailure> {
    brew_listing(output, "brew", false)
}

/// Parse `brew list --cask --versions`; casks may omit the version
pub fn parse_brew_cask(output: &str) -> Result<ParseOutput, ParseFailure> {
    brew_listing(output, "brew-cask", true)
}

fn brew_listing(output: &str, source: &str, version_optional: bool) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.split_once(' ') {
            Some((name, versions)) => {
                out.push(InventoryRecord::new(name, source).with_field("version", versions.trim()));
            }
            None if version_optional => {
                out.push(InventoryRecord::new(line, source).with_field("version", ""));
            }
            None => out.warn(format!("{source}: missing version in `{line}`")),
        }
    }

    Ok(out)
}

/// Parse `port installed`
///
/// ```text
/// The following ports are currently installed:
///   curl @8.4.0_0+ssl (active)
/// ```
/// When several versions of a port are installed the active one is kept.
pub fn parse_macports(output: &str) -> Result<ParseOutput, ParseFailure> {
    let pattern = regex(r"^(\S+)\s+@([^\s+]+)(\S*)(\s+\(active\))?")?;
    let mut out = ParseOutput::new();
    let mut ports: IndexMap<String, (InventoryRecord, bool)> = IndexMap::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("The following ports") || line.starts_with("None of the specified") {
            continue;
        }
        let Some(caps) = pattern.captures(line) else {
            out.warn(format!("port: unexpected line `{line}`"));
            continue;
        };

        let active = caps.get(4).is_some();
        let record = InventoryRecord::new(&caps[1], "macports")
            .with_field("version", &caps[2])
            .with_optional_field("variants", Some(caps[3].trim_start_matches('+')).filter(|v| !v.is_empty()))
            .with_field("active", if active { "yes" } else { "no" });

        match ports.get(&caps[1]) {
            Some((_, true)) => {}
            Some((_, false)) if !active => {}
            _ => {
                ports.insert(caps[1].to_string(), (record, active));
            }
        }
    }

    for (record, _) in ports.into_values() {
        out.push(record);
    }
    Ok(out)
}

/// Parse `mas list` (`id  name  (version)`)
pub fn parse_mas(output: &str) -> Result<ParseOutput, ParseFailure> {
    let pattern = regex(r"^(\d+)\s+(.+?)\s+\(([^)]+)\)$")?;
    let mut out = ParseOutput::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = pattern.captures(line) else {
            out.warn(format!("mas: unexpected line `{line}`"));
            continue;
        };
        out.push(
            InventoryRecord::new(&caps[2], "mas")
                .with_field("version", &caps[3])
                .with_field("app_id", &caps[1]),
        );
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_applications_plist() {
        let output = r#"<?xml version="1.0" encoding="UTF-8"?>
<plist version="1.0">
<array><dict><key>_items</key><array>
  <dict>
    <key>_name</key>
    <string>Safari</string>
    <key>obtained_from</key>
    <string>apple</string>
    <key>version</key>
    <string>17.1</string>
  </dict>
  <dict>
    <key>_name</key>
    <string>Tom &amp; Jerry</string>
  </dict>
</array></dict></array>
</plist>"#;

        let out = parse_applications_plist(output).expect("plist");

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].identity(), "Safari");
        assert_eq!(out.records[0].field("version"), Some("17.1"));
        assert_eq!(out.records[0].field("obtained_from"), Some("apple"));
        assert_eq!(out.records[1].identity(), "Tom & Jerry");
        assert!(!out.records[1].has_value("version"));
    }

    #[test]
    fn test_parse_applications_rejects_non_plist() {
        assert!(parse_applications_plist("Applications:\n  Safari: 17.1").is_err());
    }

    #[test]
    fn test_parse_brew() {
        let out = parse_brew("git 2.42.0\nopenssl@3 3.1.3 3.1.4\n").expect("brew");
        assert_eq!(out.records[1].identity(), "openssl@3");
        assert_eq!(out.records[1].field("version"), Some("3.1.3 3.1.4"));

        let casks = parse_brew_cask("firefox 119.0\nsomecask\n").expect("casks");
        assert_eq!(casks.records.len(), 2);
        assert!(!casks.records[1].has_value("version"));
    }

    #[test]
    fn test_parse_macports_prefers_active() {
        let output = "The following ports are currently installed:\n  curl @8.3.0_0+ssl\n  curl @8.4.0_0+ssl (active)\n  zlib @1.3_0 (active)\n";

        let out = parse_macports(output).expect("port output");

        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].field("version"), Some("8.4.0_0"));
        assert_eq!(out.records[0].field("variants"), Some("ssl"));
        assert_eq!(out.records[1].field("active"), Some("yes"));
    }

    #[test]
    fn test_parse_mas() {
        let out = parse_mas("497799835  Xcode  (15.0.1)\n409183694  Keynote (13.2)\n").expect("mas");
        assert_eq!(out.records[0].identity(), "Xcode");
        assert_eq!(out.records[0].field("app_id"), Some("497799835"));
        assert_eq!(out.records[1].field("version"), Some("13.2"));
    }
}
