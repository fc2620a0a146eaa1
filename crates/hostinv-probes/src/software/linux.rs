//! Linux package managers: dpkg, rpm, pacman, apk, zypper, portage, snap, flatpak

use hostinv_inventory::{InventoryRecord, ParseFailure, ParseOutput};

use crate::common::regex;

/// Parse `dpkg -l`
///
/// Only rows whose status marks the package installed (`ii`, `hi`) are
/// kept. A `:arch` qualifier on the name moves into the `arch` field.
pub fn parse_dpkg(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(status) = parts.first() else {
            continue;
        };
        // Skip header lines and removed packages
        if !matches!(*status, "ii" | "hi") {
            continue;
        }
        if parts.len() < 3 {
            out.warn(format!("dpkg: truncated row `{}`", line.trim()));
            continue;
        }

        let (name, qualifier) = match parts[1].split_once(':') {
            Some((name, arch)) => (name, Some(arch)),
            None => (parts[1], None),
        };
        let arch = parts.get(3).copied().or(qualifier);

        out.push(
            InventoryRecord::new(name, "dpkg")
                .with_field("version", parts[2])
                .with_optional_field("arch", arch),
        );
    }

    Ok(out)
}

/// Parse `rpm -qa` (`name-version-release.arch`)
pub fn parse_rpm(output: &str) -> Result<ParseOutput, ParseFailure> {
    let pattern = regex(r"^(.+)-([^-]+)-([^-]+?)(?:\.([A-Za-z0-9_]+))?$")?;
    let mut out = ParseOutput::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = pattern.captures(line) else {
            out.warn(format!("rpm: unexpected line `{line}`"));
            continue;
        };
        let version = format!("{}-{}", &caps[2], &caps[3]);
        out.push(
            InventoryRecord::new(&caps[1], "rpm")
                .with_field("version", version)
                .with_optional_field("arch", caps.get(4).map(|m| m.as_str())),
        );
    }

    Ok(out)
}

/// Parse `pacman -Q` (`name version`)
pub fn parse_pacman(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.split_once(' ') {
            Some((name, version)) => {
                out.push(InventoryRecord::new(name, "pacman").with_field("version", version));
            }
            None => out.warn(format!("pacman: unexpected line `{line}`")),
        }
    }

    Ok(out)
}

/// Parse `apk list --installed`
///
/// ```text
/// musl-1.2.4-r2 x86_64 {musl} (MIT) [installed]
/// ```
pub fn parse_apk(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines().map(str::trim) {
        if line.is_empty() || line.starts_with("WARNING") {
            continue;
        }

        let mut parts = line.split_whitespace();
        let Some(package) = parts.next() else {
            continue;
        };
        let arch = parts.next();
        let origin = line
            .split_once('{')
            .and_then(|(_, rest)| rest.split_once('}'))
            .map(|(origin, _)| origin);

        let segments: Vec<&str> = package.split('-').collect();
        if segments.len() < 3 {
            out.warn(format!("apk: unexpected package `{package}`"));
            continue;
        }
        let split = segments.len() - 2;
        let name = segments[..split].join("-");
        let version = segments[split..].join("-");

        out.push(
            InventoryRecord::new(name, "apk")
                .with_field("version", version)
                .with_optional_field("arch", arch)
                .with_optional_field("origin", origin),
        );
    }

    Ok(out)
}

/// Parse `zypper se --installed-only -s`
///
/// Columns are located from the header row, which varies between zypper
/// releases.
pub fn parse_zypper(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    let mut columns: Option<(usize, usize, Option<usize>, Option<usize>)> = None;

    for line in output.lines() {
        if !line.contains('|') || line.trim_start().starts_with("--") {
            continue;
        }
        let cells: Vec<&str> = line.split('|').map(str::trim).collect();

        let Some((name_col, version_col, type_col, arch_col)) = columns else {
            let find = |title: &str| cells.iter().position(|c| c.eq_ignore_ascii_case(title));
            if let (Some(name), Some(version)) = (find("Name"), find("Version")) {
                columns = Some((name, version, find("Type"), find("Arch")));
            }
            continue;
        };

        let (Some(name), Some(version)) = (cells.get(name_col), cells.get(version_col)) else {
            out.warn(format!("zypper: short row `{}`", line.trim()));
            continue;
        };
        if let Some(kind) = type_col.and_then(|i| cells.get(i))
            && *kind != "package"
        {
            continue;
        }
        if name.is_empty() {
            continue;
        }

        out.push(
            InventoryRecord::new(*name, "zypper")
                .with_field("version", version)
                .with_optional_field("arch", arch_col.and_then(|i| cells.get(i)).copied()),
        );
    }

    if columns.is_none() && !output.trim().is_empty() && !output.contains("No matching items") {
        return Err(ParseFailure::new("zypper: no table header found"));
    }

    Ok(out)
}

/// Parse `qlist -Iv` (`category/package-version`)
pub fn parse_portage(output: &str) -> Result<ParseOutput, ParseFailure> {
    let pattern = regex(r"^([^/\s]+)/(\S+)-(\d+(?:\.\d+)*[a-z]?(?:_[a-z]+\d*)*(?:-r\d+)?)$")?;
    let mut out = ParseOutput::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let Some(caps) = pattern.captures(line) else {
            out.warn(format!("qlist: unexpected atom `{line}`"));
            continue;
        };
        out.push(
            InventoryRecord::new(format!("{}/{}", &caps[1], &caps[2]), "portage")
                .with_field("version", &caps[3])
                .with_field("category", &caps[1]),
        );
    }

    Ok(out)
}

/// Parse `snap list`
///
/// ```text
/// Name    Version   Rev    Tracking       Publisher   Notes
/// core22  20230801  864    latest/stable  canonical✓  base
/// ```
pub fn parse_snap(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() || parts[0] == "Name" {
            continue;
        }
        if parts.len() < 2 {
            out.warn(format!("snap: unexpected line `{}`", line.trim()));
            continue;
        }

        let publisher = parts
            .get(4)
            .map(|p| p.trim_end_matches(['✓', '*', '✪']));
        out.push(
            InventoryRecord::new(parts[0], "snap")
                .with_field("version", parts[1])
                .with_optional_field("revision", parts.get(2).copied())
                .with_optional_field("channel", parts.get(3).copied())
                .with_optional_field("publisher", publisher),
        );
    }

    Ok(out)
}

/// Parse `flatpak list --app --columns=name,version` (tab separated)
pub fn parse_flatpak(output: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let Some((name, version)) = line.split_once('\t') else {
            out.warn(format!("flatpak: expected tab-separated columns in `{}`", line.trim()));
            continue;
        };
        let name = name.trim();
        if name.is_empty() || name == "Name" {
            continue;
        }
        out.push(InventoryRecord::new(name, "flatpak").with_field("version", version));
    }

    Ok(out)
}
