//! Text and JSON rendering of collected reports

use std::io::{self, Write};

use hostinv_inventory::{Domain, InventoryRecord, OutcomeKind, Report};
use hostinv_probes::reference;

/// Write reports as pretty JSON; a single report is written bare
///
/// # Errors
/// Returns error if serialization or the write fails
pub fn write_json(out: &mut impl Write, reports: &[Report]) -> eyre::Result<()> {
    match reports {
        [report] => serde_json::to_writer_pretty(&mut *out, report)?,
        _ => serde_json::to_writer_pretty(&mut *out, reports)?,
    }
    writeln!(out)?;
    Ok(())
}

/// Write reports as plain text
///
/// # Errors
/// Returns error if the write fails
pub fn write_text(out: &mut impl Write, reports: &[Report]) -> io::Result<()> {
    for (index, report) in reports.iter().enumerate() {
        if index > 0 {
            writeln!(out)?;
        }
        write_report(out, report)?;
    }
    Ok(())
}

fn write_report(out: &mut impl Write, report: &Report) -> io::Result<()> {
    let result = &report.result;
    writeln!(
        out,
        "== {} ({}) collected {} ==",
        result.domain,
        result.platform,
        result.collected_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;

    if result.is_empty() {
        writeln!(out, "(no records)")?;
    }
    for record in result.records() {
        writeln!(out, "{}", heading(result.domain, record))?;
        for (name, value) in record.fields() {
            writeln!(out, "    {name}: {value}")?;
        }
    }

    writeln!(out)?;
    writeln!(out, "Summary: {} records", report.summary.total)?;
    for (category, count) in &report.summary.by_category {
        writeln!(out, "  {category}: {count}")?;
    }

    let unsuccessful: Vec<_> = result
        .diagnostics()
        .iter()
        .filter(|d| d.outcome_kind != OutcomeKind::Success)
        .collect();
    if !unsuccessful.is_empty() {
        writeln!(out)?;
        writeln!(out, "Diagnostics")?;
        for diagnostic in unsuccessful {
            writeln!(
                out,
                "  {}: {} ({})",
                diagnostic.probe_name, diagnostic.outcome_kind, diagnostic.detail
            )?;
        }
    }
    Ok(())
}

/// Record heading; ports carry their well-known service and a risk flag
fn heading(domain: Domain, record: &InventoryRecord) -> String {
    let mut line = format!("  {}", record.identity());
    if domain != Domain::Ports {
        return line;
    }

    let Some(port) = record.field("port").and_then(|p| p.parse::<u16>().ok()) else {
        return line;
    };
    if let Some(service) = reference::service_name(port) {
        line.push_str(&format!("  [{service}]"));
    }
    if reference::is_risky(port) {
        line.push_str("  [RISKY]");
    }
    line
}
