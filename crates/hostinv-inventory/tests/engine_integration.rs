use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use hostinv_exec::{Invocation, ProbeOutcome, ProbeRunner, RawOutput};
use hostinv_inventory::*;

// Mock runner: answers by rendered command line, anything unscripted is absent
#[derive(Default)]
struct ScriptedRunner {
    script: HashMap<String, (ProbeOutcome, Duration)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    fn output(mut self, command: &str, stdout: &str) -> Self {
        self.script.insert(
            command.to_string(),
            (ProbeOutcome::Success(RawOutput::from(stdout)), Duration::ZERO),
        );
        self
    }

    fn delayed(mut self, command: &str, stdout: &str, delay: Duration) -> Self {
        self.script.insert(
            command.to_string(),
            (ProbeOutcome::Success(RawOutput::from(stdout)), delay),
        );
        self
    }

    fn outcome(mut self, command: &str, outcome: ProbeOutcome) -> Self {
        self.script.insert(command.to_string(), (outcome, Duration::ZERO));
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }
}

#[async_trait]
impl ProbeRunner for ScriptedRunner {
    async fn run(&self, _name: &str, invocation: &Invocation, timeout: Duration) -> ProbeOutcome {
        let command = invocation.to_string();
        self.calls.lock().expect("calls lock").push(command.clone());

        let Some((outcome, delay)) = self.script.get(&command).cloned() else {
            return ProbeOutcome::ToolAbsent;
        };
        if delay > timeout {
            tokio::time::sleep(timeout).await;
            return ProbeOutcome::TimedOut { timeout };
        }
        tokio::time::sleep(delay).await;
        outcome
    }

    fn runner_type(&self) -> &'static str {
        "scripted"
    }
}

// "name version [vendor]" per line
fn packages(raw: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        match cols.as_slice() {
            [name, version] => out.push(InventoryRecord::new(*name, "pkg").with_field("version", *version)),
            [name, version, vendor] => out.push(
                InventoryRecord::new(*name, "pkg")
                    .with_field("version", *version)
                    .with_field("vendor", *vendor),
            ),
            _ => out.warn(format!("unexpected line: {line}")),
        }
    }
    Ok(out)
}

// "PROTO port [pid]" per line
fn sockets(raw: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    for line in raw.lines().filter(|l| !l.trim().is_empty()) {
        let cols: Vec<&str> = line.split_whitespace().collect();
        let record = InventoryRecord::new(format!("{}:{}", cols[0], cols[1]), "sock")
            .with_field("protocol", cols[0])
            .with_field("port", cols[1])
            .with_optional_field("pid", cols.get(2).copied());
        out.push(record);
    }
    Ok(out)
}

fn process_names(raw: &str) -> Result<ParseOutput, ParseFailure> {
    let mut out = ParseOutput::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.split_once(',') {
            Some((name, pid)) => out.push(InventoryRecord::new(pid, "tasklist").with_field("process", name)),
            None => out.push(InventoryRecord::new(line, "ps").with_field("process", line)),
        }
    }
    Ok(out)
}

fn probe(name: &'static str, program: &str, parser: Parser) -> ProbeSpec {
    ProbeSpec::new(name, Platform::Linux, Invocation::new(program, &["list"]), parser)
}

fn software_chain(order: &[(&'static str, &str)]) -> ProbeChain {
    order.iter().fold(
        ProbeChain::new(Domain::Software, Platform::Linux, ChainPolicy::RunAll),
        |chain, (name, program)| chain.with_probe(probe(name, program, packages)),
    )
}

fn snapshot(result: &InventoryResult) -> Vec<(String, Vec<(String, String)>)> {
    result
        .records()
        .map(|r| {
            let fields = r.fields().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
            (r.identity().to_string(), fields)
        })
        .collect()
}

#[tokio::test]
async fn test_first_writer_wins_with_backfill() {
    let runner = ScriptedRunner::default()
        .output("dpkg list", "curl 7.81.0 N/A\nbash 5.1\n")
        .output("snap list", "curl 8.1.0 canonical\nlxd 5.0\n");
    let aggregator = Aggregator::new(Arc::new(runner));

    let result = aggregator
        .aggregate(&software_chain(&[("dpkg", "dpkg"), ("snap", "snap")]))
        .await;

    assert_eq!(result.len(), 3);
    let curl = result.get("curl").expect("curl record");
    assert_eq!(curl.field("version"), Some("7.81.0"));
    assert_eq!(curl.field("vendor"), Some("canonical"));
    assert_eq!(curl.source(), "dpkg");
    assert_eq!(result.get("lxd").map(InventoryRecord::source), Some("snap"));
}

#[tokio::test]
async fn test_merge_is_order_independent_without_conflicts() {
    let runner = Arc::new(
        ScriptedRunner::default()
            .output("dpkg list", "curl 7.81.0\nbash 5.1\n")
            .output("snap list", "curl 7.81.0 canonical\nlxd 5.0\n"),
    );
    let aggregator = Aggregator::new(runner);

    let forward = aggregator
        .aggregate(&software_chain(&[("dpkg", "dpkg"), ("snap", "snap")]))
        .await;
    let backward = aggregator
        .aggregate(&software_chain(&[("snap", "snap"), ("dpkg", "dpkg")]))
        .await;

    assert_eq!(snapshot(&forward), snapshot(&backward));
}

#[tokio::test]
async fn test_concurrency_keeps_declared_order() {
    let runner = Arc::new(
        ScriptedRunner::default()
            .delayed("dpkg list", "curl 7.81.0\n", Duration::from_millis(80))
            .output("snap list", "curl 8.1.0\n"),
    );
    let chain = software_chain(&[("dpkg", "dpkg"), ("snap", "snap")]);

    let sequential = Aggregator::new(runner.clone()).aggregate(&chain).await;
    let concurrent = Aggregator::new(runner)
        .with_max_concurrency(4)
        .aggregate(&chain)
        .await;

    assert_eq!(snapshot(&sequential), snapshot(&concurrent));
    assert_eq!(
        concurrent.get("curl").and_then(|r| r.field("version")),
        Some("7.81.0")
    );
    let names: Vec<_> = concurrent.diagnostics().iter().map(|d| d.probe_name.as_str()).collect();
    assert_eq!(names, ["dpkg", "snap"]);
}

#[tokio::test]
async fn test_failures_become_diagnostics() {
    let runner = ScriptedRunner::default()
        .delayed("slow list", "never 1.0\n", Duration::from_secs(5))
        .outcome(
            "rpm list",
            ProbeOutcome::NonZeroExit {
                code: 1,
                stderr: "rpmdb: lock held".to_string(),
            },
        )
        .output("pip list", "requests 2.31.0\n");
    let aggregator = Aggregator::new(Arc::new(runner)).with_default_timeout(Duration::from_millis(50));
    let chain = software_chain(&[("missing", "missing"), ("slow", "slow"), ("rpm", "rpm"), ("pip", "pip")]);

    let result = aggregator.aggregate(&chain).await;

    let kinds: Vec<_> = result.diagnostics().iter().map(|d| d.outcome_kind).collect();
    assert_eq!(
        kinds,
        [
            OutcomeKind::ToolAbsent,
            OutcomeKind::TimedOut,
            OutcomeKind::NonZeroExit,
            OutcomeKind::Success
        ]
    );
    assert_eq!(result.diagnostics()[2].detail, "exit code 1: rpmdb: lock held");
    assert_eq!(result.len(), 1);
    assert!(!result.all_failed());
}

#[tokio::test]
async fn test_all_failed_yields_empty_result() {
    let aggregator = Aggregator::new(Arc::new(ScriptedRunner::default()));
    let result = aggregator
        .aggregate(&software_chain(&[("dpkg", "dpkg"), ("rpm", "rpm")]))
        .await;

    assert!(result.is_empty());
    assert_eq!(result.diagnostics().len(), 2);
    assert!(result.all_failed());
}

#[tokio::test]
async fn test_first_success_skips_fallbacks() {
    let runner = Arc::new(ScriptedRunner::default().output("ss list", "TCP 22\n").output("netstat list", "TCP 80\n"));
    let chain = ProbeChain::new(Domain::Ports, Platform::Linux, ChainPolicy::FirstSuccess)
        .with_probe(probe("ss", "ss", sockets))
        .with_probe(probe("netstat", "netstat", sockets));

    let result = Aggregator::new(runner.clone()).aggregate(&chain).await;

    assert!(result.get("TCP:22").is_some());
    assert!(result.get("TCP:80").is_none());
    assert_eq!(result.diagnostics()[1].outcome_kind, OutcomeKind::Skipped);
    assert_eq!(runner.calls(), ["ss list"]);
}

#[tokio::test]
async fn test_first_success_falls_through_empty_output() {
    let runner = Arc::new(ScriptedRunner::default().output("ss list", "").output("netstat list", "TCP 80\n"));
    let chain = ProbeChain::new(Domain::Ports, Platform::Linux, ChainPolicy::FirstSuccess)
        .with_probe(probe("ss", "ss", sockets))
        .with_probe(probe("netstat", "netstat", sockets));

    let result = Aggregator::new(runner.clone()).aggregate(&chain).await;

    assert!(result.get("TCP:80").is_some());
    assert_eq!(runner.calls(), ["ss list", "netstat list"]);
}

#[tokio::test]
async fn test_alternative_group_in_run_all_chain() {
    let runner = Arc::new(
        ScriptedRunner::default()
            .output("rpm list", "bash 5.2\n")
            .output("pacman list", "bash 5.2.15\n")
            .output("pip list", "requests 2.31.0\n"),
    );
    let chain = ProbeChain::new(Domain::Software, Platform::Linux, ChainPolicy::RunAll)
        .with_probe(probe("dpkg", "dpkg", packages).in_group("system"))
        .with_probe(probe("rpm", "rpm", packages).in_group("system"))
        .with_probe(probe("pacman", "pacman", packages).in_group("system"))
        .with_probe(probe("pip", "pip", packages));

    let result = Aggregator::new(runner.clone()).with_max_concurrency(2).aggregate(&chain).await;

    let kinds: Vec<_> = result.diagnostics().iter().map(|d| d.outcome_kind).collect();
    assert_eq!(
        kinds,
        [
            OutcomeKind::ToolAbsent,
            OutcomeKind::Success,
            OutcomeKind::Skipped,
            OutcomeKind::Success
        ]
    );
    assert_eq!(result.get("bash").and_then(|r| r.field("version")), Some("5.2"));
    assert!(!runner.calls().contains(&"pacman list".to_string()));
}

#[tokio::test]
async fn test_group_declared_around_ungrouped_entry_merges_in_declared_order() {
    let runner = Arc::new(
        ScriptedRunner::default()
            .output("pip list", "bash 1.0\n")
            .output("rpm list", "bash 2.0\n"),
    );
    let chain = ProbeChain::new(Domain::Software, Platform::Linux, ChainPolicy::RunAll)
        .with_probe(probe("dpkg", "dpkg", packages).in_group("system"))
        .with_probe(probe("pip", "pip", packages))
        .with_probe(probe("rpm", "rpm", packages).in_group("system"));
    assert_eq!(chain.units(), vec![vec![0, 2], vec![1]]);

    let result = Aggregator::new(runner).aggregate(&chain).await;

    let bash = result.get("bash").expect("bash record");
    assert_eq!(bash.field("version"), Some("1.0"));
    assert_eq!(bash.source(), "pip");
    let names: Vec<_> = result.diagnostics().iter().map(|d| d.probe_name.as_str()).collect();
    assert_eq!(names, ["dpkg", "pip", "rpm"]);
    let kinds: Vec<_> = result.diagnostics().iter().map(|d| d.outcome_kind).collect();
    assert_eq!(kinds, [OutcomeKind::ToolAbsent, OutcomeKind::Success, OutcomeKind::Success]);
}

#[tokio::test]
async fn test_per_key_enrichment() {
    let runner = Arc::new(
        ScriptedRunner::default()
            .output("ss list", "TCP 22 101\nTCP 80 202\nUDP 53 101\nUDP 68\n")
            .output("ps -o comm= -p 101", "sshd\n"),
    );
    let aggregator = Aggregator::new(runner.clone());
    let chain = ProbeChain::new(Domain::Ports, Platform::Linux, ChainPolicy::FirstSuccess)
        .with_probe(probe("ss", "ss", sockets));
    let spec = EnrichmentSpec {
        name: "ps",
        key_field: "pid",
        target_field: "process",
        mode: LookupMode::PerKey {
            invocation: Invocation::new("ps", &["-o", "comm=", "-p"]),
            arg_prefix: "",
        },
        parser: process_names,
        timeout: None,
    };

    let result = aggregator.aggregate(&chain).await;
    let result = Enricher::new(aggregator).enrich(result, &spec).await;

    let process = |id: &str| result.get(id).map(|r| r.field_or_unknown("process").to_string());
    assert_eq!(process("TCP:22").as_deref(), Some("sshd"));
    assert_eq!(process("UDP:53").as_deref(), Some("sshd"));
    assert_eq!(process("TCP:80").as_deref(), Some(UNKNOWN));
    assert_eq!(process("UDP:68").as_deref(), Some(UNKNOWN));

    // one lookup per distinct pid
    let lookups = runner.calls().iter().filter(|c| c.starts_with("ps")).count();
    assert_eq!(lookups, 2);
    assert!(result.diagnostics().iter().any(|d| d.probe_name == "ps[202]"));
}

#[tokio::test]
async fn test_bulk_enrichment() {
    let runner = Arc::new(
        ScriptedRunner::default()
            .output("netstat list", "TCP 3389 900\nTCP 445 4\n")
            .output("tasklist /FO CSV", "svchost.exe,900\nSystem,4\n"),
    );
    let aggregator = Aggregator::new(runner.clone());
    let chain = ProbeChain::new(Domain::Ports, Platform::Windows, ChainPolicy::RunAll)
        .with_probe(probe("netstat", "netstat", sockets));
    let spec = EnrichmentSpec {
        name: "tasklist",
        key_field: "pid",
        target_field: "process",
        mode: LookupMode::Bulk {
            invocation: Invocation::new("tasklist", &["/FO", "CSV"]),
        },
        parser: process_names,
        timeout: None,
    };

    let result = aggregator.aggregate(&chain).await;
    let result = Enricher::new(aggregator).enrich(result, &spec).await;

    assert_eq!(result.get("TCP:3389").and_then(|r| r.field("process")), Some("svchost.exe"));
    assert_eq!(result.get("TCP:445").and_then(|r| r.field("process")), Some("System"));
    assert_eq!(runner.calls().len(), 2);
}

#[tokio::test]
async fn test_collector_summarises_by_category() {
    let dpkg: String = (0..6).map(|i| format!("deb{i} 1.0\n")).collect();
    let snap: String = (0..4).map(|i| format!("snap{i} 2.0\n")).collect();
    let runner = Arc::new(ScriptedRunner::default().output("dpkg list", &dpkg).output("snap list", &snap));

    let mut registry = Registry::new();
    registry.register(DomainPlan::new(software_chain(&[("dpkg", "dpkg"), ("snap", "snap")])));
    let collector = Collector::new(Arc::new(registry), runner, Platform::Linux);

    let report = collector.collect(Domain::Software).await.expect("software plan");

    assert_eq!(report.summary.total, 10);
    assert_eq!(report.summary.by_category.get("dpkg"), Some(&6));
    assert_eq!(report.summary.by_category.get("snap"), Some(&4));

    let err = collector.collect(Domain::Firmware).await.expect_err("no firmware plan");
    assert!(matches!(err, InventoryError::UnsupportedDomain { .. }));
}

#[tokio::test]
async fn test_result_serializes_with_diagnostics() {
    let runner = ScriptedRunner::default().output("dpkg list", "curl 7.81.0\n");
    let result = Aggregator::new(Arc::new(runner))
        .aggregate(&software_chain(&[("dpkg", "dpkg"), ("rpm", "rpm")]))
        .await;

    let json = serde_json::to_value(&result).expect("serializable");
    assert_eq!(json["records"]["curl"]["fields"]["version"], "7.81.0");
    assert_eq!(json["diagnostics"][1]["outcome_kind"], "tool_absent");
    assert_eq!(json["domain"], "software");
}
