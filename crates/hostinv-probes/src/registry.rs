//! Built-in probe plans for every supported platform and domain

use std::time::Duration;

use hostinv_exec::Invocation;
use hostinv_inventory::{
    Categorizer, ChainPolicy, Domain, DomainPlan, EnrichmentSpec, LookupMode, Parser, Platform,
    ProbeChain, ProbeSpec, Registry,
};

use crate::software::{APPLICATION, CONTAINER_PACKAGE, LANGUAGE_PACKAGE, STORE_APP, SYSTEM_PACKAGE};
use crate::{firmware, ports, software, system};

/// Alternative group of the Linux distribution package managers
pub const SYSTEM_PACKAGE_MANAGER: &str = "system-package-manager";

/// Bound for slow listings (system_profiler, MSI enumeration)
const SLOW_TIMEOUT: Duration = Duration::from_secs(120);
/// Bound for interpreters that may need to warm up
const INTERPRETER_TIMEOUT: Duration = Duration::from_secs(60);

const UNINSTALL_HKLM: &str = r"Get-ItemProperty 'HKLM:\Software\Microsoft\Windows\CurrentVersion\Uninstall\*' | Where-Object { $_.DisplayName } | Select-Object DisplayName, DisplayVersion, Publisher, InstallDate | ConvertTo-Json -Compress";
const UNINSTALL_WOW64: &str = r"Get-ItemProperty 'HKLM:\Software\WOW6432Node\Microsoft\Windows\CurrentVersion\Uninstall\*' | Where-Object { $_.DisplayName } | Select-Object DisplayName, DisplayVersion, Publisher, InstallDate | ConvertTo-Json -Compress";
const UNINSTALL_HKCU: &str = r"Get-ItemProperty 'HKCU:\Software\Microsoft\Windows\CurrentVersion\Uninstall\*' | Where-Object { $_.DisplayName } | Select-Object DisplayName, DisplayVersion, Publisher, InstallDate | ConvertTo-Json -Compress";
const GET_PACKAGE: &str = "Get-Package | Select-Object Name, Version, Source | ConvertTo-Json -Compress";
const GET_APPX: &str = "Get-AppxPackage | Where-Object { $_.Name -notlike 'Microsoft.*' -and $_.Name -notlike 'Windows.*' } | Select-Object Name, Version, Publisher | ConvertTo-Json -Compress";
const GET_TCP_LISTEN: &str = "Get-NetTCPConnection -State Listen | Select-Object LocalAddress, LocalPort, OwningProcess | ConvertTo-Json -Compress";
const WMI_BIOS: &str = "Get-CimInstance Win32_BIOS | Select-Object Manufacturer, Name, SMBIOSBIOSVersion, Version, ReleaseDate, SerialNumber | ConvertTo-Json -Compress";
const WMI_BASEBOARD: &str = "Get-CimInstance Win32_BaseBoard | Select-Object Manufacturer, Product, Version, SerialNumber | ConvertTo-Json -Compress";
const WMI_NETWORK: &str = "Get-CimInstance Win32_NetworkAdapter -Filter 'PhysicalAdapter=True' | Select-Object Name, Manufacturer, Description, DriverVersion | ConvertTo-Json -Compress";
const WMI_DISK: &str = "Get-CimInstance Win32_DiskDrive | Select-Object Model, Manufacturer, FirmwareRevision, SerialNumber, InterfaceType | ConvertTo-Json -Compress";
const WMI_VIDEO: &str = "Get-CimInstance Win32_VideoController | Select-Object Name, DriverVersion, DriverDate, VideoProcessor | ConvertTo-Json -Compress";

/// `powershell -NoProfile -NonInteractive -Command <script>`
fn powershell(script: &str) -> Invocation {
    Invocation::new("powershell", &["-NoProfile", "-NonInteractive", "-Command", script])
}

fn probe(name: &'static str, platform: Platform, program: &str, args: &[&str], parser: Parser) -> ProbeSpec {
    ProbeSpec::new(name, platform, Invocation::new(program, args), parser)
}

fn linux_software() -> DomainPlan {
    let p = Platform::Linux;
    let package_manager = |name: &'static str, program: &str, args: &[&str], parser: Parser| {
        probe(name, p, program, args, parser)
            .with_category(SYSTEM_PACKAGE)
            .in_group(SYSTEM_PACKAGE_MANAGER)
    };

    let chain = ProbeChain::new(Domain::Software, p, ChainPolicy::RunAll)
        .with_probe(package_manager("dpkg", "dpkg", &["-l"], software::linux::parse_dpkg))
        .with_probe(package_manager("rpm", "rpm", &["-qa"], software::linux::parse_rpm))
        .with_probe(package_manager("pacman", "pacman", &["-Q"], software::linux::parse_pacman))
        .with_probe(package_manager("apk", "apk", &["list", "--installed"], software::linux::parse_apk))
        .with_probe(
            package_manager(
                "zypper",
                "zypper",
                &["--non-interactive", "se", "--installed-only", "-s"],
                software::linux::parse_zypper,
            ),
        )
        .with_probe(package_manager("portage", "qlist", &["-Iv"], software::linux::parse_portage))
        .with_probe(
            probe("snap", p, "snap", &["list"], software::linux::parse_snap).with_category(CONTAINER_PACKAGE),
        )
        .with_probe(
            probe(
                "flatpak",
                p,
                "flatpak",
                &["list", "--app", "--columns=name,version"],
                software::linux::parse_flatpak,
            )
            .with_category(CONTAINER_PACKAGE),
        )
        .with_probe(
            probe("pip", p, "python3", &["-m", "pip", "list"], software::parse_pip_list)
                .with_category(LANGUAGE_PACKAGE)
                .with_timeout(INTERPRETER_TIMEOUT),
        );

    DomainPlan::new(chain)
}

fn macos_software() -> DomainPlan {
    let p = Platform::MacOs;
    let chain = ProbeChain::new(Domain::Software, p, ChainPolicy::RunAll)
        .with_probe(
            probe(
                "applications",
                p,
                "system_profiler",
                &["SPApplicationsDataType", "-xml"],
                software::macos::parse_applications_plist,
            )
            .with_category(APPLICATION)
            .with_timeout(SLOW_TIMEOUT),
        )
        .with_probe(
            probe("brew", p, "brew", &["list", "--versions"], software::macos::parse_brew)
                .with_category(SYSTEM_PACKAGE),
        )
        .with_probe(
            probe(
                "brew-cask",
                p,
                "brew",
                &["list", "--cask", "--versions"],
                software::macos::parse_brew_cask,
            )
            .with_category(APPLICATION),
        )
        .with_probe(
            probe("macports", p, "port", &["installed"], software::macos::parse_macports)
                .with_category(SYSTEM_PACKAGE),
        )
        .with_probe(probe("mas", p, "mas", &["list"], software::macos::parse_mas).with_category(STORE_APP))
        .with_probe(
            probe("pip", p, "python3", &["-m", "pip", "list"], software::parse_pip_list)
                .with_category(LANGUAGE_PACKAGE)
                .with_timeout(INTERPRETER_TIMEOUT),
        );

    DomainPlan::new(chain)
}

fn windows_software() -> DomainPlan {
    let p = Platform::Windows;
    let registry_probe = |name: &'static str, script: &str| {
        ProbeSpec::new(name, p, powershell(script), software::windows::parse_uninstall_json)
            .with_category(SYSTEM_PACKAGE)
    };

    let chain = ProbeChain::new(Domain::Software, p, ChainPolicy::RunAll)
        .with_probe(
            probe(
                "wmic",
                p,
                "wmic",
                &["product", "get", "name,version", "/format:csv"],
                software::windows::parse_wmic_products,
            )
            .with_category(SYSTEM_PACKAGE)
            .with_timeout(SLOW_TIMEOUT),
        )
        .with_probe(registry_probe("uninstall-hklm", UNINSTALL_HKLM))
        .with_probe(registry_probe("uninstall-wow64", UNINSTALL_WOW64))
        .with_probe(registry_probe("uninstall-hkcu", UNINSTALL_HKCU))
        .with_probe(
            ProbeSpec::new("get-package", p, powershell(GET_PACKAGE), software::windows::parse_get_package_json)
                .with_category(SYSTEM_PACKAGE)
                .with_timeout(INTERPRETER_TIMEOUT),
        )
        .with_probe(
            ProbeSpec::new("appx", p, powershell(GET_APPX), software::windows::parse_appx_json)
                .with_category(STORE_APP),
        )
        .with_probe(
            probe("pip", p, "python", &["-m", "pip", "list"], software::parse_pip_list)
                .with_category(LANGUAGE_PACKAGE)
                .with_timeout(INTERPRETER_TIMEOUT),
        );

    DomainPlan::new(chain)
}

/// Per-PID `ps -o comm= -p <pid>` lookup shared by Linux and macOS
fn ps_enrichment() -> EnrichmentSpec {
    EnrichmentSpec {
        name: "ps",
        key_field: "pid",
        target_field: "process",
        mode: LookupMode::PerKey {
            invocation: Invocation::new("ps", &["-o", "comm=", "-p"]),
            arg_prefix: "",
        },
        parser: ports::parse_ps_comm,
        timeout: Some(Duration::from_secs(5)),
    }
}

fn linux_ports() -> DomainPlan {
    let p = Platform::Linux;
    let chain = ProbeChain::new(Domain::Ports, p, ChainPolicy::FirstSuccess)
        .with_probe(probe("ss", p, "ss", &["-tulpn"], ports::linux::parse_ss))
        .with_probe(probe("netstat", p, "netstat", &["-tulpn"], ports::linux::parse_netstat));

    DomainPlan::new(chain)
        .with_enrichment(ps_enrichment())
        .with_categorizer(Categorizer::ByIdentityPrefix(':'))
}

fn macos_ports() -> DomainPlan {
    let p = Platform::MacOs;
    let chain = ProbeChain::new(Domain::Ports, p, ChainPolicy::RunAll)
        .with_probe(probe("lsof", p, "lsof", &["-i", "-P", "-n"], ports::macos::parse_lsof))
        .with_probe(probe("netstat", p, "netstat", &["-an"], ports::macos::parse_bsd_netstat));

    DomainPlan::new(chain)
        .with_enrichment(ps_enrichment())
        .with_categorizer(Categorizer::ByIdentityPrefix(':'))
}

fn windows_ports() -> DomainPlan {
    let p = Platform::Windows;
    let chain = ProbeChain::new(Domain::Ports, p, ChainPolicy::RunAll)
        .with_probe(probe("netstat", p, "netstat", &["-ano"], ports::windows::parse_netstat_ano))
        .with_probe(ProbeSpec::new(
            "tcp-connection",
            p,
            powershell(GET_TCP_LISTEN),
            ports::windows::parse_tcp_connection_json,
        ));

    let tasklist = EnrichmentSpec {
        name: "tasklist",
        key_field: "pid",
        target_field: "process",
        mode: LookupMode::Bulk {
            invocation: Invocation::new("tasklist", &["/FO", "CSV", "/NH"]),
        },
        parser: ports::windows::parse_tasklist_csv,
        timeout: None,
    };

    DomainPlan::new(chain)
        .with_enrichment(tasklist)
        .with_categorizer(Categorizer::ByIdentityPrefix(':'))
}

fn linux_firmware() -> DomainPlan {
    let p = Platform::Linux;
    let chain = ProbeChain::new(Domain::Firmware, p, ChainPolicy::RunAll)
        .with_probe(probe(
            "dmidecode-bios",
            p,
            "dmidecode",
            &["-t", "bios"],
            firmware::linux::parse_dmidecode_bios,
        ))
        .with_probe(probe(
            "dmidecode-baseboard",
            p,
            "dmidecode",
            &["-t", "baseboard"],
            firmware::linux::parse_dmidecode_baseboard,
        ))
        .with_probe(probe("lspci", p, "lspci", &["-v"], firmware::linux::parse_lspci))
        .with_probe(probe(
            "lsblk",
            p,
            "lsblk",
            &["-d", "-n", "-P", "-o", "NAME,MODEL,SERIAL,REV"],
            firmware::linux::parse_lsblk_pairs,
        ));

    DomainPlan::new(chain).with_categorizer(Categorizer::ByIdentityPrefix(':'))
}

fn macos_firmware() -> DomainPlan {
    let p = Platform::MacOs;
    let chain = ProbeChain::new(Domain::Firmware, p, ChainPolicy::RunAll)
        .with_probe(
            probe(
                "hardware",
                p,
                "system_profiler",
                &["SPHardwareDataType", "-json"],
                firmware::macos::parse_hardware_json,
            )
            .with_timeout(SLOW_TIMEOUT),
        )
        .with_probe(
            probe(
                "storage",
                p,
                "system_profiler",
                &["SPStorageDataType", "-json"],
                firmware::macos::parse_storage_json,
            )
            .with_timeout(SLOW_TIMEOUT),
        );

    DomainPlan::new(chain).with_categorizer(Categorizer::ByIdentityPrefix(':'))
}

fn windows_firmware() -> DomainPlan {
    let p = Platform::Windows;
    let wmi = |name: &'static str, script: &str, parser: Parser| ProbeSpec::new(name, p, powershell(script), parser);

    let chain = ProbeChain::new(Domain::Firmware, p, ChainPolicy::RunAll)
        .with_probe(wmi("wmi-bios", WMI_BIOS, firmware::windows::parse_bios_json))
        .with_probe(wmi("wmi-baseboard", WMI_BASEBOARD, firmware::windows::parse_baseboard_json))
        .with_probe(wmi("wmi-network", WMI_NETWORK, firmware::windows::parse_network_adapter_json))
        .with_probe(wmi("wmi-disk", WMI_DISK, firmware::windows::parse_disk_drive_json))
        .with_probe(wmi("wmi-video", WMI_VIDEO, firmware::windows::parse_video_controller_json));

    DomainPlan::new(chain).with_categorizer(Categorizer::ByIdentityPrefix(':'))
}

fn linux_system() -> DomainPlan {
    let p = Platform::Linux;
    let chain = ProbeChain::new(Domain::System, p, ChainPolicy::RunAll)
        .with_probe(probe("os-release", p, "cat", &["/etc/os-release"], system::parse_os_release))
        .with_probe(probe("uname", p, "uname", &["-snrm"], system::parse_uname))
        .with_probe(probe("proc-version", p, "cat", &["/proc/version"], system::parse_proc_version));

    DomainPlan::new(chain).with_categorizer(Categorizer::ByIdentityPrefix(':'))
}

fn macos_system() -> DomainPlan {
    let p = Platform::MacOs;
    let chain = ProbeChain::new(Domain::System, p, ChainPolicy::RunAll)
        .with_probe(probe("sw_vers", p, "sw_vers", &[], system::parse_sw_vers))
        .with_probe(probe("uname", p, "uname", &["-snrm"], system::parse_uname));

    DomainPlan::new(chain).with_categorizer(Categorizer::ByIdentityPrefix(':'))
}

fn windows_system() -> DomainPlan {
    let p = Platform::Windows;
    let chain = ProbeChain::new(Domain::System, p, ChainPolicy::RunAll).with_probe(
        probe("systeminfo", p, "systeminfo", &[], system::parse_systeminfo).with_timeout(INTERPRETER_TIMEOUT),
    );

    DomainPlan::new(chain).with_categorizer(Categorizer::ByIdentityPrefix(':'))
}

/// Registry holding every built-in plan
#[must_use]
pub fn builtin() -> Registry {
    let mut registry = Registry::new();
    for plan in [
        linux_software(),
        macos_software(),
        windows_software(),
        linux_ports(),
        macos_ports(),
        windows_ports(),
        linux_firmware(),
        macos_firmware(),
        windows_firmware(),
        linux_system(),
        macos_system(),
        windows_system(),
    ] {
        registry.register(plan);
    }
    registry
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const PLATFORMS: [Platform; 3] = [Platform::Linux, Platform::MacOs, Platform::Windows];

    #[test]
    fn test_every_platform_covers_every_domain() {
        let registry = builtin();
        for platform in PLATFORMS {
            for domain in Domain::ALL {
                let plan = registry.plan(platform, domain).expect("plan registered");
                assert_eq!(plan.chain.platform(), platform);
                assert_eq!(plan.chain.domain(), domain);
                assert!(!plan.chain.probes().is_empty());
            }
        }
    }

    #[test]
    fn test_probe_names_unique_within_chain() {
        let registry = builtin();
        for platform in PLATFORMS {
            for domain in Domain::ALL {
                let chain = &registry.plan(platform, domain).expect("plan").chain;
                let names: HashSet<_> = chain.probes().iter().map(|p| p.name).collect();
                assert_eq!(names.len(), chain.probes().len(), "{platform} {domain}");
                assert!(chain.probes().iter().all(|p| p.platform == platform));
            }
        }
    }

    #[test]
    fn test_no_probe_goes_through_a_shell() {
        let registry = builtin();
        for platform in PLATFORMS {
            for domain in Domain::ALL {
                for probe in registry.plan(platform, domain).expect("plan").chain.probes() {
                    assert!(
                        !matches!(probe.invocation.program(), "sh" | "bash" | "cmd"),
                        "{} uses a shell",
                        probe.name
                    );
                    assert!(probe.invocation.validate().is_ok());
                }
            }
        }
    }

    #[test]
    fn test_linux_package_managers_are_alternatives() {
        let registry = builtin();
        let chain = &registry.plan(Platform::Linux, Domain::Software).expect("plan").chain;

        let grouped: Vec<_> = chain
            .probes()
            .iter()
            .filter(|p| p.alternative_group == Some(SYSTEM_PACKAGE_MANAGER))
            .map(|p| p.name)
            .collect();
        assert_eq!(grouped, ["dpkg", "rpm", "pacman", "apk", "zypper", "portage"]);
        assert_eq!(chain.probe("snap").map(|p| p.category), Some(CONTAINER_PACKAGE));
        assert_eq!(chain.probe("pip").map(|p| p.category), Some(LANGUAGE_PACKAGE));
    }

    #[test]
    fn test_port_plans() {
        let registry = builtin();

        let linux = registry.plan(Platform::Linux, Domain::Ports).expect("plan");
        assert_eq!(linux.chain.policy(), ChainPolicy::FirstSuccess);
        assert!(matches!(
            linux.enrichment.as_ref().map(|e| &e.mode),
            Some(LookupMode::PerKey { .. })
        ));

        let windows = registry.plan(Platform::Windows, Domain::Ports).expect("plan");
        assert!(matches!(
            windows.enrichment.as_ref().map(|e| &e.mode),
            Some(LookupMode::Bulk { .. })
        ));
    }

    #[test]
    fn test_overrides_apply_to_builtin_names() {
        let mut registry = builtin();
        let overrides = std::collections::HashMap::from([(
            "tasklist".to_string(),
            hostinv_inventory::ProbeOverride {
                enabled: false,
                timeout_secs: None,
            },
        )]);

        registry.apply_overrides(&overrides).expect("known probe");

        let windows = registry.plan(Platform::Windows, Domain::Ports).expect("plan");
        assert!(windows.enrichment.is_none());
    }
}
