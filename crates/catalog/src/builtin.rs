use std::collections::BTreeMap;

use crate::{Catalog, CatalogControl, FrameworkCatalog};

/// Organization types the built-in catalog knows how to filter for.
pub const DEFAULT_ORG_TYPES: &[&str] = &["saas", "fintech", "healthcare", "enterprise", "startup"];

const REGULATED: &[&str] = &["saas", "fintech", "healthcare", "enterprise"];
const VENDOR_HEAVY: &[&str] = &["saas", "fintech", "enterprise"];

const ACTION_GOVERNANCE: &str = "Approve a security governance charter with named control owners";
const ACTION_ASSETS: &str = "Build and maintain an automated asset inventory";
const ACTION_ACCESS: &str = "Enable SSO + MFA everywhere and review privileged access";
const ACTION_ENCRYPTION: &str = "Encrypt sensitive data at rest and in transit";
const ACTION_MONITORING: &str = "Centralize security logging and alert on high-risk events";
const ACTION_INCIDENT: &str = "Document and rehearse an incident response plan";
const ACTION_RECOVERY: &str = "Test backup restoration against recovery objectives quarterly";
const ACTION_VULNERABILITIES: &str = "Run continuous vulnerability scanning with patch SLAs";
const ACTION_VENDORS: &str = "Assess third-party vendors and track their security attestations";
const ACTION_TRAINING: &str = "Run security awareness training with phishing simulations";
const ACTION_CHANGE: &str = "Require peer-reviewed, tracked changes for production systems";
const ACTION_HARDENING: &str = "Apply hardened baseline configurations to all systems";

struct ControlDef {
    id: &'static str,
    title: &'static str,
    domain: &'static str,
    org_types: &'static [&'static str],
    action: &'static str,
}

const fn control(
    id: &'static str,
    title: &'static str,
    domain: &'static str,
    org_types: &'static [&'static str],
    action: &'static str,
) -> ControlDef {
    ControlDef {
        id,
        title,
        domain,
        org_types,
        action,
    }
}

const NIST_CSF: &[ControlDef] = &[
    control("GV.OV-01", "Governance strategy defined", "Govern", &[], ACTION_GOVERNANCE),
    control(
        "GV.SC-01",
        "Supply chain risk management program established",
        "Govern",
        VENDOR_HEAVY,
        ACTION_VENDORS,
    ),
    control("ID.AM-01", "Asset inventory maintained", "Identify", &[], ACTION_ASSETS),
    control("PR.AA-01", "Identity and access managed", "Protect", &[], ACTION_ACCESS),
    control("PR.DS-01", "Data-at-rest protected", "Protect", REGULATED, ACTION_ENCRYPTION),
    control("DE.CM-01", "Continuous monitoring enabled", "Detect", &[], ACTION_MONITORING),
    control("RS.RP-01", "Incident response plan executed", "Respond", &[], ACTION_INCIDENT),
    control("RC.RP-01", "Recovery plan validated", "Recover", &[], ACTION_RECOVERY),
];

const ISO27001: &[ControlDef] = &[
    control(
        "A.5.1",
        "Policies for information security",
        "Organizational",
        &[],
        ACTION_GOVERNANCE,
    ),
    control(
        "A.5.9",
        "Inventory of information and other associated assets",
        "Organizational",
        &[],
        ACTION_ASSETS,
    ),
    control("A.5.15", "Access control", "Organizational", &[], ACTION_ACCESS),
    control(
        "A.5.19",
        "Information security in supplier relationships",
        "Organizational",
        REGULATED,
        ACTION_VENDORS,
    ),
    control(
        "A.6.3",
        "Information security awareness, education and training",
        "People",
        &[],
        ACTION_TRAINING,
    ),
    control(
        "A.8.8",
        "Management of technical vulnerabilities",
        "Technological",
        &[],
        ACTION_VULNERABILITIES,
    ),
    control("A.8.13", "Information backup", "Technological", &[], ACTION_RECOVERY),
    control("A.8.15", "Logging", "Technological", &[], ACTION_MONITORING),
];

const SOC2: &[ControlDef] = &[
    control(
        "CC1.1",
        "Control environment and integrity commitments",
        "Control Environment",
        &[],
        ACTION_GOVERNANCE,
    ),
    control(
        "CC2.2",
        "Internal communication of security responsibilities",
        "Communication",
        &[],
        ACTION_TRAINING,
    ),
    control("CC6.1", "Logical access security", "Logical Access", &[], ACTION_ACCESS),
    control(
        "CC6.7",
        "Data transmission protection",
        "Logical Access",
        REGULATED,
        ACTION_ENCRYPTION,
    ),
    control("CC7.2", "Security event monitoring", "System Operations", &[], ACTION_MONITORING),
    control("CC7.4", "Incident response", "System Operations", &[], ACTION_INCIDENT),
    control("CC8.1", "Change management", "Change Management", &[], ACTION_CHANGE),
    control(
        "CC9.2",
        "Vendor risk management",
        "Risk Mitigation",
        VENDOR_HEAVY,
        ACTION_VENDORS,
    ),
];

const CIS_V8: &[ControlDef] = &[
    control(
        "CIS 1",
        "Inventory and control of enterprise assets",
        "Basic Hygiene",
        &[],
        ACTION_ASSETS,
    ),
    control("CIS 3", "Data protection", "Data", REGULATED, ACTION_ENCRYPTION),
    control(
        "CIS 4",
        "Secure configuration of enterprise assets and software",
        "Basic Hygiene",
        &[],
        ACTION_HARDENING,
    ),
    control("CIS 5", "Account management", "Identity", &[], ACTION_ACCESS),
    control(
        "CIS 7",
        "Continuous vulnerability management",
        "Basic Hygiene",
        &[],
        ACTION_VULNERABILITIES,
    ),
    control("CIS 8", "Audit log management", "Detection", &[], ACTION_MONITORING),
    control("CIS 11", "Data recovery", "Recovery", &[], ACTION_RECOVERY),
    control(
        "CIS 14",
        "Security awareness and skills training",
        "People",
        &[],
        ACTION_TRAINING,
    ),
    control("CIS 17", "Incident response management", "Response", &[], ACTION_INCIDENT),
];

pub(crate) fn builtin_catalog() -> Catalog {
    let frameworks = [
        ("nist_csf", "NIST CSF", NIST_CSF),
        ("iso27001", "ISO 27001", ISO27001),
        ("soc2", "SOC 2", SOC2),
        ("cis_v8", "CIS v8", CIS_V8),
    ]
    .into_iter()
    .map(|(key, label, defs)| {
        let controls = defs.iter().map(to_control).collect();
        (
            key.to_string(),
            FrameworkCatalog {
                label: label.to_string(),
                controls,
            },
        )
    })
    .collect::<BTreeMap<_, _>>();

    Catalog {
        org_types: DEFAULT_ORG_TYPES.iter().map(|value| value.to_string()).collect(),
        frameworks,
    }
}

fn to_control(def: &ControlDef) -> CatalogControl {
    CatalogControl {
        id: def.id.to_string(),
        title: def.title.to_string(),
        domain: def.domain.to_string(),
        org_types: def.org_types.iter().map(|value| value.to_string()).collect(),
        action: def.action.to_string(),
    }
}
