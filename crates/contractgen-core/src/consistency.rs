//! Cross-target consistency checks.
//!
//! Every emitter's public surfaces are compared against the first emitter's
//! (the baseline), and the baseline itself against the surfaces the
//! contracts prescribe. Findings are collected rather than returned as
//! errors: a run with findings still completes, and the report decides
//! whether it passes.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;

use crate::contract::ContractSet;
use crate::emit::PublicSurface;

/// Name the contract-derived surfaces carry in findings
pub const CONTRACT: &str = "contract";

/// Compared aspect of a public surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceField {
    /// The operation is missing from one of the two emitters
    Presence,
    HttpMethod,
    Route,
    /// Ordered (name, location) list
    Parameters,
    StatusCodes,
    Security,
}

impl SurfaceField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Presence => "presence",
            Self::HttpMethod => "http_method",
            Self::Route => "route",
            Self::Parameters => "parameters",
            Self::StatusCodes => "status_codes",
            Self::Security => "security",
        }
    }
}

impl fmt::Display for SurfaceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One disagreement between two emitters about one operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InconsistencyFinding {
    pub operation_id: String,
    pub field: SurfaceField,
    pub emitter_a: String,
    pub emitter_b: String,
    pub value_a: String,
    pub value_b: String,
}

impl fmt::Display for InconsistencyFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} differs: {} has {}, {} has {}",
            self.operation_id, self.field, self.emitter_a, self.value_a, self.emitter_b, self.value_b
        )
    }
}

/// Outcome of one validation; zero findings means the targets agree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Emitter names, baseline first
    pub emitters: Vec<String>,
    pub findings: Vec<InconsistencyFinding>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Compare every emitter's surfaces against the first emitter's
pub fn validate(surfaces: &[(String, Vec<PublicSurface>)]) -> ConsistencyReport {
    let mut report = ConsistencyReport {
        emitters: surfaces.iter().map(|(name, _)| name.clone()).collect(),
        findings: Vec::new(),
    };
    if let Some(((baseline_name, baseline), others)) = surfaces.split_first() {
        for (name, other) in others {
            report
                .findings
                .extend(compare_emitters(baseline_name, baseline, name, other));
        }
    }
    log_findings(&report);
    report
}

/// Like [`validate`], but the baseline is first checked against the
/// contracts, so a divergence shared by every emitter is reported too
pub fn validate_against(
    contracts: &ContractSet,
    surfaces: &[(String, Vec<PublicSurface>)],
) -> ConsistencyReport {
    let expected: Vec<PublicSurface> = contracts
        .contracts()
        .iter()
        .map(PublicSurface::from_contract)
        .collect();
    let mut findings = match surfaces.first() {
        Some((name, baseline)) => compare_emitters(CONTRACT, &expected, name, baseline),
        None => Vec::new(),
    };
    for finding in &findings {
        log::warn!("inconsistency: {finding}");
    }
    let mut report = validate(surfaces);
    findings.append(&mut report.findings);
    report.findings = findings;
    report
}

fn compare_emitters(
    baseline_name: &str,
    baseline: &[PublicSurface],
    name: &str,
    other: &[PublicSurface],
) -> Vec<InconsistencyFinding> {
    let base = index(baseline);
    let candidate = index(other);
    let ids: BTreeSet<&str> = base.keys().chain(candidate.keys()).copied().collect();

    let mut findings = Vec::new();
    for id in ids {
        let finding = |field: SurfaceField, value_a: String, value_b: String| InconsistencyFinding {
            operation_id: id.to_string(),
            field,
            emitter_a: baseline_name.to_string(),
            emitter_b: name.to_string(),
            value_a,
            value_b,
        };
        match (base.get(id), candidate.get(id)) {
            (Some(a), Some(b)) => findings.extend(compare(a, b, finding)),
            (a, b) => findings.push(finding(
                SurfaceField::Presence,
                presence(a.is_some()),
                presence(b.is_some()),
            )),
        }
    }
    findings
}

fn log_findings(report: &ConsistencyReport) {
    for finding in &report.findings {
        log::warn!("inconsistency: {finding}");
    }
}

fn index(surfaces: &[PublicSurface]) -> BTreeMap<&str, &PublicSurface> {
    surfaces.iter().map(|s| (s.operation_id.as_str(), s)).collect()
}

fn presence(present: bool) -> String {
    if present { "present" } else { "missing" }.to_string()
}

fn compare<F>(a: &PublicSurface, b: &PublicSurface, finding: F) -> Vec<InconsistencyFinding>
where
    F: Fn(SurfaceField, String, String) -> InconsistencyFinding,
{
    let mut findings = Vec::new();
    if a.http_method != b.http_method {
        findings.push(finding(
            SurfaceField::HttpMethod,
            a.http_method.to_string(),
            b.http_method.to_string(),
        ));
    }
    if a.route != b.route {
        findings.push(finding(SurfaceField::Route, a.route.clone(), b.route.clone()));
    }
    if a.parameters != b.parameters {
        findings.push(finding(
            SurfaceField::Parameters,
            parameters(a),
            parameters(b),
        ));
    }
    if a.status_codes != b.status_codes {
        findings.push(finding(
            SurfaceField::StatusCodes,
            format!("{:?}", a.status_codes),
            format!("{:?}", b.status_codes),
        ));
    }
    if a.security != b.security {
        findings.push(finding(
            SurfaceField::Security,
            format!("{:?}", a.security),
            format!("{:?}", b.security),
        ));
    }
    findings
}

fn parameters(surface: &PublicSurface) -> String {
    let items: Vec<String> = surface
        .parameters
        .iter()
        .map(|(name, location)| format!("{location}:{name}"))
        .collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{HttpMethod, ParameterLocation};

    fn surface(id: &str) -> PublicSurface {
        PublicSurface {
            operation_id: id.to_string(),
            http_method: HttpMethod::Get,
            route: "/pets/{id}".to_string(),
            parameters: vec![
                ("id".to_string(), ParameterLocation::Path),
                ("limit".to_string(), ParameterLocation::Query),
            ],
            status_codes: BTreeSet::from([200, 404, 500]),
            security: BTreeSet::from([vec!["bearerAuth".to_string()]]),
        }
    }

    #[test]
    fn identical_surfaces_are_clean() {
        let report = validate(&[
            ("laravel".into(), vec![surface("getPet")]),
            ("slim".into(), vec![surface("getPet")]),
        ]);
        assert!(report.is_clean());
        assert_eq!(report.emitters, vec!["laravel", "slim"]);
    }

    #[test]
    fn every_difference_is_reported() {
        let mut other = surface("getPet");
        other.http_method = HttpMethod::Post;
        other.parameters.reverse();
        other.status_codes.insert(401);
        let report = validate(&[
            ("laravel".into(), vec![surface("getPet"), surface("listPets")]),
            ("symfony".into(), vec![other]),
        ]);

        let fields: Vec<SurfaceField> = report.findings.iter().map(|f| f.field).collect();
        assert_eq!(
            fields,
            vec![
                SurfaceField::HttpMethod,
                SurfaceField::Parameters,
                SurfaceField::StatusCodes,
                SurfaceField::Presence,
            ]
        );
        let missing = &report.findings[3];
        assert_eq!(missing.operation_id, "listPets");
        assert_eq!(missing.value_a, "present");
        assert_eq!(missing.value_b, "missing");
        assert_eq!(report.findings[1].value_a, "[path:id, query:limit]");
    }

    #[test]
    fn report_serializes_for_ci() {
        let mut other = surface("getPet");
        other.route = "/pet/{id}".into();
        let report = validate(&[
            ("laravel".into(), vec![surface("getPet")]),
            ("slim".into(), vec![other]),
        ]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["findings"][0]["field"], "route");
        assert_eq!(json["findings"][0]["emitter_b"], "slim");
    }

    #[test]
    fn single_emitter_has_nothing_to_compare() {
        assert!(validate(&[("slim".into(), vec![surface("getPet")])]).is_clean());
        assert!(validate(&[]).is_clean());
    }

    #[test]
    fn baseline_is_checked_against_contracts() {
        use crate::contract::{build_contracts, BuildOptions};
        use crate::description::ApiDescription;

        let description = ApiDescription::parse_content(
            r#"
info: { title: Petshop }
operations:
  - operationId: getPet
    method: get
    path: /pets/{id}
    parameters:
      - { name: id, in: path, required: true, schema: { type: integer } }
      - { name: limit, in: query, schema: { type: integer } }
    responses: { "200": {}, "404": {} }
"#,
        )
        .unwrap();
        let contracts = build_contracts(&description, BuildOptions::default()).unwrap();

        let mut faithful = surface("getPet");
        faithful.status_codes = BTreeSet::from([200, 404, 422, 500]);
        faithful.security = BTreeSet::new();
        assert!(validate_against(&contracts, &[("laravel".into(), vec![faithful.clone()])]).is_clean());

        let mut reordered = faithful.clone();
        reordered.parameters.reverse();
        let report = validate_against(
            &contracts,
            &[
                ("laravel".into(), vec![reordered.clone()]),
                ("slim".into(), vec![reordered]),
            ],
        );
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].emitter_a, CONTRACT);
        assert_eq!(report.findings[0].emitter_b, "laravel");
        assert_eq!(report.findings[0].field, SurfaceField::Parameters);
        assert_eq!(report.emitters, vec!["laravel", "slim"]);
    }
}
