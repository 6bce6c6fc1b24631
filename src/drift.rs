//! Contract drift: documented requests checked against the API contract.

use std::collections::{BTreeSet, HashSet};

use crate::claims::{EndpointClaim, Extraction};
use crate::contract::{ApiContract, Endpoint};
use crate::types::{Finding, Location, Rule};

/// A declared parameter that differs from `name` only in case or separators.
fn near_miss<'a>(endpoint: &'a Endpoint, name: &str) -> Option<&'a str> {
    let wanted = squash(name);
    return endpoint
        .parameters
        .iter()
        .find(|p| return squash(&p.name) == wanted)
        .map(|p| return p.name.as_str());
}

/// Findings for one claim against its matched endpoint.
fn check_matched(claim: &EndpointClaim, endpoint: &Endpoint, findings: &mut Vec<Finding>) {
    let mut seen = HashSet::new();
    for name in &claim.parameters {
        if !seen.insert(name.as_str()) || endpoint.has_parameter(name) {
            continue;
        }
        let hint = near_miss(endpoint, name).map_or_else(String::new, |declared| {
            return format!(" (the contract declares `{declared}`)");
        });
        findings.push(Finding::new(
            Rule::DriftUnknownParameter,
            Location::at(&claim.slug, claim.line),
            format!(
                "`{} {}` documents parameter `{name}`, which the endpoint does not declare{hint}",
                claim.method, endpoint.template
            ),
        ));
    }
}

/// Model ids the platform does not serve, when the models list is known.
fn check_models(claim: &EndpointClaim, contract: &ApiContract, findings: &mut Vec<Finding>) {
    let Some(models) = &contract.models else {
        return;
    };
    for model in &claim.models {
        if !models.contains_key(model) {
            findings.push(Finding::new(
                Rule::DriftUnknownModel,
                Location::at(&claim.slug, claim.line),
                format!("model `{model}` is not in the platform's models list"),
            ));
        }
    }
}

/// Methods under which the contract serves a path.
fn methods_for(contract: &ApiContract, path: &str) -> Vec<String> {
    let methods: BTreeSet<&str> = contract.endpoints.keys().map(|k| return k.method.as_str()).collect();
    return methods
        .into_iter()
        .filter(|method| return contract.find(method, path).is_some())
        .map(str::to_string)
        .collect();
}

/// Lowercase with `_` and `-` removed, for near-miss hints.
fn squash(name: &str) -> String {
    return name
        .chars()
        .filter(|c| return !matches!(c, '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect();
}

/// Compare every claim with the contract.
///
/// Unmatched confident claims are errors; unmatched claims whose base URL
/// is a variable, and samples that yielded no claim, become low-confidence
/// notes. With `coverage`, endpoints no claim reached are reported too.
pub fn validate(contract: &ApiContract, extraction: &Extraction, coverage: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut documented: HashSet<(String, String)> = HashSet::new();

    for claim in &extraction.claims {
        check_models(claim, contract, &mut findings);

        let Some(endpoint) = contract.find(&claim.method, &claim.path) else {
            findings.push(unmatched(claim, contract));
            continue;
        };
        documented.insert((endpoint.method.clone(), endpoint.template.normalized()));
        check_matched(claim, endpoint, &mut findings);
    }

    for miss in &extraction.misses {
        findings.push(Finding::new(
            Rule::DriftLowConfidence,
            Location::at(&miss.slug, miss.line),
            format!("code sample {}", miss.reason),
        ));
    }

    if coverage {
        let source = contract.file.display().to_string();
        for (key, endpoint) in &contract.endpoints {
            if !documented.contains(&(key.method.clone(), key.path.clone())) {
                findings.push(Finding::new(
                    Rule::DriftUndocumentedEndpoint,
                    Location::page(&source),
                    format!("`{} {}` is not documented on any page", endpoint.method, endpoint.template),
                ));
            }
        }
    }

    tracing::info!(
        claims = extraction.claims.len(),
        endpoints = contract.endpoints.len(),
        findings = findings.len(),
        "contract drift checked"
    );
    return findings;
}

/// The finding for a claim with no matching endpoint.
fn unmatched(claim: &EndpointClaim, contract: &ApiContract) -> Finding {
    let location = Location::at(&claim.slug, claim.line);
    if !claim.confident {
        return Finding::new(
            Rule::DriftLowConfidence,
            location,
            format!(
                "`{} {}` (base URL is a variable) matches no contract endpoint; check the sample by hand",
                claim.method, claim.path
            ),
        );
    }

    let other_methods = methods_for(contract, &claim.path);
    let hint = if other_methods.is_empty() {
        String::new()
    } else {
        format!(" (the path is served for {})", other_methods.join(", "))
    };
    return Finding::new(
        Rule::DriftUnknownEndpoint,
        location,
        format!(
            "documented request `{} {}` has no endpoint in `{}`{hint}",
            claim.method,
            claim.path,
            contract.file.display()
        ),
    );
}
