//! Human-readable rendering of a generation report

use rolegen_rbac::{GenerationReport, ValidationResult};
use std::fmt::Write;

/// One line per violation: `<severity>: <definition> <Kind>: <message>`
///
/// Errors come first, each group in detection order.
pub fn violation_lines(validation: &ValidationResult) -> Vec<String> {
    let errors = validation.errors.iter().map(|v| format!("error: {}", v));
    let warnings = validation.warnings.iter().map(|v| format!("warning: {}", v));
    errors.chain(warnings).collect()
}

/// Full text report: violations followed by a summary line
pub fn render_text(report: &GenerationReport) -> String {
    let mut out = String::new();
    for line in violation_lines(&report.validation) {
        let _ = writeln!(out, "{}", line);
    }

    let summary = &report.summary;
    if report.is_success() {
        let _ = writeln!(
            out,
            "ok: {} definitions, {} ClusterRoles ({} reused), {} Roles, {} RoleBindings, {} warnings",
            summary.definitions,
            summary.cluster_roles,
            summary.reuse_edges,
            summary.roles,
            summary.role_bindings,
            summary.warnings
        );
    } else {
        let _ = writeln!(
            out,
            "failed: {} errors, {} warnings; no manifests generated",
            summary.errors, summary.warnings
        );
    }
    out
}
