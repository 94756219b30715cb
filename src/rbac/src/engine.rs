//! Generation engine
//!
//! Orchestrates one run: normalize, build the reference graph, validate,
//! synthesize, report. A run is a pure function of its input records and the
//! generator's catalog/config; independent runs share nothing mutable and
//! may execute on separate threads.

use crate::definition::{DefinitionNormalizer, TemplateCatalog};
use crate::error::{Result, RolegenError};
use crate::graph::{GraphValidator, ReferenceGraphBuilder, ValidationResult};
use crate::report::GenerationReport;
use crate::synth::{ManifestSynthesizer, SynthesizerConfig};
use rolegen_core::{DefinitionSource, RawDefinition};
use std::time::Instant;
use tracing::{debug, info};

/// Generator holding the injected, read-only run configuration
#[derive(Debug, Clone)]
pub struct Generator {
    catalog: TemplateCatalog,
    config: SynthesizerConfig,
}

impl Generator {
    /// Create a generator with default synthesizer settings
    pub fn new(catalog: TemplateCatalog) -> Result<Self> {
        Self::with_config(catalog, SynthesizerConfig::default())
    }

    /// Create a generator with custom settings
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog or settings are invalid.
    pub fn with_config(catalog: TemplateCatalog, config: SynthesizerConfig) -> Result<Self> {
        catalog.validate()?;
        config.validate()?;
        Ok(Self { catalog, config })
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    /// Run generation over records from a source
    pub fn generate_from<S>(&self, source: &S) -> Result<GenerationReport>
    where
        S: DefinitionSource + ?Sized,
    {
        let records = source.load()?;
        self.generate(&records)
    }

    /// Run generation over raw records in authoring order
    ///
    /// A malformed record aborts the run with `MalformedDefinition`. Graph
    /// violations do not: they come back in the report with `manifests` unset.
    pub fn generate(&self, records: &[RawDefinition]) -> Result<GenerationReport> {
        let started = Instant::now();

        let definitions = DefinitionNormalizer::new(&self.catalog).normalize_all(records)?;
        let graph = ReferenceGraphBuilder::with_definitions(definitions).build();
        let validation = GraphValidator::new().validate(&graph);

        let manifests = if validation.is_valid() {
            Some(ManifestSynthesizer::with_config(&self.catalog, self.config.clone()).synthesize(&graph)?)
        } else {
            debug!(errors = validation.errors.len(), "skipping synthesis");
            None
        };

        let report = GenerationReport::new(&graph, validation, manifests);
        info!(
            definitions = report.summary.definitions,
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            objects = report.manifests.as_ref().map_or(0, |m| m.len()),
            elapsed_us = started.elapsed().as_micros() as u64,
            "generation run complete"
        );
        Ok(report)
    }

    /// Like `generate`, but a malformed record becomes a failed report
    ///
    /// Lets CLI and CI callers print every problem in one format.
    pub fn generate_report(&self, records: &[RawDefinition]) -> Result<GenerationReport> {
        match self.generate(records) {
            Err(err @ RolegenError::MalformedDefinition { .. }) => {
                let violation = err.as_violation().ok_or(err)?;
                Ok(GenerationReport::aborted(ValidationResult::malformed(violation)))
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ViolationKind;

    fn records() -> Vec<RawDefinition> {
        vec![
            RawDefinition::new("foo", "oncall")
                .with_namespaces(&["a"])
                .with_clusters(&["prod"]),
            RawDefinition::new("foo", "oncall")
                .with_namespaces(&["b"])
                .with_clusters(&["prod"])
                .reusing(),
        ]
    }

    #[test]
    fn test_generate_valid() {
        let generator = Generator::new(TemplateCatalog::builtin()).unwrap();
        let report = generator.generate(&records()).unwrap();

        assert!(report.is_success());
        assert_eq!(report.summary.reuse_edges, 1);
        assert_eq!(report.summary.cluster_roles, 1);
        assert_eq!(report.summary.role_bindings, 2);
    }

    #[test]
    fn test_generate_from_source() {
        let generator = Generator::new(TemplateCatalog::builtin()).unwrap();
        let report = generator.generate_from(&records()).unwrap();
        assert!(report.is_success());
    }

    #[test]
    fn test_malformed_aborts() {
        let generator = Generator::new(TemplateCatalog::builtin()).unwrap();
        let mut input = records();
        input[1].clusters.clear();

        assert!(matches!(
            generator.generate(&input),
            Err(RolegenError::MalformedDefinition { .. })
        ));

        let report = generator.generate_report(&input).unwrap();
        assert!(!report.is_success());
        assert_eq!(report.validation.errors[0].kind, ViolationKind::MalformedDefinition);
        assert_eq!(report.validation.errors[0].definition_ref.position, 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = SynthesizerConfig {
            binding_prefix: String::new(),
            ..Default::default()
        };
        assert!(Generator::with_config(TemplateCatalog::builtin(), config).is_err());
    }
}
