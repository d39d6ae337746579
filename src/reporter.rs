use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::{
    sdk_version::SdkVersion,
    transformation_engine::{TransformationResult, TransformationWarning},
    transformation_rule::{AppliedTransformation, TransformationType},
};

/// Reporter for generating transformation reports in various formats
pub struct TransformationReporter {
    output_format: ReportFormat,
}

/// Available output formats for transformation reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Yaml,
}

/// Summary of one conversion run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformationReport {
    pub source_version: Option<SdkVersion>,
    pub target_version: Option<SdkVersion>,
    pub applied_transformations: Vec<AppliedTransformation>,
    pub warnings: Vec<TransformationWarning>,
    pub created_objects: Vec<String>,
    pub transformation_summary: TransformationSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformationSummary {
    pub total_transformations: usize,
    pub versions_stamped: usize,
    pub members_removed: usize,
    pub members_retyped: usize,
    pub structs_promoted: usize,
    pub skipped_rules: usize,
}

impl TransformationReporter {
    pub fn new() -> Self {
        Self {
            output_format: ReportFormat::Console,
        }
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.output_format = format;
        self
    }

    pub fn generate_report(&self, result: &TransformationResult) -> TransformationReport {
        TransformationReport {
            source_version: result.source_version.clone(),
            target_version: result.target_version.clone(),
            applied_transformations: result.applied_transformations.clone(),
            warnings: result.warnings.clone(),
            created_objects: result.created_objects.clone(),
            transformation_summary: self
                .create_transformation_summary(&result.applied_transformations, &result.warnings),
        }
    }

    /// Format the report according to the configured output format
    pub fn format_report(&self, report: &TransformationReport) -> Result<String, ReportError> {
        match self.output_format {
            ReportFormat::Console => Ok(self.format_console_report(report)),
            ReportFormat::Json => serde_json::to_string_pretty(report)
                .map_err(|e| ReportError::SerializationError(e.to_string())),
            ReportFormat::Yaml => serde_yaml::to_string(report)
                .map_err(|e| ReportError::SerializationError(e.to_string())),
        }
    }

    fn create_transformation_summary(
        &self,
        transformations: &[AppliedTransformation],
        warnings: &[TransformationWarning],
    ) -> TransformationSummary {
        let mut summary = TransformationSummary {
            total_transformations: transformations.len(),
            skipped_rules: warnings.iter().filter(|w| w.rule_id.is_some()).count(),
            ..TransformationSummary::default()
        };

        for transformation in transformations {
            match transformation.transformation_type {
                TransformationType::StampVersion => summary.versions_stamped += 1,
                TransformationType::RemoveMember => summary.members_removed += 1,
                TransformationType::RetypeMember => summary.members_retyped += 1,
                TransformationType::PromoteStruct => summary.structs_promoted += 1,
            }
        }

        summary
    }

    fn format_console_report(&self, report: &TransformationReport) -> String {
        let mut output = String::new();

        output.push_str("=== Tag File Conversion Report ===\n\n");

        let version_or_unknown =
            |version: &Option<SdkVersion>| version.as_ref().map_or("Unknown".to_string(), |v| v.to_string());
        output.push_str(&format!("Source Version: {}\n", version_or_unknown(&report.source_version)));
        output.push_str(&format!("Target Version: {}\n\n", version_or_unknown(&report.target_version)));

        let summary = &report.transformation_summary;
        output.push_str(&format!("Transformations Applied: {}\n", summary.total_transformations));
        output.push_str(&format!("  Versions stamped: {}\n", summary.versions_stamped));
        output.push_str(&format!("  Members removed: {}\n", summary.members_removed));
        output.push_str(&format!("  Members retyped: {}\n", summary.members_retyped));
        output.push_str(&format!("  Structs promoted: {}\n", summary.structs_promoted));

        if !report.created_objects.is_empty() {
            output.push_str(&format!("Objects Created: {}\n", report.created_objects.join(", ")));
        }

        if !report.warnings.is_empty() {
            output.push_str("\nWarnings:\n");
            for warning in &report.warnings {
                match &warning.rule_id {
                    Some(rule_id) => output.push_str(&format!("  • [{}] {}\n", rule_id, warning.message)),
                    None => output.push_str(&format!("  • {}\n", warning.message)),
                }
            }
        }

        output
    }
}

impl Default for TransformationReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
