use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;

use crate::analyzer::Analysis;
use crate::summary::{self, AnalysisSummary, SummaryNamespace};
use crate::warning::Severity;

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq, Debug)]
pub enum SerializationFormat {
    Text,
    Json,
}

pub struct Printer {
    format: SerializationFormat,
}

impl Printer {
    pub fn new(format: SerializationFormat) -> Self {
        Self { format }
    }

    pub fn write_once(&self, analysis: &Analysis) -> Result<()> {
        match self.format {
            SerializationFormat::Json => {
                let summary = summary::emit(analysis)?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
            SerializationFormat::Text => {
                let warnings = analysis.warnings();
                for warning in &warnings {
                    println!("{warning}");
                }
                let errors = warnings
                    .iter()
                    .filter(|warning| warning.severity == Severity::Error)
                    .count();

                let summary = summary::emit(analysis)?;
                let (elements, mixins, classes) = count_features(&summary);
                println!(
                    "Analyzed {} document(s): {elements} element(s), {mixins} mixin(s), {classes} class(es).",
                    analysis.documents().len(),
                );
                if !warnings.is_empty() {
                    println!(
                        "Found {} warning(s) ({} error(s)).",
                        warnings.len().to_string().bold(),
                        errors
                    );
                }
            }
        }
        Ok(())
    }
}

fn count_features(summary: &AnalysisSummary) -> (usize, usize, usize) {
    fn count_namespace(namespace: &SummaryNamespace) -> (usize, usize, usize) {
        let mut totals = (
            namespace.elements.len(),
            namespace.mixins.len(),
            namespace.classes.len(),
        );
        for child in &namespace.namespaces {
            let nested = count_namespace(child);
            totals.0 += nested.0;
            totals.1 += nested.1;
            totals.2 += nested.2;
        }
        totals
    }

    let mut totals = (
        summary.elements.len(),
        summary.mixins.len(),
        summary.classes.len(),
    );
    for namespace in &summary.namespaces {
        let nested = count_namespace(namespace);
        totals.0 += nested.0;
        totals.1 += nested.1;
        totals.2 += nested.2;
    }
    totals
}
