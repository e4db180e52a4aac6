//! Vulnerability gate: scan verdicts and admission control.

use crate::config::{JobContext, PipelineConfig};
use crate::error::StageError;
use crate::pipeline::StageOutcome;
use crate::runner::{CommandOutput, CommandRunner};
use crate::stage::RuntimeStage;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// One finding from the scanner's JSON report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Finding {
    pub id: String,
    pub title: String,
    pub severity: String,
    pub package_name: String,
}

#[derive(Debug, Deserialize)]
struct ScanReport {
    #[serde(default)]
    vulnerabilities: Vec<Finding>,
}

/// Gate evaluation verdict.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanVerdict {
    /// No disallowed findings.
    Clean,

    /// The scanner itself failed to run.
    ScannerFailed { stderr: String },

    /// The scanner ran and reported findings.
    Rejected {
        findings: Vec<Finding>,
        report: String,
    },
}

impl ScanVerdict {
    /// Classify a scanner run.
    ///
    /// - exit 0: clean
    /// - non-zero with stderr output: the scanner broke
    /// - non-zero with empty stderr: findings on stdout
    pub fn classify(output: &CommandOutput) -> Self {
        if output.passed() {
            ScanVerdict::Clean
        } else if !output.stderr.trim().is_empty() {
            ScanVerdict::ScannerFailed {
                stderr: output.stderr.clone(),
            }
        } else {
            ScanVerdict::Rejected {
                findings: parse_findings(&output.stdout),
                report: output.stdout.clone(),
            }
        }
    }

    pub fn passed(&self) -> bool {
        matches!(self, ScanVerdict::Clean)
    }

    /// Convert a failing verdict to its stage error.
    pub fn into_error(self) -> Option<StageError> {
        match self {
            ScanVerdict::Clean => None,
            ScanVerdict::ScannerFailed { stderr } => {
                Some(StageError::ScanExecution { reason: stderr })
            }
            ScanVerdict::Rejected { findings, report } => Some(StageError::AdmissionRejected {
                // A rejection always counts at least once, even if the report
                // was not machine readable.
                findings: findings.len().max(1),
                report,
            }),
        }
    }
}

/// Best-effort parse of the scanner report.
///
/// The scanner emits one report object, or an array of them when several
/// projects were scanned. Unparseable output yields no findings.
pub fn parse_findings(stdout: &str) -> Vec<Finding> {
    if let Ok(report) = serde_json::from_str::<ScanReport>(stdout) {
        return report.vulnerabilities;
    }
    if let Ok(reports) = serde_json::from_str::<Vec<ScanReport>>(stdout) {
        return reports
            .into_iter()
            .flat_map(|r| r.vulnerabilities)
            .collect();
    }
    Vec::new()
}

/// Scans the job's image and blocks it on high-severity findings.
pub struct VulnerabilityGate<'a> {
    runner: &'a dyn CommandRunner,
    config: &'a PipelineConfig,
}

impl<'a> VulnerabilityGate<'a> {
    pub fn new(runner: &'a dyn CommandRunner, config: &'a PipelineConfig) -> Self {
        Self { runner, config }
    }

    pub async fn check(&self, job: &JobContext) -> StageOutcome<()> {
        let command = RuntimeStage::Scan.command(job, self.config);
        let output = match self.runner.run(&command, None).await {
            Ok(output) => output,
            Err(e) => {
                error!(error = %e, "Vulnerability scanner could not be started");
                return StageOutcome::Abort(StageError::ScanExecution {
                    reason: e.to_string(),
                });
            }
        };

        let verdict = ScanVerdict::classify(&output);
        match &verdict {
            ScanVerdict::Clean => {
                info!(duration_ms = output.duration_ms, "Scanned image");
            }
            ScanVerdict::ScannerFailed { stderr } => {
                error!(
                    exit_code = output.exit_code,
                    stderr = %stderr.trim(),
                    "Got an error while scanning the image"
                );
            }
            ScanVerdict::Rejected { findings, report } => {
                warn!(
                    findings = findings.len(),
                    report = %report.trim(),
                    "Found vulnerabilities during the image scan"
                );
            }
        }

        match verdict.into_error() {
            None => StageOutcome::Continue(()),
            Some(e) => StageOutcome::Abort(e),
        }
    }
}
