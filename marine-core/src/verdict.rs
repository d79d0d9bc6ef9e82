//! Local piracy verdict for matching results.

/// Score at or above which a match is classified as piracy.
pub const DEFAULT_PIRACY_THRESHOLD: f64 = 85.0;

/// Outcome of applying the threshold to a match score.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Score reached the threshold. `report_url` identifies the reported copy.
    Piracy { score: f64, report_url: String },
    Clean { score: f64 },
}

impl Verdict {
    pub fn is_piracy(&self) -> bool {
        matches!(self, Self::Piracy { .. })
    }
}

/// Threshold classification plus the reporting URL scheme.
#[derive(Debug, Clone)]
pub struct VerdictPolicy {
    pub threshold: f64,
    /// Base the reporting URL is derived from; the filename is appended.
    pub report_base_url: String,
}

impl Default for VerdictPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_PIRACY_THRESHOLD,
            report_base_url: "https://example.com/pirated/".to_string(),
        }
    }
}

impl VerdictPolicy {
    pub fn classify(&self, score: f64, filename: &str) -> Verdict {
        if score >= self.threshold {
            Verdict::Piracy {
                score,
                report_url: self.report_url(filename),
            }
        } else {
            Verdict::Clean { score }
        }
    }

    fn report_url(&self, filename: &str) -> String {
        if self.report_base_url.ends_with('/') {
            format!("{}{}", self.report_base_url, filename)
        } else {
            format!("{}/{}", self.report_base_url, filename)
        }
    }
}
