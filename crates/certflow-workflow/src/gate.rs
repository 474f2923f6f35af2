/// Terms identifying a complementary work-risk insurance certificate.
pub const SCTR_VOCABULARY: &[&str] = &[
    "seguro complementario de trabajo de riesgo",
    "sctr",
    "constancia",
    "póliza",
    "riesgos laborales",
    "accidente de trabajo",
    "cobertura",
    "vigencia",
    "asegurado",
];

pub const DEFAULT_THRESHOLD: usize = 3;

/// Outcome of gating a document's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub admitted: bool,
    /// Vocabulary terms found, in vocabulary order.
    pub matched: Vec<String>,
}

/// Bag-of-keywords admission check.
///
/// The text is lower-cased and each vocabulary term is tested for substring
/// presence. A document is admitted when at least `threshold` distinct terms
/// occur. No stemming, weighting or negative evidence.
#[derive(Debug, Clone)]
pub struct DocumentGate {
    vocabulary: Vec<String>,
    threshold: usize,
}

impl Default for DocumentGate {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl DocumentGate {
    pub fn new(threshold: usize) -> Self {
        Self::with_vocabulary(SCTR_VOCABULARY.iter().copied(), threshold)
    }

    pub fn with_vocabulary<I, T>(terms: I, threshold: usize) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut vocabulary: Vec<String> = Vec::new();
        for term in terms {
            let term = term.into().to_lowercase();
            if !term.is_empty() && !vocabulary.contains(&term) {
                vocabulary.push(term);
            }
        }
        Self {
            vocabulary,
            threshold,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn evaluate(&self, text: &str) -> GateDecision {
        let lowered = text.to_lowercase();
        let matched: Vec<String> = self
            .vocabulary
            .iter()
            .filter(|term| lowered.contains(term.as_str()))
            .cloned()
            .collect();
        GateDecision {
            admitted: matched.len() >= self.threshold,
            matched,
        }
    }

    pub fn admits(&self, text: &str) -> bool {
        self.evaluate(text).admitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_terms_admitted() {
        let gate = DocumentGate::default();
        let text = "CONSTANCIA DE SEGURO COMPLEMENTARIO DE TRABAJO DE RIESGO. \
                    Póliza N° 123. Vigencia: 01/01/2024 al 31/01/2024";
        let decision = gate.evaluate(text);
        assert!(decision.admitted);
        assert!(decision.matched.contains(&"póliza".to_string()));
        assert!(decision.matched.contains(&"vigencia".to_string()));
    }

    #[test]
    fn test_exactly_three_matches() {
        let gate = DocumentGate::default();
        let text = "seguro complementario de trabajo de riesgo, póliza, vigencia";
        let decision = gate.evaluate(text);
        // "sctr" is not a substring of the long form
        assert_eq!(decision.matched.len(), 3);
        assert!(decision.admitted);
    }

    #[test]
    fn test_invoice_rejected() {
        let gate = DocumentGate::default();
        let decision = gate.evaluate("FACTURA ELECTRÓNICA\nTotal: S/ 120.00");
        assert!(!decision.admitted);
        assert!(decision.matched.is_empty());
    }

    #[test]
    fn test_two_matches_rejected() {
        let gate = DocumentGate::default();
        assert!(!gate.admits("Factura con cobertura y vigencia"));
    }

    #[test]
    fn test_repeated_term_counts_once() {
        let gate = DocumentGate::default();
        assert!(!gate.admits("vigencia vigencia vigencia cobertura"));
    }

    #[test]
    fn test_case_insensitive() {
        let gate = DocumentGate::default();
        assert!(gate.admits("SCTR - COBERTURA - ASEGURADO"));
    }

    #[test]
    fn test_custom_threshold() {
        let gate = DocumentGate::new(1);
        assert!(gate.admits("solo una constancia"));
        assert_eq!(gate.threshold(), 1);
    }

    #[test]
    fn test_custom_vocabulary_dedup() {
        let gate = DocumentGate::with_vocabulary(["Alpha", "alpha", "beta"], 2);
        assert!(gate.admits("ALPHA and BETA"));
        assert!(!gate.admits("alpha alpha"));
    }
}
