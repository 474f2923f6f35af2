use certflow_core::config::InvalidDocumentPolicy;
use certflow_core::types::{
    FinalVerdict, SectionOutcome, SectionResult, VerdictDetails, INVALID_DOCUMENT_REASON,
};

pub const ACCEPTED_REASON: &str = "all validations passed";

/// Whole-document signals computed before fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentSignals {
    pub logo_passed: bool,
    pub signatures_passed: bool,
}

/// Combine per-section results with whole-document signals.
///
/// Accepted only when the logo check, the signature check and every section
/// pass. With no section results the validity and person dimensions fail.
/// `reason` names the first failing dimension in priority order: logo,
/// validity, signature, person.
pub fn compile_verdict(signals: DocumentSignals, sections: &[SectionResult]) -> FinalVerdict {
    let any = !sections.is_empty();
    let details = VerdictDetails {
        logo_validation_passed: signals.logo_passed,
        validity_validation_passed: any && sections.iter().all(|s| s.verdict.dates_valid),
        signature_validation_passed: signals.signatures_passed,
        person_validation_passed: any && sections.iter().all(|s| s.verdict.person_found),
    };

    let mut outcomes: Vec<SectionOutcome> = sections
        .iter()
        .map(|s| SectionOutcome {
            section_index: s.section_index,
            passed: s.verdict.passed(),
            dates_valid: s.verdict.dates_valid,
            person_found: s.verdict.person_found,
        })
        .collect();
    outcomes.sort_by_key(|o| o.section_index);

    let failing: Vec<usize> = outcomes
        .iter()
        .filter(|o| !o.passed)
        .map(|o| o.section_index)
        .collect();

    let (accepted, reason) = match details.first_failure() {
        None => (true, ACCEPTED_REASON.to_string()),
        Some(dimension) if failing.is_empty() => (false, dimension.failure_reason().to_string()),
        Some(dimension) => {
            let list = failing
                .iter()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            (
                false,
                format!("{} (failing sections: {})", dimension.failure_reason(), list),
            )
        }
    };

    FinalVerdict {
        accepted,
        reason,
        details,
        sections: outcomes,
    }
}

/// Fixed verdict for documents that never reached section validation.
///
/// Under [`InvalidDocumentPolicy::Discard`] every detail is false regardless
/// of checks already run. `Preserve` reports the earlier logo and signature
/// outcomes; the verdict is rejected either way.
pub fn invalid_document_verdict(
    policy: InvalidDocumentPolicy,
    signals: Option<DocumentSignals>,
) -> FinalVerdict {
    let details = match (policy, signals) {
        (InvalidDocumentPolicy::Preserve, Some(s)) => VerdictDetails {
            logo_validation_passed: s.logo_passed,
            signature_validation_passed: s.signatures_passed,
            ..Default::default()
        },
        _ => VerdictDetails::default(),
    };
    FinalVerdict {
        accepted: false,
        reason: INVALID_DOCUMENT_REASON.to_string(),
        details,
        sections: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use certflow_core::types::{SectionVerdict, ValidatedData};

    fn section(index: usize, dates_valid: bool, person_found: bool) -> SectionResult {
        SectionResult {
            section_index: index,
            validated_data: ValidatedData::default(),
            verdict: SectionVerdict {
                dates_valid,
                person_found,
                notes: None,
            },
        }
    }

    const ALL_PASS: DocumentSignals = DocumentSignals {
        logo_passed: true,
        signatures_passed: true,
    };

    #[test]
    fn test_all_pass_accepted() {
        let verdict = compile_verdict(ALL_PASS, &[section(1, true, true)]);
        assert!(verdict.accepted);
        assert_eq!(verdict.reason, ACCEPTED_REASON);
        assert!(verdict.details.first_failure().is_none());
        assert_eq!(verdict.sections.len(), 1);
    }

    #[test]
    fn test_logo_reported_before_other_failures() {
        let signals = DocumentSignals {
            logo_passed: false,
            signatures_passed: false,
        };
        let verdict = compile_verdict(signals, &[section(1, false, false)]);
        assert!(!verdict.accepted);
        assert!(verdict.reason.starts_with("insurer logo"));
        assert!(!verdict.details.signature_validation_passed);
        assert!(!verdict.details.validity_validation_passed);
    }

    #[test]
    fn test_one_failing_section_rejects() {
        let sections = vec![
            section(1, true, true),
            section(2, false, true),
            section(3, true, true),
        ];
        let verdict = compile_verdict(ALL_PASS, &sections);
        assert!(!verdict.accepted);
        assert!(verdict.reason.contains("validity"));
        assert!(verdict.reason.contains("failing sections: 2"));
        assert!(verdict.details.person_validation_passed);
        let passed: Vec<bool> = verdict.sections.iter().map(|s| s.passed).collect();
        assert_eq!(passed, vec![true, false, true]);
    }

    #[test]
    fn test_person_failure_after_signature() {
        let signals = DocumentSignals {
            logo_passed: true,
            signatures_passed: false,
        };
        let verdict = compile_verdict(signals, &[section(1, true, false)]);
        assert!(verdict.reason.starts_with("required signatures"));
        assert!(!verdict.details.person_validation_passed);
    }

    #[test]
    fn test_no_sections_fails_section_dimensions() {
        let verdict = compile_verdict(ALL_PASS, &[]);
        assert!(!verdict.accepted);
        assert!(!verdict.details.validity_validation_passed);
        assert!(!verdict.details.person_validation_passed);
    }

    #[test]
    fn test_outcomes_sorted_by_index() {
        let verdict = compile_verdict(ALL_PASS, &[section(2, true, true), section(1, true, true)]);
        let order: Vec<usize> = verdict.sections.iter().map(|s| s.section_index).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn test_invalid_discards_signals() {
        let verdict = invalid_document_verdict(InvalidDocumentPolicy::Discard, Some(ALL_PASS));
        assert!(!verdict.accepted);
        assert_eq!(verdict.reason, INVALID_DOCUMENT_REASON);
        assert_eq!(verdict.details, VerdictDetails::default());
    }

    #[test]
    fn test_invalid_preserves_signals() {
        let verdict = invalid_document_verdict(InvalidDocumentPolicy::Preserve, Some(ALL_PASS));
        assert!(!verdict.accepted);
        assert!(verdict.details.logo_validation_passed);
        assert!(verdict.details.signature_validation_passed);
        assert!(!verdict.details.validity_validation_passed);
        assert!(!verdict.details.person_validation_passed);
    }
}
