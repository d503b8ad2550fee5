//! Self-check verdict parsing.

use tracing::debug;

/// The outcome of the grounding check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The verifier answered YES: the draft stands as the final answer.
    Supported,
    /// Anything else, including empty or hedged output: the draft is repaired.
    Unsupported,
}

impl Verdict {
    pub fn passed(self) -> bool {
        self == Verdict::Supported
    }
}

/// Interpret the verifier's raw reply.
///
/// Only a reply beginning with "YES" (ignoring case and leading whitespace)
/// passes. The check is fail-closed: "Y", "yes-ish" prose that starts
/// differently, "NO", and empty output are all `Unsupported`.
pub fn parse_verdict(raw: &str) -> Verdict {
    let normalized = raw.trim().to_uppercase();
    let verdict = if normalized.starts_with("YES") {
        Verdict::Supported
    } else {
        Verdict::Unsupported
    };
    debug!(reply = %raw.trim(), ?verdict, "parsed self-check verdict");
    verdict
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_passes_in_any_case() {
        assert_eq!(parse_verdict("YES"), Verdict::Supported);
        assert_eq!(parse_verdict("yes"), Verdict::Supported);
        assert_eq!(parse_verdict("Yes."), Verdict::Supported);
        assert_eq!(parse_verdict("  yes, fully supported"), Verdict::Supported);
    }

    #[test]
    fn no_fails() {
        assert_eq!(parse_verdict("NO"), Verdict::Unsupported);
        assert_eq!(parse_verdict("no"), Verdict::Unsupported);
    }

    /// Ambiguous or empty replies must route to repair, never to acceptance.
    #[test]
    fn ambiguous_output_fails_closed() {
        assert_eq!(parse_verdict(""), Verdict::Unsupported);
        assert_eq!(parse_verdict("   "), Verdict::Unsupported);
        assert_eq!(parse_verdict("Y"), Verdict::Unsupported);
        assert_eq!(parse_verdict("Mostly yes"), Verdict::Unsupported);
        assert_eq!(parse_verdict("I think YES"), Verdict::Unsupported);
    }

    #[test]
    fn passed_reflects_verdict() {
        assert!(Verdict::Supported.passed());
        assert!(!Verdict::Unsupported.passed());
    }
}
