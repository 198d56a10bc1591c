/// A label picked by the confidence policy together with the confidence reported for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub index: Option<usize>,
    pub confidence: f32,
    pub fallback: bool,
}

/// Trusts the top class only when its probability reaches `threshold`.
///
/// Anything below the floor is reported as the fallback label with confidence
/// 1.0. This intentionally discards the model's uncertainty: a low-confidence
/// diagnosis is never surfaced as an actionable finding.
#[derive(Debug, Clone, Copy)]
pub struct ConfidencePolicy {
    threshold: f32,
}

impl ConfidencePolicy {
    pub const DEFAULT_THRESHOLD: f32 = 0.5;

    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn apply(&self, probabilities: &[f32]) -> Verdict {
        let mut best: Option<(usize, f32)> = None;
        for (index, &p) in probabilities.iter().enumerate() {
            if p.is_nan() {
                continue;
            }
            // Ties keep the first index.
            match best {
                Some((_, top)) if p <= top => {}
                _ => best = Some((index, p)),
            }
        }

        match best {
            Some((index, confidence)) if confidence >= self.threshold => Verdict {
                index: Some(index),
                confidence,
                fallback: false,
            },
            _ => Verdict {
                index: None,
                confidence: 1.0,
                fallback: true,
            },
        }
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confident_prediction_keeps_argmax() {
        let verdict = ConfidencePolicy::default().apply(&[0.1, 0.7, 0.2]);
        assert_eq!(
            verdict,
            Verdict {
                index: Some(1),
                confidence: 0.7,
                fallback: false
            }
        );
    }

    #[test]
    fn low_confidence_falls_back_with_full_confidence() {
        let verdict = ConfidencePolicy::default().apply(&[0.3, 0.4, 0.3]);
        assert!(verdict.fallback);
        assert_eq!(verdict.index, None);
        assert_eq!(verdict.confidence, 1.0);
    }

    #[test]
    fn floor_is_inclusive() {
        let verdict = ConfidencePolicy::new(0.5).apply(&[0.5, 0.5]);
        assert_eq!(verdict.index, Some(0));
        assert_eq!(verdict.confidence, 0.5);
    }

    #[test]
    fn threshold_is_configurable() {
        let strict = ConfidencePolicy::new(0.9);
        assert!(strict.apply(&[0.85, 0.15]).fallback);

        let lenient = ConfidencePolicy::new(0.0);
        assert_eq!(lenient.apply(&[0.2, 0.3, 0.25, 0.25]).index, Some(1));
    }

    #[test]
    fn empty_and_nan_vectors_fall_back() {
        assert!(ConfidencePolicy::default().apply(&[]).fallback);
        assert!(ConfidencePolicy::default().apply(&[f32::NAN, f32::NAN]).fallback);
        assert_eq!(
            ConfidencePolicy::default().apply(&[f32::NAN, 0.9]).index,
            Some(1)
        );
    }
}
