//! Dichotomy search for the maximum secure value of a scalar parameter.
//!
//! The typical parameter is a commercial exchange level: the caller shifts
//! the network to the probed level, runs the remedial-action optimizer, and
//! translates its result into a [`SecurityVerdict`]. The search assumes
//! security is monotonically decreasing in the parameter and bisects the
//! interval until it is narrower than `epsilon`.

use thiserror::Error;
use tracing::{debug, info, warn};

use rao_core::RaoError;

/// Outcome of evaluating security at one parameter value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityVerdict {
    /// All optimized cnecs have non-negative margin after optimization.
    Secure,
    /// At least one optimized cnec stays overloaded.
    Unsecure,
    /// The evaluation itself broke down (load flow divergence, solver
    /// error). Says nothing about security.
    Failure,
}

/// One evaluated point, in probe order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub value: f64,
    pub verdict: SecurityVerdict,
    /// True when this probe is the perturbed retry of a failed one.
    pub retried: bool,
}

#[derive(Debug, Clone)]
pub struct DichotomyConfig {
    /// Terminate once the bracketing interval is narrower than this.
    pub epsilon: f64,
    /// Hard cap on bisection steps, independent of epsilon.
    pub max_iterations: usize,
    /// Retry offset after a failed probe, as a fraction of the current
    /// interval width.
    pub failure_perturbation: f64,
}

impl Default for DichotomyConfig {
    fn default() -> Self {
        Self {
            epsilon: 1.0,
            max_iterations: 64,
            failure_perturbation: 0.02,
        }
    }
}

/// Result of a completed dichotomy. `best_secure` is the highest value
/// proven secure; the true security limit lies within `epsilon` above it
/// when `converged` is set.
#[derive(Debug, Clone)]
pub struct DichotomyResult {
    pub best_secure: f64,
    pub probes: Vec<Probe>,
    pub converged: bool,
}

#[derive(Debug, Error)]
pub enum DichotomyError {
    #[error("invalid interval [{low}, {high}]")]
    InvalidInterval { low: f64, high: f64 },
    #[error("epsilon must be strictly positive, got {0}")]
    InvalidEpsilon(f64),
    /// Even the lower bound is not secure, so no value in the interval can
    /// be certified. The probe history documents what was tried.
    #[error("no secure value in [{low}, {high}]")]
    CapacityNotFound {
        low: f64,
        high: f64,
        probes: Vec<Probe>,
    },
}

impl From<DichotomyError> for RaoError {
    fn from(e: DichotomyError) -> Self {
        match e {
            DichotomyError::CapacityNotFound { low, .. } => {
                RaoError::CapacityNotFound { value: low }
            }
            other => RaoError::Config(other.to_string()),
        }
    }
}

/// Find the maximum secure value in `[low, high]` by bisection.
///
/// The evaluator is called once per probe, strictly sequentially; its call
/// order is deterministic for a given interval and configuration. A probe
/// returning [`SecurityVerdict::Failure`] is retried once at a slightly
/// perturbed value; if the retry fails too, the point is conservatively
/// treated as unsecure. `best_secure` only ever takes values an evaluation
/// actually confirmed secure: when the retry is the one that succeeds, the
/// bracket narrows to the retry value, not to the unconfirmed original.
pub fn find_max_secure_value(
    low: f64,
    high: f64,
    config: &DichotomyConfig,
    mut evaluate: impl FnMut(f64) -> SecurityVerdict,
) -> Result<DichotomyResult, DichotomyError> {
    if !(low < high) || !low.is_finite() || !high.is_finite() {
        return Err(DichotomyError::InvalidInterval { low, high });
    }
    if !(config.epsilon > 0.0) {
        return Err(DichotomyError::InvalidEpsilon(config.epsilon));
    }

    let mut probes = Vec::new();
    let width = high - low;

    let (low_confirmed, low_verdict) =
        probe_with_retry(low, width, low, high, config, &mut evaluate, &mut probes);
    if low_verdict != SecurityVerdict::Secure {
        warn!(low, high, "lower bound is not secure");
        return Err(DichotomyError::CapacityNotFound { low, high, probes });
    }

    let (high_confirmed, high_verdict) =
        probe_with_retry(high, width, low, high, config, &mut evaluate, &mut probes);
    if high_verdict == SecurityVerdict::Secure {
        info!(value = high_confirmed, "upper bound already secure");
        return Ok(DichotomyResult {
            best_secure: high_confirmed,
            probes,
            converged: true,
        });
    }

    let mut secure = low_confirmed;
    let mut unsecure = high;
    let mut iterations = 0;
    while unsecure - secure > config.epsilon && iterations < config.max_iterations {
        let mid = secure + (unsecure - secure) / 2.0;
        let (confirmed, verdict) = probe_with_retry(
            mid,
            unsecure - secure,
            low,
            high,
            config,
            &mut evaluate,
            &mut probes,
        );
        debug!(mid, confirmed, ?verdict, "dichotomy step");
        if verdict == SecurityVerdict::Secure {
            secure = confirmed;
        } else {
            unsecure = mid;
        }
        iterations += 1;
    }

    let converged = unsecure - secure <= config.epsilon;
    info!(
        best_secure = secure,
        probes = probes.len(),
        converged,
        "dichotomy finished"
    );
    Ok(DichotomyResult {
        best_secure: secure,
        probes,
        converged,
    })
}

/// Evaluate one point, retrying once at a perturbed value on failure.
///
/// Returns the verdict together with the value it actually holds for, so the
/// caller never narrows the bracket with an unconfirmed point. The retry
/// steps down by a fraction of the bracket width, or up when the downward
/// step would leave the interval; a failing retry counts as unsecure for the
/// original value so the search narrows away from the unstable region.
fn probe_with_retry(
    value: f64,
    interval_width: f64,
    low: f64,
    high: f64,
    config: &DichotomyConfig,
    evaluate: &mut impl FnMut(f64) -> SecurityVerdict,
    probes: &mut Vec<Probe>,
) -> (f64, SecurityVerdict) {
    let verdict = evaluate(value);
    probes.push(Probe {
        value,
        verdict,
        retried: false,
    });
    if verdict != SecurityVerdict::Failure {
        return (value, verdict);
    }

    let step = config.failure_perturbation * interval_width;
    let mut retry_value = value - step;
    if retry_value < low {
        retry_value = (value + step).min(high);
    }
    warn!(value, retry_value, "probe failed, retrying once");
    let retry_verdict = evaluate(retry_value);
    probes.push(Probe {
        value: retry_value,
        verdict: retry_verdict,
        retried: true,
    });
    match retry_verdict {
        SecurityVerdict::Secure => (retry_value, SecurityVerdict::Secure),
        _ => (value, SecurityVerdict::Unsecure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threshold_evaluator(limit: f64) -> impl FnMut(f64) -> SecurityVerdict {
        move |v| {
            if v <= limit {
                SecurityVerdict::Secure
            } else {
                SecurityVerdict::Unsecure
            }
        }
    }

    #[test]
    fn test_converges_within_epsilon() {
        let config = DichotomyConfig {
            epsilon: 1.0,
            ..Default::default()
        };
        let result =
            find_max_secure_value(0.0, 1000.0, &config, threshold_evaluator(637.0)).unwrap();
        assert!(result.converged);
        assert!(result.best_secure <= 637.0);
        assert!(637.0 - result.best_secure <= config.epsilon);
        // Two bound probes plus at most ceil(log2(1000)) bisection steps.
        assert!(result.probes.len() <= 12);
    }

    #[test]
    fn test_unsecure_lower_bound_means_no_capacity() {
        let config = DichotomyConfig::default();
        let err = find_max_secure_value(100.0, 1000.0, &config, threshold_evaluator(50.0))
            .unwrap_err();
        match err {
            DichotomyError::CapacityNotFound { low, probes, .. } => {
                assert_eq!(low, 100.0);
                assert_eq!(probes.len(), 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_secure_upper_bound_short_circuits() {
        let config = DichotomyConfig::default();
        let result =
            find_max_secure_value(0.0, 500.0, &config, threshold_evaluator(800.0)).unwrap();
        assert_eq!(result.best_secure, 500.0);
        assert!(result.converged);
        assert_eq!(result.probes.len(), 2);
    }

    #[test]
    fn test_failed_probe_retried_then_treated_unsecure() {
        // Every probe above 400 fails; the retry (slightly below) fails too
        // unless it lands under 400. The search must still converge, to a
        // value no higher than the unstable region's edge.
        let config = DichotomyConfig {
            epsilon: 1.0,
            ..Default::default()
        };
        let evaluator = |v: f64| {
            if v > 400.0 {
                SecurityVerdict::Failure
            } else {
                SecurityVerdict::Secure
            }
        };
        let result = find_max_secure_value(0.0, 1000.0, &config, evaluator).unwrap();
        assert!(result.converged);
        assert!(result.best_secure <= 400.0 + config.epsilon);
        assert!(result.probes.iter().any(|p| p.retried));
    }

    #[test]
    fn test_retry_success_counts_as_secure() {
        // 500 fails once; its perturbed retry at 480 succeeds, so the bracket
        // keeps rising instead of treating 500 as unsecure.
        let config = DichotomyConfig {
            epsilon: 100.0,
            ..Default::default()
        };
        let mut failed_once = false;
        let evaluator = move |v: f64| {
            if (v - 500.0).abs() < 1e-9 && !failed_once {
                failed_once = true;
                SecurityVerdict::Failure
            } else if v <= 600.0 {
                SecurityVerdict::Secure
            } else {
                SecurityVerdict::Unsecure
            }
        };
        let result = find_max_secure_value(0.0, 1000.0, &config, evaluator).unwrap();
        assert!(result.best_secure >= 500.0);
        assert!(result.best_secure <= 600.0);
    }

    #[test]
    fn test_failed_midpoint_is_never_certified() {
        // Secure up to 490, Unsecure above, except that 500 itself always
        // breaks the evaluation. The bracket may only rise to values a probe
        // actually confirmed, so the result stays at or below 490.
        let config = DichotomyConfig {
            epsilon: 1.0,
            ..Default::default()
        };
        let evaluator = |v: f64| {
            if (v - 500.0).abs() < 1e-9 {
                SecurityVerdict::Failure
            } else if v <= 490.0 {
                SecurityVerdict::Secure
            } else {
                SecurityVerdict::Unsecure
            }
        };
        let result = find_max_secure_value(0.0, 1000.0, &config, evaluator).unwrap();
        assert!(result.converged);
        assert!(result.best_secure <= 490.0);
        assert!(result.probes.iter().any(|p| p.retried));
        for probe in &result.probes {
            if (probe.value - result.best_secure).abs() < 1e-9 {
                assert_eq!(probe.verdict, SecurityVerdict::Secure);
            }
        }
    }

    #[test]
    fn test_failure_at_lower_bound_retries_upward() {
        // The lower bound itself breaks the evaluation; the retry must step
        // into the interval instead of re-probing the same value.
        let config = DichotomyConfig {
            epsilon: 1.0,
            ..Default::default()
        };
        let evaluator = |v: f64| {
            if v == 0.0 {
                SecurityVerdict::Failure
            } else if v <= 500.0 {
                SecurityVerdict::Secure
            } else {
                SecurityVerdict::Unsecure
            }
        };
        let result = find_max_secure_value(0.0, 1000.0, &config, evaluator).unwrap();
        assert_eq!(result.probes[0].value, 0.0);
        assert_eq!(result.probes[1].value, 20.0);
        assert!(result.probes[1].retried);
        assert!(result.converged);
        assert!(result.best_secure <= 500.0);
        assert!(500.0 - result.best_secure <= config.epsilon);
    }

    #[test]
    fn test_probe_sequence_is_deterministic() {
        let config = DichotomyConfig::default();
        let first =
            find_max_secure_value(0.0, 1000.0, &config, threshold_evaluator(333.0)).unwrap();
        let second =
            find_max_secure_value(0.0, 1000.0, &config, threshold_evaluator(333.0)).unwrap();
        let values = |r: &DichotomyResult| r.probes.iter().map(|p| p.value).collect::<Vec<_>>();
        assert_eq!(values(&first), values(&second));
    }

    #[test]
    fn test_invalid_interval_rejected() {
        let config = DichotomyConfig::default();
        assert!(find_max_secure_value(10.0, 10.0, &config, threshold_evaluator(5.0)).is_err());
        assert!(find_max_secure_value(20.0, 10.0, &config, threshold_evaluator(5.0)).is_err());
    }
}
