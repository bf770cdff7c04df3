// ── Queue provisioning ──
//
// Bandwidth splits are validated here and handed to an external program
// that sizes the rate-limited queues. One provisioner instance exists per
// controller; its "already running" flag lives on that instance.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::future::BoxFuture;
use serde::Serialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::CoreError;

/// Upper bound on the sum of a split, in the provisioner's base unit.
pub const MAX_TOTAL_BANDWIDTH: f64 = 10.0;

/// Number of values in a split: HTTP, DNS and ICMP queues.
pub const SPLIT_LEN: usize = 3;

// Tolerates float noise such as 3.3 + 3.3 + 3.4.
const SUM_EPSILON: f64 = 1e-9;

/// Three validated, non-negative bandwidth figures.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BandwidthSplit([f64; SPLIT_LEN]);

impl BandwidthSplit {
    pub fn new(values: &[f64]) -> Result<Self, CoreError> {
        let invalid = |reason: String| CoreError::InvalidBandwidthSplit { reason };

        let values: [f64; SPLIT_LEN] = values.try_into().map_err(|_| {
            invalid(format!(
                "expected exactly {SPLIT_LEN} values, got {}",
                values.len()
            ))
        })?;
        if let Some(v) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(invalid(format!(
                "values must be finite and non-negative, got {v}"
            )));
        }
        let total: f64 = values.iter().sum();
        if total > MAX_TOTAL_BANDWIDTH + SUM_EPSILON {
            return Err(invalid(format!(
                "values must sum to at most {MAX_TOTAL_BANDWIDTH}, got {total}"
            )));
        }
        Ok(Self(values))
    }

    pub fn values(&self) -> [f64; SPLIT_LEN] {
        self.0
    }

    pub fn total(&self) -> f64 {
        self.0.iter().sum()
    }
}

impl fmt::Display for BandwidthSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "{a}/{b}/{c}")
    }
}

/// External collaborator that applies a split to the physical queues.
pub trait QueueProvisioner: Send + Sync {
    fn provision(&self, split: BandwidthSplit) -> BoxFuture<'_, Result<(), CoreError>>;
}

/// Runs `program [args...] <v1> <v2> <v3>`, each value scaled by
/// `unit_multiplier` and printed as an integer.
pub struct ProcessProvisioner {
    program: String,
    args: Vec<String>,
    unit_multiplier: u32,
    running: AtomicBool,
}

impl ProcessProvisioner {
    pub fn new(program: impl Into<String>, args: Vec<String>, unit_multiplier: u32) -> Self {
        Self {
            program: program.into(),
            args,
            unit_multiplier,
            running: AtomicBool::new(false),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Arguments appended after the configured ones.
    pub fn scaled_args(&self, split: &BandwidthSplit) -> Vec<String> {
        let unit = f64::from(self.unit_multiplier);
        split
            .values()
            .iter()
            .map(|v| format!("{:.0}", v * unit))
            .collect()
    }

    async fn run(&self, split: BandwidthSplit) -> Result<(), CoreError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CoreError::ProvisionerBusy);
        }
        let _guard = RunningGuard(&self.running);

        let scaled = self.scaled_args(&split);
        debug!(program = %self.program, args = ?scaled, "starting queue provisioner");

        let output = Command::new(&self.program)
            .args(&self.args)
            .args(&scaled)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CoreError::ProvisioningFailed {
                message: format!("cannot run {}: {e}", self.program),
            })?;

        if output.status.success() {
            info!(%split, "queues provisioned");
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = format!("{} exited with {}: {}", self.program, output.status, stderr.trim());
            warn!(%split, %message, "queue provisioning failed");
            Err(CoreError::ProvisioningFailed { message })
        }
    }
}

impl QueueProvisioner for ProcessProvisioner {
    fn provision(&self, split: BandwidthSplit) -> BoxFuture<'_, Result<(), CoreError>> {
        Box::pin(self.run(split))
    }
}

/// Clears the running flag however `run` exits.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_sum_up_to_ten() {
        let split = BandwidthSplit::new(&[4.0, 3.0, 3.0]).unwrap();
        assert!((split.total() - 10.0).abs() < f64::EPSILON);
        assert!(BandwidthSplit::new(&[3.3, 3.3, 3.4]).is_ok());
        assert!(BandwidthSplit::new(&[0.0, 0.0, 0.0]).is_ok());
    }

    #[test]
    fn rejects_bad_splits() {
        for bad in [
            vec![4.0, 4.0, 3.0],
            vec![5.0, 5.0],
            vec![1.0, 1.0, 1.0, 1.0],
            vec![-1.0, 2.0, 2.0],
            vec![f64::NAN, 1.0, 1.0],
        ] {
            assert!(
                matches!(
                    BandwidthSplit::new(&bad),
                    Err(CoreError::InvalidBandwidthSplit { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn scales_values_to_integer_args() {
        let p = ProcessProvisioner::new("true", Vec::new(), 1_000_000);
        let split = BandwidthSplit::new(&[4.0, 3.5, 2.5]).unwrap();
        assert_eq!(p.scaled_args(&split), vec!["4000000", "3500000", "2500000"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn reports_exit_status() {
        let split = BandwidthSplit::new(&[1.0, 1.0, 1.0]).unwrap();

        let ok = ProcessProvisioner::new("true", Vec::new(), 1);
        ok.provision(split).await.unwrap();
        assert!(!ok.is_running());

        let failing = ProcessProvisioner::new("false", Vec::new(), 1);
        let err = failing.provision(split).await.unwrap_err();
        assert!(matches!(err, CoreError::ProvisioningFailed { .. }));
        assert!(!failing.is_running());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn concurrent_run_is_busy() {
        let p = ProcessProvisioner::new("sleep", vec!["0.3".into()], 1);
        let split = BandwidthSplit::new(&[0.0, 0.0, 0.0]).unwrap();
        let (first, second) = tokio::join!(p.provision(split), async {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            p.provision(split).await
        });
        first.unwrap();
        assert!(matches!(second, Err(CoreError::ProvisionerBusy)));
    }

    #[tokio::test]
    async fn missing_program_fails_cleanly() {
        let p = ProcessProvisioner::new("/nonexistent/sliceflow-qos", Vec::new(), 1);
        let split = BandwidthSplit::new(&[1.0, 1.0, 1.0]).unwrap();
        let err = p.provision(split).await.unwrap_err();
        assert!(matches!(err, CoreError::ProvisioningFailed { .. }));
        assert!(!p.is_running());
    }
}
