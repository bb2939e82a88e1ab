//! Render-job claims and write admission.

use framevault_core::{RationalTime, TimeRange};

/// A render worker's declared responsibility for a time range, tagged with
/// its submission stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobClaim {
    /// Timeline region the job renders.
    pub range: TimeRange,
    /// Submission-order stamp issued by the job owner.
    pub stamp: u64,
}

/// Append-only list of job claims in submission order.
///
/// Stamps are issued by the caller and must strictly increase across
/// registrations.
#[derive(Debug, Clone, Default)]
pub struct JobTracker {
    claims: Vec<JobClaim>,
}

impl JobTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that a job with `stamp` is responsible for `range`.
    pub fn register(&mut self, range: TimeRange, stamp: u64) {
        debug_assert!(
            self.claims.last().map_or(true, |last| last.stamp < stamp),
            "job stamps must strictly increase"
        );
        self.claims.push(JobClaim { range, stamp });
    }

    /// Whether a result for `time` produced by the job with `stamp` is
    /// still current.
    ///
    /// The most recently registered claim covering `time` decides: the
    /// result is current iff its stamp is at least that claim's. A newer
    /// covering claim therefore supersedes every older job for the times
    /// it covers, and a time no claim covers admits nothing.
    pub fn is_current(&self, time: RationalTime, stamp: u64) -> bool {
        for claim in self.claims.iter().rev() {
            if claim.range.contains(time) {
                return stamp >= claim.stamp;
            }
        }
        false
    }

    /// Drop claims with stamps at or below `stamp`.
    ///
    /// Callers retire only jobs whose results have fully drained; a live
    /// region must stay covered by a newer claim or its results will be
    /// rejected.
    pub fn retire_through(&mut self, stamp: u64) {
        self.claims.retain(|claim| claim.stamp > stamp);
    }

    /// Number of registered claims.
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// True if no claims are registered.
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }
}
