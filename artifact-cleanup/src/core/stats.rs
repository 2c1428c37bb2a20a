//! Cleanup accumulators at repository and run scope.

use serde::Serialize;

/// Jobs cleaned and bytes reclaimed within one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupStats {
    pub cleaned_jobs: u64,
    pub reclaimed_bytes: u64,
}

impl CleanupStats {
    pub fn record(&mut self, reclaimed_bytes: u64) {
        self.cleaned_jobs += 1;
        self.reclaimed_bytes += reclaimed_bytes;
    }

    pub fn absorb(&mut self, other: &CleanupStats) {
        self.cleaned_jobs += other.cleaned_jobs;
        self.reclaimed_bytes += other.reclaimed_bytes;
    }

    pub fn is_empty(&self) -> bool {
        self.cleaned_jobs == 0
    }
}

/// Outcome of one repository scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryReport {
    /// Canonical path of the repository as reported by the server.
    pub repository: String,
    pub stats: CleanupStats,
}

/// Outcome of a whole run, in processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub repositories: Vec<RepositoryReport>,
    pub total: CleanupStats,
}

impl RunReport {
    pub fn push(&mut self, report: RepositoryReport) {
        self.total.absorb(&report.stats);
        self.repositories.push(report);
    }
}
