//! Build progress, reported per phase
//!
//! A nodemap build runs up to three phases in a fixed order: the one-off
//! mapfile import, the history scan past the watermark, and the index
//! write. Reporters are told which phase started and how many units it
//! covers; the unit differs per phase.

use std::time::Instant;

use indicatif::{ProgressBar, ProgressStyle};

/// One stage of `GitNodemap::build`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    /// Records read from the flat mapfile, first build only
    Import,
    /// Revisions past the watermark
    Scan,
    /// Rows written to the index
    Index,
}

impl BuildPhase {
    pub fn label(self) -> &'static str {
        match self {
            BuildPhase::Import => "Importing mapfile",
            BuildPhase::Scan => "Scanning history",
            BuildPhase::Index => "Writing index",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            BuildPhase::Import => "records",
            BuildPhase::Scan => "commits",
            BuildPhase::Index => "rows",
        }
    }
}

pub trait ProgressHandle: Send + Sync {
    fn inc(&self, n: u64);
    fn finish(&self);
}

/// Receives the phases of a build as they start
pub trait ProgressReporter: Send + Sync {
    fn phase(&self, phase: BuildPhase, total: u64) -> Box<dyn ProgressHandle>;
}

/// Terminal progress bars for the CLI
pub struct IndicatifProgress;

impl ProgressReporter for IndicatifProgress {
    fn phase(&self, phase: BuildPhase, total: u64) -> Box<dyn ProgressHandle> {
        let pb = ProgressBar::new(total);
        let template = format!(
            "{{spinner:.green}} {}: [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{per_sec}})",
            phase.label(),
            phase.unit()
        );
        pb.set_style(
            ProgressStyle::default_bar()
                .template(&template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Box::new(PhaseBar {
            phase,
            pb,
            started: Instant::now(),
        })
    }
}

struct PhaseBar {
    phase: BuildPhase,
    pb: ProgressBar,
    started: Instant,
}

impl ProgressHandle for PhaseBar {
    fn inc(&self, n: u64) {
        self.pb.inc(n);
    }

    fn finish(&self) {
        self.pb.finish_and_clear();
        tracing::debug!(
            "{}: {} {} in {:?}",
            self.phase.label(),
            self.pb.position(),
            self.phase.unit(),
            self.started.elapsed()
        );
    }
}

/// Silent reporter for library callers, lookups and tests
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn phase(&self, _phase: BuildPhase, _total: u64) -> Box<dyn ProgressHandle> {
        Box::new(NoopHandle)
    }
}

struct NoopHandle;

impl ProgressHandle for NoopHandle {
    fn inc(&self, _n: u64) {}
    fn finish(&self) {}
}
