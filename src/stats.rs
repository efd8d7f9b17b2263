//! Process-wide counters.
//!
//! Plain atomics with relaxed ordering; a snapshot reads each counter on its
//! own, so values reported together may be momentarily out of step.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::catalog::CATEGORIES;
use crate::util::format_uptime;

pub struct GenerationStats {
  started: Instant,
  total_generated: AtomicU64,
  total_generation_ms: AtomicU64,
  per_category: [AtomicU64; CATEGORIES.len()],
  psych_questions: AtomicU64,
  analyses: AtomicU64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
  pub total_generated: u64,
  pub avg_generation_time_ms: f64,
  pub total_generation_time_ms: u64,
  pub questions_per_minute: f64,
  pub per_category: Vec<CategoryCount>,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct CategoryCount {
  pub category: String,
  pub count: u64,
}

#[derive(Clone, Copy, Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PsychologyStats {
  pub total_psych_questions: u64,
  pub total_analyses: u64,
}

impl GenerationStats {
  pub fn new() -> Self {
    Self {
      started: Instant::now(),
      total_generated: AtomicU64::new(0),
      total_generation_ms: AtomicU64::new(0),
      per_category: Default::default(),
      psych_questions: AtomicU64::new(0),
      analyses: AtomicU64::new(0),
    }
  }

  /// Record one quiz question. Categories outside the catalog only count toward the totals.
  pub fn record_quiz(&self, category: &str, elapsed_ms: u64) {
    self.total_generated.fetch_add(1, Ordering::Relaxed);
    self.total_generation_ms.fetch_add(elapsed_ms, Ordering::Relaxed);
    if let Some(idx) = CATEGORIES.iter().position(|c| *c == category) {
      self.per_category[idx].fetch_add(1, Ordering::Relaxed);
    }
  }

  pub fn record_psych_questions(&self, count: u64) {
    self.psych_questions.fetch_add(count, Ordering::Relaxed);
  }

  pub fn record_analysis(&self) {
    self.analyses.fetch_add(1, Ordering::Relaxed);
  }

  pub fn snapshot(&self) -> StatsSnapshot {
    self.snapshot_after(self.started.elapsed())
  }

  fn snapshot_after(&self, uptime: Duration) -> StatsSnapshot {
    let total_generated = self.total_generated.load(Ordering::Relaxed);
    let total_ms = self.total_generation_ms.load(Ordering::Relaxed);
    let avg = if total_generated > 0 { total_ms as f64 / total_generated as f64 } else { 0.0 };
    let uptime_ms = uptime.as_millis();
    let qpm = if uptime_ms > 0 { total_generated as f64 * 60_000.0 / uptime_ms as f64 } else { 0.0 };
    StatsSnapshot {
      total_generated,
      avg_generation_time_ms: avg,
      total_generation_time_ms: total_ms,
      questions_per_minute: qpm,
      per_category: CATEGORIES
        .iter()
        .zip(&self.per_category)
        .map(|(c, n)| CategoryCount { category: c.to_string(), count: n.load(Ordering::Relaxed) })
        .collect(),
    }
  }

  pub fn psychology(&self) -> PsychologyStats {
    PsychologyStats {
      total_psych_questions: self.psych_questions.load(Ordering::Relaxed),
      total_analyses: self.analyses.load(Ordering::Relaxed),
    }
  }
}

impl Default for GenerationStats {
  fn default() -> Self {
    Self::new()
  }
}

/// HTTP-level request accounting.
pub struct RequestCounters {
  started: Instant,
  total: AtomicU64,
  successful: AtomicU64,
  failed: AtomicU64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSnapshot {
  pub uptime: String,
  pub total_requests: u64,
  pub successful_generations: u64,
  pub failed_generations: u64,
}

impl RequestCounters {
  pub fn new() -> Self {
    Self {
      started: Instant::now(),
      total: AtomicU64::new(0),
      successful: AtomicU64::new(0),
      failed: AtomicU64::new(0),
    }
  }

  pub fn request(&self) {
    self.total.fetch_add(1, Ordering::Relaxed);
  }

  pub fn generation(&self, ok: bool) {
    let counter = if ok { &self.successful } else { &self.failed };
    counter.fetch_add(1, Ordering::Relaxed);
  }

  pub fn uptime(&self) -> String {
    format_uptime(self.started.elapsed().as_secs())
  }

  pub fn snapshot(&self) -> RequestSnapshot {
    RequestSnapshot {
      uptime: self.uptime(),
      total_requests: self.total.load(Ordering::Relaxed),
      successful_generations: self.successful.load(Ordering::Relaxed),
      failed_generations: self.failed.load(Ordering::Relaxed),
    }
  }
}

impl Default for RequestCounters {
  fn default() -> Self {
    Self::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quiz_counters_and_rates() {
    let stats = GenerationStats::new();
    stats.record_quiz("Science", 100);
    stats.record_quiz("Mathematics", 300);
    stats.record_quiz("Cooking", 200);

    let snap = stats.snapshot_after(Duration::from_secs(60));
    assert_eq!(snap.total_generated, 3);
    assert_eq!(snap.total_generation_time_ms, 600);
    assert_eq!(snap.avg_generation_time_ms, 200.0);
    assert_eq!(snap.questions_per_minute, 3.0);
    let science = snap.per_category.iter().find(|c| c.category == "Science").map(|c| c.count);
    assert_eq!(science, Some(1));
    assert_eq!(snap.per_category.iter().map(|c| c.count).sum::<u64>(), 2);
  }

  #[test]
  fn empty_stats_have_zero_rates() {
    let snap = GenerationStats::new().snapshot_after(Duration::ZERO);
    assert_eq!(snap.avg_generation_time_ms, 0.0);
    assert_eq!(snap.questions_per_minute, 0.0);
  }

  #[test]
  fn psychology_and_request_counters() {
    let stats = GenerationStats::new();
    stats.record_psych_questions(8);
    stats.record_analysis();
    assert_eq!(stats.psychology(), PsychologyStats { total_psych_questions: 8, total_analyses: 1 });

    let requests = RequestCounters::new();
    requests.request();
    requests.request();
    requests.generation(true);
    requests.generation(false);
    let snap = requests.snapshot();
    assert_eq!((snap.total_requests, snap.successful_generations, snap.failed_generations), (2, 1, 1));
    assert!(snap.uptime.ends_with('s'));
  }
}
