// THEORY:
// The `optimizer` module is the top-level API for the deduplication engine.
// It owns the sprite sheet for the duration of a run and drives the greedy
// removal loop: rebuild or revalidate the correlation index, rank its
// entries, select the highest-priority winner, erase its occurrences, and
// repeat until no opaque pixels remain.
//
// Key architectural principles:
// 1.  **Two-Tier Freshness**: a full index rebuild is the dominant cost, so
//     it only runs every `freshness_span` iterations. Between rebuilds, only
//     the top `volatility_range` entries of the previous ranking are
//     revalidated — a removal most plausibly perturbs the highest-priority,
//     most instance-rich areas. Far-ranked entries may go stale; the next
//     rebuild corrects them.
// 2.  **Fan-Out, Then Apply**: rebuild and revalidation fan out across
//     worker threads; ranking, winner selection, and erasure run on the
//     caller thread. A fan-out must fully complete and merge before the
//     apply phase mutates the sheet, so no reader ever observes a
//     half-erased window.
// 3.  **Recheck Before Erase**: every winner correlation is re-read against
//     the live sheet and silently skipped on hash mismatch. Staleness is
//     expected data, not an error.
// 4.  **Cooperative Cancellation**: the token is checked at pass boundaries
//     and before each parallel unit; in-flight units complete, nothing is
//     rolled back, and cancellation returns the erasures that already landed.

use crate::cancel::CancellationToken;
use crate::core_modules::correlation::{AreaEntry, CorrelationIndex};
use crate::core_modules::enumerator::{AreaEnumerator, build_enumerator};
use crate::core_modules::scoring::{DefaultScoringPolicy, ScoringPolicy};
use crate::core_modules::sizing::{DefaultSizingPolicy, EnsureUnitSizing, SizingPolicy};
use crate::error::OptimizerError;
use crate::progress::{OptimizerPhase, ProgressReport};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use rayon::prelude::*;

// Re-export the data types a consumer of the engine works with.
pub use crate::core_modules::area::{Area, Dimensions};
pub use crate::core_modules::correlation::Correlation;
pub use crate::core_modules::enumerator::EnumeratorKind;
pub use crate::core_modules::pixel::pixel::Pixel;
pub use crate::core_modules::sprite::{Sprite, SpriteSheet};

/// Tunable behavior of the removal loop.
#[derive(Debug, Clone)]
pub struct OptimizerConfig {
    /// Upper bound for candidate window sizes fed to the sizing chain.
    pub max_window_width: u32,
    pub max_window_height: u32,
    /// Iterations between full index rebuilds. Must be at least 1.
    pub freshness_span: usize,
    /// How many top-ranked entries get revalidated between rebuilds.
    pub volatility_range: usize,
    /// Which registered enumeration strategy to construct.
    pub enumerator: EnumeratorKind,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            max_window_width: 8,
            max_window_height: 8,
            freshness_span: 10,
            volatility_range: 8,
            enumerator: EnumeratorKind::default(),
        }
    }
}

/// One consumed winner: the canonical area and the positions actually erased.
#[derive(Debug, Clone)]
pub struct RemovalRecord {
    pub area: Area,
    pub erased: Vec<Correlation>,
}

/// The greedy removal loop. Owns the sheet for the duration of a run.
pub struct Optimizer {
    sheet: SpriteSheet,
    config: OptimizerConfig,
    sizing_policies: Vec<Box<dyn SizingPolicy>>,
    scoring_policy: Box<dyn ScoringPolicy>,
    enumerator: Box<dyn AreaEnumerator>,
    sizings: Vec<Dimensions>,
    index: CorrelationIndex,
    unprocessed_pixels: u64,
    overall_progress: Arc<ProgressReport>,
    operation_progress: Arc<ProgressReport>,
    ct: CancellationToken,
    rebuild_count: u64,
    revalidation_count: u64,
}

impl Optimizer {
    /// Builds an optimizer with the default sizing chain (zig-zag descent
    /// plus a guaranteed unit window) and the default what-if scorer.
    pub fn new(sheet: SpriteSheet, config: OptimizerConfig) -> Self {
        let enumerator = build_enumerator(config.enumerator);
        Self {
            sheet,
            config,
            sizing_policies: vec![
                Box::new(DefaultSizingPolicy),
                Box::new(EnsureUnitSizing),
            ],
            scoring_policy: Box::new(DefaultScoringPolicy),
            enumerator,
            sizings: Vec::new(),
            index: CorrelationIndex::new(),
            unprocessed_pixels: 0,
            overall_progress: Arc::new(ProgressReport::new()),
            operation_progress: Arc::new(ProgressReport::new()),
            ct: CancellationToken::new(),
            rebuild_count: 0,
            revalidation_count: 0,
        }
    }

    /// Replaces the sizing chain.
    pub fn with_sizing_policies(mut self, policies: Vec<Box<dyn SizingPolicy>>) -> Self {
        self.sizing_policies = policies;
        self
    }

    /// Replaces the scoring policy.
    pub fn with_scoring_policy(mut self, policy: Box<dyn ScoringPolicy>) -> Self {
        self.scoring_policy = policy;
        self
    }

    /// Replaces the enumeration strategy.
    pub fn with_enumerator(mut self, enumerator: Box<dyn AreaEnumerator>) -> Self {
        self.enumerator = enumerator;
        self
    }

    pub fn overall_progress(&self) -> Arc<ProgressReport> {
        self.overall_progress.clone()
    }

    pub fn operation_progress(&self) -> Arc<ProgressReport> {
        self.operation_progress.clone()
    }

    pub fn unprocessed_pixels(&self) -> u64 {
        self.unprocessed_pixels
    }

    /// Full rebuilds performed so far.
    pub fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    /// Partial revalidation passes performed so far.
    pub fn revalidation_count(&self) -> u64 {
        self.revalidation_count
    }

    pub fn sheet(&self) -> &SpriteSheet {
        &self.sheet
    }

    pub fn into_sheet(self) -> SpriteSheet {
        self.sheet
    }

    /// Runs the sizing chain and the initial opaque-pixel count.
    ///
    /// If the token is already cancelled (or trips during initialization)
    /// this returns `Ok` with the pixel counter left untouched, so a
    /// subsequent `run` yields an empty result.
    pub fn initialize(&mut self, ct: CancellationToken) -> Result<(), OptimizerError> {
        if self.config.freshness_span == 0 {
            return Err(OptimizerError::ZeroFreshnessSpan);
        }
        self.ct = ct;
        if self.ct.is_cancelled() {
            return Ok(());
        }

        let mut configured: Option<Vec<Dimensions>> = None;
        for policy in &self.sizing_policies {
            if self.ct.is_cancelled() {
                return Ok(());
            }
            configured = policy.configure_sizings(
                configured,
                self.sheet.len(),
                self.config.max_window_width,
                self.config.max_window_height,
                &self.ct,
            );
        }
        if self.ct.is_cancelled() {
            return Ok(());
        }

        let sizings = configured.unwrap_or_default();
        if sizings.is_empty() {
            return Err(OptimizerError::EmptySizingSequence);
        }
        if let Some(&bad) = sizings.iter().find(|d| d.width == 0 || d.height == 0) {
            return Err(OptimizerError::DegenerateSizing(bad));
        }

        let counted = self.count_unprocessed_pixels();
        if self.ct.is_cancelled() {
            return Ok(());
        }
        self.sizings = sizings;
        self.unprocessed_pixels = counted;
        tracing::debug!(
            sizings = self.sizings.len(),
            unprocessed = self.unprocessed_pixels,
            "optimizer initialized"
        );
        Ok(())
    }

    /// Runs the removal loop to completion (or cancellation) and returns one
    /// record per consumed winner.
    pub fn run(&mut self) -> Result<Vec<RemovalRecord>, OptimizerError> {
        let mut removals = Vec::new();
        self.overall_progress
            .begin(OptimizerPhase::RemovingAreas, self.unprocessed_pixels);

        let mut iteration: usize = 0;
        let mut previous_ranking: Option<Vec<(u64, Arc<AreaEntry>)>> = None;

        while self.unprocessed_pixels > 0 {
            if self.ct.is_cancelled() {
                tracing::info!(iteration, "optimization cancelled");
                break;
            }

            if iteration % self.config.freshness_span == 0 {
                tracing::debug!(iteration, "rebuilding correlation index");
                self.index = self.rebuild();
                self.rebuild_count += 1;
                previous_ranking = None;
            } else if let Some(previous) = previous_ranking.as_deref() {
                self.revalidate(previous);
                self.revalidation_count += 1;
            }

            // A cancel observed mid-fan-out leaves a partial (possibly empty)
            // index behind; that is a clean exit, not an invariant violation.
            if self.ct.is_cancelled() {
                tracing::info!(iteration, "optimization cancelled");
                break;
            }

            let ranking = self.rank();
            if ranking.is_empty() {
                return Err(OptimizerError::EmptyIndex {
                    unprocessed: self.unprocessed_pixels,
                });
            }

            let (winner_hash, winner) = (ranking[0].0, &ranking[0].1);
            tracing::info!(
                iteration,
                hash = winner_hash,
                priority = winner.priority(),
                "applying winner area"
            );
            let record = self.apply_winner(winner_hash)?;
            let pixels_removed =
                record.area.opaque_pixel_count() as u64 * record.erased.len() as u64;
            self.unprocessed_pixels -= pixels_removed;
            self.overall_progress.advance(pixels_removed);
            removals.push(record);

            // The consumed winner never appears in the next top slice.
            previous_ranking = Some(ranking.into_iter().skip(1).collect());
            iteration += 1;
        }

        self.operation_progress.begin(OptimizerPhase::Complete, 0);
        tracing::info!(
            iterations = iteration,
            winners = removals.len(),
            unprocessed = self.unprocessed_pixels,
            "optimization finished"
        );
        Ok(removals)
    }

    /// Moves the whole run onto a blocking worker thread, for callers living
    /// on an async runtime. Consumes the optimizer and hands the mutated
    /// sheet back alongside the removal records.
    pub async fn run_detached(
        mut self,
    ) -> Result<(Vec<RemovalRecord>, SpriteSheet), OptimizerError> {
        tokio::task::spawn_blocking(move || {
            let removals = self.run()?;
            Ok((removals, self.sheet))
        })
        .await
        .map_err(|join| OptimizerError::Worker(join.to_string()))?
    }

    /// Whole-sheet 1x1 scan counting opaque pixels.
    fn count_unprocessed_pixels(&self) -> u64 {
        self.operation_progress
            .begin(OptimizerPhase::CountingPixels, self.sheet.total_pixels());
        let opaque = AtomicU64::new(0);
        let progress = &self.operation_progress;
        self.enumerator.enumerate_parallel(
            &self.sheet,
            Dimensions::unit(),
            &self.ct,
            &|sprite, _, x, y| {
                if sprite.pixel(x, y).is_opaque() {
                    opaque.fetch_add(1, Ordering::Relaxed);
                }
                progress.advance(1);
            },
        );
        opaque.load(Ordering::Acquire)
    }

    /// Full rebuild: scan every (sizing, sprite) pair in parallel and merge
    /// every opaque-containing window into a fresh index. A panicking unit
    /// is logged and skipped; the rebuild is best-effort across units.
    fn rebuild(&self) -> CorrelationIndex {
        let index = CorrelationIndex::new();
        let pairs: Vec<(Dimensions, usize)> = self
            .sizings
            .iter()
            .flat_map(|&dims| (0..self.sheet.len()).map(move |sprite| (dims, sprite)))
            .collect();
        self.operation_progress
            .begin(OptimizerPhase::FetchingAreas, pairs.len() as u64);

        pairs.par_iter().for_each(|&(dims, sprite_index)| {
            if self.ct.is_cancelled() {
                return;
            }
            let unit = catch_unwind(AssertUnwindSafe(|| {
                self.enumerator.enumerate_through_sprite(
                    &self.sheet,
                    sprite_index,
                    dims,
                    &mut |sprite, observed_in, x, y| {
                        if !Area::contains_opaque_pixel(sprite, x, y, dims) {
                            return;
                        }
                        let area = Area::read(sprite, x, y, dims);
                        let correlation = Correlation::new(observed_in, x, y, dims);
                        index.merge_observation(area, correlation, |candidate| {
                            self.scoring_policy.score(
                                candidate,
                                &self.sheet,
                                self.enumerator.as_ref(),
                            )
                        });
                    },
                );
            }));
            if unit.is_err() {
                tracing::error!(
                    sprite = sprite_index,
                    window = %dims,
                    "area scan unit panicked; continuing rebuild without it"
                );
            }
            self.operation_progress.advance(1);
        });

        index
    }

    /// Re-reads every correlation of the top-ranked entries against the live
    /// sheet and prunes the ones whose content no longer matches. Parallel
    /// across entries; pruning within one entry is sequential.
    fn revalidate(&self, previous_ranking: &[(u64, Arc<AreaEntry>)]) {
        let top =
            &previous_ranking[..previous_ranking.len().min(self.config.volatility_range)];
        self.operation_progress
            .begin(OptimizerPhase::UpdatingVolatileScores, top.len() as u64);

        top.par_iter().for_each(|(hash, entry)| {
            if self.ct.is_cancelled() {
                return;
            }
            let mut stale = Vec::new();
            for (id, correlation) in entry.snapshot() {
                let current = Area::read(
                    self.sheet.sprite(correlation.sprite_index),
                    correlation.x,
                    correlation.y,
                    correlation.dims,
                );
                if current.content_hash() != *hash {
                    stale.push(id);
                }
            }
            for id in stale {
                entry.remove(id);
            }
            self.operation_progress.advance(1);
        });
    }

    /// Current entries by descending priority. Entries whose correlations
    /// have all been pruned are excluded — an empty entry can never win.
    fn rank(&self) -> Vec<(u64, Arc<AreaEntry>)> {
        let mut entries = self.index.entries();
        entries.retain(|(_, entry)| entry.correlation_count() > 0);
        entries.sort_by_key(|(_, entry)| std::cmp::Reverse(entry.priority()));
        entries
    }

    /// Consumes the winner: recheck-then-erase each surviving correlation,
    /// remove the entry from the index, report what actually landed.
    fn apply_winner(&mut self, winner_hash: u64) -> Result<RemovalRecord, OptimizerError> {
        let entry = self
            .index
            .remove(winner_hash)
            .ok_or(OptimizerError::WinnerMissing { hash: winner_hash })?;

        let correlations = entry.snapshot();
        self.operation_progress
            .begin(OptimizerPhase::ApplyingWinner, correlations.len() as u64);

        let mut erased = Vec::new();
        for (_, correlation) in correlations {
            let current = Area::read(
                self.sheet.sprite(correlation.sprite_index),
                correlation.x,
                correlation.y,
                correlation.dims,
            );
            // Stale correlation: content changed since the last refresh.
            if current.content_hash() == winner_hash {
                Area::erase(
                    self.sheet.sprite_mut(correlation.sprite_index),
                    correlation.x,
                    correlation.y,
                    correlation.dims,
                );
                erased.push(correlation);
            }
            self.operation_progress.advance(1);
        }

        Ok(RemovalRecord {
            area: entry.area().clone(),
            erased,
        })
    }
}
