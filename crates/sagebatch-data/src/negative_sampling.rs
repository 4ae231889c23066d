//! Negative destination sampling for unsupervised edge learning.
//!
//! For every query (a positive destination) a sampler returns exactly
//! `count` candidates drawn from a destination population. Whether a
//! candidate equal to its own query may be returned is an explicit part of
//! the sampler contract, exposed through [`SelfExclusion`].
//!
//! # Sampling Strategies
//!
//! - [`UniformNegativeSampler`]: uniform over the distinct population members
//! - [`FrequencyNegativeSampler`]: weighted by occurrence count with
//!   temperature smoothing
//!
//! # Example
//!
//! ```
//! use sagebatch_data::negative_sampling::{NegativeSampler, UniformNegativeSampler};
//!
//! let population = vec![10, 11, 12, 13];
//! let sampler = UniformNegativeSampler::new().with_seed(7);
//! let negatives = sampler.sample_negatives(3, &population, &[10, 11]).unwrap();
//!
//! assert_eq!(negatives.len(), 2);
//! assert!(negatives[0].iter().all(|&n| n != 10));
//! assert!(negatives[1].iter().all(|&n| n != 11));
//!
//! // a lone query is its own only candidate
//! let lone = sampler.sample_negatives(2, &[10, 10], &[10]).unwrap();
//! assert_eq!(lone, vec![vec![10, 10]]);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use sagebatch_core::NodeId;

use crate::error::{DataError, Result};

/// Whether a candidate identical to its query may be returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfExclusion {
    /// Candidates may equal their query.
    Allow,
    /// Candidates differ from their query whenever the population holds any
    /// other member. A query that is the only distinct member is returned as
    /// its own candidate.
    #[default]
    ExcludeQuery,
}

/// Trait for negative sampling strategies.
pub trait NegativeSampler: Send + Sync {
    /// Samples `count` negatives for every query node.
    ///
    /// # Arguments
    ///
    /// * `count` - Number of candidates per query
    /// * `population` - The destination population to draw from
    /// * `queries` - The positive destinations to sample against
    ///
    /// # Returns
    ///
    /// One list of exactly `count` candidates per query, in query order.
    ///
    /// # Errors
    ///
    /// Returns an error if the population is empty while candidates are
    /// requested.
    fn sample_negatives(
        &self,
        count: usize,
        population: &[NodeId],
        queries: &[NodeId],
    ) -> Result<Vec<Vec<NodeId>>>;

    /// Returns the self-exclusion policy of this sampler.
    fn self_exclusion(&self) -> SelfExclusion;
}

/// Checks that candidates can be drawn.
///
/// Returns `false` when nothing is requested.
fn check_population(count: usize, population: &[NodeId], queries: &[NodeId]) -> Result<bool> {
    if count == 0 || queries.is_empty() {
        return Ok(false);
    }
    if population.is_empty() {
        return Err(DataError::Sampling(format!(
            "cannot draw {count} negative(s) for {} queries from an empty population",
            queries.len()
        )));
    }
    Ok(true)
}

/// Position of the candidate that must be skipped for `query`, if any.
fn excluded_position(
    candidates: &[NodeId],
    query: NodeId,
    exclusion: SelfExclusion,
) -> Option<usize> {
    if exclusion == SelfExclusion::Allow {
        return None;
    }
    let position = candidates.iter().position(|&n| n == query)?;
    if candidates.len() == 1 {
        debug!("Node {} is the only candidate, keeping it as its own negative", query);
        return None;
    }
    Some(position)
}

/// Returns the distinct members of `population` with their occurrence counts,
/// in first-seen order.
fn distinct_counts(population: &[NodeId]) -> Vec<(NodeId, usize)> {
    let mut position: HashMap<NodeId, usize> = HashMap::with_capacity(population.len());
    let mut counts: Vec<(NodeId, usize)> = Vec::new();
    for &node in population {
        match position.get(&node) {
            Some(&i) => counts[i].1 += 1,
            None => {
                position.insert(node, counts.len());
                counts.push((node, 1));
            }
        }
    }
    counts
}

fn weighted_index<I>(weights: I) -> Result<WeightedIndex<f64>>
where
    I: IntoIterator<Item = f64>,
{
    WeightedIndex::new(weights)
        .map_err(|e| DataError::Sampling(format!("invalid sampling weights: {e}")))
}

// =============================================================================
// Uniform Sampler
// =============================================================================

/// Samples uniformly from the distinct members of the population.
#[derive(Debug)]
pub struct UniformNegativeSampler {
    exclusion: SelfExclusion,
    rng: Mutex<StdRng>,
}

impl Default for UniformNegativeSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl UniformNegativeSampler {
    /// Creates a sampler that excludes self-matches.
    pub fn new() -> Self {
        Self {
            exclusion: SelfExclusion::default(),
            rng: Mutex::new(StdRng::seed_from_u64(0x12345678_9abcdef0)),
        }
    }

    /// Sets the self-exclusion policy.
    pub fn with_self_exclusion(mut self, exclusion: SelfExclusion) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Sets the random seed for reproducible sampling.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }
}

impl NegativeSampler for UniformNegativeSampler {
    fn sample_negatives(
        &self,
        count: usize,
        population: &[NodeId],
        queries: &[NodeId],
    ) -> Result<Vec<Vec<NodeId>>> {
        if !check_population(count, population, queries)? {
            return Ok(vec![Vec::new(); queries.len()]);
        }
        let candidates: Vec<NodeId> = distinct_counts(population)
            .into_iter()
            .map(|(node, _)| node)
            .collect();

        let mut rng = self.rng.lock();
        Ok(queries
            .iter()
            .map(|&query| match excluded_position(&candidates, query, self.exclusion) {
                // draw from the remaining members and shift past the skipped one
                Some(skip) => (0..count)
                    .map(|_| {
                        let i = rng.gen_range(0..candidates.len() - 1);
                        candidates[if i >= skip { i + 1 } else { i }]
                    })
                    .collect(),
                None => (0..count)
                    .map(|_| candidates[rng.gen_range(0..candidates.len())])
                    .collect(),
            })
            .collect())
    }

    fn self_exclusion(&self) -> SelfExclusion {
        self.exclusion
    }
}

// =============================================================================
// Frequency Sampler
// =============================================================================

/// Samples population members proportionally to `count^(1/temperature)`.
///
/// Higher temperature makes the distribution more uniform, while lower
/// temperature emphasizes frequent destinations.
#[derive(Debug)]
pub struct FrequencyNegativeSampler {
    temperature: f32,
    exclusion: SelfExclusion,
    rng: Mutex<StdRng>,
}

impl FrequencyNegativeSampler {
    /// Creates a frequency sampler with the given temperature.
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature,
            exclusion: SelfExclusion::default(),
            rng: Mutex::new(StdRng::seed_from_u64(0xfedcba98_76543210)),
        }
    }

    /// Sets the self-exclusion policy.
    pub fn with_self_exclusion(mut self, exclusion: SelfExclusion) -> Self {
        self.exclusion = exclusion;
        self
    }

    /// Sets the random seed for reproducible sampling.
    pub fn with_seed(self, seed: u64) -> Self {
        *self.rng.lock() = StdRng::seed_from_u64(seed);
        self
    }

    /// Smoothed weight of every distinct population member.
    fn smoothed_weights(&self, population: &[NodeId]) -> (Vec<NodeId>, Vec<f64>) {
        // w_i = count_i^(1/T)
        let inv_temp = 1.0 / self.temperature.max(0.01) as f64;
        distinct_counts(population)
            .into_iter()
            .map(|(node, count)| (node, (count as f64).powf(inv_temp)))
            .unzip()
    }
}

impl NegativeSampler for FrequencyNegativeSampler {
    fn sample_negatives(
        &self,
        count: usize,
        population: &[NodeId],
        queries: &[NodeId],
    ) -> Result<Vec<Vec<NodeId>>> {
        if !check_population(count, population, queries)? {
            return Ok(vec![Vec::new(); queries.len()]);
        }
        let (candidates, weights) = self.smoothed_weights(population);
        let all = weighted_index(weights.iter().copied())?;

        let mut rng = self.rng.lock();
        queries
            .iter()
            .map(|&query| -> Result<Vec<NodeId>> {
                let without_query;
                let dist = match excluded_position(&candidates, query, self.exclusion) {
                    Some(skip) => {
                        without_query = weighted_index(
                            weights
                                .iter()
                                .enumerate()
                                .map(|(i, &w)| if i == skip { 0.0 } else { w }),
                        )?;
                        &without_query
                    }
                    None => &all,
                };
                Ok((0..count)
                    .map(|_| candidates[dist.sample(&mut *rng)])
                    .collect())
            })
            .collect()
    }

    fn self_exclusion(&self) -> SelfExclusion {
        self.exclusion
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Sampling strategy enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SamplingStrategy {
    /// Uniform random sampling.
    #[default]
    Uniform,
    /// Frequency-based sampling.
    Frequency,
}

/// Configuration for building a shared negative sampler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NegativeSamplingConfig {
    /// The sampling strategy to use.
    pub strategy: SamplingStrategy,
    /// Temperature for frequency-based sampling (higher = more uniform).
    pub temperature: f32,
    /// Self-exclusion policy.
    pub self_exclusion: SelfExclusion,
    /// Random seed.
    pub seed: u64,
}

impl Default for NegativeSamplingConfig {
    fn default() -> Self {
        Self {
            strategy: SamplingStrategy::Uniform,
            temperature: 1.0,
            self_exclusion: SelfExclusion::ExcludeQuery,
            seed: 0x12345678_9abcdef0,
        }
    }
}

impl NegativeSamplingConfig {
    /// Sets the sampling strategy.
    pub fn with_strategy(mut self, strategy: SamplingStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Sets the self-exclusion policy.
    pub fn with_self_exclusion(mut self, exclusion: SelfExclusion) -> Self {
        self.self_exclusion = exclusion;
        self
    }

    /// Sets the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Builds a sampler that can be shared between readers.
    pub fn build(&self) -> Arc<dyn NegativeSampler> {
        match self.strategy {
            SamplingStrategy::Uniform => Arc::new(
                UniformNegativeSampler::new()
                    .with_self_exclusion(self.self_exclusion)
                    .with_seed(self.seed),
            ),
            SamplingStrategy::Frequency => Arc::new(
                FrequencyNegativeSampler::new(self.temperature)
                    .with_self_exclusion(self.self_exclusion)
                    .with_seed(self.seed),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_sampler_basic() {
        let sampler = UniformNegativeSampler::new().with_seed(42);
        let population: Vec<NodeId> = (100..200).collect();
        let queries = vec![100, 150, 199];

        let negatives = sampler.sample_negatives(5, &population, &queries).unwrap();
        assert_eq!(negatives.len(), 3);
        for list in &negatives {
            assert_eq!(list.len(), 5);
            assert!(list.iter().all(|n| population.contains(n)));
        }
    }

    #[test]
    fn test_uniform_sampler_excludes_query() {
        let sampler = UniformNegativeSampler::new().with_seed(1);
        assert_eq!(sampler.self_exclusion(), SelfExclusion::ExcludeQuery);

        let population = vec![1, 2];
        let negatives = sampler.sample_negatives(20, &population, &[1, 2]).unwrap();
        assert!(negatives[0].iter().all(|&n| n == 2));
        assert!(negatives[1].iter().all(|&n| n == 1));
        assert_eq!(negatives[0].len(), 20);
    }

    #[test]
    fn test_uniform_sampler_allow_self() {
        let sampler = UniformNegativeSampler::new()
            .with_self_exclusion(SelfExclusion::Allow)
            .with_seed(3);
        let negatives = sampler.sample_negatives(4, &[9], &[9]).unwrap();
        assert_eq!(negatives, vec![vec![9, 9, 9, 9]]);
    }

    #[test]
    fn test_lone_query_is_its_own_candidate() {
        let sampler = UniformNegativeSampler::new().with_seed(5);
        let negatives = sampler.sample_negatives(3, &[4, 4], &[4, 4]).unwrap();
        assert_eq!(negatives, vec![vec![4, 4, 4], vec![4, 4, 4]]);

        let sampler = FrequencyNegativeSampler::new(1.0).with_seed(5);
        let negatives = sampler.sample_negatives(2, &[4], &[4]).unwrap();
        assert_eq!(negatives, vec![vec![4, 4]]);
    }

    #[test]
    fn test_every_query_gets_full_count() {
        let population: Vec<NodeId> = vec![1, 1, 1, 2, 3];
        let queries: Vec<NodeId> = vec![1, 2, 3, 1, 9];
        let uniform = UniformNegativeSampler::new().with_seed(21);
        let frequency = FrequencyNegativeSampler::new(0.5).with_seed(21);

        let samplers: [&dyn NegativeSampler; 2] = [&uniform, &frequency];
        for sampler in samplers {
            let negatives = sampler.sample_negatives(7, &population, &queries).unwrap();
            assert_eq!(negatives.len(), queries.len());
            for (query, list) in queries.iter().zip(&negatives) {
                assert_eq!(list.len(), 7);
                assert!(list.iter().all(|n| n != query && population.contains(n)));
            }
        }
    }

    #[test]
    fn test_uniform_sampler_covers_all_members() {
        let sampler = UniformNegativeSampler::new().with_seed(13);
        let negatives = sampler.sample_negatives(300, &[1, 2, 3, 4], &[2]).unwrap();
        for member in [1, 3, 4] {
            let hits = negatives[0].iter().filter(|&&n| n == member).count();
            assert!(hits > 50, "member {member} drawn {hits} time(s)");
        }
    }

    #[test]
    fn test_empty_population_is_error() {
        let sampler = UniformNegativeSampler::new();
        assert!(matches!(
            sampler.sample_negatives(2, &[], &[1]),
            Err(DataError::Sampling(_))
        ));
        assert_eq!(sampler.sample_negatives(2, &[], &[]).unwrap().len(), 0);
        assert_eq!(
            sampler.sample_negatives(0, &[], &[1]).unwrap(),
            vec![Vec::<NodeId>::new()]
        );
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let population: Vec<NodeId> = (0..50).collect();
        let a = UniformNegativeSampler::new()
            .with_seed(99)
            .sample_negatives(6, &population, &[1, 2, 3])
            .unwrap();
        let b = UniformNegativeSampler::new()
            .with_seed(99)
            .sample_negatives(6, &population, &[1, 2, 3])
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_frequency_sampler_prefers_frequent() {
        let mut population = vec![1; 90];
        population.extend(vec![2; 10]);
        let sampler = FrequencyNegativeSampler::new(1.0).with_seed(11);

        let negatives = sampler.sample_negatives(1000, &population, &[0]).unwrap();
        let ones = negatives[0].iter().filter(|&&n| n == 1).count();
        assert_eq!(negatives[0].len(), 1000);
        assert!(ones > 700, "expected mostly frequent node, got {ones}");
    }

    #[test]
    fn test_frequency_sampler_temperature() {
        let mut population = vec![1; 90];
        population.extend(vec![2; 10]);
        let sampler = FrequencyNegativeSampler::new(100.0).with_seed(11);

        let negatives = sampler.sample_negatives(1000, &population, &[0]).unwrap();
        let twos = negatives[0].iter().filter(|&&n| n == 2).count();
        assert!(twos > 300, "high temperature should flatten, got {twos}");
    }

    #[test]
    fn test_frequency_sampler_excludes_query() {
        let sampler = FrequencyNegativeSampler::new(1.0).with_seed(2);
        let negatives = sampler.sample_negatives(10, &[5, 5, 6], &[5]).unwrap();
        assert_eq!(negatives[0], vec![6; 10]);
    }

    #[test]
    fn test_distinct_counts_order() {
        assert_eq!(distinct_counts(&[3, 1, 3, 2, 1, 3]), vec![(3, 3), (1, 2), (2, 1)]);
    }

    #[test]
    fn test_config_build() {
        let config = NegativeSamplingConfig::default()
            .with_strategy(SamplingStrategy::Frequency)
            .with_temperature(0.75)
            .with_self_exclusion(SelfExclusion::Allow)
            .with_seed(8);
        let sampler = config.build();
        assert_eq!(sampler.self_exclusion(), SelfExclusion::Allow);
        assert_eq!(sampler.sample_negatives(2, &[1], &[1]).unwrap(), vec![vec![1, 1]]);
    }

    #[test]
    fn test_sampling_strategy_default() {
        assert_eq!(SamplingStrategy::default(), SamplingStrategy::Uniform);
        assert_eq!(
            NegativeSamplingConfig::default().self_exclusion,
            SelfExclusion::ExcludeQuery
        );
    }
}
