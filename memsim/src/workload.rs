use crate::{Allocation, ByteSteps, Input, MemoryManager, Query};
use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GenError {
    #[error("Free ratio {ratio} is not within [0, 1]")]
    FreeRatio { ratio: f64 },
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GenConfig {
    pub memory_size:    ByteSteps,
    pub queries:        usize,
    /// Chance that a query frees something, when anything is live.
    pub free_ratio:     f64,
    /// Requests are drawn from `0..=max_size`.
    pub max_size:       ByteSteps,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            memory_size:    1_000,
            queries:        1_000,
            free_ratio:     0.4,
            max_size:       100,
        }
    }
}

/// Builds a random query stream that stays valid under the strict
/// free policy: frees only ever target allocations that are still live.
pub fn generate<R: Rng>(config: &GenConfig, rng: &mut R) -> Result<Input, GenError> {
    let free_ratio = config.free_ratio;
    if !(0.0..=1.0).contains(&free_ratio) {
        return Err(GenError::FreeRatio { ratio: free_ratio });
    }
    let mut manager = MemoryManager::new(config.memory_size);
    let mut live: Vec<(usize, Allocation)> = vec![];
    let mut queries = Vec::with_capacity(config.queries);

    for query in 0..config.queries {
        if !live.is_empty() && rng.gen_bool(free_ratio) {
            let (target, handle) = live.swap_remove(rng.gen_range(0..live.len()));
            let released = manager.free(handle);
            debug_assert!(released.is_ok());
            queries.push(Query::Free(target));
        } else {
            let size = rng.gen_range(0..=config.max_size);
            if let Ok(handle) = manager.allocate(size) {
                live.push((query, handle));
            }
            queries.push(Query::Allocate(size));
        }
    }

    Ok(Input {
        memory_size: config.memory_size,
        queries,
    })
}
