use crate::{Allocation, ByteSteps, MemoryManager, Query, Stats, ValueEnum};
use ahash::AHasher;
use bestfit::{FreeError, InvariantError};
use indexmap::IndexMap;
use log::{debug, warn};
use serde::Serialize;
use std::hash::BuildHasherDefault;
use thiserror::Error;

/// What to do with a free query whose target cannot be released.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FreePolicy {
    /// Abort the run.
    #[default]
    Strict,
    /// Log a warning and move on.
    Lenient,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunConfig {
    pub free_policy:    FreePolicy,
    /// Check the manager's invariants after every query.
    pub verify:         bool,
}

/// The answer to one allocation query.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Response {
    /// 0-based start offset.
    Placed { offset: ByteSteps },
    Rejected,
}

impl Response {
    pub fn offset(&self) -> Option<ByteSteps> {
        match *self {
            Response::Placed { offset }     => { Some(offset) },
            Response::Rejected              => { None },
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeRefusal {
    #[error("no such query has been issued yet")]
    NotIssued,
    #[error("the target is itself a free query")]
    NotAnAllocation,
    #[error("the target allocation was rejected")]
    Rejected,
    #[error("the target allocation has already been released")]
    AlreadyReleased,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunError {
    #[error("Query {query} cannot free query {target}: {reason}")]
    InvalidFree {
        query:  usize,
        target: usize,
        #[source]
        reason: FreeRefusal,
    },
    #[error("Query {query} refused the handle of query {target}")]
    Handle {
        query:  usize,
        target: usize,
        #[source]
        source: FreeError,
    },
    #[error("Memory map corrupted after query {query}")]
    Corrupted {
        query:  usize,
        #[source]
        source: InvariantError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// One entry per allocation query, in query order.
    pub responses:  Vec<Response>,
    pub stats:      Stats,
    /// Allocations never freed, keyed by the query that made them.
    pub live:       Vec<(usize, Allocation)>,
}

// What each past query left behind.
#[derive(Copy, Clone, Debug)]
enum Ticket {
    Live(Allocation),
    Rejected,
    Released,
    Free,
}

type Ledger = IndexMap<usize, Ticket, BuildHasherDefault<AHasher>>;

/// Feeds `queries` to a fresh manager over `[0, memory_size)`.
pub fn run(
    memory_size:    ByteSteps,
    queries:        &[Query],
    config:         &RunConfig,
) -> Result<Outcome, RunError> {
    let mut manager = MemoryManager::new(memory_size);
    let mut ledger = Ledger::with_capacity_and_hasher(queries.len(), Default::default());
    let mut responses = Vec::with_capacity(queries.len());

    for (query, q) in queries.iter().enumerate() {
        let ticket = match *q {
            Query::Allocate(size)   => {
                match manager.allocate(size) {
                    Ok(handle)  => {
                        responses.push(Response::Placed { offset: handle.offset() });
                        Ticket::Live(handle)
                    },
                    Err(e)      => {
                        debug!("Query {}: {}", query, e);
                        responses.push(Response::Rejected);
                        Ticket::Rejected
                    }
                }
            },
            Query::Free(target)     => {
                let refusal = match ledger.get(&target).copied() {
                    Some(Ticket::Live(handle))  => {
                        manager.free(handle)
                            .map_err(|source| RunError::Handle { query, target, source })?;
                        ledger.insert(target, Ticket::Released);
                        None
                    },
                    Some(Ticket::Rejected)      => { Some(FreeRefusal::Rejected) },
                    Some(Ticket::Released)      => { Some(FreeRefusal::AlreadyReleased) },
                    Some(Ticket::Free)          => { Some(FreeRefusal::NotAnAllocation) },
                    None                        => { Some(FreeRefusal::NotIssued) },
                };
                if let Some(reason) = refusal {
                    match config.free_policy {
                        FreePolicy::Strict  => {
                            return Err(RunError::InvalidFree { query, target, reason });
                        },
                        FreePolicy::Lenient => {
                            warn!("Query {} skipped: cannot free query {} ({})", query, target, reason);
                        }
                    }
                }
                Ticket::Free
            }
        };
        ledger.insert(query, ticket);
        if config.verify {
            manager.check_invariants()
                .map_err(|source| RunError::Corrupted { query, source })?;
        }
    }

    let live = ledger.iter()
        .filter_map(|(query, ticket)| match ticket {
            Ticket::Live(handle)    => { Some((*query, *handle)) },
            _                       => { None },
        })
        .collect();

    Ok(Outcome {
        responses,
        stats: manager.stats(),
        live,
    })
}
