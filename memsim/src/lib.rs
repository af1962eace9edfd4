//! Drives a [`bestfit::MemoryManager`] with textual query streams.
//!
//! An input is the size of the address range, the number of queries,
//! and then the queries themselves, all whitespace-separated integers.
//! A non-negative `k` asks for `k` steps. A negative `v` frees whatever
//! query number `-v - 1` allocated, counting every query, frees included,
//! from zero.

pub use std::io::{self, BufReader, BufWriter, Read, Write};
pub use std::fs::File;
pub use std::path::PathBuf;
pub use std::time::Instant;
pub use anyhow::{Context, Result};
pub use clap::{Parser, ValueEnum};
pub use bestfit::{Allocation, ByteSteps, MemoryManager, Stats};

pub mod query;
pub mod run;
pub mod report;
pub mod workload;

pub use query::{parse_input, read_input, write_input, DecodeError, Input, Query};
pub use run::{run, FreePolicy, FreeRefusal, Outcome, Response, RunConfig, RunError};
pub use report::{write_json, write_plain, write_plain_batch, OutputFormat, Report};
pub use workload::{generate, GenConfig, GenError};
