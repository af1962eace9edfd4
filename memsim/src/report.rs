use crate::{ByteSteps, Outcome, Response, Stats, ValueEnum, Write};
use serde::Serialize;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One line per allocation query: 1-based offset, or -1.
    #[default]
    Plain,
    Json,
}

pub fn write_plain<W: Write>(w: &mut W, outcome: &Outcome) -> std::io::Result<()> {
    for r in &outcome.responses {
        match r.offset() {
            Some(offset)    => { writeln!(w, "{}", offset + 1)?; },
            None            => { writeln!(w, "-1")?; }
        }
    }

    Ok(())
}

/// Plain reports for several inputs. Each one gets a `==> source <==`
/// header when there is more than one, and a blank line separates them.
pub fn write_plain_batch<W: Write>(w: &mut W, batch: &[(&str, &Outcome)]) -> std::io::Result<()> {
    let headed = batch.len() > 1;
    for (idx, (source, outcome)) in batch.iter().enumerate() {
        if headed {
            if idx > 0 {
                writeln!(w)?;
            }
            writeln!(w, "==> {} <==", source)?;
        }
        write_plain(w, outcome)?;
    }

    Ok(())
}

#[derive(Serialize, Debug)]
struct StatsReport {
    total:              ByteSteps,
    free_bytes:         ByteSteps,
    allocated_bytes:    ByteSteps,
    free_segments:      usize,
    allocated_segments: usize,
    largest_free:       ByteSteps,
}

impl From<&Stats> for StatsReport {
    fn from(s: &Stats) -> Self {
        Self {
            total:              s.total,
            free_bytes:         s.free_bytes,
            allocated_bytes:    s.allocated_bytes,
            free_segments:      s.free_segments,
            allocated_segments: s.allocated_segments,
            largest_free:       s.largest_free,
        }
    }
}

#[derive(Serialize, Debug)]
struct LiveReport {
    query:  usize,
    offset: ByteSteps,
    size:   ByteSteps,
}

/// Everything [`write_json`] emits for one input.
#[derive(Serialize, Debug)]
pub struct Report<'a> {
    source:         &'a str,
    memory_size:    ByteSteps,
    responses:      &'a [Response],
    stats:          StatsReport,
    live:           Vec<LiveReport>,
}

impl<'a> Report<'a> {
    pub fn new(source: &'a str, memory_size: ByteSteps, outcome: &'a Outcome) -> Self {
        Self {
            source,
            memory_size,
            responses:  &outcome.responses,
            stats:      StatsReport::from(&outcome.stats),
            live:       outcome.live.iter()
                .map(|(query, a)| LiveReport { query: *query, offset: a.offset(), size: a.size() })
                .collect(),
        }
    }
}

pub fn write_json<W: Write>(w: &mut W, report: &Report) -> std::io::Result<()> {
    serde_json::to_writer_pretty(&mut *w, report)?;
    writeln!(w)
}
