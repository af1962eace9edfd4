use memsim::*;
use rayon::prelude::*;
use log::info;

/// Runs query streams against a best-fit-leftmost memory manager.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to input (repeatable; stdin if absent)
    #[arg(short, long, value_parser = clap::value_parser!(PathBuf))]
    input:      Vec<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Plain)]
    format:     OutputFormat,

    /// Skip invalid frees instead of aborting
    #[arg(long)]
    lenient:    bool,

    /// Check the memory map after every query
    #[arg(long)]
    verify:     bool,
}

struct Finished {
    source:     String,
    input:      Input,
    outcome:    Outcome,
}

fn simulate(source: String, input: Input, config: &RunConfig) -> Result<Finished> {
    let start = Instant::now();
    let outcome = run(input.memory_size, &input.queries, config)
        .with_context(|| format!("Simulation of {} failed", source))?;
    info!("{}: {} queries in {:?}", source, input.queries.len(), start.elapsed());

    Ok(Finished { source, input, outcome })
}

fn load(path: &PathBuf) -> Result<Input> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open {}", path.display()))?;

    read_input(BufReader::new(file))
        .with_context(|| format!("Cannot decode {}", path.display()))
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Args::parse();
    let config = RunConfig {
        free_policy:    if cli.lenient { FreePolicy::Lenient } else { FreePolicy::Strict },
        verify:         cli.verify,
    };

    let finished: Vec<Finished> = if cli.input.is_empty() {
        let input = read_input(io::stdin().lock())
            .context("Cannot decode stdin")?;
        vec![simulate("<stdin>".to_string(), input, &config)?]
    } else {
        cli.input.par_iter()
            .map(|path| simulate(path.display().to_string(), load(path)?, &config))
            .collect::<Result<_>>()?
    };

    let mut out = BufWriter::new(io::stdout().lock());
    match cli.format {
        OutputFormat::Plain => {
            let batch: Vec<(&str, &Outcome)> = finished.iter()
                .map(|f| (f.source.as_str(), &f.outcome))
                .collect();
            write_plain_batch(&mut out, &batch)?;
        },
        OutputFormat::Json  => {
            for f in &finished {
                let report = Report::new(&f.source, f.input.memory_size, &f.outcome);
                write_json(&mut out, &report)?;
            }
        }
    }
    out.flush()?;

    Ok(())
}
