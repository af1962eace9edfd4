use memsim::*;
use rand::{rngs::StdRng, SeedableRng};
use log::info;

/// Writes a random query stream that `memsim` accepts in strict mode.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Size of the managed address range
    #[arg(short, long, default_value_t = 1_000)]
    memory_size:    ByteSteps,

    /// Number of queries to emit
    #[arg(short, long, default_value_t = 1_000)]
    queries:        usize,

    /// Chance of a free whenever something is live, within [0, 1]
    #[arg(long, default_value_t = 0.4, value_parser = parse_ratio)]
    free_ratio:     f64,

    /// Largest request size
    #[arg(long, default_value_t = 100)]
    max_size:       ByteSteps,

    /// RNG seed (random if absent)
    #[arg(short, long)]
    seed:           Option<u64>,

    /// Path to output (stdout if absent)
    #[arg(short, long, value_parser = clap::value_parser!(PathBuf))]
    output:         Option<PathBuf>,
}

fn parse_ratio(arg: &str) -> Result<f64, String> {
    let ratio: f64 = arg.parse().map_err(|e| format!("{}", e))?;
    if (0.0..=1.0).contains(&ratio) {
        Ok(ratio)
    } else {
        Err(format!("{} is not within [0, 1]", ratio))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Args::parse();
    let config = GenConfig {
        memory_size:    cli.memory_size,
        queries:        cli.queries,
        free_ratio:     cli.free_ratio,
        max_size:       cli.max_size,
    };
    let mut rng = match cli.seed {
        Some(seed)  => { StdRng::seed_from_u64(seed) },
        None        => { StdRng::from_entropy() }
    };
    let input = generate(&config, &mut rng)?;
    info!("Generated {} queries over {} steps", input.queries.len(), input.memory_size);

    match cli.output {
        Some(path)  => {
            let file = File::create(&path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            let mut w = BufWriter::new(file);
            write_input(&mut w, &input)?;
            w.flush()?;
        },
        None        => {
            let mut w = BufWriter::new(io::stdout().lock());
            write_input(&mut w, &input)?;
            w.flush()?;
        }
    }

    Ok(())
}
