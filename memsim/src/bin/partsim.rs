use memsim::*;
use memsim::algo::{compare_strategies, random_workload};
use tracing_subscriber::EnvFilter;

/// A dynamic-partition allocation simulator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a CSV script (`op,id,size,strategy`)
    #[arg(short, long, value_parser = clap::value_parser!(PathBuf))]
    input:      Option<PathBuf>,

    /// Size of the address space
    #[arg(short, long, default_value_t = 1024)]
    #[arg(value_parser = clap::value_parser!(Units))]
    total:      Units,

    /// Generate this many random operations instead of reading a script
    #[arg(short, long)]
    #[arg(value_parser = clap::value_parser!(usize))]
    random:     Option<usize>,

    /// Seed for random workloads
    #[arg(long, default_value_t = 0)]
    #[arg(value_parser = clap::value_parser!(u64))]
    seed:       u64,

    /// Force every allocation to use this strategy
    #[arg(short, long, value_enum)]
    strategy:   Option<Strategy>,

    /// Replay the workload under every strategy and compare
    #[arg(short, long, default_value_t = false)]
    compare:    bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Args::parse();
    let workload = match (cli.random, cli.input) {
        (Some(n), _)        => random_workload(n, cli.total, cli.seed),
        (None, Some(path))  => {
            assert!(path.exists() && path.is_file(), "Invalid input path");
            PartitionCSVParser::new(path).read_script()?
        },
        (None, None)        => { return Err("either --input or --random is required".into()); },
    };

    if cli.compare {
        let total = Instant::now();
        let reports = compare_strategies(cli.total, &workload)?;
        println!("Compared {} strategies in {} μs", reports.len(), total.elapsed().as_micros());
        println!("{:<10}\t{:>8}\t{:>8}\t{:>8}\t{:>8}", "strategy", "rejected", "no-fit", "usage", "frag.");
        for r in reports {
            println!(
                "{:<10}\t{:>8}\t{:>8}\t{:>7.2}%\t{:>7.2}%",
                r.strategy.to_string(),
                r.rejected,
                r.no_fit,
                r.stats.usage,
                r.stats.fragmentation,
            );
        }
        return Ok(());
    }

    let mut alloc = PartitionAllocator::new(cli.total)?;
    let mut rejected = 0;
    for op in &workload {
        let op = match cli.strategy {
            Some(s) => op.with_strategy(s),
            None    => *op,
        };
        match alloc.apply(&op) {
            Ok(true)    => { println!("{op}: ok"); },
            Ok(false)   => { println!("{op}: nothing to do"); },
            Err(e)      => {
                rejected += 1;
                println!("{op}: {e}");
            }
        }
    }

    println!(
        "\nFree:\t\t{}\nAllocated:\t{}\n{}\n{rejected} of {} operations rejected.",
        alloc.free_list().iter().join(" "),
        alloc.snapshot_allocations()
            .iter()
            .map(|(id, e)| format!("#{id}{e}"))
            .join(" "),
        alloc.stats(),
        workload.len(),
    );

    Ok(())
}
