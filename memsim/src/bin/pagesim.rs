use memsim::*;
use tracing_subscriber::EnvFilter;

/// A demand-paging simulator with FIFO local replacement
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a CSV program (`op,page,offset`); the classic
    /// twelve-instruction exercise runs if omitted
    #[arg(short, long, value_parser = clap::value_parser!(PathBuf))]
    input:          Option<PathBuf>,

    /// Frames allocated to the job, in hand-out order
    #[arg(short, long, value_delimiter = ',', default_values_t = vec![5, 8, 9, 1])]
    frames:         Vec<FrameId>,

    /// Number of pages of the job (defaults to what the program needs)
    #[arg(short, long)]
    #[arg(value_parser = clap::value_parser!(usize))]
    pages:          Option<usize>,

    /// log2 of the page size
    #[arg(long, default_value_t = 10)]
    #[arg(value_parser = clap::value_parser!(u32))]
    offset_bits:    u32,

    /// log2 of the maximum number of pages per job
    #[arg(long, default_value_t = 6)]
    #[arg(value_parser = clap::value_parser!(u32))]
    page_bits:      u32,

    /// log2 of the number of physical frames
    #[arg(long, default_value_t = 6)]
    #[arg(value_parser = clap::value_parser!(u32))]
    frame_bits:     u32,
}

const JOB: JobId = 1;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Args::parse();
    let program = match cli.input {
        Some(path)  => {
            assert!(path.exists() && path.is_file(), "Invalid input path");
            Program::new(ProgramCSVParser::new(path).read_script()?)
        },
        None        => Program::classic(),
    };
    let config = PagingConfig {
        offset_bits:    cli.offset_bits,
        page_bits:      cli.page_bits,
        frame_bits:     cli.frame_bits,
    };
    let mut engine = PagingEngine::with_config(config)?;
    let pages = cli.pages.unwrap_or(program.pages_needed().max(1));
    engine.create_job(JOB, pages, &cli.frames)?;

    let mut runner = ProgramRunner::new(&mut engine, JOB, &program)?;
    for outcome in runner.run_to_end() {
        let i = outcome.instruction;
        match outcome.result {
            Ok(r)   => println!("[{:>3}] {}", i.seq, r.message),
            Err(e)  => println!("[{:>3}] {} page {} offset {}: {e}", i.seq, i.op, i.page, i.offset),
        }
    }

    let stats = engine.stats(JOB)?;
    println!("\npage\tvalid\tframe\tmodified\tdisk");
    for e in engine.snapshot_page_table(JOB)? {
        println!(
            "{}\t{}\t{}\t{}\t\t{}",
            e.page,
            u8::from(e.present),
            e.frame.map_or_else(|| String::from("-"), |f| f.to_string()),
            u8::from(e.modified),
            e.disk_location(),
        );
    }
    println!(
        "\nAccesses:\t{}\nFaults:\t\t{}\nEvictions:\t{}\nWrite-backs:\t{}\nFault rate:\t{:.2}%",
        stats.accesses,
        stats.faults,
        stats.evictions,
        stats.write_backs,
        stats.fault_rate(),
    );

    Ok(())
}
