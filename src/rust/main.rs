use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use fasttext_parallel::{Classifier, LabelCodes, NullSink, RuntimeConfig, NO_THRESHOLD};
use log::info;

/// Classify one text per input line and print the top-k labels as TSV.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the fastText model (.bin or .ftz)
    #[arg(short, long)]
    model: PathBuf,

    /// Number of labels to report per line
    #[arg(short, long, default_value_t = 1)]
    k: usize,

    /// Minimum probability; -1 disables filtering
    #[arg(short, long, default_value_t = NO_THRESHOLD, allow_hyphen_values = true)]
    threshold: f32,

    /// JSON object mapping labels to integer codes
    #[arg(short, long)]
    label_codes: Option<PathBuf>,

    /// Worker threads (0 = one per available core)
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Silence loader diagnostics
    #[arg(short, long)]
    quiet: bool,

    /// Input file, one text per line (defaults to stdin)
    input: Option<PathBuf>,
}

fn read_lines(input: Option<&PathBuf>) -> io::Result<Vec<String>> {
    match input {
        Some(path) => BufReader::new(File::open(path)?).lines().collect(),
        None => io::stdin().lock().lines().collect(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let start_time = Instant::now();
    let mut builder = Classifier::builder()
        .with_runtime_config(RuntimeConfig::default().with_threads(args.threads));
    if let Some(path) = &args.label_codes {
        builder = builder.with_label_codes(LabelCodes::from_json_file(path)?);
    }
    if args.quiet {
        builder = builder.with_diagnostics(Arc::new(NullSink));
    }
    let classifier = builder.load(&args.model)?;
    info!("Model ready (took {:.2?}): {:?}", start_time.elapsed(), classifier.info());

    let texts = read_lines(args.input.as_ref())?;
    let classify_start = Instant::now();
    let result = classifier.batch(&texts, args.k, args.threshold)?;
    let classify_time = classify_start.elapsed();
    info!("Classified {} texts in {:.2?}", texts.len(), classify_time);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for predictions in result.iter() {
        let fields: Vec<String> = predictions
            .iter()
            .map(|p| format!("{}\t{:.4}", p.label, p.prob))
            .collect();
        writeln!(out, "{}", fields.join("\t"))?;
    }
    out.flush()?;

    Ok(())
}
