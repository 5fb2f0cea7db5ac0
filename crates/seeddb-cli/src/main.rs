use clap::{ArgAction, Args, Parser, ValueEnum};
use seeddb_lib::{seed, BuildConfig, ChildTableType, DatabaseBuilder, SequenceFormat, TantanSetting};

#[derive(Parser)]
#[command(name = "seeddb")]
#[command(version)]
#[command(about = "Build subset-seeded suffix array databases", long_about = None)]
struct Cli {
    /// Output database name
    base: String,

    /// Input files ("-" or none means stdin)
    inputs: Vec<String>,

    /// Built-in seed name (e.g. YASS) or seed file
    #[arg(short = 'u', long, value_name = "NAME|FILE")]
    seed_file: Option<String>,

    /// Ad-hoc seed pattern (repeatable)
    #[arg(long = "seed", value_name = "PATTERN")]
    seeds: Vec<String>,

    #[command(flatten)]
    options: BuildOptions,

    /// More logging (repeatable)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
}

/// Options a seed file may also carry on `#seeddb` lines; the command line
/// overrides them field by field.
#[derive(Parser)]
#[command(no_binary_name = true)]
struct EmbeddedCli {
    #[command(flatten)]
    options: BuildOptions,
}

#[derive(Args)]
struct BuildOptions {
    /// Use the protein alphabet
    #[arg(short = 'p', long)]
    protein: bool,

    /// Canonical alphabet letters
    #[arg(short = 'a', long, value_name = "LETTERS")]
    alphabet: Option<String>,

    /// Input format
    #[arg(short = 'Q', long, value_enum, value_name = "FORMAT")]
    input_format: Option<FormatArg>,

    /// Keep lowercase input letters lowercase
    #[arg(long)]
    keep_lowercase: bool,

    /// Exclude lowercase letters from seeds
    #[arg(long)]
    case_sensitive: bool,

    /// Masking: 0 off, 1 standard, 2 stricter
    #[arg(long, value_name = "0|1|2")]
    tantan: Option<u8>,

    /// Index every Nth position
    #[arg(short = 'w', long, value_name = "N")]
    index_step: Option<usize>,

    /// Minimizer window size
    #[arg(short = 'W', long, value_name = "N")]
    minimizer_window: Option<usize>,

    /// Leave runs up to this long to a comparison sort
    #[arg(short = 'm', long, value_name = "N")]
    min_seed_limit: Option<usize>,

    /// Bucket table depth (default: automatic)
    #[arg(short = 'b', long, value_name = "N")]
    bucket_depth: Option<usize>,

    /// Child table: none, byte, short or full
    #[arg(short = 'C', long, value_enum, value_name = "KIND")]
    child_table: Option<ChildTableArg>,

    /// Volume size in bytes
    #[arg(short = 's', long, value_name = "BYTES")]
    volume_size: Option<u64>,

    /// Number of threads (0 = all available cores)
    #[arg(short = 'P', long, value_name = "N")]
    threads: Option<usize>,

    /// Only write the letter counts
    #[arg(short = 'x', long)]
    counts_only: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Fasta,
    FastqSanger,
    FastqSolexa,
    FastqIllumina,
}

impl From<FormatArg> for SequenceFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Fasta => SequenceFormat::Fasta,
            FormatArg::FastqSanger => SequenceFormat::FastqSanger,
            FormatArg::FastqSolexa => SequenceFormat::FastqSolexa,
            FormatArg::FastqIllumina => SequenceFormat::FastqIllumina,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ChildTableArg {
    None,
    Byte,
    Short,
    Full,
}

impl From<ChildTableArg> for ChildTableType {
    fn from(arg: ChildTableArg) -> Self {
        match arg {
            ChildTableArg::None => ChildTableType::None,
            ChildTableArg::Byte => ChildTableType::Byte,
            ChildTableArg::Short => ChildTableType::Short,
            ChildTableArg::Full => ChildTableType::Full,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli) {
        eprintln!("seeddb: {}", err);
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    // RUST_LOG overrides; otherwise -v raises the default level
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = BuildConfig {
        base_name: cli.base,
        inputs: cli.inputs,
        seed_patterns: cli.seeds,
        ..BuildConfig::default()
    };

    // Seed-file options apply first, then the command line on top.
    if let Some(name) = &cli.seed_file {
        let text = seed::load_seed_text(name)?;
        let tokens = seed::embedded_option_tokens(&text);
        if !tokens.is_empty() {
            let embedded = EmbeddedCli::try_parse_from(tokens.iter().map(String::as_str))
                .map_err(|e| anyhow::anyhow!("bad options in seed file {}: {}", name, e))?;
            overlay(&mut config, embedded.options)?;
        }
        config.seed_text = Some(text);
    }
    overlay(&mut config, cli.options)?;

    let builder = DatabaseBuilder::new(config)?;
    builder.run()?;
    Ok(())
}

fn overlay(config: &mut BuildConfig, options: BuildOptions) -> anyhow::Result<()> {
    config.is_protein |= options.protein;
    config.keep_lowercase |= options.keep_lowercase;
    config.case_sensitive |= options.case_sensitive;
    config.counts_only |= options.counts_only;

    if let Some(letters) = options.alphabet {
        config.user_alphabet = Some(letters);
    }
    if let Some(format) = options.input_format {
        config.input_format = format.into();
    }
    if let Some(setting) = options.tantan {
        config.tantan = match setting {
            0 => TantanSetting::Off,
            1 => TantanSetting::Standard,
            2 => TantanSetting::Stricter,
            other => anyhow::bail!("bad argument: tantan setting {}", other),
        };
    }
    if let Some(step) = options.index_step {
        config.index_step = step;
    }
    if let Some(window) = options.minimizer_window {
        config.minimizer_window = window;
    }
    if let Some(limit) = options.min_seed_limit {
        config.min_seed_limit = limit;
    }
    if let Some(depth) = options.bucket_depth {
        config.bucket_depth = Some(depth);
    }
    if let Some(kind) = options.child_table {
        config.child_table = kind.into();
    }
    if let Some(bytes) = options.volume_size {
        config.volume_size = bytes;
    }
    if let Some(threads) = options.threads {
        config.num_threads = threads;
    }
    Ok(())
}
