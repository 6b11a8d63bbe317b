use anyhow::Result;
use clap::{Parser, Subcommand};
use downlink_cli::commands::{self, decode::DEFAULT_CHUNK_BITS, listen::DEFAULT_BIND, pack::PackOptions};
use downlink_cli::{DecoderArgs, InputFormat};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "downlink")]
#[command(about = "Downlink - BPSK satellite frame decoder", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a recorded bit stream
    Decode {
        /// Input bit file
        #[arg(short, long)]
        input: String,

        /// Output JSON file for the decode report
        #[arg(short, long)]
        output: Option<String>,

        /// Input format
        #[arg(short, long, value_enum, default_value_t = InputFormat::Bits)]
        format: InputFormat,

        /// Bits pushed to the decoder per step
        #[arg(long, default_value_t = DEFAULT_CHUNK_BITS)]
        chunk_bits: usize,

        #[command(flatten)]
        decoder: DecoderArgs,
    },

    /// Decode a file of pre-aligned convolved frames
    Datagram {
        /// Input file of back-to-back frames
        #[arg(short, long)]
        input: String,

        /// Output JSON file for the decode report
        #[arg(short, long)]
        output: Option<String>,

        /// Input format
        #[arg(short, long, value_enum, default_value_t = InputFormat::Bits)]
        format: InputFormat,

        #[command(flatten)]
        decoder: DecoderArgs,
    },

    /// Receive and decode frames sent as UDP datagrams
    Listen {
        /// Address to bind
        #[arg(short, long, default_value = DEFAULT_BIND)]
        bind: String,

        /// Stop after this many datagrams
        #[arg(short = 'n', long)]
        count: Option<usize>,

        /// Stop after this many milliseconds without a datagram (0 waits forever)
        #[arg(long, default_value = "0")]
        timeout_ms: u64,

        /// Output JSON file for the decode report
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        decoder: DecoderArgs,
    },

    /// Pack JSON payloads into convolved frames
    Pack {
        /// Input JSON file (array of payloads)
        #[arg(short, long)]
        input: String,

        /// Output file for packed frames
        #[arg(short, long)]
        output: String,

        #[command(flatten)]
        options: PackOptions,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Decode {
            input,
            output,
            format,
            chunk_bits,
            decoder,
        } => commands::decode::execute(&input, output.as_deref(), format, chunk_bits, &decoder),

        Commands::Datagram {
            input,
            output,
            format,
            decoder,
        } => commands::datagram::execute(&input, output.as_deref(), format, &decoder),

        Commands::Listen {
            bind,
            count,
            timeout_ms,
            output,
            decoder,
        } => commands::listen::execute(&bind, count, timeout_ms, output.as_deref(), &decoder),

        Commands::Pack {
            input,
            output,
            options,
        } => commands::pack::execute(&input, &output, &options),
    }
}
