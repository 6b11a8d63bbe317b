use anyhow::{Context, Result};
use downlink_core::FrameEvent;
use tracing::info;

use crate::{
    read_bits, read_symbols, DecodeReport, DecoderArgs, FailureReport, FrameReport, InputFormat,
};

/// Default number of bits handed to the decoder per push
pub const DEFAULT_CHUNK_BITS: usize = 8192;

/// Stream a recorded bit file through the decoder and collect a report
///
/// The file is fed in `chunk_bits` pieces, the way a demodulator would
/// deliver it. Symbol files go in as soft symbols so runs of silence can
/// reset the decoder.
pub fn run(
    input: &str,
    format: InputFormat,
    chunk_bits: usize,
    args: &DecoderArgs,
) -> Result<DecodeReport> {
    let config = args.resolve()?;
    let mut decoder = config
        .build_stream_decoder()
        .context("Failed to build stream decoder")?;
    let chunk_len = chunk_bits.max(1);

    let mut report = DecodeReport::default();
    let mut collect = |events: Vec<FrameEvent>| {
        for event in events {
            match event {
                FrameEvent::Decoded(payload) => report.frames.push(FrameReport::new(&payload, None)),
                FrameEvent::Failed(failure) => {
                    report.failures.push(FailureReport::from_stream(&failure))
                }
            }
        }
    };

    if format == InputFormat::Symbols {
        let symbols = read_symbols(input)?;
        info!("Decoding {} symbols from {}", symbols.len(), input);
        for chunk in symbols.chunks(chunk_len) {
            decoder.push_symbols(chunk);
            collect(decoder.poll());
        }
    } else {
        let bits = read_bits(input, format)?;
        info!("Decoding {} bits from {}", bits.len(), input);
        for chunk in bits.chunks(chunk_len) {
            decoder.push_bits(chunk);
            collect(decoder.poll());
        }
    }
    report.stats = *decoder.stats();

    Ok(report)
}

pub fn execute(
    input: &str,
    output: Option<&str>,
    format: InputFormat,
    chunk_bits: usize,
    args: &DecoderArgs,
) -> Result<()> {
    let report = run(input, format, chunk_bits, args)?;
    report.print_summary();

    if let Some(output_path) = output {
        report.write(output_path)?;
        info!("Decode report written to: {}", output_path);
    }

    Ok(())
}
