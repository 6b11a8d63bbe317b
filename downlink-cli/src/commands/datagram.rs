use anyhow::{Context, Result};
use downlink_core::{constants::FRAME_BIT_LEN, StandardFrameDecoder};
use tracing::{info, warn};

use crate::{read_bits, DecodeReport, DecoderArgs, FailureReport, FrameReport, InputFormat};

/// Decode one pre-aligned datagram into `report`
pub fn decode_one(
    decoder: &StandardFrameDecoder,
    index: usize,
    bits: &[u8],
    report: &mut DecodeReport,
) {
    report.stats.bits_received += bits.len() as u64;
    report.stats.candidates += 1;

    match decoder.decode_datagram(bits) {
        Ok(payload) => {
            report.stats.frames_decoded += 1;
            report.frames.push(FrameReport::new(&payload, Some(index)));
        }
        Err(error) => {
            warn!(datagram = index, stage = %error.stage(), "Datagram rejected: {}", error);
            report.stats.record_failure(&error);
            report.failures.push(FailureReport::from_datagram(index, &error));
        }
    }
}

/// Decode a file of back-to-back convolved frames
///
/// Each frame is decoded independently without differential decoding or
/// marker search; a trailing partial frame is reported as incomplete.
pub fn run(input: &str, format: InputFormat, args: &DecoderArgs) -> Result<DecodeReport> {
    let config = args.resolve()?;
    let decoder = config
        .build_frame_decoder()
        .context("Failed to build frame decoder")?;

    let bits = read_bits(input, format)?;
    info!(
        "Decoding {} datagrams from {}",
        (bits.len() + FRAME_BIT_LEN - 1) / FRAME_BIT_LEN,
        input
    );

    let mut report = DecodeReport::default();
    for (index, datagram) in bits.chunks(FRAME_BIT_LEN).enumerate() {
        decode_one(&decoder, index, datagram, &mut report);
    }

    Ok(report)
}

pub fn execute(
    input: &str,
    output: Option<&str>,
    format: InputFormat,
    args: &DecoderArgs,
) -> Result<()> {
    let report = run(input, format, args)?;
    report.print_summary();

    if let Some(output_path) = output {
        report.write(output_path)?;
        info!("Decode report written to: {}", output_path);
    }

    Ok(())
}
