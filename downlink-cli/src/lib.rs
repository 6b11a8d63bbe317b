//! Library entry for downlink-cli used by integration tests and embedding.

use anyhow::{bail, Context, Result};
use downlink_core::{
    bits::{hard_decisions, pack_bits, unpack_bits},
    config::DecoderConfig,
    constants::FrameLayout,
    CorrectionCounters, DecodeStats, DecodedPayload, FrameError, FrameFailure,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub mod commands;

// Re-export commands for convenience
pub use commands::*;

/// On-disk representation of a bit stream
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum InputFormat {
    /// One bit per byte (GNU Radio unpacked)
    #[default]
    Bits,
    /// Bits packed MSB-first into bytes
    Packed,
    /// Little-endian f32 BPSK soft symbols
    Symbols,
}

impl InputFormat {
    /// Turn raw file bytes into one bit per byte
    pub fn to_bits(self, raw: &[u8]) -> Result<Vec<u8>> {
        match self {
            InputFormat::Bits => Ok(raw.iter().map(|b| b & 1).collect()),
            InputFormat::Packed => Ok(unpack_bits(raw)),
            InputFormat::Symbols => Ok(hard_decisions(&parse_symbols(raw)?)),
        }
    }

    /// Serialize bits (one per byte) in this format
    pub fn serialize_bits(self, bits: &[u8]) -> Vec<u8> {
        match self {
            InputFormat::Bits => bits.to_vec(),
            InputFormat::Packed => pack_bits(bits),
            InputFormat::Symbols => bits
                .iter()
                .flat_map(|&b| {
                    let symbol: f32 = if b & 1 == 1 { 1.0 } else { -1.0 };
                    symbol.to_le_bytes()
                })
                .collect(),
        }
    }
}

/// Decode little-endian f32 soft symbols
pub fn parse_symbols(raw: &[u8]) -> Result<Vec<f32>> {
    if raw.len() % 4 != 0 {
        bail!(
            "symbol input of {} bytes is not a whole number of f32 values",
            raw.len()
        );
    }
    Ok(raw
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

/// Frame layout selector for the command line
#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LayoutArg {
    /// Length, headers, encrypted data region and CRC-32
    Secured,
    /// Length-prefixed plaintext
    Plain,
}

impl From<LayoutArg> for FrameLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Secured => FrameLayout::Secured,
            LayoutArg::Plain => FrameLayout::Plain,
        }
    }
}

/// Decoder settings shared by `decode`, `datagram` and `listen`
#[derive(Clone, Debug, Default, clap::Args)]
pub struct DecoderArgs {
    /// JSON decoder configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// AES-128 key (32 hex characters or 0xNN,... list); overrides config and DOWNLINK_KEY
    #[arg(short, long)]
    pub key: Option<String>,

    /// Frame layout
    #[arg(long, value_enum)]
    pub layout: Option<LayoutArg>,

    /// Convolved marker threshold (of 64 bits)
    #[arg(long)]
    pub threshold: Option<u32>,

    /// Bits to skip before the first search
    #[arg(long)]
    pub skip: Option<usize>,

    /// Input bits are not differentially encoded
    #[arg(long)]
    pub no_differential: bool,

    /// Reset after this many zero-valued symbols in a row (symbols input)
    #[arg(long)]
    pub idle_reset: Option<usize>,
}

impl DecoderArgs {
    /// Merge config file, environment and flags, then validate
    ///
    /// Precedence: flags over `DOWNLINK_KEY` over the config file over defaults.
    pub fn resolve(&self) -> Result<DecoderConfig> {
        let config = match &self.config {
            Some(path) => DecoderConfig::from_file(path)
                .with_context(|| format!("Failed to load config file: {}", path))?,
            None => DecoderConfig::default(),
        };

        let mut config = config
            .with_env_overrides()
            .with_key_override(self.key.clone());
        if let Some(layout) = self.layout {
            config.layout = layout.into();
        }
        if let Some(threshold) = self.threshold {
            config.convolved_threshold = threshold;
        }
        if let Some(skip) = self.skip {
            config.initial_offset = skip;
        }
        if self.no_differential {
            config.differential = false;
        }
        if let Some(symbols) = self.idle_reset {
            config.idle_reset_symbols = Some(symbols);
        }

        config.validate().context("Invalid decoder configuration")?;
        Ok(config)
    }
}

/// Read a bit file in the given format
pub fn read_bits(path: impl AsRef<Path>, format: InputFormat) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let raw =
        fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;
    format.to_bits(&raw)
}

/// Read a file of little-endian f32 soft symbols
pub fn read_symbols(path: impl AsRef<Path>) -> Result<Vec<f32>> {
    let path = path.as_ref();
    let raw =
        fs::read(path).with_context(|| format!("Failed to read input file: {}", path.display()))?;
    parse_symbols(&raw)
}

/// Write bits to a file in the given format
pub fn write_bits(path: impl AsRef<Path>, bits: &[u8], format: InputFormat) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, format.serialize_bits(bits))
        .with_context(|| format!("Failed to write output file: {}", path.display()))
}

/// One recovered frame in a JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Bit offset in the stream (streaming mode only)
    pub offset: Option<usize>,
    /// Datagram index when decoded from a datagram file or socket
    pub datagram: Option<usize>,
    /// Length field as received, before clamping
    pub declared_length: u16,
    /// Routing header as hex (secured layout)
    pub routing_header: Option<String>,
    /// Control header as hex (secured layout)
    pub control_header: Option<String>,
    /// Payload as lossy UTF-8
    pub text: String,
    /// Payload as hex
    pub hex: String,
    /// Declared length ran past the data region
    pub truncated: bool,
    /// Inner bits and outer symbols corrected
    pub counters: CorrectionCounters,
}

impl FrameReport {
    /// Build a report entry from a decoded payload
    pub fn new(payload: &DecodedPayload, datagram: Option<usize>) -> Self {
        Self {
            offset: payload.offset,
            datagram,
            declared_length: payload.declared_length,
            routing_header: payload.routing_header.map(|h| h.to_string()),
            control_header: payload.control_header.map(|h| h.to_string()),
            text: payload.text_lossy(),
            hex: hex::encode(&payload.data),
            truncated: payload.truncated,
            counters: payload.counters,
        }
    }
}

/// One rejected candidate in a JSON report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Bit offset of the candidate (streaming mode only)
    pub offset: Option<usize>,
    /// Datagram index (datagram and listen modes)
    pub datagram: Option<usize>,
    /// Pipeline stage that failed
    pub stage: String,
    /// Error message
    pub error: String,
}

impl FailureReport {
    /// Report entry for a streaming failure
    pub fn from_stream(failure: &FrameFailure) -> Self {
        Self {
            offset: Some(failure.offset),
            datagram: None,
            stage: failure.error.stage().to_string(),
            error: failure.error.to_string(),
        }
    }

    /// Report entry for a rejected datagram
    pub fn from_datagram(index: usize, error: &FrameError) -> Self {
        Self {
            offset: None,
            datagram: Some(index),
            stage: error.stage().to_string(),
            error: error.to_string(),
        }
    }
}

/// Full JSON report of a decode run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecodeReport {
    /// Recovered frames in stream order
    pub frames: Vec<FrameReport>,
    /// Rejected candidates in stream order
    pub failures: Vec<FailureReport>,
    /// Decoder counters at the end of the run
    pub stats: DecodeStats,
}

impl DecodeReport {
    /// Write the report as pretty JSON
    pub fn write(&self, path: &str) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize decode report")?;
        fs::write(path, json).with_context(|| format!("Failed to write report file: {}", path))
    }

    /// Print a colored summary to stdout
    pub fn print_summary(&self) {
        use colored::Colorize;

        let stats = &self.stats;
        println!("\n=== Decode Results ===");
        println!("Bits received:      {}", stats.bits_received);
        println!("Candidates:         {}", stats.candidates);
        println!("Frames decoded:     {}", stats.frames_decoded);
        println!("Inner failures:     {}", stats.inner_failures);
        println!("Outer failures:     {}", stats.outer_failures);
        println!("Checksum failures:  {}", stats.integrity_failures);
        println!("Decrypt failures:   {}", stats.decrypt_failures);
        println!("Success rate:       {:.2}%", stats.success_rate() * 100.0);
        println!();

        for frame in &self.frames {
            let position = match (frame.offset, frame.datagram) {
                (Some(offset), _) => format!("bit {}", offset),
                (None, Some(index)) => format!("datagram {}", index),
                (None, None) => "-".to_string(),
            };
            println!(
                "{} {:>14}: {} bytes, {} bits / {} symbols corrected: {:?}",
                "✓".green(),
                position,
                frame.hex.len() / 2,
                frame.counters.inner_bits,
                frame.counters.outer_symbols,
                frame.text
            );
        }
        for failure in &self.failures {
            let position = match (failure.offset, failure.datagram) {
                (Some(offset), _) => format!("bit {}", offset),
                (None, Some(index)) => format!("datagram {}", index),
                (None, None) => "-".to_string(),
            };
            println!("{} {:>14}: {}", "✗".red(), position, failure.error);
        }
    }
}
