use anyhow::{bail, Context, Result};
use bytes::Bytes;
use downlink_core::{
    config::KEY_ENV_VAR,
    constants::{FrameLayout, ROUTING_HEADER_LEN},
    encoder::assemble_stream,
    CipherKey, FrameBuilder,
};
use serde_json::Value;
use std::fs;
use tracing::info;

use crate::{write_bits, InputFormat, LayoutArg};

/// Transmit-side settings for `pack`
#[derive(Clone, Debug, clap::Args)]
pub struct PackOptions {
    /// AES-128 key for the secured layout (falls back to DOWNLINK_KEY)
    #[arg(short, long)]
    pub key: Option<String>,

    /// Frame layout
    #[arg(long, value_enum, default_value_t = LayoutArg::Secured)]
    pub layout: LayoutArg,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = InputFormat::Bits)]
    pub format: InputFormat,

    /// Idle bits before every frame (stream mode)
    #[arg(long, default_value = "256")]
    pub idle_bits: usize,

    /// Write back-to-back datagrams instead of a stream
    #[arg(long)]
    pub datagrams: bool,

    /// Skip differential encoding of the stream
    #[arg(long)]
    pub no_differential: bool,

    /// Routing header as 8 hex characters (secured layout)
    #[arg(long)]
    pub routing_header: Option<String>,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            key: None,
            layout: LayoutArg::Secured,
            format: InputFormat::Bits,
            idle_bits: 256,
            datagrams: false,
            no_differential: false,
            routing_header: None,
        }
    }
}

/// Payload bytes for one JSON value: strings as UTF-8, anything else as JSON
fn payload_bytes(value: &Value) -> Result<Vec<u8>> {
    match value {
        Value::String(text) => Ok(text.as_bytes().to_vec()),
        other => serde_json::to_vec(other).context("Failed to serialize payload"),
    }
}

fn base_builder(options: &PackOptions) -> Result<FrameBuilder> {
    let mut builder = match FrameLayout::from(options.layout) {
        FrameLayout::Secured => {
            let key = match &options.key {
                Some(key) => key.clone(),
                None => std::env::var(KEY_ENV_VAR).with_context(|| {
                    format!("The secured layout needs --key or {}", KEY_ENV_VAR)
                })?,
            };
            let key: CipherKey = key.parse().context("Invalid key")?;
            FrameBuilder::secured(key)
        }
        FrameLayout::Plain => FrameBuilder::plain(),
    };

    if let Some(header) = &options.routing_header {
        let bytes = hex::decode(header).context("Routing header is not valid hex")?;
        let header: [u8; ROUTING_HEADER_LEN] = match bytes.try_into() {
            Ok(header) => header,
            Err(bytes) => bail!(
                "Routing header must be {} bytes, got {}",
                ROUTING_HEADER_LEN,
                bytes.len()
            ),
        };
        builder = builder.routing_header(header);
    }

    Ok(builder)
}

/// Build convolved frames for a JSON array of payloads
pub fn build_frames(payloads: &[Value], options: &PackOptions) -> Result<Vec<Vec<u8>>> {
    let builder = base_builder(options)?;

    payloads
        .iter()
        .enumerate()
        .map(|(i, payload)| {
            let bytes = payload_bytes(payload)?;
            let frame = builder
                .clone()
                .payload(Bytes::from(bytes))
                .build_bits()
                .with_context(|| format!("Failed to build frame {}", i))?;
            info!("Packed frame {} ({} bits)", i, frame.len());
            Ok(frame)
        })
        .collect()
}

pub fn execute(input: &str, output: &str, options: &PackOptions) -> Result<()> {
    info!("Packing data from {} to {}", input, output);

    // Read input JSON
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read input file: {}", input))?;

    let payloads: Vec<Value> =
        serde_json::from_str(&content).with_context(|| "Failed to parse JSON input")?;

    info!("Found {} payloads to pack", payloads.len());

    let frames = build_frames(&payloads, options)?;
    let bits = if options.datagrams {
        frames.concat()
    } else {
        assemble_stream(&frames, options.idle_bits, !options.no_differential)
    };

    write_bits(output, &bits, options.format)?;

    info!(
        "Successfully packed {} frames ({} bits total)",
        frames.len(),
        bits.len()
    );

    Ok(())
}
