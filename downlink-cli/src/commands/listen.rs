use anyhow::{Context, Result};
use colored::Colorize;
use downlink_core::{constants::FRAME_BIT_LEN, StandardFrameDecoder};
use std::net::UdpSocket;
use std::time::Duration;
use tracing::{info, warn};

use crate::commands::datagram::decode_one;
use crate::{DecodeReport, DecoderArgs};

/// Default bind address for the datagram receiver
pub const DEFAULT_BIND: &str = "0.0.0.0:52001";

/// Receive datagrams on `socket` until `count` have been handled
///
/// Each datagram carries one convolved frame as one bit per byte. With no
/// `count` the loop runs until the socket errors or times out.
pub fn serve(
    socket: &UdpSocket,
    decoder: &StandardFrameDecoder,
    count: Option<usize>,
) -> Result<DecodeReport> {
    let mut report = DecodeReport::default();
    // Room for an oversized datagram so it can be reported
    let mut buf = vec![0u8; FRAME_BIT_LEN * 2];
    let mut index = 0;

    while count.map_or(true, |limit| index < limit) {
        let (n, peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(ref e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                info!("Receive timed out after {} datagrams", index);
                break;
            }
            Err(e) => return Err(e).context("Failed to receive datagram"),
        };

        if n != FRAME_BIT_LEN {
            warn!("Datagram {} from {} has {} bytes, expected {}", index, peer, n, FRAME_BIT_LEN);
        }
        let bits: Vec<u8> = buf[..n].iter().map(|b| b & 1).collect();

        let decoded_before = report.frames.len();
        decode_one(decoder, index, &bits, &mut report);
        if let Some(frame) = report.frames.get(decoded_before) {
            println!(
                "{} datagram {} from {}: {:?}",
                "✓".green(),
                index,
                peer,
                frame.text
            );
        }
        index += 1;
    }

    Ok(report)
}

pub fn execute(
    bind: &str,
    count: Option<usize>,
    timeout_ms: u64,
    output: Option<&str>,
    args: &DecoderArgs,
) -> Result<()> {
    let config = args.resolve()?;
    let decoder = config
        .build_frame_decoder()
        .context("Failed to build frame decoder")?;

    let socket =
        UdpSocket::bind(bind).with_context(|| format!("Failed to bind UDP socket: {}", bind))?;
    if timeout_ms > 0 {
        socket
            .set_read_timeout(Some(Duration::from_millis(timeout_ms)))
            .context("Failed to set receive timeout")?;
    }
    info!("Listening for datagrams on {}", bind);

    let report = serve(&socket, &decoder, count)?;
    report.print_summary();

    if let Some(output_path) = output {
        report.write(output_path)?;
        info!("Decode report written to: {}", output_path);
    }

    Ok(())
}
