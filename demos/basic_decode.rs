//! Basic decoding example: build a noisy downlink stream and decode it

use downlink_core::{
    encoder::assemble_stream, stream::StreamDecoder, CipherKey, FrameBuilder, FrameDecoder,
    FrameEvent,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Downlink Basic Decoding Example\n");

    let key: CipherKey = "2b7e151628aed2a6abf7158809cf4f3c".parse()?;

    let mut frames = Vec::new();
    for i in 1..=5 {
        let payload = format!("Telemetry frame {}: battery 7.{}V", i, 40 + i);
        let bits = FrameBuilder::secured(key.clone())
            .routing_header([0x8a, 0x05, 0x10, i as u8])
            .payload(payload.into_bytes())
            .build_bits()?;
        frames.push(bits);
    }

    let mut stream = assemble_stream(&frames, 512, true);

    // One channel error every 97 bits
    for bit in stream.iter_mut().step_by(97) {
        *bit ^= 1;
    }
    println!("Stream: {} bits, {} frames", stream.len(), frames.len());

    let mut decoder = StreamDecoder::new(FrameDecoder::standard().with_key(key));
    for chunk in stream.chunks(2048) {
        decoder.push_bits(chunk);
        for event in decoder.poll() {
            match event {
                FrameEvent::Decoded(payload) => println!(
                    "  bit {:>6}: {:?} ({} bits corrected)",
                    payload.offset.unwrap_or(0),
                    payload.text_lossy(),
                    payload.counters.inner_bits
                ),
                FrameEvent::Failed(failure) => {
                    println!("  bit {:>6}: {}", failure.offset, failure.error)
                }
            }
        }
    }

    let stats = decoder.stats();
    println!(
        "\nDecoded {} of {} candidates ({:.0}%)",
        stats.frames_decoded,
        stats.candidates,
        stats.success_rate() * 100.0
    );

    Ok(())
}
