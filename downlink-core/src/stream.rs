//! Streaming resynchronization
//!
//! [`StreamDecoder`] owns the growing bit buffer and a persistent scan
//! offset. Each [`poll`](StreamDecoder::poll) scans forward from the offset:
//!
//! - no convolved marker within reach: wait for more bits
//! - candidate found but an FEC stage failed: resume one bit later
//! - both FEC stages succeeded: jump to the end of the frame minus the
//!   resync overlap, whatever the checksum or cipher then say
//!
//! Scanning stops while fewer than one frame of bits remain past the
//! offset. Bits that can never be rescanned are dropped after every poll;
//! reported offsets stay absolute since the last reset.
//!
//! With [`StreamConfig::idle_reset_symbols`] set, a run of that many
//! exactly-zero soft symbols (a closed squelch) ends the burst: pending bits
//! are decoded, then the stream is reset.

use crate::bits::{hard_decisions, BitStream};
use crate::constants::{FRAME_BIT_LEN, RESYNC_OVERLAP_BITS};
use crate::decoder::FrameDecoder;
use crate::differential::DifferentialDecoder;
use crate::error::{DecodeStage, FrameError};
use crate::fec::{InnerDecoder, OuterDecoder};
use crate::scanner::{find_access_code, AccessCode};
use crate::types::{CorrectionCounters, DecodedPayload};
use serde::{Deserialize, Serialize};

#[cfg(feature = "logging")]
use tracing::{debug, info, warn};

/// What to do when fewer than one frame of bits remain past the offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndOfBufferPolicy {
    /// Stop scanning and resume from the same offset once more bits arrive
    #[default]
    AwaitMoreData,
}

/// Streaming parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConfig {
    /// Convolved-domain marker and threshold
    pub convolved_code: AccessCode,
    /// Bits the offset is pulled back after a decoded frame
    pub resync_overlap_bits: usize,
    /// Bits skipped after every reset before the first search
    pub initial_offset: usize,
    /// Differentially decode incoming bits
    pub differential: bool,
    /// Behaviour near the buffer end
    pub end_of_buffer: EndOfBufferPolicy,
    /// Zero-valued symbols in a row that count as loss of signal
    pub idle_reset_symbols: Option<usize>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            convolved_code: AccessCode::CONVOLVED,
            resync_overlap_bits: RESYNC_OVERLAP_BITS,
            initial_offset: 0,
            differential: true,
            end_of_buffer: EndOfBufferPolicy::AwaitMoreData,
            idle_reset_symbols: None,
        }
    }
}

/// Decoder lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No bits since creation or the last reset
    Idle,
    /// Holding bits; candidates are decoded inside [`StreamDecoder::poll`]
    Scanning,
}

/// A candidate that did not yield a payload
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFailure {
    /// Absolute bit offset of the candidate
    pub offset: usize,
    /// What went wrong
    pub error: FrameError,
    /// FEC work, present when both FEC stages succeeded
    pub counters: Option<CorrectionCounters>,
}

/// Outcome of one candidate
#[derive(Debug, Clone, PartialEq)]
pub enum FrameEvent {
    /// Payload recovered
    Decoded(DecodedPayload),
    /// Candidate rejected
    Failed(FrameFailure),
}

/// Counters kept since creation or the last [`StreamDecoder::take_stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeStats {
    /// Bits pushed in
    pub bits_received: u64,
    /// Convolved marker matches handed to the frame decoder
    pub candidates: u64,
    /// Payloads recovered
    pub frames_decoded: u64,
    /// Inner decode or decoded-marker failures
    pub inner_failures: u64,
    /// Outer decode failures
    pub outer_failures: u64,
    /// Checksum mismatches
    pub integrity_failures: u64,
    /// Frames that could not be decrypted
    pub decrypt_failures: u64,
    /// Resets (loss of signal)
    pub resets: u64,
}

impl DecodeStats {
    /// Fraction of candidates that produced a payload
    pub fn success_rate(&self) -> f64 {
        if self.candidates == 0 {
            return 0.0;
        }
        self.frames_decoded as f64 / self.candidates as f64
    }

    /// Count a rejected candidate under its stage
    pub fn record_failure(&mut self, error: &FrameError) {
        match error.stage() {
            DecodeStage::Inner => self.inner_failures += 1,
            DecodeStage::Outer => self.outer_failures += 1,
            DecodeStage::Integrity => self.integrity_failures += 1,
            DecodeStage::Decrypt => self.decrypt_failures += 1,
            DecodeStage::Sync | DecodeStage::Input => {}
        }
    }
}

/// Continuous-stream frame decoder
#[derive(Debug)]
pub struct StreamDecoder<I, O> {
    decoder: FrameDecoder<I, O>,
    config: StreamConfig,
    bits: BitStream,
    differential: DifferentialDecoder,
    offset: usize,
    state: StreamState,
    stats: DecodeStats,
    silent_run: usize,
    pending: Vec<FrameEvent>,
}

impl<I: InnerDecoder, O: OuterDecoder> StreamDecoder<I, O> {
    /// Create a stream decoder with default parameters
    pub fn new(decoder: FrameDecoder<I, O>) -> Self {
        Self::with_config(decoder, StreamConfig::default())
    }

    /// Create a stream decoder
    ///
    /// The resync overlap is capped at one bit short of a frame so every
    /// decoded frame moves the offset forward.
    pub fn with_config(decoder: FrameDecoder<I, O>, mut config: StreamConfig) -> Self {
        if config.resync_overlap_bits >= FRAME_BIT_LEN {
            #[cfg(feature = "logging")]
            warn!(
                "Resync overlap of {} bits capped at {}",
                config.resync_overlap_bits,
                FRAME_BIT_LEN - 1
            );
            config.resync_overlap_bits = FRAME_BIT_LEN - 1;
        }
        Self {
            decoder,
            offset: config.initial_offset,
            config,
            bits: BitStream::new(),
            differential: DifferentialDecoder::new(),
            state: StreamState::Idle,
            stats: DecodeStats::default(),
            silent_run: 0,
            pending: Vec::new(),
        }
    }

    /// Append received bits (one bit per byte)
    pub fn push_bits(&mut self, bits: &[u8]) {
        if bits.is_empty() {
            return;
        }
        if self.config.differential {
            let decoded = self.differential.decode(bits);
            self.bits.extend(&decoded);
        } else {
            self.bits.extend(bits);
        }
        self.stats.bits_received += bits.len() as u64;
        self.state = StreamState::Scanning;
    }

    /// Append BPSK soft symbols, sliced to hard decisions
    ///
    /// When an idle limit is configured, zero symbols at or past the limit
    /// are dropped; reaching it decodes what is buffered and resets. The
    /// resulting events are returned by the next [`poll`](Self::poll).
    pub fn push_symbols(&mut self, symbols: &[f32]) {
        let limit = match self.config.idle_reset_symbols {
            Some(limit) if limit > 0 => limit,
            _ => return self.push_bits(&hard_decisions(symbols)),
        };

        let mut start = 0;
        for (i, &symbol) in symbols.iter().enumerate() {
            if symbol != 0.0 {
                self.silent_run = 0;
                continue;
            }
            self.silent_run += 1;
            if self.silent_run == limit {
                let run_start = (i + 1).saturating_sub(limit).max(start);
                self.push_bits(&hard_decisions(&symbols[start..run_start]));
                self.squelch(limit);
            }
            if self.silent_run >= limit {
                start = i + 1;
            }
        }
        self.push_bits(&hard_decisions(&symbols[start..]));
    }

    fn squelch(&mut self, limit: usize) {
        let events = self.poll();
        self.pending.extend(events);

        #[cfg(feature = "logging")]
        info!("Signal lost after {} silent symbols, resetting", limit);
        #[cfg(not(feature = "logging"))]
        let _ = limit;

        self.reset();
    }

    /// Scan and decode every frame reachable with the bits held
    pub fn poll(&mut self) -> Vec<FrameEvent> {
        let mut events = std::mem::take(&mut self.pending);
        if self.state == StreamState::Idle {
            return events;
        }

        let overlap = self.config.resync_overlap_bits;
        let code = self.config.convolved_code;

        loop {
            let end = self.bits.end();
            if self.offset.saturating_add(FRAME_BIT_LEN) > end {
                // EndOfBufferPolicy::AwaitMoreData
                break;
            }

            let base = self.bits.base();
            let bits = self.bits.as_slice();
            let candidate = match find_access_code(bits, self.offset - base, &code, FRAME_BIT_LEN)
            {
                Ok(candidate) => candidate,
                Err(_) => {
                    // Every start that still fits a frame was inspected
                    self.offset = end - FRAME_BIT_LEN + 1;
                    break;
                }
            };

            let position = base + candidate.offset;
            self.stats.candidates += 1;
            let frame_bits = &bits[candidate.offset..candidate.offset + FRAME_BIT_LEN];

            match self.decoder.decode_fec(frame_bits) {
                Ok(frame) => {
                    self.offset = position + FRAME_BIT_LEN - overlap;
                    match self.decoder.open(&frame, Some(position)) {
                        Ok(payload) => {
                            self.stats.frames_decoded += 1;
                            events.push(FrameEvent::Decoded(payload));
                        }
                        Err(error) => {
                            #[cfg(feature = "logging")]
                            warn!("Frame at bit {} rejected ({}): {}", position, error.stage(), error);

                            self.stats.record_failure(&error);
                            events.push(FrameEvent::Failed(FrameFailure {
                                offset: position,
                                error,
                                counters: Some(frame.counters),
                            }));
                        }
                    }
                }
                Err(error) => {
                    #[cfg(feature = "logging")]
                    debug!(
                        "Candidate at bit {} ({} matching) failed ({}): {}",
                        position,
                        candidate.matches,
                        error.stage(),
                        error
                    );

                    self.offset = position + 1;
                    self.stats.record_failure(&error);
                    events.push(FrameEvent::Failed(FrameFailure {
                        offset: position,
                        error,
                        counters: None,
                    }));
                }
            }
        }

        self.bits.discard_before(self.offset);
        events
    }

    /// Drop all bits and state, as on loss of signal
    pub fn reset(&mut self) {
        self.bits.reset();
        self.differential.reset();
        self.offset = self.config.initial_offset;
        self.state = StreamState::Idle;
        self.stats.resets += 1;
    }

    /// Lifecycle state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Absolute bit offset the next scan starts from
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bits currently buffered
    pub fn buffered_bits(&self) -> usize {
        self.bits.len()
    }

    /// Counters so far
    pub fn stats(&self) -> &DecodeStats {
        &self.stats
    }

    /// Return the counters and start new ones
    pub fn take_stats(&mut self) -> DecodeStats {
        std::mem::take(&mut self.stats)
    }

    /// Frame decoder in use
    pub fn decoder(&self) -> &FrameDecoder<I, O> {
        &self.decoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::unpack_bits;
    use crate::constants::{
        FrameLayout, CONVOLVED_MARKER_WORD, RS_BLOCK_LEN, SYNC_MARKER,
    };
    use crate::encoder::FrameBuilder;
    use crate::fec::fixture::{FixtureInner, FixtureOuter};

    fn plain_config() -> StreamConfig {
        StreamConfig {
            differential: false,
            ..StreamConfig::default()
        }
    }

    #[test]
    fn test_idle_until_bits_arrive() {
        let decoder = FrameDecoder::new(FixtureInner::failing("x"), FixtureOuter::passthrough());
        let mut stream = StreamDecoder::new(decoder);
        assert_eq!(stream.state(), StreamState::Idle);
        assert!(stream.poll().is_empty());

        stream.push_bits(&[0, 1, 0]);
        assert_eq!(stream.state(), StreamState::Scanning);
        assert_eq!(stream.stats().bits_received, 3);
    }

    #[test]
    fn test_no_sync_skips_to_last_frame_start() {
        let decoder = FrameDecoder::new(FixtureInner::failing("x"), FixtureOuter::passthrough());
        let mut stream = StreamDecoder::with_config(decoder, plain_config());
        stream.push_bits(&vec![0u8; FRAME_BIT_LEN + 500]);

        assert!(stream.poll().is_empty());
        assert_eq!(stream.offset(), 501);
        assert_eq!(stream.buffered_bits(), FRAME_BIT_LEN - 1);
        assert_eq!(stream.decoder().inner().calls(), 0);
    }

    #[test]
    fn test_short_buffer_waits() {
        let decoder = FrameDecoder::new(FixtureInner::failing("x"), FixtureOuter::passthrough());
        let mut stream = StreamDecoder::with_config(decoder, plain_config());
        stream.push_bits(&vec![1u8; FRAME_BIT_LEN - 1]);

        assert!(stream.poll().is_empty());
        assert_eq!(stream.offset(), 0);
        assert_eq!(stream.buffered_bits(), FRAME_BIT_LEN - 1);
    }

    #[test]
    fn test_reset_restores_initial_offset() {
        let config = StreamConfig {
            initial_offset: 128,
            ..plain_config()
        };
        let decoder = FrameDecoder::new(FixtureInner::failing("x"), FixtureOuter::passthrough());
        let mut stream = StreamDecoder::with_config(decoder, config);
        stream.push_bits(&vec![0u8; FRAME_BIT_LEN * 2]);
        stream.poll();
        assert!(stream.offset() > 128);

        stream.reset();
        assert_eq!(stream.offset(), 128);
        assert_eq!(stream.state(), StreamState::Idle);
        assert_eq!(stream.buffered_bits(), 0);
        assert_eq!(stream.stats().resets, 1);
    }

    /// Decoder whose inner stage always yields a valid plain frame
    fn accepting_decoder() -> FrameDecoder<FixtureInner, FixtureOuter> {
        let block = FrameBuilder::plain()
            .payload(&b"PING"[..])
            .build_block()
            .unwrap();
        let mut decoded = SYNC_MARKER.to_vec();
        decoded.extend_from_slice(&block);
        decoded.resize(SYNC_MARKER.len() + RS_BLOCK_LEN, 0);
        FrameDecoder::new(FixtureInner::returning(decoded), FixtureOuter::passthrough())
            .with_layout(FrameLayout::Plain)
    }

    /// One frame of bits: convolved marker followed by zeros
    fn marked_frame() -> Vec<u8> {
        let mut bits = unpack_bits(&CONVOLVED_MARKER_WORD.to_be_bytes());
        bits.resize(FRAME_BIT_LEN, 0);
        bits
    }

    fn to_symbols(bits: &[u8]) -> Vec<f32> {
        bits.iter().map(|&b| if b == 1 { 1.0 } else { -1.0 }).collect()
    }

    fn decoded_offsets(events: &[FrameEvent]) -> Vec<usize> {
        events
            .iter()
            .filter_map(|e| match e {
                FrameEvent::Decoded(p) => p.offset,
                FrameEvent::Failed(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_overlap_of_a_whole_frame_still_advances() {
        for overlap in [FRAME_BIT_LEN, FRAME_BIT_LEN + 1, usize::MAX] {
            let config = StreamConfig {
                resync_overlap_bits: overlap,
                ..plain_config()
            };
            let mut stream = StreamDecoder::with_config(accepting_decoder(), config);
            let mut bits = marked_frame();
            bits.extend(vec![0u8; FRAME_BIT_LEN]);
            stream.push_bits(&bits);

            let events = stream.poll();
            assert_eq!(decoded_offsets(&events), vec![0]);
            assert_eq!(stream.decoder().inner().calls(), 1);
            assert!(stream.offset() > 0);
        }
    }

    #[test]
    fn test_silence_resets_between_bursts() {
        let config = StreamConfig {
            idle_reset_symbols: Some(100),
            ..plain_config()
        };
        let mut stream = StreamDecoder::with_config(accepting_decoder(), config);

        let burst = to_symbols(&marked_frame());
        let mut symbols = burst.clone();
        symbols.extend(vec![0.0f32; 300]);
        symbols.extend(&burst);
        stream.push_symbols(&symbols);

        // The first burst was decoded before the reset and is still reported
        let events = stream.poll();
        assert_eq!(decoded_offsets(&events), vec![0, 0]);
        assert_eq!(stream.stats().resets, 1);
        assert_eq!(stream.stats().bits_received, 2 * FRAME_BIT_LEN as u64);
    }

    #[test]
    fn test_short_silence_is_data() {
        let config = StreamConfig {
            idle_reset_symbols: Some(100),
            ..plain_config()
        };
        let mut stream = StreamDecoder::with_config(accepting_decoder(), config);

        let mut symbols = vec![0.0f32; 99];
        symbols.push(-1.0);
        stream.push_symbols(&symbols[..50]);
        stream.push_symbols(&symbols[50..]);
        assert_eq!(stream.stats().resets, 0);
        assert_eq!(stream.buffered_bits(), 100);
    }

    #[test]
    fn test_silence_split_across_pushes() {
        let config = StreamConfig {
            idle_reset_symbols: Some(100),
            initial_offset: 7,
            ..plain_config()
        };
        let mut stream = StreamDecoder::with_config(accepting_decoder(), config);

        stream.push_symbols(&[1.0; 20]);
        stream.push_symbols(&[0.0; 60]);
        stream.push_symbols(&[0.0; 60]);
        assert_eq!(stream.stats().resets, 1);
        assert_eq!(stream.state(), StreamState::Idle);
        assert_eq!(stream.offset(), 7);

        // Silence past the limit is dropped, the next burst starts fresh
        stream.push_symbols(&[0.0, 0.0, -1.0, 1.0]);
        assert_eq!(stream.buffered_bits(), 2);
        assert_eq!(stream.stats().resets, 1);
    }

    #[test]
    fn test_success_rate() {
        let stats = DecodeStats {
            candidates: 4,
            frames_decoded: 3,
            ..DecodeStats::default()
        };
        assert!((stats.success_rate() - 0.75).abs() < f64::EPSILON);
        assert_eq!(DecodeStats::default().success_rate(), 0.0);
    }
}
