use std::fs;
use std::net::UdpSocket;
use std::time::Duration;
use tempfile::tempdir;

use downlink_cli::commands::{datagram, decode, listen, pack};
use downlink_cli::{write_bits, DecodeReport, DecoderArgs, InputFormat};
use downlink_core::{config::DecoderConfig, constants::FRAME_BIT_LEN};
use serde_json::json;

const KEY_HEX: &str = "000102030405060708090a0b0c0d0e0f";

fn pack_options() -> pack::PackOptions {
    pack::PackOptions {
        key: Some(KEY_HEX.to_string()),
        ..pack::PackOptions::default()
    }
}

fn frames(texts: &[&str]) -> Vec<Vec<u8>> {
    let payloads: Vec<_> = texts.iter().map(|t| json!(t)).collect();
    pack::build_frames(&payloads, &pack_options()).unwrap()
}

#[test]
fn decode_writes_json_report() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("stream.bits");
    let report_path = td.path().join("report.json");

    let stream = downlink_core::encoder::assemble_stream(&frames(&["TLM A", "TLM B"]), 64, true);
    write_bits(&in_path, &stream, InputFormat::Bits).unwrap();

    let args = DecoderArgs {
        key: Some(KEY_HEX.to_string()),
        ..DecoderArgs::default()
    };
    decode::execute(
        in_path.to_str().unwrap(),
        Some(report_path.to_str().unwrap()),
        InputFormat::Bits,
        decode::DEFAULT_CHUNK_BITS,
        &args,
    )
    .unwrap();

    let report: DecodeReport =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report.frames.len(), 2);
    assert_eq!(report.frames[1].text, "TLM B");
    assert_eq!(report.frames[1].hex, hex::encode("TLM B"));
    assert_eq!(report.stats.frames_decoded, 2);
    assert_eq!(report.stats.bits_received, stream.len() as u64);
}

#[test]
fn decode_reads_key_from_config_file() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("stream.bits");
    let config_path = td.path().join("config.json");

    let stream = downlink_core::encoder::assemble_stream(&frames(&["from config"]), 32, false);
    write_bits(&in_path, &stream, InputFormat::Bits).unwrap();
    fs::write(
        &config_path,
        format!(r#"{{"key": "{}", "differential": false}}"#, KEY_HEX),
    )
    .unwrap();

    let args = DecoderArgs {
        config: Some(config_path.to_str().unwrap().to_string()),
        ..DecoderArgs::default()
    };
    let report = decode::run(in_path.to_str().unwrap(), InputFormat::Bits, 500, &args).unwrap();
    assert_eq!(report.frames.len(), 1);
    assert_eq!(report.frames[0].text, "from config");
    assert_eq!(report.frames[0].offset, Some(32));
}

#[test]
fn decode_wrong_key_still_reports_frames() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("stream.bits");

    let stream = downlink_core::encoder::assemble_stream(&frames(&["secret"]), 16, true);
    write_bits(&in_path, &stream, InputFormat::Bits).unwrap();

    // The checksum covers ciphertext, so a wrong key decodes to garbage
    let args = DecoderArgs {
        key: Some("ffffffffffffffffffffffffffffffff".to_string()),
        ..DecoderArgs::default()
    };
    let report = decode::run(in_path.to_str().unwrap(), InputFormat::Bits, 4096, &args).unwrap();
    assert_eq!(report.frames.len(), 1);
    assert_ne!(report.frames[0].text, "secret");
}

#[test]
fn decode_symbols_resets_on_silence() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("passes.f32");

    let burst = |text: &str| {
        let bits = downlink_core::encoder::assemble_stream(&frames(&[text]), 80, true);
        InputFormat::Symbols.serialize_bits(&bits)
    };
    let mut raw = burst("AOS 1");
    raw.extend(vec![0u8; 4 * 600]);
    raw.extend(burst("AOS 2"));
    fs::write(&in_path, raw).unwrap();

    let args = DecoderArgs {
        key: Some(KEY_HEX.to_string()),
        idle_reset: Some(200),
        ..DecoderArgs::default()
    };
    let report = decode::run(in_path.to_str().unwrap(), InputFormat::Symbols, 1024, &args).unwrap();

    let found: Vec<_> = report
        .frames
        .iter()
        .map(|f| (f.offset, f.text.as_str()))
        .collect();
    assert_eq!(found, vec![(Some(80), "AOS 1"), (Some(80), "AOS 2")]);
    assert_eq!(report.stats.resets, 1);
}

#[test]
fn decode_rejects_malformed_key() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("stream.bits");
    fs::write(&in_path, [0u8; 16]).unwrap();

    let args = DecoderArgs {
        key: Some("not-a-key".to_string()),
        ..DecoderArgs::default()
    };
    assert!(decode::run(in_path.to_str().unwrap(), InputFormat::Bits, 4096, &args).is_err());
}

#[test]
fn decode_rejects_threshold_above_width() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("stream.bits");
    fs::write(&in_path, [0u8; 16]).unwrap();

    let args = DecoderArgs {
        threshold: Some(65),
        ..DecoderArgs::default()
    };
    assert!(decode::run(in_path.to_str().unwrap(), InputFormat::Bits, 4096, &args).is_err());
}

#[test]
fn decode_rejects_ragged_symbol_file() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("stream.f32");
    fs::write(&in_path, [0u8; 10]).unwrap();

    let result = decode::run(
        in_path.to_str().unwrap(),
        InputFormat::Symbols,
        4096,
        &DecoderArgs::default(),
    );
    assert!(result.is_err());
}

#[test]
fn datagram_reports_trailing_partial_frame() {
    let td = tempdir().unwrap();
    let in_path = td.path().join("frames.bits");

    let mut bits = frames(&["whole"]).concat();
    bits.extend(vec![0u8; 1000]);
    write_bits(&in_path, &bits, InputFormat::Bits).unwrap();

    let args = DecoderArgs {
        key: Some(KEY_HEX.to_string()),
        ..DecoderArgs::default()
    };
    let report = datagram::run(in_path.to_str().unwrap(), InputFormat::Bits, &args).unwrap();
    assert_eq!(report.frames.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].datagram, Some(1));
    assert_eq!(report.failures[0].stage, "input");
    assert_eq!(report.stats.candidates, 2);
}

#[test]
fn listen_decodes_udp_datagrams() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let addr = receiver.local_addr().unwrap();

    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    for frame in frames(&["pass 1", "pass 2"]) {
        assert_eq!(frame.len(), FRAME_BIT_LEN);
        sender.send_to(&frame, addr).unwrap();
    }

    let config = DecoderConfig {
        key: Some(KEY_HEX.to_string()),
        ..DecoderConfig::default()
    };
    let decoder = config.build_frame_decoder().unwrap();
    let report = listen::serve(&receiver, &decoder, Some(2)).unwrap();

    let texts: Vec<_> = report.frames.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(texts, vec!["pass 1", "pass 2"]);
    assert_eq!(report.frames[0].datagram, Some(0));
}
