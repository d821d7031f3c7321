//! Output limits and follow-up streams on new sinks.

use oxilzma::{
    EncodeStatus, Encoder, EncoderConfig, LimitedSink, LzmaDecoder, LzmaError, decompress_raw,
};

fn generate_text(size: usize) -> Vec<u8> {
    let words: [&[u8]; 8] = [
        b"range ", b"coder ", b"window ", b"match ", b"literal ", b"distance ", b"hash ", b"chain ",
    ];
    let mut data = Vec::with_capacity(size);
    let mut seed: u64 = 0x123456789ABCDEF0;
    while data.len() < size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        let word = words[(seed >> 40) as usize % words.len()];
        data.extend_from_slice(&word[..word.len().min(size - data.len())]);
    }
    data
}

fn config() -> EncoderConfig {
    EncoderConfig::default().with_dict_cap(1 << 16)
}

/// Compress `data` into streams of at most `limit` bytes each, returning
/// every stream with the number of input bytes it holds.
fn compress_in_streams(data: &[u8], config: &EncoderConfig, limit: u64) -> Vec<(Vec<u8>, u64)> {
    let mut enc = Encoder::new(LimitedSink::new(Vec::new(), limit), config).unwrap();
    let mut streams = Vec::new();

    let mut taken = 0;
    while taken < data.len() {
        let (n, status) = enc.write(&data[taken..]).unwrap();
        taken += n;
        if status == EncodeStatus::Complete {
            break;
        }
        enc.close().unwrap();
        let size = enc.compressed();
        let sink = enc.reopen(LimitedSink::new(Vec::new(), limit));
        streams.push((sink.into_inner(), size));
    }

    loop {
        let status = enc.close().unwrap();
        let size = enc.compressed();
        if status == EncodeStatus::Complete {
            streams.push((enc.into_sink().into_inner(), size));
            break;
        }
        let sink = enc.reopen(LimitedSink::new(Vec::new(), limit));
        streams.push((sink.into_inner(), size));
    }
    streams
}

#[test]
fn test_close_reports_limit_on_tiny_sink() {
    let mut enc = Encoder::new(LimitedSink::new(Vec::new(), 3), &config()).unwrap();
    let (n, status) = enc.write(b"balla").unwrap();
    assert_eq!((n, status), (5, EncodeStatus::Complete));

    let err = enc.close().unwrap_err();
    assert!(matches!(err, LzmaError::Limit));
    assert!(!enc.is_closed());
    assert_eq!(enc.sink().written(), 0);
    assert_eq!(enc.buffered(), 5);
}

#[test]
fn test_limit_leaves_input_buffered() {
    let data = generate_text(200_000);
    let limit = 2_000;
    let mut enc = Encoder::new(LimitedSink::new(Vec::new(), limit), &config()).unwrap();

    let (n, status) = enc.write(&data).unwrap();
    assert_eq!(status, EncodeStatus::LimitReached);
    assert!(n < data.len());
    assert!(enc.is_limit_reached());

    let status = enc.close().unwrap();
    assert_eq!(status, EncodeStatus::LimitReached);
    assert!(enc.buffered() > 0);
    assert!(enc.sink().written() <= limit);

    let compressed = enc.compressed();
    assert_eq!(compressed as usize + enc.buffered(), n);
    let stream = enc.into_sink().into_inner();
    let out = decompress_raw(&stream, config().properties, 1 << 16, Some(compressed)).unwrap();
    assert!(out[..] == data[..compressed as usize]);
}

#[test]
fn test_reopen_sessions_decode_in_sequence() {
    let data = generate_text(150_000);
    let config = config();
    let limit = 3_000;
    let streams = compress_in_streams(&data, &config, limit);
    assert!(streams.len() > 2, "only {} streams", streams.len());

    let mut decoder = LzmaDecoder::new(config.properties, config.dict_cap as u32).unwrap();
    let mut out = Vec::new();
    for (stream, size) in &streams {
        assert!(stream.len() as u64 <= limit);
        let n = decoder.decode(&stream[..], Some(*size), &mut out).unwrap();
        assert_eq!(n, *size);
    }
    assert_eq!(decoder.pos(), data.len() as u64);
    assert!(out == data);
}

#[test]
fn test_reopen_with_eos_marker() {
    let data = generate_text(60_000);
    let config = config().with_eos_marker(true);
    let streams = compress_in_streams(&data, &config, 1_500);

    let mut decoder = LzmaDecoder::new(config.properties, config.dict_cap as u32).unwrap();
    let mut out = Vec::new();
    for (stream, size) in &streams {
        let n = decoder.decode(&stream[..], None, &mut out).unwrap();
        assert_eq!(n, *size);
    }
    assert!(out == data);
}

#[test]
fn test_io_write_reports_write_zero() {
    use std::io::{ErrorKind, Write};

    let data = generate_text(100_000);
    let mut enc = Encoder::new(LimitedSink::new(Vec::new(), 500), &config()).unwrap();
    let err = enc.write_all(&data).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteZero);
    assert!(enc.is_limit_reached());
}

#[test]
fn test_copy_n_history() {
    let config = config();
    let mut enc = Encoder::new(Vec::new(), &config).unwrap();
    enc.write(b"0123456789").unwrap();
    enc.close().unwrap();

    let dict = enc.dict();
    assert_eq!(dict.dict_len(), 10);
    let mut raw = Vec::new();
    let (n, status) = dict.copy_n(&mut raw, 4).unwrap();
    assert_eq!((n, status.is_no_space()), (4, false));
    assert_eq!(raw, b"6789");

    let mut raw = Vec::new();
    let (n, status) = dict.copy_n(&mut raw, 25).unwrap();
    assert_eq!(n, 10);
    assert!(status.is_no_space());
    assert_eq!(raw, b"0123456789");
}
