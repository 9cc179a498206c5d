use std::{cell::Cell, time::Duration};

use apng_mux::{
    chunks::{assemble_chunk, Chunk, IENDChunk, IHDRChunk, ParseableChunk, IDAT, SIGNATURE},
    inspect::{describe, inspect, sequence_numbers},
    still::StillEncoder,
    EncoderConfig, FrameError, MuxError, Muxer,
};
use futures::{
    future::{AbortHandle, Abortable, Aborted},
    stream, StreamExt,
};
use miniz_oxide::inflate::decompress_to_vec_zlib;

fn frame(width: u32, height: u32, payloads: &[&[u8]]) -> Vec<u8> {
    let mut png = SIGNATURE.to_vec();
    png.extend(IHDRChunk::rgba8(width, height).to_bytes());
    for payload in payloads {
        png.extend(assemble_chunk(IDAT, payload));
    }
    png.extend(IENDChunk.to_bytes());
    png
}

fn muxer(width: u32, height: u32, fps: u32) -> Muxer {
    Muxer::new(EncoderConfig::new(width, height, fps)).unwrap()
}

/// Frames of a 4x4 clip, each with its pixel data spread over several IDAT chunks.
fn encoded_clip(frame_count: usize) -> (Vec<Vec<u8>>, Vec<Vec<u8>>) {
    let mut pixels = vec![];
    let mut frames = vec![];
    for index in 0..frame_count {
        let rgba: Vec<u8> = (0..4 * 4 * 4)
            .map(|i| (i * 31 + index * 17) as u8)
            .collect();
        frames.push(
            StillEncoder::rgba(4, 4)
                .with_max_idat_len(10)
                .encode(&rgba)
                .unwrap(),
        );
        pixels.push(rgba);
    }
    (frames, pixels)
}

fn image_data(png: &[u8]) -> Vec<Vec<u8>> {
    inspect(png)
        .unwrap()
        .into_iter()
        .filter_map(|c| match c.chunk {
            Chunk::IDAT(data) => Some(data.to_vec()),
            _ => None,
        })
        .collect()
}

#[test]
fn two_single_pixel_frames() {
    let frames = [frame(1, 1, &[b"frame-0"]), frame(1, 1, &[b"frame-1"])];
    let apng = muxer(1, 1, 10).mux(&frames).unwrap();

    let chunks = inspect(&apng).unwrap();
    let listing = describe(&chunks);
    insta::assert_snapshot!(listing.trim_end(), @r###"
    IHDR      8    13 1x1 depth=8 color=6
    acTL     33     8 frames=2 plays=0
    fcTL     53    26 seq=0 1x1+0+0 delay=100/1000 dispose=0 blend=0
    IDAT     91     7
    fcTL    110    26 seq=1 1x1+0+0 delay=100/1000 dispose=0 blend=0
    fdAT    148    11 seq=2
    IEND    171     0
    "###);
    assert_eq!(apng.len(), 183);
    assert_eq!(&apng[..8], SIGNATURE);
    assert_eq!(&apng[171..], &IENDChunk.to_bytes());
}

#[test]
fn header_and_first_frame_are_copied_verbatim() {
    let (frames, _) = encoded_clip(2);
    let apng = muxer(4, 4, 15).mux(&frames).unwrap();

    let header_len = 25;
    assert_eq!(&apng[8..8 + header_len], &frames[0][8..8 + header_len]);
    assert_eq!(image_data(&apng), image_data(&frames[0]));

    for c in inspect(&frames[0]).unwrap() {
        if c.raw.is(IDAT) {
            assert!(apng.windows(c.raw.bytes.len()).any(|w| w == c.raw.bytes));
        }
    }
}

#[test]
fn output_length_adds_up() {
    for frame_count in 1..=5 {
        let (frames, _) = encoded_clip(frame_count);
        let apng = muxer(4, 4, 15).mux(&frames).unwrap();

        let first_frame: usize = inspect(&frames[0])
            .unwrap()
            .iter()
            .filter(|c| c.raw.is(IDAT))
            .map(|c| c.raw.bytes.len())
            .sum();
        let later_frames: usize = frames[1..]
            .iter()
            .flat_map(|f| image_data(f))
            .map(|payload| payload.len() + 16)
            .sum();
        let expected = 8 + 25 + 20 + frame_count * 38 + first_frame + later_frames + 12;
        assert_eq!(apng.len(), expected, "{frame_count} frames");
    }
}

#[test]
fn sequence_numbers_have_no_gaps() {
    let (frames, _) = encoded_clip(4);
    let apng = muxer(4, 4, 15).mux(&frames).unwrap();
    let chunks = inspect(&apng).unwrap();

    let actl: Vec<_> = chunks
        .iter()
        .filter_map(|c| match c.chunk {
            Chunk::acTL(actl) => Some(actl),
            _ => None,
        })
        .collect();
    assert_eq!(actl.len(), 1);
    assert_eq!(actl[0].num_frames, 4);
    assert_eq!(actl[0].num_plays, 0);

    let fctl_count = chunks
        .iter()
        .filter(|c| matches!(c.chunk, Chunk::fcTL(_)))
        .count();
    assert_eq!(fctl_count, 4);

    let numbers = sequence_numbers(&chunks);
    let expected: Vec<u32> = (0..numbers.len() as u32).collect();
    assert_eq!(numbers, expected);
    assert!(numbers.len() > 4);
}

#[test]
fn every_checksum_is_valid() {
    let (frames, _) = encoded_clip(3);
    let apng = muxer(4, 4, 15).mux(&frames).unwrap();
    for c in inspect(&apng).unwrap() {
        let mut covered = c.raw.chunk_type.to_vec();
        covered.extend(c.raw.data);
        assert_eq!(c.raw.crc, crc32fast::hash(&covered), "{}", c.raw.type_name());
        assert!(c.crc_ok());
    }
}

#[test]
fn later_frames_pass_pixel_data_through() {
    let (frames, pixels) = encoded_clip(3);
    let apng = muxer(4, 4, 15).mux(&frames).unwrap();
    let chunks = inspect(&apng).unwrap();

    // Group fdAT payloads by the fcTL they follow.
    let mut per_frame: Vec<Vec<Vec<u8>>> = vec![];
    for c in &chunks {
        match &c.chunk {
            Chunk::fcTL(_) => per_frame.push(vec![]),
            Chunk::fdAT(fdat) => per_frame
                .last_mut()
                .unwrap()
                .push(fdat.data.to_vec()),
            _ => {}
        }
    }
    assert_eq!(per_frame.len(), 3);
    assert!(per_frame[0].is_empty());

    for index in 1..3 {
        assert_eq!(per_frame[index], image_data(&frames[index]));
        let stream: Vec<u8> = per_frame[index].concat();
        let scanlines = decompress_to_vec_zlib(&stream).unwrap();
        let rows: Vec<u8> = scanlines
            .chunks(17)
            .flat_map(|row| row[1..].iter().copied())
            .collect();
        assert_eq!(rows, pixels[index]);
    }
}

#[test]
fn single_frame() {
    let png = frame(2, 2, &[b"one", b"two"]);
    let apng = muxer(2, 2, 30).mux([&png]).unwrap();
    let chunks = inspect(&apng).unwrap();

    assert!(matches!(
        chunks[1].chunk,
        Chunk::acTL(actl) if actl.num_frames == 1
    ));
    assert_eq!(
        chunks
            .iter()
            .filter(|c| matches!(c.chunk, Chunk::fcTL(_)))
            .count(),
        1
    );
    assert!(!chunks.iter().any(|c| matches!(c.chunk, Chunk::fdAT(_))));
    assert_eq!(image_data(&apng), [b"one".to_vec(), b"two".to_vec()]);
    assert_eq!(sequence_numbers(&chunks), [0]);
}

#[test]
fn no_frames() {
    let frames: [Vec<u8>; 0] = [];
    assert!(matches!(
        muxer(1, 1, 10).mux(frames),
        Err(MuxError::EmptyInput)
    ));
}

#[test]
fn malformed_frame_fails_the_run() {
    let mut broken = frame(1, 1, &[b"payload"]);
    broken.truncate(40);
    let err = muxer(1, 1, 10)
        .mux([frame(1, 1, &[b"ok"]), broken])
        .unwrap_err();
    assert!(matches!(
        err,
        MuxError::MalformedFrame {
            frame: 1,
            source: FrameError::TruncatedChunk { offset: 33 }
        }
    ));
    assert_eq!(
        err.to_string(),
        "Frame 1 is malformed: chunk at offset 33 is truncated"
    );
}

#[test]
fn frame_without_signature() {
    let err = muxer(1, 1, 10).mux([b"not a png".to_vec()]).unwrap_err();
    assert!(matches!(
        err,
        MuxError::MalformedFrame {
            frame: 0,
            source: FrameError::MissingSignature
        }
    ));
}

#[async_std::test]
async fn stream_matches_in_memory_run() {
    let (frames, _) = encoded_clip(3);
    let muxer = muxer(4, 4, 15);
    let expected = muxer.mux(&frames).unwrap();

    let source = stream::iter(frames.clone()).map(anyhow::Ok);
    let apng = muxer.mux_stream(frames.len(), source).await.unwrap();
    assert_eq!(apng, expected);
}

#[async_std::test]
async fn never_requests_more_than_declared() {
    let png = frame(1, 1, &[b"x"]);
    let requested = Cell::new(0);
    let source = stream::repeat_with(|| {
        requested.set(requested.get() + 1);
        anyhow::Ok(png.clone())
    });
    muxer(1, 1, 10).mux_stream(3, source).await.unwrap();
    assert_eq!(requested.get(), 3);
}

#[async_std::test]
async fn source_error_is_an_acquisition_failure() {
    let source = stream::iter(vec![
        anyhow::Ok(frame(1, 1, &[b"x"])),
        Err(anyhow::anyhow!("camera unplugged")),
    ]);
    let err = muxer(1, 1, 10).mux_stream(2, source).await.unwrap_err();
    assert!(matches!(err, MuxError::AcquisitionFailure { frame: 1, .. }));
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "camera unplugged");
}

#[async_std::test]
async fn short_source() {
    let source = stream::iter(vec![anyhow::Ok(frame(1, 1, &[b"x"]))]);
    let err = muxer(1, 1, 10).mux_stream(2, source).await.unwrap_err();
    assert!(matches!(
        err,
        MuxError::SourceExhausted {
            expected: 2,
            received: 1
        }
    ));
}

#[async_std::test]
async fn stalled_source_times_out() {
    let mut config = EncoderConfig::new(1, 1, 10);
    config.acquisition_timeout_ms = 50;
    let source = stream::iter(vec![anyhow::Ok(frame(1, 1, &[b"x"]))]).chain(stream::pending());

    let err = Muxer::new(config)
        .unwrap()
        .mux_stream(2, source)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        MuxError::AcquisitionTimeout { frame: 1, timeout } if timeout == Duration::from_millis(50)
    ));
}

#[async_std::test]
async fn default_config_gives_up_on_a_stalled_source() {
    let config = EncoderConfig::default();
    let png = frame(config.width, config.height, &[b"x"]);
    let source = stream::iter(vec![anyhow::Ok(png)]).chain(stream::pending());

    let muxer = Muxer::new(config).unwrap();
    let run = muxer.mux_stream(2, source);
    let err = async_std::future::timeout(Duration::from_secs(30), run)
        .await
        .expect("run should end on its own")
        .unwrap_err();
    assert!(matches!(
        err,
        MuxError::AcquisitionTimeout { frame: 1, timeout } if timeout == Duration::from_secs(5)
    ));
}

#[async_std::test]
async fn run_can_be_aborted() {
    let muxer = muxer(1, 1, 10);
    let source = stream::iter(vec![anyhow::Ok(frame(1, 1, &[b"x"]))]).chain(stream::pending());
    let (handle, registration) = AbortHandle::new_pair();

    let run = Abortable::new(muxer.mux_stream(2, source), registration);
    let abort = async {
        async_std::task::sleep(Duration::from_millis(20)).await;
        handle.abort();
    };
    let (result, ()) = futures::join!(run, abort);
    assert!(matches!(result, Err(Aborted)));
}
