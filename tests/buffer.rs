//! Scenario tests for `Buffer`

mod common;

use common::{init_test_logging, letter_a_buffer, Recording};
use redwood::config::BufferConfig;
use redwood::source::ConstantFiller;
use redwood::{Buffer, Error, ErrorKind, FillError, Source, SourceFlags};
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[test]
fn write_over_lazily_filled_range() {
    init_test_logging();
    let mut buf = letter_a_buffer();

    assert_eq!(buf.read_to_vec(20..30).unwrap(), [0x41; 10]);

    buf.write(25..35, &[0x42; 10]).unwrap();
    let all = buf.read_to_vec(0..100).unwrap();
    assert_eq!(all.len(), 100);
    assert!(all[..25].iter().all(|&b| b == 0x41));
    assert!(all[25..35].iter().all(|&b| b == 0x42));
    assert!(all[35..].iter().all(|&b| b == 0x41));

    buf.validate();
    let covered: u64 = buf.materialized().map(|r| r.end - r.start).sum();
    assert_eq!(covered, 100);
}

#[test]
fn read_outside_limit_creates_nothing() {
    init_test_logging();
    let mut buf = letter_a_buffer();

    let mut dest = [0; 10];
    let err = buf.read(150..160, &mut dest).unwrap_err();
    assert!(matches!(
        err,
        Error::OutOfLimit { ref requested, ref limit } if *requested == (150..160) && *limit == (0..100)
    ));
    assert_eq!(err.kind(), ErrorKind::Precondition);
    assert!(buf.tree().is_empty());

    // straddling the end of the limit is just as bad
    assert!(buf.read_to_vec(95..105).is_err());
    assert!(buf.write(99..101, &[0, 0]).is_err());
    assert!(buf.tree().is_empty());
}

#[test]
fn unbounded_ranges() {
    let mut buf = letter_a_buffer();
    assert_eq!(buf.read_to_vec(90..).unwrap().len(), 10);
    assert_eq!(buf.read_to_vec(..=4).unwrap().len(), 5);

    let mut unlimited = Buffer::new(Source::new(ConstantFiller::new(0), None));
    assert!(matches!(unlimited.read_to_vec(10..), Err(Error::Unbounded(_))));
    assert_eq!(unlimited.read_to_vec(1 << 40..(1 << 40) + 3).unwrap(), [0; 3]);
}

#[test]
fn each_leaf_filled_once() {
    init_test_logging();
    let filler = Recording::default();
    let config = BufferConfig {
        max_chunk_size: 32,
        ..BufferConfig::default()
    };
    let source = Source::new(filler.clone(), None).with_limit(0..256);
    let mut buf = Buffer::with_config(source.into_ref(), config);

    let data = buf.read_to_vec(10..70).unwrap();
    assert_eq!(data, (10..70).map(|i| i as u8).collect::<Vec<_>>());
    assert_eq!(filler.calls(), [10..32, 32..64, 64..70]);

    // everything here is already there
    buf.read_to_vec(20..60).unwrap();
    assert_eq!(filler.calls().len(), 3);

    // only the gaps on either side are new
    buf.read_to_vec(0..80).unwrap();
    assert_eq!(filler.calls(), [10..32, 32..64, 64..70, 0..10, 70..80]);
    assert_eq!(filler.bytes_filled(), 80);

    // writes never fill anything
    buf.write(100..140, &[0; 40]).unwrap();
    assert_eq!(filler.calls().len(), 5);
    buf.validate();
}

#[test]
fn failed_fill_is_retried() {
    init_test_logging();
    let fail = Arc::new(AtomicBool::new(true));
    let should_fail = fail.clone();
    let source = Source::new(
        move |range: Range<u64>, dest: &mut [u8]| -> Result<(), FillError> {
            if range.contains(&50) && should_fail.load(Ordering::SeqCst) {
                return Err(FillError::Custom("disk on fire".into()));
            }
            dest.fill(7);
            Ok(())
        },
        None,
    )
    .with_limit(0..100);
    let config = BufferConfig {
        max_chunk_size: 16,
        ..BufferConfig::default()
    };
    let mut buf = Buffer::with_config(source.into_ref(), config);

    let err = buf.read_to_vec(40..60).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fill);
    assert!(matches!(err, Error::Fill { ref range, .. } if *range == (48..60)));
    buf.validate();

    // [40, 48) was filled before the failure; [48, 60) is still there, but unfilled
    assert_eq!(buf.materialized().collect::<Vec<_>>(), [40..48]);
    assert_eq!(buf.tree().len(), 2);
    assert!(!buf.tree().leaf(48).unwrap().state().is_filled());

    fail.store(false, Ordering::SeqCst);
    assert_eq!(buf.read_to_vec(40..60).unwrap(), [7; 20]);
    assert_eq!(buf.materialized().collect::<Vec<_>>(), [40..48, 48..60]);
}

#[test]
fn forks_are_isolated() {
    init_test_logging();
    let mut original = letter_a_buffer();
    original.read_to_vec(0..100).unwrap();

    let mut fork = original.fork();
    fork.write(10..20, &[1; 10]).unwrap();
    original.write(15..25, &[2; 10]).unwrap();

    let a = original.read_to_vec(..).unwrap();
    let b = fork.read_to_vec(..).unwrap();
    assert_eq!(&a[10..15], &[0x41; 5]);
    assert_eq!(&a[15..25], &[2; 10]);
    assert_eq!(&b[10..20], &[1; 10]);
    assert_eq!(&b[20..25], &[0x41; 5]);

    original.validate();
    fork.validate();
}

#[test]
fn segments_outlive_writes() {
    let mut buf = letter_a_buffer();
    let segments: Vec<_> = buf
        .iterate(0..100)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();

    buf.write(0..100, &[0; 100]).unwrap();
    for seg in &segments {
        assert!(seg.bytes().iter().all(|&b| b == 0x41));
    }
    assert_eq!(buf.read_to_vec(..).unwrap(), [0; 100]);

    // the old block now belongs to the segment alone
    drop(buf);
    let view = segments.into_iter().next().unwrap().into_view();
    assert_eq!(view.block().count(), 1);
    assert_eq!(view.block_offset(), 0);
    assert_eq!(view.bytes(), [0x41; 100]);
}

#[test]
fn iterate_is_lazy() {
    let filler = Recording::default();
    let config = BufferConfig {
        max_chunk_size: 10,
        ..BufferConfig::default()
    };
    let source = Source::new(filler.clone(), None).with_limit(0..100);
    let mut buf = Buffer::with_config(source.into_ref(), config);

    let mut segments = buf.iterate(5..45).unwrap();
    let first = segments.next().unwrap().unwrap();
    assert_eq!((first.offset(), first.len()), (5, 5));
    assert_eq!(first.bytes(), [5, 6, 7, 8, 9]);
    assert_eq!(filler.calls(), [5..10]);

    let second = segments.next().unwrap().unwrap();
    assert_eq!(second.range(), 10..20);
    assert_eq!(filler.calls(), [5..10, 10..20]);

    let ranges: Vec<_> = segments.map(|s| s.unwrap().range()).collect();
    assert_eq!(ranges, [20..30, 30..40, 40..45]);
}

#[test]
fn read_only_source() {
    let source = Source::new(ConstantFiller::new(3), None)
        .with_limit(0..10)
        .with_flags(SourceFlags::NONE);
    let mut buf = Buffer::new(source);

    assert!(matches!(buf.write(0..1, &[1]), Err(Error::ReadOnly)));
    assert_eq!(buf.read_to_vec(..).unwrap(), [3; 10]);
}

#[test]
fn invalidate_refills() {
    let filler = Recording::default();
    let source = Source::new(filler.clone(), None).with_limit(0..50);
    let mut buf = Buffer::new(source);

    buf.write(0..50, &[0xEE; 50]).unwrap();
    buf.invalidate(10..20).unwrap();
    assert_eq!(buf.materialized().collect::<Vec<_>>(), [0..10, 20..50]);

    let data = buf.read_to_vec(..).unwrap();
    assert_eq!(&data[..10], &[0xEE; 10]);
    assert_eq!(&data[10..20], (10..20).map(|i| i as u8).collect::<Vec<_>>());
    assert_eq!(&data[20..], &[0xEE; 30]);
    assert_eq!(filler.calls(), [10..20]);

    buf.invalidate_all();
    assert!(buf.tree().is_empty());
}

#[test]
fn shared_buffers_across_threads() {
    let shared = letter_a_buffer().into_shared();
    let handles: Vec<_> = (0..4_u8)
        .map(|i| {
            let buf = shared.acquire();
            std::thread::spawn(move || {
                let start = i as u64 * 25;
                buf.lock().write(start..start + 5, &[i; 5]).unwrap();
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let mut buf = shared.lock();
    let data = buf.read_to_vec(..).unwrap();
    for i in 0..4_u8 {
        let start = i as usize * 25;
        assert_eq!(&data[start..start + 5], &[i; 5]);
        assert_eq!(data[start + 5], 0x41);
    }
    buf.validate();
}
