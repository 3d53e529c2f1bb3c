//! Helpers shared by the integration tests

#![allow(dead_code)]

use redwood::source::{ConstantFiller, Filler};
use redwood::{Buffer, FillError, Source};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Installs a test-friendly subscriber, filtered by `RUST_LOG` (default: `redwood=trace`)
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("redwood=trace"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// A filler that produces `offset as u8` and counts the ranges it's asked for
#[derive(Clone, Default)]
pub struct Recording {
    pub calls: Arc<parking_lot::Mutex<Vec<Range<u64>>>>,
    pub bytes: Arc<AtomicUsize>,
}

impl Recording {
    pub fn calls(&self) -> Vec<Range<u64>> {
        self.calls.lock().clone()
    }

    pub fn bytes_filled(&self) -> usize {
        self.bytes.load(Ordering::SeqCst)
    }
}

impl Filler for Recording {
    fn fill(&self, req: redwood::source::FillRequest<'_>) -> Result<(), FillError> {
        self.calls.lock().push(req.range.clone());
        self.bytes.fetch_add(req.dest.len(), Ordering::SeqCst);
        for (b, offset) in req.dest.iter_mut().zip(req.range) {
            *b = offset as u8;
        }
        Ok(())
    }
}

/// A buffer over `[0, 100)` that fills every byte with `0x41`
pub fn letter_a_buffer() -> Buffer {
    Buffer::new(Source::new(ConstantFiller::new(0x41), None).with_limit(0..100))
}
