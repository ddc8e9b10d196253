//! Sources of difficulties: the external database and the raw folder scan.

pub mod external;
pub mod scanner;

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

pub use external::{ExternalDatabase, Outcome, load_external_db, parse_external_db};
pub use scanner::{DifficultyLoader, RawScanner, ScanProgress};

/// Load progress in `0.0..=1.0`, shared between the loading thread and readers.
#[derive(Debug, Clone, Default)]
pub struct Progress(Arc<AtomicU32>);

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: f32) {
        self.0
            .store(value.clamp(0.0, 1.0).to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_shared_and_clamped() {
        let progress = Progress::new();
        let other = progress.clone();
        assert_eq!(other.get(), 0.0);

        progress.set(0.25);
        assert_eq!(other.get(), 0.25);

        progress.set(3.0);
        assert_eq!(other.get(), 1.0);
    }
}
