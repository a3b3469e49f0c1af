//! Shannon entropy of raw byte streams.
//!
//! Entropy measures the unpredictability of data. Plain text sits around
//! 3-5 bits/byte; encrypted or compressed content approaches 8.0. A file
//! that jumps from the first range into the second has very likely been
//! rewritten by something that scrambles bytes.

use std::path::Path;

/// Why an entropy reading could not be taken for a file.
#[derive(Debug, thiserror::Error)]
pub enum EntropyError {
    /// The file is empty. An empty file has no byte distribution; reporting
    /// 0.0 would look like a maximally ordered baseline.
    #[error("file is empty, no entropy to measure")]
    Empty,

    #[error("failed to read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Calculate Shannon entropy of a byte slice.
///
/// Returns a value between 0.0 (all bytes identical) and 8.0 (uniform
/// byte distribution). Single pass, fixed 256-slot frequency table, no
/// allocations.
#[inline]
pub fn calculate(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }

    let mut frequency = [0u64; 256];
    for &byte in data {
        frequency[byte as usize] += 1;
    }

    let len = data.len() as f64;
    let mut entropy = 0.0;

    for &count in &frequency {
        if count > 0 {
            let probability = count as f64 / len;
            entropy -= probability * probability.log2();
        }
    }

    entropy
}

/// Calculate the entropy of a file's current contents.
///
/// Reads the whole file into memory. A missing or unreadable file, and a
/// zero-length file, are errors rather than 0.0 readings. Deterministic for
/// unchanged content.
pub fn calculate_file(path: &Path) -> Result<f64, EntropyError> {
    let data = std::fs::read(path)?;
    if data.is_empty() {
        return Err(EntropyError::Empty);
    }
    Ok(calculate(&data))
}
