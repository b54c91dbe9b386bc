use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, warn};

use crate::error::Result;

/// Prefix the service writes in front of every fragment.
pub const SENTINEL: &[u8; 9] = b"000000000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Payload written; holds the number of bytes copied.
    Repaired(u64),
    /// Header was not the sentinel. Nothing was written.
    SentinelMismatch,
}

/// Copy `source` minus its sentinel header to `destination`, replacing any
/// existing file there. A partially written destination is left in place
/// when the copy fails.
pub fn repair(source: &Path, destination: &Path) -> Result<RepairOutcome> {
    let mut reader = File::open(source)?;

    let mut header = [0u8; SENTINEL.len()];
    match reader.read_exact(&mut header) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            warn!(
                "{} is shorter than the sentinel header, skipping",
                source.display()
            );
            return Ok(RepairOutcome::SentinelMismatch);
        }
        Err(e) => return Err(e.into()),
    }

    if &header != SENTINEL {
        warn!(
            "{} does not start with the sentinel header, skipping",
            source.display()
        );
        return Ok(RepairOutcome::SentinelMismatch);
    }

    reader.seek(SeekFrom::Start(SENTINEL.len() as u64))?;

    let mut writer = BufWriter::new(File::create(destination)?);
    let copied = io::copy(&mut BufReader::new(reader), &mut writer)?;
    writer.flush()?;

    debug!(
        "Repaired {} -> {} ({} bytes)",
        source.display(),
        destination.display(),
        copied
    );
    Ok(RepairOutcome::Repaired(copied))
}
