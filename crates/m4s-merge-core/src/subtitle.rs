use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

pub const SUBTITLE_EXTENSION: &str = "ass";

/// Produces a subtitle file for a directory inside a session.
///
/// `id` is the directory's own name, which the client uses as the item id.
pub trait SubtitleSource {
    fn fetch(&self, dir: &Path, id: &str) -> Result<PathBuf>;
}

/// Where the subtitle for `output` goes: same basename, subtitle extension.
pub fn sibling_subtitle_path(output: &Path) -> PathBuf {
    output.with_extension(SUBTITLE_EXTENSION)
}

/// Copy `subtitle` next to `output`. Returns the written path.
pub fn copy_beside(subtitle: &Path, output: &Path) -> Result<PathBuf> {
    let target = sibling_subtitle_path(output);
    fs::copy(subtitle, &target)?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sibling_subtitle_path() {
        let path = sibling_subtitle_path(Path::new("/out/group-up/Title.mp4"));
        assert_eq!(path, PathBuf::from("/out/group-up/Title.ass"));
    }

    #[test]
    fn test_copy_beside() {
        let dir = tempdir().unwrap();
        let subtitle = dir.path().join("123.ass");
        fs::write(&subtitle, "[Script Info]").unwrap();
        let output = dir.path().join("Title.mp4");

        let written = copy_beside(&subtitle, &output).unwrap();
        assert_eq!(written, dir.path().join("Title.ass"));
        assert_eq!(fs::read_to_string(written).unwrap(), "[Script Info]");
    }
}
