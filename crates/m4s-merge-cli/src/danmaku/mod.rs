mod ass;

pub use ass::{parse_comments, to_ass};

use m4s_merge_core::{Error, SubtitleSource};
use reqwest::blocking::Client;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

const COMMENT_URL: &str = "https://comment.bilibili.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Downloads a session's danmaku XML and turns it into an ASS subtitle.
pub struct DanmakuSource {
    client: Client,
    base_url: String,
}

impl DanmakuSource {
    pub fn new() -> Result<Self, Error> {
        DanmakuSource::with_base_url(COMMENT_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Subtitle(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, id: &str) -> String {
        format!("{}/{}.xml", self.base_url, id)
    }

    fn download(&self, id: &str) -> Result<String, Error> {
        let url = self.url_for(id);
        debug!("Fetching {}", url);
        self.client
            .get(&url)
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(|e| Error::Subtitle(format!("{}: {}", url, e)))
    }
}

impl SubtitleSource for DanmakuSource {
    fn fetch(&self, dir: &Path, id: &str) -> Result<PathBuf, Error> {
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::Subtitle(format!("'{}' is not a comment id", id)));
        }

        let xml = self.download(id)?;
        save_and_convert(dir, id, &xml)
    }
}

/// Write `<id>.xml` and its converted `<id>.ass` into `dir`.
fn save_and_convert(dir: &Path, id: &str, xml: &str) -> Result<PathBuf, Error> {
    let xml_path = dir.join(format!("{}.xml", id));
    fs::write(&xml_path, xml)?;

    let comments = parse_comments(xml);
    let ass_path = dir.join(format!("{}.ass", id));
    fs::write(&ass_path, to_ass(&comments))?;
    debug!(
        "Converted {} comments from {} to {}",
        comments.len(),
        xml_path.display(),
        ass_path.display()
    );
    Ok(ass_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_url_for() {
        let source = DanmakuSource::with_base_url("http://localhost:1/").unwrap();
        assert_eq!(source.url_for("1234"), "http://localhost:1/1234.xml");
    }

    #[test]
    fn test_rejects_non_numeric_ids() {
        let dir = tempdir().unwrap();
        let source = DanmakuSource::new().unwrap();
        assert!(matches!(
            source.fetch(dir.path(), "output"),
            Err(Error::Subtitle(_))
        ));
        assert!(matches!(source.fetch(dir.path(), ""), Err(Error::Subtitle(_))));
    }

    #[test]
    fn test_save_and_convert_writes_xml_and_ass() {
        let dir = tempdir().unwrap();
        let xml = r#"<i><d p="1.5,1,25,16777215,0,0,0,0">hello</d></i>"#;

        let ass_path = save_and_convert(dir.path(), "42", xml).unwrap();

        assert_eq!(ass_path, dir.path().join("42.ass"));
        assert_eq!(fs::read_to_string(dir.path().join("42.xml")).unwrap(), xml);
        let ass = fs::read_to_string(&ass_path).unwrap();
        assert!(ass.starts_with("[Script Info]"));
        assert_eq!(ass.lines().filter(|l| l.starts_with("Dialogue:")).count(), 1);
        assert!(ass.contains("hello"));
    }
}
