use std::fmt::Write as _;

const PLAY_RES_X: u32 = 1920;
const PLAY_RES_Y: u32 = 1080;
const FONT_SIZE: u32 = 48;
const LINE_HEIGHT: u32 = FONT_SIZE + 4;
const SCROLL_SECS: f64 = 8.0;
const STATIC_SECS: f64 = 4.0;
/// Scrolling comments use the upper part of the frame only.
const SCROLL_AREA: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentMode {
    Scroll,
    Bottom,
    Top,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub time: f64,
    pub mode: CommentMode,
    /// 0xRRGGBB
    pub color: u32,
    pub text: String,
}

/// Extract `<d p="time,mode,size,color,...">text</d>` entries, sorted by time.
/// Modes other than scrolling, top and bottom are dropped.
pub fn parse_comments(xml: &str) -> Vec<Comment> {
    let mut comments = Vec::new();
    let mut rest = xml;

    while let Some(start) = rest.find("<d p=\"") {
        rest = &rest[start + 6..];
        let Some(attr_end) = rest.find('"') else { break };
        let attrs = &rest[..attr_end];
        rest = &rest[attr_end..];

        let Some(body_start) = rest.find('>') else { break };
        rest = &rest[body_start + 1..];
        let Some(body_end) = rest.find("</d>") else { break };
        let text = unescape(&rest[..body_end]);
        rest = &rest[body_end + 4..];

        if let Some(comment) = parse_attrs(attrs, text) {
            comments.push(comment);
        }
    }

    comments.sort_by(|a, b| a.time.total_cmp(&b.time));
    comments
}

fn parse_attrs(attrs: &str, text: String) -> Option<Comment> {
    let mut fields = attrs.split(',');
    let time: f64 = fields.next()?.parse().ok()?;
    let mode = match fields.next()?.parse::<u8>().ok()? {
        1..=3 | 6 => CommentMode::Scroll,
        4 => CommentMode::Bottom,
        5 => CommentMode::Top,
        _ => return None,
    };
    let _size = fields.next();
    let color = fields.next().and_then(|c| c.parse().ok()).unwrap_or(0xFFFFFF);

    if text.trim().is_empty() || !time.is_finite() || time < 0.0 {
        return None;
    }
    Some(Comment {
        time,
        mode,
        color,
        text,
    })
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Render comments as an ASS script. Each comment takes the first row that is
/// free at its start time; when every row is busy the least busy one is reused.
pub fn to_ass(comments: &[Comment]) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "[Script Info]\n\
         ScriptType: v4.00+\n\
         PlayResX: {PLAY_RES_X}\n\
         PlayResY: {PLAY_RES_Y}\n\
         WrapStyle: 2\n\
         \n\
         [V4+ Styles]\n\
         Format: Name, Fontname, Fontsize, PrimaryColour, SecondaryColour, OutlineColour, BackColour, Bold, Italic, Underline, StrikeOut, ScaleX, ScaleY, Spacing, Angle, BorderStyle, Outline, Shadow, Alignment, MarginL, MarginR, MarginV, Encoding\n\
         Style: Danmaku,sans-serif,{FONT_SIZE},&H33FFFFFF,&H33FFFFFF,&H33000000,&H33000000,0,0,0,0,100,100,0,0,1,2,0,7,0,0,0,0\n\
         \n\
         [Events]\n\
         Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n"
    );

    let scroll_rows = ((PLAY_RES_Y as f64 * SCROLL_AREA) / LINE_HEIGHT as f64).max(1.0) as usize;
    let static_rows = (PLAY_RES_Y / LINE_HEIGHT / 2).max(1) as usize;
    let mut scroll_free = vec![0.0f64; scroll_rows];
    let mut top_free = vec![0.0f64; static_rows];
    let mut bottom_free = vec![0.0f64; static_rows];

    for comment in comments {
        let width = text_width(&comment.text);
        let (position, duration) = match comment.mode {
            CommentMode::Scroll => {
                // Row frees up once the tail has fully entered the screen.
                let speed = (PLAY_RES_X as f64 + width) / SCROLL_SECS;
                let row = take_row(&mut scroll_free, comment.time, width / speed);
                let y = row as u32 * LINE_HEIGHT;
                let position = format!(
                    "\\move({},{},{},{})",
                    PLAY_RES_X,
                    y,
                    -(width.ceil() as i64),
                    y
                );
                (position, SCROLL_SECS)
            }
            CommentMode::Top => {
                let row = take_row(&mut top_free, comment.time, STATIC_SECS);
                let y = row as u32 * LINE_HEIGHT;
                (format!("\\an8\\pos({},{})", PLAY_RES_X / 2, y), STATIC_SECS)
            }
            CommentMode::Bottom => {
                let row = take_row(&mut bottom_free, comment.time, STATIC_SECS);
                let y = PLAY_RES_Y - row as u32 * LINE_HEIGHT;
                (format!("\\an2\\pos({},{})", PLAY_RES_X / 2, y), STATIC_SECS)
            }
        };
        let _ = writeln!(
            out,
            "Dialogue: 2,{},{},Danmaku,,0000,0000,0000,,{{{}{}}}{}",
            ass_time(comment.time),
            ass_time(comment.time + duration),
            position,
            color_override(comment.color),
            escape_text(&comment.text)
        );
    }

    out
}

fn take_row(free_at: &mut [f64], time: f64, busy_for: f64) -> usize {
    let row = free_at
        .iter()
        .position(|&free| free <= time)
        .unwrap_or_else(|| {
            free_at
                .iter()
                .enumerate()
                .min_by(|a, b| a.1.total_cmp(b.1))
                .map_or(0, |(i, _)| i)
        });
    free_at[row] = time + busy_for;
    row
}

/// Rough width in pixels: full-width glyphs count double.
fn text_width(text: &str) -> f64 {
    let units: f64 = text
        .chars()
        .map(|c| if c.is_ascii() { 0.5 } else { 1.0 })
        .sum();
    units * FONT_SIZE as f64
}

fn color_override(rgb: u32) -> String {
    if rgb & 0xFFFFFF == 0xFFFFFF {
        return String::new();
    }
    let r = (rgb >> 16) & 0xFF;
    let g = (rgb >> 8) & 0xFF;
    let b = rgb & 0xFF;
    format!("\\c&H{:02X}{:02X}{:02X}&", b, g, r)
}

fn escape_text(text: &str) -> String {
    text.replace('\\', "＼")
        .replace('{', "｛")
        .replace('}', "｝")
        .replace("\r\n", "\\N")
        .replace('\n', "\\N")
}

/// `H:MM:SS.cc`
fn ass_time(seconds: f64) -> String {
    let centis = (seconds * 100.0).round() as u64;
    let (hours, rest) = (centis / 360_000, centis % 360_000);
    let (minutes, rest) = (rest / 6_000, rest % 6_000);
    format!("{}:{:02}:{:02}.{:02}", hours, minutes, rest / 100, rest % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?><i><chatserver>chat.bilibili.com</chatserver>
<d p="12.5,1,25,16777215,1700000000,0,abc,1">second &amp; scroll</d>
<d p="3.0,5,25,16711680,1700000000,0,abc,2">top red</d>
<d p="4.0,7,25,16777215,1700000000,0,abc,3">[special]</d>
<d p="5.25,4,25,16777215,1700000000,0,abc,4">bottom</d>
</i>"#;

    #[test]
    fn test_parse_comments() {
        let comments = parse_comments(SAMPLE);
        assert_eq!(comments.len(), 3);
        assert_eq!(comments[0].text, "top red");
        assert_eq!(comments[0].mode, CommentMode::Top);
        assert_eq!(comments[0].color, 0xFF0000);
        assert_eq!(comments[1].mode, CommentMode::Bottom);
        assert_eq!(comments[2].text, "second & scroll");
        assert_eq!(comments[2].mode, CommentMode::Scroll);
    }

    #[test]
    fn test_parse_ignores_truncated_input() {
        assert!(parse_comments("<d p=\"1.0,1,25,0\">never closed").is_empty());
        assert!(parse_comments("").is_empty());
    }

    #[test]
    fn test_ass_time() {
        assert_eq!(ass_time(0.0), "0:00:00.00");
        assert_eq!(ass_time(3725.456), "1:02:05.46");
    }

    #[test]
    fn test_color_override() {
        assert_eq!(color_override(0xFFFFFF), "");
        assert_eq!(color_override(0xFF0000), "\\c&H0000FF&");
    }

    #[test]
    fn test_to_ass_events() {
        let ass = to_ass(&parse_comments(SAMPLE));
        assert!(ass.starts_with("[Script Info]\n"));
        let events: Vec<&str> = ass.lines().filter(|l| l.starts_with("Dialogue:")).collect();
        assert_eq!(events.len(), 3);
        assert!(events[0].starts_with("Dialogue: 2,0:00:03.00,0:00:07.00,Danmaku,"));
        assert!(events[0].contains("\\an8\\pos(960,0)\\c&H0000FF&"));
        assert!(events[0].ends_with("top red"));
        assert!(events[2].contains("\\move(1920,0,"));
    }

    #[test]
    fn test_take_row_reuses_free_rows() {
        let mut rows = vec![0.0; 2];
        assert_eq!(take_row(&mut rows, 1.0, 2.0), 0);
        assert_eq!(take_row(&mut rows, 1.5, 2.0), 1);
        assert_eq!(take_row(&mut rows, 2.0, 2.0), 0);
        assert_eq!(take_row(&mut rows, 3.5, 2.0), 1);
    }
}
