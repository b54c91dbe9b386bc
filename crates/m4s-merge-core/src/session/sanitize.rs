/// Characters that are not allowed in file names, with their stand-ins.
const REPLACEMENTS: [(char, char); 11] = [
    ('<', '《'),
    ('>', '》'),
    ('\\', '#'),
    ('"', '\''),
    ('/', '_'),
    ('|', '_'),
    ('?', '_'),
    ('*', '_'),
    ('【', '['),
    ('】', ']'),
    (':', '：'),
];

pub const FORBIDDEN_CHARS: [char; 11] = [
    '<', '>', '\\', '"', '/', '|', '?', '*', '【', '】', ':',
];

/// Make a title safe to use as a path component.
pub fn sanitize_file_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| {
            REPLACEMENTS
                .iter()
                .find(|(from, _)| *from == c)
                .map_or(c, |(_, to)| *to)
        })
        .collect();
    replaced.trim().to_string()
}
