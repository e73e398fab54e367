//! Cleanup of device configuration dumps (`tmsh list` output).
//!
//! The dump is a brace-delimited block language:
//!
//! ```text
//! ltm pool /Common/web1 {
//!     members {
//!         /Common/10.0.0.5:80 { address 10.0.0.5 }
//!     }
//! }
//! ```
//!
//! Administrative blocks (certificates, users, provisioning, ...) are noise
//! for an agent and sometimes carry secrets. They are removed with a
//! balanced-brace scan; a depth-unaware pattern match corrupts nested blocks.

/// Block headers removed wholesale by [`clean_config`].
pub const NOISE_BLOCKS: &[&str] = &[
    "sys management-ip",
    "sys software",
    "sys file ssl-cert",
    "sys file ssl-key",
    "sys crypto cert-order-manager",
    "sys diags",
    "sys ecm",
    "sys disk",
    "sys provision",
    "sys db",
    "auth user",
    "auth password-policy",
    "cm cert",
    "cm key",
    "cm device",
    "cm trust-domain",
];

/// Single-line attributes stripped by [`clean_config`].
pub const SECRET_LINE_KEYWORDS: &[&str] = &[
    "encrypted-password",
    "password",
    "passphrase",
    "secret",
    "cert-fingerprint",
    "fingerprint",
    "checksum",
    "key-checksum",
];

const EMPTY_BLOCK_PASSES: usize = 5;

/// Remove every block introduced by `keyword`.
///
/// A header is `keyword` at the start of a line (after indentation) followed
/// by whitespace or `{`, with the block's `{` on that same line. The span from
/// the header's line start to its matching `}` is deleted, plus one trailing
/// newline. Scanning restarts from the top after each removal. Header lines
/// without a `{` are skipped. A block with no matching `}` ends the scan and
/// is left in place.
pub fn remove_block(text: &str, keyword: &str) -> String {
    let mut out = text.to_string();
    let mut from = 0;
    while let Some((start, line_end)) = find_header(&out, keyword, from) {
        let Some(open) = out[start..line_end].find('{').map(|i| start + i) else {
            from = line_end;
            continue;
        };
        let Some(close) = matching_brace(&out, open) else {
            break;
        };
        let mut end = close + 1;
        if out[end..].starts_with('\n') {
            end += 1;
        }
        out.replace_range(start..end, "");
        from = 0;
    }
    out
}

/// Strip noise blocks, secret-bearing lines, empty blocks and blank lines.
pub fn clean_config(raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n");
    for keyword in NOISE_BLOCKS {
        text = remove_block(&text, keyword);
    }
    text = strip_secret_lines(&text);
    for _ in 0..EMPTY_BLOCK_PASSES {
        let (next, changed) = collapse_empty_blocks(&text);
        text = next;
        if !changed {
            break;
        }
    }
    collapse_blank_lines(&text)
}

/// Start and end (past the newline) of the first line at or after `from`
/// that opens with `keyword`. `from` must be a line start.
fn find_header(text: &str, keyword: &str, from: usize) -> Option<(usize, usize)> {
    let mut line_start = from;
    for line in text[from..].split_inclusive('\n') {
        let line_end = line_start + line.len();
        if let Some(rest) = line.trim_start().strip_prefix(keyword) {
            if rest.starts_with(|c: char| c.is_whitespace() || c == '{') {
                return Some((line_start, line_end));
            }
        }
        line_start = line_end;
    }
    None
}

/// Offset of the `}` balancing the `{` at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, byte) in text.as_bytes().iter().enumerate().skip(open) {
        match byte {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn strip_secret_lines(text: &str) -> String {
    text.split_inclusive('\n')
        .filter(|line| {
            let trimmed = line.trim_start();
            !SECRET_LINE_KEYWORDS.iter().any(|kw| {
                trimmed
                    .strip_prefix(kw)
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
            })
        })
        .collect()
}

/// One pass removing `header { }` blocks whose body is only whitespace.
///
/// Only the empty block and its header are removed. An empty `{ }` with no
/// header word in front of it (Tcl `if { ... } { }`) is kept.
fn collapse_empty_blocks(text: &str) -> (String, bool) {
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;
    let mut search = 0;
    let mut changed = false;

    while let Some(i) = text[search..].find('{') {
        let open = search + i;
        let after = &text[open + 1..];
        let close = open + 1 + (after.len() - after.trim_start().len());
        if !text[close..].starts_with('}') {
            search = open + 1;
            continue;
        }
        let Some((start, whole_line)) = empty_block_header(text, copied, open) else {
            search = close + 1;
            continue;
        };
        out.push_str(&text[copied..start]);
        let mut end = close + 1;
        if whole_line && text[end..].starts_with('\n') {
            end += 1;
        }
        copied = end;
        search = end;
        changed = true;
    }
    out.push_str(&text[copied..]);
    (out, changed)
}

/// Where the header of the block opening at `open` starts, and whether it
/// starts its line. Looks back no further than `floor`, the nearest newline
/// or the nearest brace. With a brace on the same line, the header is the
/// single word before `open`.
fn empty_block_header(text: &str, floor: usize, open: usize) -> Option<(usize, bool)> {
    let before = &text[floor..open];
    let (from, line_start) = match before.rfind(|c: char| matches!(c, '\n' | '{' | '}')) {
        Some(i) => (floor + i + 1, before.as_bytes()[i] == b'\n'),
        None => (floor, floor == 0 || text[..floor].ends_with('\n')),
    };
    let header = text[from..open].trim_end();
    if header.trim_start().is_empty() {
        return None;
    }
    if line_start {
        return Some((from, true));
    }
    let word = from + header.trim_end_matches(|c: char| !c.is_whitespace()).len();
    Some((word, false))
}

fn collapse_blank_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
