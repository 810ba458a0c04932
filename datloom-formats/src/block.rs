//! Line classification and tokenization shared by the block-structured
//! dialects (ClrMamePro, DosCenter).
//!
//! A block-structured DAT is line-oriented: keyword lines open multi-line
//! blocks, `)` closes them, and everything in between is either a
//! standalone key/value pair or an inline parenthesized record like
//! `rom ( name "x" size 1 crc ab )`. Classification is total — any line
//! maps to exactly one [`LineKind`], and callers route unrecognized
//! content to an extras list instead of failing.

/// Structural shape of one line of a block-structured DAT.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// A keyword opening a multi-line block, e.g. `game (`.
    TopLevelOpen(&'a str),
    /// A keyword with an inline parenthesized record on the same line,
    /// e.g. `rom ( name "x" size 1 )`. Carries the keyword and the text
    /// between the outer parentheses.
    NestedRecord(&'a str, &'a str),
    /// A standalone `key value` or `Key: value` pair. The value is raw
    /// (quotes not yet stripped) and may be empty.
    KeyValue(&'a str, &'a str),
    /// A lone `)` closing the current block.
    BlockClose,
    /// A `#` or `//` comment line.
    Comment(&'a str),
    /// Empty or whitespace-only.
    Blank,
}

/// Classify one raw line. Total: every input maps to some [`LineKind`].
pub fn classify(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return LineKind::Blank;
    }
    if trimmed == ")" {
        return LineKind::BlockClose;
    }
    if trimmed.starts_with('#') || trimmed.starts_with("//") {
        return LineKind::Comment(trimmed);
    }
    if let Some(keyword) = block_open_keyword(trimmed) {
        return LineKind::TopLevelOpen(keyword);
    }

    // Split on the first whitespace to get a candidate keyword.
    let (key, rest) = match trimmed.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&trimmed[..pos], trimmed[pos..].trim_start()),
        None => (trimmed, ""),
    };

    // `rom ( ... )` — keyword followed by an inline parenthesized record.
    if rest.starts_with('(') && rest.ends_with(')') && rest.len() >= 2 {
        return LineKind::NestedRecord(key, rest[1..rest.len() - 1].trim());
    }

    LineKind::KeyValue(key, rest)
}

/// Detect a block-opening line like `clrmamepro (` or `game (` and return
/// the keyword. The keyword must be bare alphanumeric so that value lines
/// whose text happens to end in `(` are not mistaken for opens.
fn block_open_keyword(trimmed: &str) -> Option<&str> {
    let stripped = trimmed.strip_suffix('(')?.trim_end();
    if !stripped.is_empty() && stripped.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Some(stripped)
    } else {
        None
    }
}

/// Split an inline record body into tokens, treating double-quoted runs as
/// single tokens: `name "Game (USA).bin" size 12` becomes
/// `["name", "Game (USA).bin", "size", "12"]`.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut rest = input.trim_start();

    while !rest.is_empty() {
        if let Some(quoted) = rest.strip_prefix('"') {
            // Quoted token: runs to the closing quote (or end of input on
            // an unterminated quote).
            match quoted.find('"') {
                Some(end) => {
                    tokens.push(quoted[..end].to_string());
                    rest = quoted[end + 1..].trim_start();
                }
                None => {
                    tokens.push(quoted.to_string());
                    rest = "";
                }
            }
        } else {
            let end = rest
                .find(|c: char| c.is_ascii_whitespace())
                .unwrap_or(rest.len());
            tokens.push(rest[..end].to_string());
            rest = rest[end..].trim_start();
        }
    }

    tokens
}

/// Strip one layer of surrounding double quotes, if present.
pub fn unquote(raw: &str) -> &str {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        &raw[1..raw.len() - 1]
    } else {
        raw
    }
}

/// Quote a value for emission when it contains whitespace or is empty;
/// bare values are written as-is.
pub fn quote_if_needed(value: &str) -> String {
    if value.is_empty() || value.contains(|c: char| c.is_ascii_whitespace()) {
        format!("\"{value}\"")
    } else {
        value.to_string()
    }
}
