//! Plain-text and URL sanitizers applied to attribute writes. These mirror
//! the host system's field sanitizers: tags and control characters never
//! reach the store, and single-line fields collapse internal whitespace.

fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            c if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

fn collapse_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut pending_space = false;
    for c in line.chars() {
        if c == ' ' || c == '\t' {
            pending_space = true;
        } else if c.is_control() {
            // dropped outright
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

/// Sanitizes a single-line text value: strips tags, drops control
/// characters, collapses whitespace runs to single spaces, trims.
#[must_use]
pub fn sanitize_text_field(input: &str) -> String {
    let stripped = strip_tags(input);
    let mut out = String::with_capacity(stripped.len());
    let mut pending_space = false;
    for c in stripped.chars() {
        if c.is_whitespace() {
            pending_space = true;
        } else if c.is_control() {
            // dropped outright
        } else {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        }
    }
    out
}

/// Sanitizes a multi-line text value: like [`sanitize_text_field`] but line
/// breaks survive. Leading and trailing blank lines are trimmed.
#[must_use]
pub fn sanitize_textarea_field(input: &str) -> String {
    let stripped = strip_tags(input);
    let lines: Vec<String> = stripped.lines().map(collapse_line).collect();
    lines.join("\n").trim_matches('\n').to_string()
}

fn scheme_of(url: &str) -> Option<&str> {
    let end = url.find(|c: char| matches!(c, ':' | '/' | '?' | '#'))?;
    if url[end..].starts_with(':') {
        Some(&url[..end])
    } else {
        None
    }
}

/// Sanitizes a URL value: trims, removes control characters and interior
/// whitespace, and screens the scheme. Only `http` and `https` absolute
/// URLs pass; scheme-less values get an `http://` prefix unless they are
/// site-relative (`/`, `#`, `?`); anything else sanitizes to empty.
#[must_use]
pub fn sanitize_url(input: &str) -> String {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| !c.is_control() && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return cleaned;
    }
    match scheme_of(&cleaned) {
        Some(scheme)
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") =>
        {
            cleaned
        }
        Some(_) => String::new(),
        None if cleaned.starts_with(['/', '#', '?']) => cleaned,
        None => format!("http://{cleaned}"),
    }
}
