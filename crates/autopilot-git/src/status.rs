use autopilot_core::ChangeRecord;

/// Parse `git status --porcelain` (v1) output into change records.
///
/// Lines are `XY PATH` or `XY ORIG -> PATH` for renames and copies. Paths
/// that git quoted (spaces, non-ASCII) are unquoted.
pub fn parse_porcelain(stdout: &str) -> Vec<ChangeRecord> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<ChangeRecord> {
    if line.len() < 4 || !line.is_char_boundary(2) || !line.is_char_boundary(3) {
        return None;
    }
    let code = &line[..2];
    let rest = line[3..].trim();
    if rest.is_empty() {
        return None;
    }

    match rest.split_once(" -> ") {
        Some((orig, dest)) => {
            Some(ChangeRecord::new(code, unquote(dest)).with_orig_path(unquote(orig)))
        }
        None => Some(ChangeRecord::new(code, unquote(rest))),
    }
}

/// Undo git's C-style path quoting (`"a b.txt"`, `"caf\303\251"`).
pub(crate) fn unquote(path: &str) -> String {
    let Some(inner) = path.strip_prefix('"').and_then(|p| p.strip_suffix('"')) else {
        return path.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('"') => bytes.push(b'"'),
            Some('\\') => bytes.push(b'\\'),
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(v) => {
                            value = value * 8 + v;
                            chars.next();
                        }
                        None => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => {
                bytes.push(b'\\');
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
