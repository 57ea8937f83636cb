//! Shell-like splitting of the `extra_options` input
//!
//! `--build-arg "-X main.version=1.0.0"` becomes `--build-arg` and
//! `-X main.version=1.0.0`. Quotes are stripped; an unterminated quote runs
//! to the end of the line instead of failing.

/// Split one options line into argv-style tokens.
pub fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in raw.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None => match c {
                '"' | '\'' => {
                    quote = Some(c);
                    in_token = true;
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                _ => {
                    current.push(c);
                    in_token = true;
                }
            },
        }
    }

    if in_token {
        tokens.push(current);
    }

    tokens
}

/// Tokenize each options line independently and concatenate in order.
pub fn tokenize_lines<S: AsRef<str>>(lines: &[S]) -> Vec<String> {
    lines
        .iter()
        .flat_map(|line| tokenize(line.as_ref()))
        .collect()
}
