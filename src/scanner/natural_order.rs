//! Natural ordering of file names: "img2.png" sorts before "img10.png".

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Run<'a> {
    /// Digit run with leading zeros stripped.
    Num(&'a str),
    Text(&'a str),
}

struct Runs<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Runs<'a> {
    type Item = Run<'a>;

    fn next(&mut self) -> Option<Run<'a>> {
        let first = self.rest.chars().next()?;
        let is_digit = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(self.rest.len());
        let (run, rest) = self.rest.split_at(end);
        self.rest = rest;

        if is_digit {
            let trimmed = run.trim_start_matches('0');
            Some(Run::Num(trimmed))
        } else {
            Some(Run::Text(run))
        }
    }
}

fn runs(s: &str) -> Runs<'_> {
    Runs { rest: s }
}

/// Digit strings without leading zeros: longer means larger.
fn compare_numeric(a: &str, b: &str) -> Ordering {
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn compare_text(a: &str, b: &str) -> Ordering {
    let a = a.chars().flat_map(char::to_lowercase);
    let b = b.chars().flat_map(char::to_lowercase);
    a.cmp(b)
}

fn compare_run(a: Run<'_>, b: Run<'_>) -> Ordering {
    match (a, b) {
        (Run::Num(x), Run::Num(y)) => compare_numeric(x, y),
        (Run::Text(x), Run::Text(y)) => compare_text(x, y),
        (Run::Num(_), Run::Text(_)) => Ordering::Less,
        (Run::Text(_), Run::Num(_)) => Ordering::Greater,
    }
}

/// Compare two names run by run. Digit runs compare as unsigned integers of any
/// length, text runs case-insensitively, and a digit run sorts before a text
/// run. On a common prefix the shorter name sorts first.
pub fn compare(a: &str, b: &str) -> Ordering {
    let mut left = runs(a);
    let mut right = runs(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = compare_run(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}
