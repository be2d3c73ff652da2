// Natural ordering: "host2" < "host10".

use std::cmp::Ordering;

#[derive(Debug, PartialEq)]
enum Run<'a> {
    Text(&'a str),
    Digits(&'a str),
}

/// Alternating runs, always starting and ending with a (possibly empty) text run.
fn runs(s: &str) -> Vec<Run<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = false;
    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        if digit != in_digits {
            out.push(if in_digits {
                Run::Digits(&s[start..i])
            } else {
                Run::Text(&s[start..i])
            });
            start = i;
            in_digits = digit;
        }
    }
    if in_digits {
        out.push(Run::Digits(&s[start..]));
        out.push(Run::Text(""));
    } else {
        out.push(Run::Text(&s[start..]));
    }
    out
}

/// Compares digit strings by numeric value without overflowing.
fn cmp_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let ra = runs(a);
    let rb = runs(b);
    for (x, y) in ra.iter().zip(rb.iter()) {
        let ord = match (x, y) {
            (Run::Digits(x), Run::Digits(y)) => cmp_digits(x, y),
            (Run::Text(x), Run::Text(y)) => x.cmp(y),
            // Runs alternate from the same starting kind, so kinds always line up.
            (Run::Text(_), Run::Digits(_)) => Ordering::Greater,
            (Run::Digits(_), Run::Text(_)) => Ordering::Less,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ra.len().cmp(&rb.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<&str>) -> Vec<&str> {
        v.sort_by(|a, b| natural_cmp(a, b));
        v
    }

    #[test]
    fn digit_runs_compare_numerically() {
        assert_eq!(
            sorted(vec!["host10", "host2", "host1"]),
            ["host1", "host2", "host10"]
        );
    }

    #[test]
    fn multiple_runs_and_prefixes() {
        assert_eq!(
            sorted(vec!["rack2-gpu10", "rack10-gpu1", "rack2-gpu9", "rack", "10", "9"]),
            ["9", "10", "rack", "rack2-gpu9", "rack2-gpu10", "rack10-gpu1"]
        );
    }

    #[test]
    fn leading_zeros_and_huge_numbers() {
        assert_eq!(natural_cmp("node007", "node7"), Ordering::Equal);
        assert_eq!(
            natural_cmp("n99999999999999999999999", "n100000000000000000000000"),
            Ordering::Less
        );
    }

    #[test]
    fn runs_split_like_alternating_groups() {
        assert_eq!(
            runs("gpu12b"),
            vec![Run::Text("gpu"), Run::Digits("12"), Run::Text("b")]
        );
        assert_eq!(
            runs("7"),
            vec![Run::Text(""), Run::Digits("7"), Run::Text("")]
        );
    }
}
