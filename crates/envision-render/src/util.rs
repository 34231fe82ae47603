use std::fmt::Write as _;

fn trim_trailing_zeros_and_dot(out: &mut String, start: usize) {
    while out.len() > start && out.as_bytes()[out.len() - 1] == b'0' {
        out.pop();
    }
    if out.len() > start && out.as_bytes()[out.len() - 1] == b'.' {
        out.pop();
    }
}

/// Writes `v` with at most three fractional digits, trailing zeros trimmed and no `-0`.
pub(crate) fn fmt_path_into(out: &mut String, v: f64) {
    if !v.is_finite() || v.abs() < 0.0005 {
        out.push('0');
        return;
    }
    let rounded = (v * 1000.0).round() / 1000.0;
    let start = out.len();
    let _ = write!(out, "{rounded:.3}");
    trim_trailing_zeros_and_dot(out, start);
    if &out[start..] == "-0" {
        out.truncate(start);
        out.push('0');
    }
}

pub(crate) fn fmt_num(v: f64) -> String {
    let mut out = String::new();
    fmt_path_into(&mut out, v);
    out
}

pub(crate) fn escape_xml_into(out: &mut String, text: &str) {
    let bytes = text.as_bytes();
    let mut start = 0usize;
    for (i, &b) in bytes.iter().enumerate() {
        let esc = match b {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&#39;",
            _ => continue,
        };
        if start < i {
            out.push_str(&text[start..i]);
        }
        out.push_str(esc);
        start = i + 1;
    }
    if start < text.len() {
        out.push_str(&text[start..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_trimmed() {
        assert_eq!(fmt_num(1.0), "1");
        assert_eq!(fmt_num(-0.0001), "0");
        assert_eq!(fmt_num(12.3456), "12.346");
        assert_eq!(fmt_num(f64::NAN), "0");
        assert_eq!(fmt_num(-2.5), "-2.5");
    }

    #[test]
    fn markup_is_escaped() {
        let mut out = String::new();
        escape_xml_into(&mut out, r#"a<b> & "c""#);
        assert_eq!(out, "a&lt;b&gt; &amp; &quot;c&quot;");
    }
}
