//! Output formatting helpers: terminal grids, human sizes, head metadata

use crate::client::{HeadMeta, ObjectBody};
use anyhow::{bail, Result};

// Content types we are willing to dump to a terminal
const SAFE_CONTENT_TYPE_PREFIXES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/yaml",
    "text/",
];

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| w as usize)
        .unwrap_or(80)
}

/// Lay strings out in columns sized to the terminal, column-major like ls.
pub fn print_grid(data: &[String]) {
    let largest = data.iter().map(String::len).max().unwrap_or(0) + 1;
    let num_cols = terminal_width() / largest.max(1);

    // Give up if we can't fit the data into columns anyway
    if num_cols <= 1 {
        for e in data {
            println!("{}", e);
        }
        return;
    }

    let col_size = data.len() / num_cols;
    let mut groups = vec![col_size; num_cols];
    for g in groups.iter_mut().take(data.len() % num_cols) {
        *g += 1;
    }

    let rows = groups[0];
    let mut output = vec![String::new(); rows];
    let mut i = 0;
    for g in &groups {
        for line in output.iter_mut().take(*g) {
            output_push_padded(line, &data[i], largest);
            i += 1;
        }
    }

    for line in output {
        println!("{}", line.trim_end());
    }
}

fn output_push_padded(line: &mut String, value: &str, width: usize) {
    line.push_str(value);
    for _ in value.len()..width {
        line.push(' ');
    }
}

/// Round a byte count to a whole number of suitable units.
pub fn pretty_size(n: u64) -> String {
    let mut size = n as f64;

    for suffix in ["B", "KB", "MB", "GB", "TB"] {
        if size <= 1023.0 || suffix == "TB" {
            return format!("{} {}", size.round() as u64, suffix);
        }
        size /= 1024.0;
    }

    unreachable!()
}

fn is_safe_content_type(ct: Option<&str>) -> bool {
    ct.map_or(false, |ct| {
        SAFE_CONTENT_TYPE_PREFIXES
            .iter()
            .any(|p| ct.starts_with(p))
    })
}

/// Print an object body, refusing anything that doesn't look like text.
pub fn print_object(body: &ObjectBody) -> Result<()> {
    if !is_safe_content_type(body.content_type.as_deref()) {
        bail!(
            "Refusing to print unsafe content type \"{}\"",
            body.content_type.as_deref().unwrap_or("")
        );
    }

    let text = std::str::from_utf8(&body.bytes)?;
    print!("{}", text);
    Ok(())
}

fn print_field(key: &str, value: &str, indent_level: usize) {
    let indent = "  ".repeat(indent_level);
    println!("{}\x1b[36m{: <40}\x1b[0m{}", indent, format!("{}:", key), value);
}

/// Pretty-print head metadata as sorted key/value pairs, with the
/// user-defined metadata map nested underneath.
pub fn print_head_meta(meta: &HeadMeta) {
    let length = match meta.content_length {
        Some(n) if n >= 0 => format!("{} ({} bytes)", pretty_size(n as u64), n),
        _ => String::new(),
    };
    let modified = meta
        .last_modified
        .map(|t| t.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
        .unwrap_or_default();

    print_field("Content-Length", &length, 0);
    print_field("Content-Type", meta.content_type.as_deref().unwrap_or(""), 0);
    print_field("Last-Modified", &modified, 0);
    print_field("Metadata", "", 0);
    for (k, v) in &meta.metadata {
        print_field(k, v, 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pretty_size() {
        let cases: [(u64, &str); 9] = [
            (0, "0 B"),
            (233, "233 B"),
            (1023, "1023 B"),
            (1024, "1 KB"),
            (1024u64.pow(2) - 1, "1 MB"),
            (12345678, "12 MB"),
            (1024u64.pow(3) + 100, "1 GB"),
            (1024u64.pow(4) + 1, "1 TB"),
            (1024u64.pow(5) * 2, "2048 TB"),
        ];

        for (value, expected) in cases {
            assert_eq!(pretty_size(value), expected, "input: {value}");
        }
    }

    #[test]
    fn test_safe_content_types() {
        for safe in [
            "text/plain",
            "text/html; charset=utf-8",
            "application/json",
            "application/yaml",
        ] {
            assert!(is_safe_content_type(Some(safe)), "{safe}");
        }
        for unsafe_ct in ["application/x-tar", "image/png", ""] {
            assert!(!is_safe_content_type(Some(unsafe_ct)), "{unsafe_ct}");
        }
        assert!(!is_safe_content_type(None));
    }

    #[test]
    fn test_print_object_refuses_binary() {
        let body = ObjectBody {
            content_type: Some("application/x-tar".to_string()),
            bytes: vec![0, 1, 2],
        };
        assert!(print_object(&body).is_err());

        let body = ObjectBody {
            content_type: Some("text/plain".to_string()),
            bytes: b"fine".to_vec(),
        };
        assert!(print_object(&body).is_ok());
    }
}
