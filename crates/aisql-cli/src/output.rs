use std::io::Read;
use std::path::Path;

use crate::error::{CliError, CliResult};

#[derive(Clone, Copy, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// Cut `s` to at most `max_chars` characters, marking the cut with `...`
pub fn truncate_string(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// Read a whole input file, or stdin when the path is absent or `-`
pub fn read_input(path: Option<&Path>) -> CliResult<String> {
    match path {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)
            .map_err(|e| CliError(format!("Failed to read {}: {e}", path.display()))),
        _ => {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_truncate_string_counts_characters() {
        assert_eq!(truncate_string("short", 10), "short");
        assert_eq!(truncate_string("人工智能是计算机科学", 6), "人工智...");
        assert_eq!(truncate_string("abcdef", 6), "abcdef");
    }

    #[test]
    fn test_read_input_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "data: [DONE]").unwrap();
        assert_eq!(read_input(Some(file.path())).unwrap(), "data: [DONE]");
    }

    #[test]
    fn test_read_input_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_input(Some(&dir.path().join("nope.txt"))).unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }
}
