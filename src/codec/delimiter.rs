//! Field delimiter selection

use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Bytes read from the start of a file when sniffing its delimiter
const SNIFF_BYTES: u64 = 8 * 1024;

/// Common field delimiters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    #[default]
    Comma,
    Tab,
    Pipe,
    Semicolon,
}

impl Delimiter {
    /// Get the character for this delimiter
    pub fn char(self) -> char {
        match self {
            Delimiter::Comma => ',',
            Delimiter::Tab => '\t',
            Delimiter::Pipe => '|',
            Delimiter::Semicolon => ';',
        }
    }

    /// Delimiter implied by a file extension, if it names one
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(Delimiter::Comma),
            "tsv" => Some(Delimiter::Tab),
            "psv" => Some(Delimiter::Pipe),
            _ => None,
        }
    }

    /// Delimiter for the file at `path`
    ///
    /// A known extension decides. Otherwise the start of the file is sniffed
    /// with [`detect_delimiter`]; missing or unreadable files use commas.
    pub fn for_file(path: &Path) -> Self {
        if let Some(delimiter) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Delimiter::from_extension)
        {
            return delimiter;
        }

        let mut head = Vec::new();
        let read =
            File::open(path).and_then(|file| file.take(SNIFF_BYTES).read_to_end(&mut head));
        match read {
            Ok(n) => {
                // Leave out a line cut off by the read limit
                if n as u64 == SNIFF_BYTES {
                    if let Some(end) = head.iter().rposition(|&b| b == b'\n') {
                        head.truncate(end);
                    }
                }
                detect_delimiter(&String::from_utf8_lossy(&head))
            }
            Err(_) => Delimiter::Comma,
        }
    }
}

/// Lines looked at when sniffing
const SNIFF_LINES: usize = 5;

/// Candidates in tie-break order
const CANDIDATES: [Delimiter; 4] = [
    Delimiter::Comma,
    Delimiter::Tab,
    Delimiter::Semicolon,
    Delimiter::Pipe,
];

/// Guess the separator of `content` from its first non-empty lines
///
/// Separators inside double-quoted fields are not counted. A candidate that
/// occurs equally often on every sampled line beats one whose count varies;
/// after that the larger total wins, and ties go to the earlier candidate.
pub fn detect_delimiter(content: &str) -> Delimiter {
    let sample: Vec<&str> = content
        .lines()
        .filter(|line| !line.is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best: Option<(bool, usize, Delimiter)> = None;
    for candidate in CANDIDATES {
        let counts: Vec<usize> = sample
            .iter()
            .map(|line| count_unquoted(line, candidate.char()))
            .collect();
        let total: usize = counts.iter().sum();
        if total == 0 {
            continue;
        }
        let consistent = counts.windows(2).all(|pair| pair[0] == pair[1]);
        if best.map_or(true, |(c, t, _)| (consistent, total) > (c, t)) {
            best = Some((consistent, total, candidate));
        }
    }

    best.map(|(_, _, delimiter)| delimiter).unwrap_or_default()
}

fn count_unquoted(line: &str, separator: char) -> usize {
    let mut in_quotes = false;
    line.chars()
        .filter(|&c| {
            if c == '"' {
                in_quotes = !in_quotes;
            }
            !in_quotes && c == separator
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delimiter_from_extension() {
        assert_eq!(Delimiter::from_extension("csv"), Some(Delimiter::Comma));
        assert_eq!(Delimiter::from_extension("TSV"), Some(Delimiter::Tab));
        assert_eq!(Delimiter::from_extension("psv"), Some(Delimiter::Pipe));
        assert_eq!(Delimiter::from_extension("txt"), None);
    }

    #[test]
    fn test_for_file_prefers_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.TSV");
        std::fs::write(&path, "a;b;c
").unwrap();
        assert_eq!(Delimiter::for_file(&path), Delimiter::Tab);
    }

    #[test]
    fn test_for_file_sniffs_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.txt");
        std::fs::write(&path, "a;b;c
1;2;3
").unwrap();
        assert_eq!(Delimiter::for_file(&path), Delimiter::Semicolon);

        assert_eq!(
            Delimiter::for_file(&dir.path().join("missing")),
            Delimiter::Comma
        );
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a,b,c\n1,2,3\n"), Delimiter::Comma);
        assert_eq!(detect_delimiter("a\tb\tc\n1\t2\t3\n"), Delimiter::Tab);
        assert_eq!(detect_delimiter("a|b|c\n1|2|3\n"), Delimiter::Pipe);
        assert_eq!(detect_delimiter("a;b;c\n1;2;3\n"), Delimiter::Semicolon);
        assert_eq!(detect_delimiter("plain\n"), Delimiter::Comma);
        assert_eq!(detect_delimiter(""), Delimiter::Comma);
    }

    #[test]
    fn test_detect_ignores_quoted_separators() {
        let content = "name,notes\nBob,\"a;b;c;d\"\nAmy,\"e;f;g\"\n";
        assert_eq!(detect_delimiter(content), Delimiter::Comma);
    }

    #[test]
    fn test_detect_prefers_consistent_counts() {
        // One comma on the first line only, one semicolon per line
        let content = "a;b,c\nd;e\nf;g\n";
        assert_eq!(detect_delimiter(content), Delimiter::Semicolon);
    }
}
