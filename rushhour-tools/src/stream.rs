//! Recorded board streams and configuration files.
//!
//! A stream file holds one inbound message per line, exactly as a board
//! feed would send them:
//!
//! ```text
//! {"cars": {"red": [[0, 1], [0, 2]], "blue": [[5, 4], [5, 5]]}}
//! {"cars": {"red": [[0, 2], [0, 3]], "blue": [[5, 4], [5, 5]]}}
//! ```
//!
//! Blank lines are skipped. A line that does not parse is kept as a
//! malformed entry so callers can report it without dropping the stream.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use rushhour_core::{
    parse_configuration, starting_configuration, Configuration, ConfigurationError,
    InboundMessage,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{} does not fit a {size}x{size} board: {source}", path.display())]
    Invalid {
        path: PathBuf,
        size: u16,
        source: ConfigurationError,
    },
    #[error("failed to write {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// One non-blank line of a stream.
#[derive(Debug)]
pub struct StreamEntry {
    /// 1-based line number in the source file.
    pub line: usize,
    pub parsed: Result<Configuration, serde_json::Error>,
}

/// Split stream text into entries.
pub fn parse_stream(text: &str) -> Vec<StreamEntry> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| StreamEntry {
            line: i + 1,
            parsed: InboundMessage::parse(line).map(|message| message.cars),
        })
        .collect()
}

pub fn read_stream(path: &Path) -> Result<Vec<StreamEntry>, LoadError> {
    let text = read(path)?;
    Ok(parse_stream(&text))
}

/// Load a configuration file (bare or wrapped in `{"cars": ...}`) and check
/// it fits the board.
pub fn load_configuration(path: &Path, board_size: u16) -> Result<Configuration, LoadError> {
    let text = read(path)?;
    let config = parse_configuration(&text).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config
        .validate(board_size)
        .map_err(|source| LoadError::Invalid {
            path: path.to_path_buf(),
            size: board_size,
            source,
        })?;
    Ok(config)
}

/// The configuration at `path`, or the red/blue starting board.
pub fn initial_configuration(
    path: Option<&Path>,
    board_size: u16,
) -> Result<Configuration, LoadError> {
    match path {
        Some(path) => load_configuration(path, board_size),
        None => Ok(starting_configuration()),
    }
}

pub fn write_file(path: &Path, contents: &str) -> Result<(), LoadError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| LoadError::Write {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    fs::write(path, contents).map_err(|source| LoadError::Write {
        path: path.to_path_buf(),
        source,
    })
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rushhour_core::same_configuration;

    #[test]
    fn test_parse_stream_skips_blanks_and_keeps_bad_lines() {
        let text = "\n{\"cars\": {\"red\": [[0, 1], [0, 2]]}}\n   \nnot json\n{\"cars\": {}}\n";
        let entries = parse_stream(text);

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].line, 2);
        assert!(entries[0].parsed.is_ok());
        assert_eq!(entries[1].line, 4);
        assert!(entries[1].parsed.is_err());
        assert_eq!(entries[2].line, 5);
        assert!(entries[2].parsed.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_load_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("board.json");

        fs::write(&path, r#"{"red": [[0, 0], [0, 1]], "blue": [[5, 4], [5, 5]]}"#).unwrap();
        let config = load_configuration(&path, 6).unwrap();
        assert!(same_configuration(&config, &starting_configuration()));

        assert!(matches!(
            load_configuration(&path, 5),
            Err(LoadError::Invalid { size: 5, .. })
        ));

        fs::write(&path, "{").unwrap();
        assert!(matches!(
            load_configuration(&path, 6),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_stream(&dir.path().join("absent.jsonl")).unwrap_err();
        assert!(matches!(err, LoadError::Read { .. }));
        assert!(err.to_string().contains("absent.jsonl"));
    }

    #[test]
    fn test_initial_defaults_to_starting_board() {
        let config = initial_configuration(None, 6).unwrap();
        assert!(same_configuration(&config, &starting_configuration()));
    }

    #[test]
    fn test_write_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("graph.dot");
        write_file(&path, "digraph states {\n}\n").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "digraph states {\n}\n");
    }
}
