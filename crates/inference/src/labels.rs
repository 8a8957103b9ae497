use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelsError {
    #[error("failed to read labels file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed class names at byte {position}: {reason}")]
    Malformed { position: usize, reason: &'static str },

    #[error("class indices must be contiguous from 0, missing index {0}")]
    MissingIndex(usize),

    #[error("class table is empty")]
    Empty,
}

/// Index → human-readable class name table owned by a loaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels {
    names: Vec<String>,
}

impl ClassLabels {
    pub fn new(names: Vec<String>) -> Result<Self, LabelsError> {
        if names.is_empty() {
            return Err(LabelsError::Empty);
        }
        Ok(Self { names })
    }

    pub fn get(&self, class_id: usize) -> Option<&str> {
        self.names.get(class_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// One class name per line; blank lines are skipped.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LabelsError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| LabelsError::Io {
            path: path.display().to_string(),
            source,
        })?;

        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_owned)
                .collect(),
        )
    }

    /// Parse the `names` metadata entry YOLO exporters write into ONNX files,
    /// e.g. `{0: 'person', 1: 'bicycle', 2: "driver's seat"}`.
    pub fn from_yolo_metadata(raw: &str) -> Result<Self, LabelsError> {
        let entries = parse_index_map(raw)?;

        let mut names = Vec::with_capacity(entries.len());
        for (expected, (index, name)) in entries.into_iter().enumerate() {
            if index != expected {
                return Err(LabelsError::MissingIndex(expected));
            }
            names.push(name);
        }

        Self::new(names)
    }
}

/// Parse a Python-style `{int: 'str', ...}` literal.
fn parse_index_map(raw: &str) -> Result<BTreeMap<usize, String>, LabelsError> {
    let bytes = raw.as_bytes();
    let mut pos = 0;
    let mut entries = BTreeMap::new();

    let skip_ws = |pos: &mut usize| {
        while *pos < bytes.len() && bytes[*pos].is_ascii_whitespace() {
            *pos += 1;
        }
    };
    let malformed = |position: usize, reason: &'static str| LabelsError::Malformed { position, reason };

    skip_ws(&mut pos);
    if bytes.get(pos) != Some(&b'{') {
        return Err(malformed(pos, "expected '{'"));
    }
    pos += 1;

    loop {
        skip_ws(&mut pos);
        match bytes.get(pos) {
            Some(b'}') => break,
            Some(b',') => {
                pos += 1;
                continue;
            }
            None => return Err(malformed(pos, "unterminated mapping")),
            _ => {}
        }

        let start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_digit() {
            pos += 1;
        }
        let index: usize = raw[start..pos]
            .parse()
            .map_err(|_| malformed(start, "expected class index"))?;

        skip_ws(&mut pos);
        if bytes.get(pos) != Some(&b':') {
            return Err(malformed(pos, "expected ':'"));
        }
        pos += 1;
        skip_ws(&mut pos);

        let quote = match bytes.get(pos) {
            Some(q @ (b'\'' | b'"')) => *q,
            _ => return Err(malformed(pos, "expected quoted class name")),
        };
        pos += 1;

        let mut name = String::new();
        loop {
            match bytes.get(pos) {
                None => return Err(malformed(pos, "unterminated class name")),
                Some(b'\\') => {
                    let escaped = raw[pos + 1..]
                        .chars()
                        .next()
                        .ok_or_else(|| malformed(pos, "dangling escape"))?;
                    name.push(escaped);
                    pos += 1 + escaped.len_utf8();
                }
                Some(&b) if b == quote => {
                    pos += 1;
                    break;
                }
                Some(_) => {
                    let c = raw[pos..].chars().next().unwrap_or_default();
                    name.push(c);
                    pos += c.len_utf8();
                }
            }
        }

        entries.insert(index, name);
    }

    Ok(entries)
}
