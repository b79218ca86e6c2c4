//! Reading corpus files into [`DocInput`] records.
//!
//! Accepts a `.json` file (an array of records or a single record), a
//! `.jsonl` file (one record per line), or a directory walked for both.
//! Each record is a JSON object; its tokens come from `tokens` (array),
//! `cut_content` (whitespace-joined string) or `body` (raw text, split on
//! whitespace and also kept as `content`), first match wins. All other
//! fields become metadata. Normalization (case, stemming) is left to the
//! engine's tokenizer at load time.

use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{Result, SearchError};
use crate::index::{DocInput, Metadata};

const TOKEN_FIELDS: [&str; 3] = ["tokens", "cut_content", "body"];

pub fn read_corpus(path: impl AsRef<Path>) -> Result<Vec<DocInput>> {
    let path = path.as_ref();
    let mut docs = Vec::new();
    for file in corpus_files(path)? {
        let before = docs.len();
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            read_jsonl(&file, &mut docs)?;
        } else {
            read_json(&file, &mut docs)?;
        }
        tracing::debug!(file = %file.display(), records = docs.len() - before, "read corpus file");
    }
    tracing::info!(path = %path.display(), records = docs.len(), "corpus read");
    Ok(docs)
}

/// Files making up the corpus at `path`, sorted so doc ids are stable across runs.
fn corpus_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(SearchError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("corpus path {} does not exist", path.display()),
        )));
    }
    let mut files: Vec<PathBuf> = WalkDir::new(path)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e.into_path()),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable corpus entry");
                None
            }
        })
        .filter(|p| p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")))
        .collect();
    files.sort();
    Ok(files)
}

fn read_jsonl(file: &Path, docs: &mut Vec<DocInput>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let value: Value = serde_json::from_str(&line)?;
        docs.push(parse_record(value, docs.len())?);
    }
    Ok(())
}

fn read_json(file: &Path, docs: &mut Vec<DocInput>) -> Result<()> {
    let reader = BufReader::new(File::open(file)?);
    let value: Value = serde_json::from_reader(reader)?;
    match value {
        Value::Array(records) => {
            for value in records {
                docs.push(parse_record(value, docs.len())?);
            }
        }
        value => docs.push(parse_record(value, docs.len())?),
    }
    Ok(())
}

/// Turn one JSON record into a [`DocInput`]. `position` is the record's
/// index in the whole corpus and is reported in format errors.
pub fn parse_record(value: Value, position: usize) -> Result<DocInput> {
    let Value::Object(mut metadata) = value else {
        return Err(SearchError::corpus_format(position, "record"));
    };
    let tokens = take_tokens(&mut metadata, position)?;
    Ok(DocInput { tokens, metadata })
}

fn take_tokens(metadata: &mut Metadata, position: usize) -> Result<Vec<String>> {
    let Some(field) = TOKEN_FIELDS.iter().copied().find(|f| metadata.contains_key(*f)) else {
        return Err(SearchError::corpus_format(position, "tokens"));
    };
    let tokens = match (field, metadata.remove(field)) {
        ("tokens", Some(Value::Array(items))) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                _ => Err(SearchError::corpus_format(position, "tokens")),
            })
            .collect::<Result<Vec<_>>>()?,
        ("cut_content", Some(Value::String(s))) => s.split_whitespace().map(str::to_string).collect(),
        ("body", Some(Value::String(s))) => {
            let tokens = s.split_whitespace().map(str::to_string).collect();
            // keep the raw text around for snippets
            metadata.entry("content").or_insert(Value::String(s));
            tokens
        }
        _ => return Err(SearchError::corpus_format(position, field)),
    };
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_sources_in_priority_order() {
        let rec = json!({"tokens": ["a", "b"], "cut_content": "x y", "title": "t"});
        let d = parse_record(rec, 0).unwrap();
        assert_eq!(d.tokens, vec!["a", "b"]);
        assert_eq!(d.metadata.get("cut_content"), Some(&json!("x y")));
        assert!(!d.metadata.contains_key("tokens"));

        let rec = json!({"cut_content": " 奖学金  评选 ", "title": "t"});
        let d = parse_record(rec, 0).unwrap();
        assert_eq!(d.tokens, vec!["奖学金", "评选"]);
    }

    #[test]
    fn body_is_split_and_kept_as_content() {
        let rec = json!({"body": "The exams", "title": "t"});
        let d = parse_record(rec, 0).unwrap();
        assert_eq!(d.tokens, vec!["The", "exams"]);
        assert_eq!(d.metadata.get("content"), Some(&json!("The exams")));
    }

    #[test]
    fn malformed_records_report_position() {
        let err = parse_record(json!({"title": "no tokens"}), 4).unwrap_err();
        assert!(matches!(err, SearchError::CorpusFormat { position: 4, ref field } if field == "tokens"));

        let err = parse_record(json!({"tokens": ["a", 1]}), 2).unwrap_err();
        assert!(matches!(err, SearchError::CorpusFormat { position: 2, .. }));

        let err = parse_record(json!(["a"]), 7).unwrap_err();
        assert!(matches!(err, SearchError::CorpusFormat { position: 7, ref field } if field == "record"));
    }

    #[test]
    fn reads_json_and_jsonl_directory_in_path_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("a.json"),
            r#"[{"tokens":["one"],"title":"1"},{"tokens":["two"],"title":"2"}]"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("b.jsonl"), "{\"cut_content\":\"three\",\"title\":\"3\"}\n\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let docs = read_corpus(dir.path()).unwrap();
        let titles: Vec<&str> = docs.iter().map(|d| d.metadata["title"].as_str().unwrap()).collect();
        assert_eq!(titles, vec!["1", "2", "3"]);
    }

    #[test]
    fn missing_path_is_io_error() {
        let err = read_corpus("/definitely/not/here.jsonl").unwrap_err();
        assert!(matches!(err, SearchError::Io(_)));
    }
}
