//! File-backed corpus storage.
//!
//! The corpus is a pretty-printed JSON document `{ "version": 1, "paths":
//! [...] }`. Loading a missing or unreadable file yields an empty corpus;
//! anything that parses but breaks path invariants is rejected outright.

use crate::corpus::{Corpus, CorpusSettings};
use crate::error::StoreError;
use crate::path::GamePath;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

pub const FORMAT_VERSION: u32 = 1;

#[derive(Deserialize)]
struct Header {
    version: u32,
}

#[derive(Deserialize)]
struct CorpusFile {
    paths: Vec<GamePath>,
}

#[derive(Serialize)]
struct CorpusFileRef<'a> {
    version: u32,
    paths: &'a [GamePath],
}

pub fn encode(corpus: &Corpus) -> Result<String, StoreError> {
    let doc = CorpusFileRef {
        version: FORMAT_VERSION,
        paths: corpus.paths(),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}

/// Parses and validates a corpus document.
pub fn decode(text: &str, settings: CorpusSettings) -> Result<Corpus, StoreError> {
    let header: Header = serde_json::from_str(text)?;
    if header.version != FORMAT_VERSION {
        return Err(StoreError::UnsupportedVersion {
            found: header.version,
        });
    }
    let file: CorpusFile = serde_json::from_str(text)?;

    let mut seen = HashSet::with_capacity(file.paths.len());
    for (index, path) in file.paths.iter().enumerate() {
        path.check_integrity()
            .map_err(|reason| StoreError::Corrupt { index, reason })?;
        if !seen.insert(path.terminal_hash()) {
            return Err(StoreError::Corrupt {
                index,
                reason: format!("duplicate terminal hash {:#018x}", path.terminal_hash()),
            });
        }
    }
    Ok(Corpus::from_paths(settings, file.paths))
}

pub fn load(path: &Path, settings: CorpusSettings) -> Result<Corpus, StoreError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no corpus file yet, starting empty");
            return Ok(Corpus::new(settings));
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), "corpus file unreadable, starting empty: {err}");
            return Ok(Corpus::new(settings));
        }
    };
    let corpus = decode(&text, settings)?;
    tracing::info!(path = %path.display(), paths = corpus.len(), "loaded corpus");
    Ok(corpus)
}

/// Replaces `path` atomically: the document is written to a sibling temp
/// file which is then renamed over the target.
pub fn save(path: &Path, corpus: &Corpus) -> Result<(), StoreError> {
    let text = encode(corpus)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(text.as_bytes())?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|err| StoreError::Io(err.error))?;

    tracing::debug!(path = %path.display(), paths = corpus.len(), "saved corpus");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::tests::synthetic_path;

    fn sample() -> Corpus {
        let mut corpus = Corpus::seeded(CorpusSettings::default());
        corpus.add(synthetic_path(1, &[0, 10, 20, 30], false));
        corpus.add(synthetic_path(2, &[0, 5], false));
        corpus
    }

    #[test]
    fn decode_accepts_its_own_output() {
        let corpus = sample();
        let text = encode(&corpus).unwrap();
        let loaded = decode(&text, CorpusSettings::default()).unwrap();
        assert_eq!(loaded.paths(), corpus.paths());
        assert_eq!(loaded.paths()[1].scores(), &[0, 10, 20, 30]);
    }

    #[test]
    fn rejects_other_versions() {
        let err = decode(r#"{"version": 2, "paths": []}"#, CorpusSettings::default()).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { found: 2 }));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = decode("{\"version\": 1, \"paths\": [", CorpusSettings::default()).unwrap_err();
        assert!(matches!(err, StoreError::Parse(_)));
    }

    #[test]
    fn rejects_unequal_sequences() {
        let text = r#"{"version": 1, "paths": [{
            "inputs": [{}], "scores": [0, 1], "hashes": [0],
            "deaths": [false], "ticks": [0]
        }]}"#;
        let err = decode(text, CorpusSettings::default()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { index: 0, .. }));
    }

    #[test]
    fn rejects_tampered_hashes() {
        let mut value: serde_json::Value = serde_json::from_str(&encode(&sample()).unwrap()).unwrap();
        value["paths"][1]["hashes"][2] = serde_json::json!(12345);
        let err = decode(&value.to_string(), CorpusSettings::default()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { index: 1, .. }));
    }

    #[test]
    fn rejects_duplicate_terminal_hashes() {
        let mut value: serde_json::Value = serde_json::from_str(&encode(&sample()).unwrap()).unwrap();
        let first = value["paths"][0].clone();
        value["paths"]
            .as_array_mut()
            .unwrap()
            .push(first);
        let err = decode(&value.to_string(), CorpusSettings::default()).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { index: 3, .. }));
    }

    #[test]
    fn missing_file_is_an_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = load(&dir.path().join("absent.json"), CorpusSettings::default()).unwrap();
        assert!(corpus.is_empty());
    }

    #[test]
    fn unreadable_file_is_an_empty_corpus() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = load(dir.path(), CorpusSettings::default()).unwrap();
        assert!(corpus.is_empty());

        let binary = dir.path().join("paths.json");
        fs::write(&binary, [0xff, 0xfe, 0x00, 0x9f]).unwrap();
        let corpus = load(&binary, CorpusSettings::default()).unwrap();
        assert!(corpus.is_empty());
    }

    #[test]
    fn save_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested").join("paths.json");
        save(&target, &sample()).unwrap();
        save(&target, &Corpus::seeded(CorpusSettings::default())).unwrap();
        let loaded = load(&target, CorpusSettings::default()).unwrap();
        assert_eq!(loaded.len(), 1);
        let leftovers = fs::read_dir(target.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
