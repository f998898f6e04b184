//! The persistent dependency database for remake
//!
//! One record per line: `<target>: <dep> <dep> …`, every name written with
//! the same quoting as rule-file words. The database remembers dynamic
//! dependencies discovered by scripts across runs; it is loaded at startup
//! and written back on exit. Recorded dependencies decide freshness only —
//! they are not rebuilt on their own when stale.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use camino::Utf8Path;
use thiserror::Error;
use tracing::debug;

use remake_rules::words::{Scanner, escape};

/// Errors that can occur while writing the database
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Map from targets to their known dependencies.
///
/// The dep sets are unordered in meaning; `BTreeSet`/`BTreeMap` keep the
/// on-disk representation stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DepDb {
    map: BTreeMap<String, BTreeSet<String>>,
}

impl DepDb {
    /// Load the database from `path`.
    ///
    /// A missing or unreadable file yields an empty database; ill-formed
    /// contents are discarded the same way. Both are reported at debug
    /// level only.
    pub fn load(path: &Utf8Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                debug!(path = %path, error = %e, "no dependency database loaded");
                return Self::default();
            }
        };
        match Self::parse(&contents) {
            Some(db) => db,
            None => {
                debug!(path = %path, "ill-formed dependency database ignored");
                Self::default()
            }
        }
    }

    /// Parse database contents; `None` if a record is ill-formed.
    fn parse(contents: &str) -> Option<Self> {
        let mut sc = Scanner::new(contents);
        let mut map = BTreeMap::new();
        loop {
            let target = sc.read_word();
            if target.is_empty() {
                break;
            }
            if sc.bump() != Some(b':') {
                return None;
            }
            sc.skip_spaces();
            let set: &mut BTreeSet<String> = map.entry(target).or_default();
            loop {
                let dep = sc.read_word();
                if dep.is_empty() {
                    break;
                }
                set.insert(dep);
                sc.skip_spaces();
            }
            sc.skip_eol();
        }
        Some(Self { map })
    }

    /// Write the database to `path` atomically (temp file + rename).
    /// Targets with no recorded dependencies are omitted.
    pub fn save(&self, path: &Utf8Path) -> Result<(), DbError> {
        let io_err = |source| DbError::Write {
            path: path.to_string(),
            source,
        };
        let mut out = Vec::new();
        for (target, deps) in &self.map {
            if deps.is_empty() {
                continue;
            }
            write!(out, "{}: ", escape(target)).map_err(io_err)?;
            for dep in deps {
                write!(out, "{} ", escape(dep)).map_err(io_err)?;
            }
            writeln!(out).map_err(io_err)?;
        }

        let dir = path.parent().unwrap_or(Utf8Path::new("."));
        let tmp = tempfile::Builder::new()
            .prefix(".remake-tmp")
            .tempfile_in(dir)
            .map_err(io_err)?;
        let (mut file, tmp_path) = tmp.into_parts();
        file.write_all(&out).map_err(io_err)?;
        drop(file);
        tmp_path
            .persist(path)
            .map_err(|e| io_err(std::io::Error::other(e)))?;
        Ok(())
    }

    /// The recorded dependencies of `target`, if any.
    pub fn deps_of(&self, target: &str) -> Option<&BTreeSet<String>> {
        self.map.get(target)
    }

    /// Replace the dep set of `target` with exactly `deps`. Used when a
    /// rule starts running: earlier dynamic records are discarded because
    /// the script is being re-executed.
    pub fn replace<I>(&mut self, target: &str, deps: I)
    where
        I: IntoIterator<Item = String>,
    {
        let set = self.map.entry(target.to_string()).or_default();
        set.clear();
        set.extend(deps);
    }

    /// Add a single dependency of `target`, keeping existing records.
    pub fn record(&mut self, target: &str, dep: &str) {
        self.map
            .entry(target.to_string())
            .or_default()
            .insert(dep.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.map.values().all(|deps| deps.is_empty())
    }
}
