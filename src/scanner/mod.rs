//! Run-tree scanner.
//!
//! Directory names encode the simulation parameters:
//! `N = <int>/T_creation = <float>/T_sample = <float>/h = (<x>, <y>, <z>)`.
//! The scanner descends the tree with explicit paths, collects every run
//! directory together with its configuration, and lists the series files
//! inside a run.

use crate::config::QuantitySpec;
use crate::error::{StatError, StatResult};
use crate::models::{Configuration, Field, SkippedFile};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// A parameter encoded in one directory name.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    N(u32),
    TCreation(f64),
    TSample(f64),
    Field(Field),
}

/// Parse one directory name.
///
/// Returns `Ok(None)` for names that carry no parameter, and a parse
/// failure for names with a known key but a malformed value.
pub fn parse_segment(name: &str) -> StatResult<Option<Segment>> {
    let Some((key, value)) = name.split_once('=') else {
        return Ok(None);
    };
    let value = value.trim();

    let segment = match key.trim() {
        "N" => Segment::N(parse_number(name, value)?),
        "T_creation" => Segment::TCreation(parse_number(name, value)?),
        "T_sample" => Segment::TSample(parse_number(name, value)?),
        "h" => Segment::Field(parse_field(name, value)?),
        _ => return Ok(None),
    };
    Ok(Some(segment))
}

fn parse_number<T>(name: &str, value: &str) -> StatResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| StatError::parse(name, format!("'{}': {}", value, e)))
}

fn parse_field(name: &str, value: &str) -> StatResult<Field> {
    let inner = value
        .strip_prefix('(')
        .and_then(|v| v.strip_suffix(')'))
        .ok_or_else(|| StatError::parse(name, "field must be written as (x, y, z)"))?;

    let components = inner
        .split(',')
        .map(|c| parse_number::<f64>(name, c.trim()))
        .collect::<StatResult<Vec<f64>>>()?;

    match components.as_slice() {
        [x, y, z] => Ok(Field::new(*x, *y, *z)),
        other => Err(StatError::parse(
            name,
            format!("expected 3 field components, found {}", other.len()),
        )),
    }
}

/// A leaf run directory.
#[derive(Debug, Clone, PartialEq)]
pub struct RunDir {
    pub configuration: Configuration,
    pub field: Field,
    /// The run directory itself.
    pub path: PathBuf,
    /// The enclosing `T_sample = ...` directory, where sweeps are written.
    pub config_dir: PathBuf,
}

/// Runs found under a directory plus the subtrees that had to be skipped.
#[derive(Debug, Default)]
pub struct Discovery {
    pub runs: Vec<RunDir>,
    pub skipped: Vec<SkippedFile>,
}

impl Discovery {
    fn extend(&mut self, other: Discovery) {
        self.runs.extend(other.runs);
        self.skipped.extend(other.skipped);
    }
}

/// Parameters collected on the way down.
#[derive(Debug, Clone, Default)]
struct TreeContext {
    n: Option<u32>,
    t_creation: Option<f64>,
    t_sample: Option<f64>,
    config_dir: Option<PathBuf>,
}

impl TreeContext {
    fn configuration(&self) -> Option<(Configuration, PathBuf)> {
        Some((
            Configuration {
                n: self.n?,
                t_creation: self.t_creation?,
                t_sample: self.t_sample?,
            },
            self.config_dir.clone()?,
        ))
    }
}

/// Scanner for the run tree.
pub struct RunScanner {
    root: PathBuf,
}

impl RunScanner {
    /// Create a new scanner rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Collect all run directories below the root.
    pub fn scan(&self) -> Discovery {
        let mut discovery = self.walk_dir(&self.root, &TreeContext::default());
        discovery.runs.sort_by(|a, b| {
            a.configuration
                .cmp(&b.configuration)
                .then(a.field.x.total_cmp(&b.field.x))
        });
        discovery
    }

    /// Walk directory recursively. Each level returns what it found and the
    /// caller concatenates.
    fn walk_dir(&self, dir: &Path, ctx: &TreeContext) -> Discovery {
        let mut found = Discovery::default();

        let entries = match fs::read_dir(dir) {
            Ok(e) => e,
            Err(e) => {
                debug!("Cannot read directory {}: {}", dir.display(), e);
                return found;
            }
        };

        let mut subdirs: Vec<PathBuf> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        subdirs.sort();

        for path in subdirs {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            let mut child_ctx = ctx.clone();
            match parse_segment(&name) {
                Ok(Some(Segment::N(n))) => child_ctx.n = Some(n),
                Ok(Some(Segment::TCreation(t))) => child_ctx.t_creation = Some(t),
                Ok(Some(Segment::TSample(t))) => {
                    child_ctx.t_sample = Some(t);
                    child_ctx.config_dir = Some(path.clone());
                }
                Ok(Some(Segment::Field(field))) => match ctx.configuration() {
                    Some((configuration, config_dir)) => {
                        debug!("Found run {} / {}", configuration, field);
                        found.runs.push(RunDir {
                            configuration,
                            field,
                            path: path.clone(),
                            config_dir,
                        });
                    }
                    None => {
                        warn!(
                            "Skipping {}: field directory outside a complete configuration",
                            path.display()
                        );
                        found.skipped.push(SkippedFile {
                            path: path.clone(),
                            reason: "field directory outside a complete configuration"
                                .to_string(),
                        });
                        continue;
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    warn!("Skipping subtree {}: {}", path.display(), e);
                    found.skipped.push(SkippedFile {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            }

            found.extend(self.walk_dir(&path, &child_ctx));
        }

        found
    }
}

/// List the regular files directly inside a run directory, sorted by name.
pub fn series_files(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!("Cannot read entry in {}: {}", dir.display(), e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// How a file name matched a quantity.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
enum MatchRank {
    Exact,
    Tagged(f64),
}

fn match_rank(file_name: &str, spec: &QuantitySpec) -> Option<MatchRank> {
    let stem = file_name.strip_suffix(spec.suffix.as_str())?;
    let rest = stem.strip_prefix(spec.prefix.as_str())?;
    if rest.is_empty() {
        return Some(MatchRank::Exact);
    }
    rest.parse::<f64>()
        .ok()
        .filter(|tag| tag.is_finite())
        .map(MatchRank::Tagged)
}

/// Pick the file holding `spec` among `files`.
///
/// The stem must equal the prefix, or be the prefix followed by a finite
/// numeric tag. An exact stem wins over tagged ones; among tagged files the
/// smallest tag (earliest waiting time) wins.
pub fn find_quantity_file<'a>(files: &'a [PathBuf], spec: &QuantitySpec) -> Option<&'a PathBuf> {
    files
        .iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?;
            match_rank(name, spec).map(|rank| (rank, path))
        })
        .min_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(_, path)| path)
}
