//! Lookup of installed gems.
//!
//! A gem home holds `specifications/<name>-<version>.gemspec` and the
//! unpacked gem in `gems/<name>-<version>/`. Only the parts of the gemspec the
//! deployer needs are read: runtime dependencies and require paths.

use crate::deploy::{Error, Result, error::ErrorExt};
use regex::Regex;
use std::cmp::Ordering;
use std::path::PathBuf;

/// An installed gem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GemSpec {
    pub name: String,
    pub version: GemVersion,
    /// Runtime dependency names, in declaration order.
    pub dependencies: Vec<String>,
    /// Load path directories relative to `dir`.
    pub require_paths: Vec<String>,
    /// Install directory.
    pub dir: PathBuf,
}

impl GemSpec {
    /// Absolute require path directories.
    pub fn require_dirs(&self) -> Vec<PathBuf> {
        self.require_paths.iter().map(|p| self.dir.join(p)).collect()
    }
}

/// Finds the spec of an installed gem by name.
pub trait GemIndex {
    /// The most recent installed version of `name`.
    fn find(&self, name: &str) -> Result<GemSpec>;
}

/// Gems installed in a gem home on disk.
#[derive(Debug, Clone)]
pub struct InstalledGems {
    home: PathBuf,
}

impl InstalledGems {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    fn not_found(&self, name: &str) -> Error {
        Error::Resolution {
            name: name.to_string(),
            reason: format!("not installed in {}", self.home.display()),
        }
    }
}

impl GemIndex for InstalledGems {
    fn find(&self, name: &str) -> Result<GemSpec> {
        let spec_dir = self.home.join("specifications");
        let entries = match std::fs::read_dir(&spec_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(self.not_found(name));
            }
            Err(e) => return Err(e).fs_context("failed to read gem specifications", &spec_dir),
        };

        let mut best: Option<(GemVersion, String, PathBuf)> = None;
        for entry in entries {
            let entry = entry.fs_context("failed to read gem specifications", &spec_dir)?;
            let path = entry.path();
            if !path.extension().is_some_and(|e| e == "gemspec") {
                continue;
            }
            let Some(full_name) = path.file_stem().map(|s| s.to_string_lossy().into_owned())
            else {
                continue;
            };
            let Some((gem, version)) = split_full_name(&full_name) else {
                continue;
            };
            if gem != name {
                continue;
            }
            let version = GemVersion::parse(version);
            // equal versions such as 1.0 and 1.0.0 are ordered by their raw text
            let better = best.as_ref().is_none_or(|(v, _, _)| {
                version.cmp(v).then_with(|| version.as_str().cmp(v.as_str())) == Ordering::Greater
            });
            if better {
                best = Some((version, full_name.clone(), path));
            }
        }

        let (version, full_name, spec_path) = best.ok_or_else(|| self.not_found(name))?;
        let contents = std::fs::read_to_string(&spec_path)
            .fs_context("failed to read gemspec", &spec_path)?;

        log::debug!("Resolved gem {} to {}", name, full_name);
        Ok(GemSpec {
            name: name.to_string(),
            version,
            dependencies: runtime_dependencies(&contents)?,
            require_paths: require_paths(&contents)?,
            dir: self.home.join("gems").join(&full_name),
        })
    }
}

/// Splits `rack-1.2.1` (or `nokogiri-1.4.4-universal-darwin`) into name and version.
fn split_full_name(full_name: &str) -> Option<(&str, &str)> {
    full_name
        .match_indices('-')
        .map(|(i, _)| i)
        .find(|&i| {
            full_name[i + 1..]
                .chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit())
        })
        .map(|i| (&full_name[..i], &full_name[i + 1..]))
}

/// Names passed to `add_runtime_dependency` / `add_dependency`, without repeats.
fn runtime_dependencies(gemspec: &str) -> Result<Vec<String>> {
    let re = Regex::new(
        r#"\.add_(?:runtime_)?dependency\s*\(?\s*(?:%q<([^>]+)>|["']([^"']+)["'])"#,
    )?;
    let mut deps: Vec<String> = Vec::new();
    for caps in re.captures_iter(gemspec) {
        if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
            let name = name.as_str().trim().to_string();
            if !deps.contains(&name) {
                deps.push(name);
            }
        }
    }
    Ok(deps)
}

/// Entries of `require_paths = [...]`; `["lib"]` when absent.
fn require_paths(gemspec: &str) -> Result<Vec<String>> {
    let list = Regex::new(r"\.require_paths\s*=\s*\[([^\]]*)\]")?;
    let item = Regex::new(r#"["']([^"']+)["']"#)?;
    let paths: Vec<String> = list
        .captures(gemspec)
        .and_then(|caps| caps.get(1))
        .map(|m| {
            item.captures_iter(m.as_str())
                .filter_map(|c| c.get(1).map(|p| p.as_str().to_string()))
                .collect()
        })
        .unwrap_or_default();
    if paths.is_empty() {
        Ok(vec!["lib".to_string()])
    } else {
        Ok(paths)
    }
}

/// A gem version, compared segment by segment like rubygems does.
///
/// Numeric segments compare numerically; a textual segment (`pre`, `rc1`)
/// sorts before any number, so `1.0.pre` < `1.0`. Trailing zeros are ignored.
#[derive(Clone, Debug)]
pub struct GemVersion {
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Segment {
    Text(String),
    Number(u64),
}

impl GemVersion {
    pub fn parse(raw: &str) -> Self {
        // platform suffix (`1.4.4-universal-darwin`) does not take part in ordering
        let version = raw.split('-').next().unwrap_or(raw);
        let mut segments = Vec::new();
        for part in version.split('.') {
            segments.extend(split_segment(part));
        }
        while segments.last() == Some(&Segment::Number(0)) {
            segments.pop();
        }
        Self {
            raw: raw.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// `rc1` -> [Text("rc"), Number(1)], `12` -> [Number(12)].
fn split_segment(part: &str) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut digits = false;
    for c in part.chars() {
        if !current.is_empty() && c.is_ascii_digit() != digits {
            out.push(make_segment(&current, digits));
            current.clear();
        }
        digits = c.is_ascii_digit();
        current.push(c);
    }
    if !current.is_empty() {
        out.push(make_segment(&current, digits));
    }
    out
}

fn make_segment(s: &str, digits: bool) -> Segment {
    if digits {
        s.parse().map(Segment::Number).unwrap_or(Segment::Text(s.to_string()))
    } else {
        Segment::Text(s.to_string())
    }
}

impl PartialEq for GemVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GemVersion {}

impl PartialOrd for GemVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GemVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.segments.len().max(other.segments.len());
        for i in 0..len {
            let zero = Segment::Number(0);
            let a = self.segments.get(i).unwrap_or(&zero);
            let b = other.segments.get(i).unwrap_or(&zero);
            match a.cmp(b) {
                Ordering::Equal => continue,
                ord => return ord,
            }
        }
        Ordering::Equal
    }
}

impl std::fmt::Display for GemVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
