/// Font matching: resolve a family name plus weight and slant to a font
/// file. The directory matcher indexes font files by their file names,
/// `Family-Style.ttf`, which is how most font packages name them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub trait FontMatcher {
    fn match_description(&self, family: &str, size: f32, bold: bool, italic: bool)
        -> Option<PathBuf>;
}

/// Never matches; descriptions must then be literal paths.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMatcher;

impl FontMatcher for NoMatcher {
    fn match_description(&self, _: &str, _: f32, _: bool, _: bool) -> Option<PathBuf> {
        None
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    path: PathBuf,
    family: String,
    bold: bool,
    italic: bool,
}

#[derive(Debug, Clone)]
pub struct DirectoryMatcher {
    directories: Vec<PathBuf>,
    aliases: HashMap<String, String>,
    entries: Vec<Entry>,
}

/// Lowercase with spaces, dashes and underscores removed.
fn normalize(family: &str) -> String {
    family
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_font_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf" | "ttc"))
        .unwrap_or(false)
}

fn parse_entry(path: &Path) -> Option<Entry> {
    let stem = path.file_stem()?.to_str()?;
    let (family, style) = match stem.rsplit_once('-') {
        Some((family, style)) => (family, style.to_ascii_lowercase()),
        None => (stem, String::new()),
    };
    Some(Entry {
        path: path.to_path_buf(),
        family: normalize(family),
        bold: style.contains("bold"),
        italic: style.contains("italic") || style.contains("oblique"),
    })
}

/// Walk `dir` recursively. Symlinked directories are followed, each real
/// directory at most once.
fn scan(dir: &Path, visited: &mut HashSet<PathBuf>, out: &mut Vec<Entry>) {
    let Ok(real) = std::fs::canonicalize(dir) else {
        return;
    };
    if !visited.insert(real) {
        return;
    }
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read.flatten() {
        let path = entry.path();
        if path.is_dir() {
            scan(&path, visited, out);
        } else if is_font_file(&path) {
            if let Some(e) = parse_entry(&path) {
                out.push(e);
            }
        }
    }
}

pub fn default_directories() -> Vec<PathBuf> {
    let mut dirs = vec![
        PathBuf::from("/usr/share/fonts"),
        PathBuf::from("/usr/local/share/fonts"),
        PathBuf::from("/System/Library/Fonts"),
        PathBuf::from("/Library/Fonts"),
    ];
    if let Ok(home) = std::env::var("HOME") {
        let home = PathBuf::from(home);
        dirs.push(home.join(".local/share/fonts"));
        dirs.push(home.join(".fonts"));
    }
    dirs
}

pub fn default_aliases() -> HashMap<String, String> {
    [
        ("monospace", "DejaVu Sans Mono"),
        ("sans", "DejaVu Sans"),
        ("sans-serif", "DejaVu Sans"),
        ("serif", "DejaVu Serif"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl DirectoryMatcher {
    /// Index every font file under `directories`.
    pub fn new(directories: Vec<PathBuf>, aliases: HashMap<String, String>) -> Self {
        let mut matcher = Self { directories, aliases, entries: Vec::new() };
        matcher.refresh();
        matcher
    }

    /// Rescan the directories.
    pub fn refresh(&mut self) {
        self.entries.clear();
        let mut visited = HashSet::new();
        for dir in &self.directories {
            scan(dir, &mut visited, &mut self.entries);
        }
        self.entries.sort_by(|a, b| a.path.cmp(&b.path));
        log::debug!("indexed {} font files", self.entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FontMatcher for DirectoryMatcher {
    fn match_description(
        &self,
        family: &str,
        _size: f32,
        bold: bool,
        italic: bool,
    ) -> Option<PathBuf> {
        let family = self.aliases.get(family).map(String::as_str).unwrap_or(family);
        let key = normalize(family);
        self.entries
            .iter()
            .filter(|e| e.family == key)
            // max_by_key keeps the last maximum; reversed, earlier paths win ties.
            .rev()
            .max_by_key(|e| 2 * u8::from(e.bold == bold) + u8::from(e.italic == italic))
            .map(|e| e.path.clone())
    }
}
