// Tabular sources inside a symbol directory and the first-match locator.
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Component, Path, PathBuf};

use zip::ZipArchive;

use super::csv_parser::{read_headers, TimeSeriesTable};
use crate::error::{EngineError, NotFoundReason, Outcome};

/// A file in a symbol directory that can yield tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabularSource {
    /// A `.csv` file; its only candidate is itself.
    PlainFile(PathBuf),
    /// A `.zip` archive; candidates are its `.csv` entries.
    Archive(PathBuf),
}

/// A table together with a description of where it came from.
#[derive(Debug, Clone)]
pub struct LocatedTable {
    pub table: TimeSeriesTable,
    pub origin: String,
}

fn has_extension(name: &str, ext: &str) -> bool {
    name.to_lowercase().ends_with(ext)
}

fn open_archive(path: &Path) -> Result<ZipArchive<BufReader<File>>, EngineError> {
    let file = File::open(path)?;
    Ok(ZipArchive::new(BufReader::new(file))?)
}

impl TabularSource {
    pub fn from_path(path: PathBuf) -> Option<Self> {
        let name = path.file_name()?.to_str()?;
        if has_extension(name, ".csv") {
            Some(TabularSource::PlainFile(path))
        } else if has_extension(name, ".zip") {
            Some(TabularSource::Archive(path))
        } else {
            None
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            TabularSource::PlainFile(path) | TabularSource::Archive(path) => path,
        }
    }

    pub fn file_name(&self) -> String {
        self.path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, TabularSource::Archive(_))
    }

    /// Names that can be passed to [`headers`](Self::headers) and [`open`](Self::open),
    /// in archive listing order.
    ///
    /// Entries are listed without being decompressed, so an entry that cannot be
    /// read only fails once it is probed.
    pub fn list_candidates(&self) -> Result<Vec<String>, EngineError> {
        match self {
            TabularSource::PlainFile(_) => Ok(vec![self.file_name()]),
            TabularSource::Archive(path) => {
                let mut archive = open_archive(path)?;
                let mut names = Vec::new();
                for idx in 0..archive.len() {
                    let entry = archive.by_index_raw(idx)?;
                    if entry.is_file() && has_extension(entry.name(), ".csv") {
                        names.push(entry.name().to_string());
                    }
                }
                Ok(names)
            }
        }
    }

    pub fn headers(&self, candidate: &str) -> Result<Vec<String>, EngineError> {
        match self {
            TabularSource::PlainFile(path) => read_headers(BufReader::new(File::open(path)?)),
            TabularSource::Archive(path) => {
                let mut archive = open_archive(path)?;
                let entry = archive.by_name(candidate)?;
                read_headers(entry)
            }
        }
    }

    pub fn open(&self, candidate: &str) -> Result<TimeSeriesTable, EngineError> {
        match self {
            TabularSource::PlainFile(path) => TimeSeriesTable::from_path(path),
            TabularSource::Archive(path) => {
                let mut archive = open_archive(path)?;
                let entry = archive.by_name(candidate)?;
                TimeSeriesTable::from_reader(entry)
            }
        }
    }

    fn origin(&self, candidate: &str) -> String {
        match self {
            TabularSource::PlainFile(_) => self.file_name(),
            TabularSource::Archive(_) => format!("{}:{}", self.file_name(), candidate),
        }
    }
}

/// Case-insensitive pattern test; a suffix match is a special case of containment.
pub fn matches_pattern(file_name: &str, pattern: &str) -> bool {
    file_name.to_lowercase().contains(&pattern.to_lowercase())
}

/// Directory of `symbol` under `data_dir`, if the symbol names an existing directory.
pub fn symbol_dir(data_dir: &Path, symbol: &str) -> Option<PathBuf> {
    let mut components = Path::new(symbol).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return None,
    }
    let dir = data_dir.join(symbol);
    dir.is_dir().then_some(dir)
}

/// Every tabular source in `dir`, sorted by file name.
pub fn discover_sources(dir: &Path) -> Result<Vec<TabularSource>, EngineError> {
    let mut sources = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(source) = TabularSource::from_path(entry.path()) {
            sources.push(source);
        }
    }
    sources.sort_by_key(|source| source.file_name());
    Ok(sources)
}

/// Opens the first candidate whose headers satisfy `accept`.
///
/// Only headers are read while probing; a candidate is parsed in full once it
/// is accepted. Unreadable files and archive entries are logged and skipped.
pub fn first_match<F>(sources: &[TabularSource], accept: F) -> Option<LocatedTable>
where
    F: Fn(&[String]) -> bool,
{
    for source in sources {
        let candidates = match source.list_candidates() {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(file = %source.file_name(), error = %e, "Skipping unreadable source");
                continue;
            }
        };
        for candidate in candidates {
            let origin = source.origin(&candidate);
            let headers = match source.headers(&candidate) {
                Ok(headers) => headers,
                Err(e) => {
                    tracing::warn!(origin = %origin, error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !accept(&headers) {
                tracing::debug!(origin = %origin, "Candidate rejected");
                continue;
            }
            match source.open(&candidate) {
                Ok(table) => return Some(LocatedTable { table, origin }),
                Err(e) => {
                    tracing::warn!(origin = %origin, error = %e, "Failed to parse accepted entry");
                }
            }
        }
    }
    None
}

/// Finds the first file matching `pattern` (plain or archive) that has a `feature` column.
pub fn locate(
    data_dir: &Path,
    symbol: &str,
    feature: &str,
    pattern: &str,
) -> Result<Outcome<LocatedTable>, EngineError> {
    let Some(dir) = symbol_dir(data_dir, symbol) else {
        tracing::warn!(symbol = %symbol, data_dir = %data_dir.display(), "Symbol directory not found");
        return Ok(Outcome::NotFound(NotFoundReason::SymbolMissing { symbol: symbol.to_string() }));
    };

    let sources: Vec<TabularSource> = discover_sources(&dir)?
        .into_iter()
        .filter(|source| matches_pattern(&source.file_name(), pattern))
        .collect();
    if sources.is_empty() {
        tracing::warn!(symbol = %symbol, pattern = %pattern, "No files match pattern");
        return Ok(Outcome::NotFound(NotFoundReason::NoMatchingFile { pattern: pattern.to_string() }));
    }

    match first_match(&sources, |headers| headers.iter().any(|h| h == feature)) {
        Some(located) => {
            tracing::info!(symbol = %symbol, feature = %feature, origin = %located.origin, "Found feature");
            Ok(Outcome::Data(located))
        }
        None => {
            tracing::warn!(symbol = %symbol, feature = %feature, pattern = %pattern, "Feature not found in matching files");
            Ok(Outcome::NotFound(NotFoundReason::ColumnMissing { feature: feature.to_string() }))
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};

    use zip::write::FileOptions;
    use zip::{CompressionMethod, ZipWriter};

    pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_zip(dir: &Path, name: &str, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join(name);
        let mut zip = ZipWriter::new(fs::File::create(&path).unwrap());
        let options = FileOptions::default().compression_method(CompressionMethod::Stored);
        for (entry, content) in entries {
            zip.start_file(*entry, options).unwrap();
            zip.write_all(content).unwrap();
        }
        zip.finish().unwrap();
        path
    }

    /// Rewrites the bytes of an already written file in place.
    pub fn edit_bytes(path: &Path, edit: impl FnOnce(&mut Vec<u8>)) {
        let mut bytes = fs::read(path).unwrap();
        edit(&mut bytes);
        fs::write(path, bytes).unwrap();
    }

    pub fn find(bytes: &[u8], needle: &[u8]) -> usize {
        bytes.windows(needle.len()).position(|w| w == needle).unwrap()
    }
}
