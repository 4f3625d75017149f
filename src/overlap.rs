//! Region-overlap queries against a precomputed interval index.
//!
//! The overlap search itself is carried out by an external executable
//! (`giggle`). This module handles everything around it:
//!
//! * determining the genome size from a chromosome sizes file,
//! * normalizing an uploaded BED file (decompressing it and trimming it to
//!   the configured chromosome),
//! * compressing the query with `bgzip`,
//! * invoking the search with a fixed command line, and
//! * parsing the tab-delimited output into a [`Table`].

use std::ffi::OsString;
use std::fs::File;
use std::io;
use std::io::BufRead;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::sync::LazyLock;

use flate2::read::MultiGzDecoder;
use regex::Regex;
use serde::Serialize;
use tracing::debug;
use tracing::info;

use crate::config::Config;

/// The gzip magic bytes.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// The file name used when an upload has no usable name.
pub const DEFAULT_QUERY_NAME: &str = "query.bed";

/// Cells that look like file paths or BED file names.
static PATH_LIKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)[\\/]|\.bed(\.gz)?$").unwrap());

/// An error related to an overlap search.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// No chromosome sizes file was configured.
    MissingChromosomeSizes,

    /// The requested chromosome was not found within the chromosome sizes.
    ChromosomeNotFound(Option<String>),

    /// An external command could not be run or exited unsuccessfully.
    Command {
        /// The program that was run.
        program: String,

        /// The reason for the failure.
        reason: String,
    },

    /// An external command did not produce its expected output file.
    MissingOutput(PathBuf),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::MissingChromosomeSizes => {
                write!(f, "no chromosome sizes file was configured")
            }
            Error::ChromosomeNotFound(Some(chromosome)) => {
                write!(f, "chromosome `{chromosome}` not found in chromosome sizes")
            }
            Error::ChromosomeNotFound(None) => write!(f, "chromosome sizes are empty"),
            Error::Command { program, reason } => write!(f, "`{program}` failed: {reason}"),
            Error::MissingOutput(path) => {
                write!(f, "expected output not created: {}", path.display())
            }
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Reads the size of the genome (or a single chromosome) from a chromosome
/// sizes file.
///
/// Each non-blank line is expected to be a chromosome name followed by its
/// size. Without a chromosome, the size on the first non-blank line is used.
/// With a chromosome, the size on the first matching line is used.
///
/// # Examples
///
/// ```
/// use encodelite::overlap;
///
/// let data = b"\nchr1\t248956422\nchr2\t242193529\n";
///
/// assert_eq!(overlap::genome_size(&data[..], Some("chr2"))?, 242193529);
/// assert_eq!(overlap::genome_size(&data[..], None)?, 248956422);
/// assert!(overlap::genome_size(&data[..], Some("chrZ")).is_err());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn genome_size<R>(reader: R, chromosome: Option<&str>) -> Result<u64>
where
    R: BufRead,
{
    let not_found = || Error::ChromosomeNotFound(chromosome.map(String::from));

    for line in reader.lines() {
        let line = line.map_err(Error::Io)?;
        let mut parts = line.split_whitespace();

        let name = match parts.next() {
            Some(name) => name,
            None => continue,
        };

        if chromosome.is_none() || chromosome == Some(name) {
            return match parts.next().and_then(|size| size.parse::<u64>().ok()) {
                Some(size) if size > 0 => Ok(size),
                _ => Err(not_found()),
            };
        }
    }

    Err(not_found())
}

/// Sanitizes an uploaded file name.
///
/// Only alphanumerics, `-`, `_`, `.`, and spaces are kept.
pub fn safe_filename(name: &str) -> String {
    let safe = name
        .trim()
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ' '))
        .collect::<String>();

    match safe.is_empty() {
        true => String::from(DEFAULT_QUERY_NAME),
        false => safe,
    }
}

/// Normalizes a BED stream, writing the retained lines to `dst`.
///
/// Gzipped input is decompressed transparently. Comment lines (`#`) and blank
/// lines are dropped. If a chromosome is provided, only lines whose first
/// column matches it are kept. Returns the number of lines written.
///
/// # Examples
///
/// ```
/// use encodelite::overlap;
///
/// let data = b"#header\nchr1\t1\t2\nchr2\t3\t4\n\nchr1\t5\t6\n";
/// let mut out = Vec::new();
///
/// let n = overlap::normalize(&data[..], &mut out, Some("chr1"))?;
///
/// assert_eq!(n, 2);
/// assert_eq!(out, b"chr1\t1\t2\nchr1\t5\t6\n");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn normalize<R, W>(src: R, dst: W, chromosome: Option<&str>) -> Result<usize>
where
    R: Read,
    W: Write,
{
    let mut src = BufReader::new(src);
    let compressed = src.fill_buf().map_err(Error::Io)?.starts_with(&GZIP_MAGIC);

    match compressed {
        true => retain(BufReader::new(MultiGzDecoder::new(src)), dst, chromosome),
        false => retain(src, dst, chromosome),
    }
}

/// Writes the retained lines of an uncompressed BED stream to `dst`.
fn retain<R, W>(src: R, mut dst: W, chromosome: Option<&str>) -> Result<usize>
where
    R: BufRead,
    W: Write,
{
    let mut written = 0;

    for line in src.split(b'\n') {
        let line = line.map_err(Error::Io)?;
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches('\r');

        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(chromosome) = chromosome {
            if line.split('\t').next() != Some(chromosome) {
                continue;
            }
        }

        writeln!(dst, "{line}").map_err(Error::Io)?;
        written += 1;
    }

    dst.flush().map_err(Error::Io)?;
    Ok(written)
}

/// Runs a command to completion, returning its standard output.
fn run(mut command: Command) -> Result<String> {
    let program = command.get_program().to_string_lossy().into_owned();
    debug!("running: {command:?}");

    let output = command.output().map_err(|err| Error::Command {
        program: program.clone(),
        reason: err.to_string(),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let reason = match stderr.is_empty() {
            true => format!("exited with {}", output.status),
            false => stderr,
        };

        return Err(Error::Command { program, reason });
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Compresses a file in place with `bgzip`, returning the compressed path.
///
/// The program runs in the current directory, so a relative `path` is
/// resolved exactly once.
pub fn bgzip(program: &Path, path: &Path) -> Result<PathBuf> {
    let mut command = Command::new(program);
    command.arg("-f").arg(path);
    run(command)?;

    let mut compressed = path.as_os_str().to_owned();
    compressed.push(".gz");
    let compressed = PathBuf::from(compressed);

    match compressed.exists() {
        true => Ok(compressed),
        false => Err(Error::MissingOutput(compressed)),
    }
}

/// The fixed invocation of the interval search executable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SearchCommand {
    /// The executable.
    program: PathBuf,

    /// The index directory.
    index_dir: PathBuf,

    /// The compressed query.
    query: PathBuf,

    /// The genome size.
    genome_size: u64,
}

impl SearchCommand {
    /// Creates a new search command.
    pub fn new(
        program: impl Into<PathBuf>,
        index_dir: impl Into<PathBuf>,
        query: impl Into<PathBuf>,
        genome_size: u64,
    ) -> Self {
        Self {
            program: program.into(),
            index_dir: index_dir.into(),
            query: query.into(),
            genome_size,
        }
    }

    /// Gets the arguments passed to the executable.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::overlap::SearchCommand;
    ///
    /// let command = SearchCommand::new("giggle", "index", "q.bed.gz", 100);
    /// assert_eq!(
    ///     command.args(),
    ///     ["search", "-i", "index", "-q", "q.bed.gz", "-s", "-g", "100"]
    /// );
    /// ```
    pub fn args(&self) -> Vec<OsString> {
        vec![
            OsString::from("search"),
            OsString::from("-i"),
            self.index_dir.clone().into_os_string(),
            OsString::from("-q"),
            self.query.clone().into_os_string(),
            OsString::from("-s"),
            OsString::from("-g"),
            OsString::from(self.genome_size.to_string()),
        ]
    }

    /// Runs the search, returning its raw output.
    pub fn run(&self) -> Result<String> {
        let mut command = Command::new(&self.program);
        command.args(self.args());

        info!(
            "overlap: searching {} against {}",
            self.query.display(),
            self.index_dir.display()
        );

        run(command)
    }
}

/// Shortens a cell that looks like a file path to its bare name.
///
/// `/path/ENCFF000CCX.bed.gz` becomes `ENCFF000CCX`. Cells that don't look
/// like paths are returned unchanged.
///
/// # Examples
///
/// ```
/// use encodelite::overlap;
///
/// assert_eq!(overlap::shorten_filename_token("/data/ENCFF000CCX.bed.gz"), "ENCFF000CCX");
/// assert_eq!(overlap::shorten_filename_token("12.5"), "12.5");
/// ```
pub fn shorten_filename_token(cell: &str) -> String {
    if !PATH_LIKE.is_match(cell) {
        return cell.to_string();
    }

    let base = cell.rsplit(['/', '\\']).next().unwrap_or(cell);
    let lower = base.to_lowercase();

    let base = [".bed.gz", ".bed", ".bgz", ".gz"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| &base[..base.len() - ext.len()])
        .unwrap_or(base);

    base.split('.').next().unwrap_or(base).to_string()
}

/// Tabular search output.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Table {
    /// The column headers.
    headers: Vec<String>,

    /// The rows.
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Attempts to parse search output into a table.
    ///
    /// If the first non-blank line starts with `#`, it provides the headers.
    /// Otherwise, if every line has the same (non-zero) number of tabs, the
    /// headers are named `col1`, `col2`, and so on. In all other cases (and
    /// for empty output), [`None`] is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::overlap::Table;
    ///
    /// let table = Table::parse("#file\tcount\na.bed.gz\t3\n").unwrap();
    /// assert_eq!(table.headers(), ["file", "count"]);
    /// assert_eq!(table.rows()[0], ["a.bed.gz", "3"]);
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let lines = text
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>();

        let (first, rest) = lines.split_first()?;
        let split = |line: &&str| line.split('\t').map(String::from).collect::<Vec<_>>();

        if let Some(header) = first.strip_prefix('#') {
            return Some(Self {
                headers: header.trim().split('\t').map(String::from).collect(),
                rows: rest.iter().map(split).collect(),
            });
        }

        let tabs = first.matches('\t').count();
        if tabs == 0 || lines.iter().any(|line| line.matches('\t').count() != tabs) {
            return None;
        }

        Some(Self {
            headers: (1..=tabs + 1).map(|i| format!("col{i}")).collect(),
            rows: lines.iter().map(split).collect(),
        })
    }

    /// Gets the headers.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Gets the rows.
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Shortens every cell that looks like a file path (see
    /// [`shorten_filename_token()`]).
    pub fn shorten_filenames(mut self) -> Self {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                *cell = shorten_filename_token(cell);
            }
        }

        self
    }
}

/// Details about how a search was run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Meta {
    /// The index directory.
    pub index_dir: PathBuf,

    /// The search executable.
    pub giggle_bin: PathBuf,

    /// The genome size passed to the search.
    pub genome_len: u64,
}

/// The outcome of a search.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Outcome {
    /// Details about how the search was run.
    pub meta: Meta,

    /// The parsed results (if the output was tabular).
    pub table: Option<Table>,

    /// The raw output (if the output was not tabular).
    pub raw_output: Option<String>,
}

/// Runs a complete overlap search for an uploaded BED file.
///
/// All intermediate files are written within `work_dir`.
pub fn search(config: &Config, upload: &Path, work_dir: &Path) -> Result<Outcome> {
    let sizes = config
        .chromosome_sizes()
        .ok_or(Error::MissingChromosomeSizes)?;
    let sizes = File::open(sizes).map(BufReader::new).map_err(Error::Io)?;
    let genome_len = genome_size(sizes, config.chromosome())?;

    let name = upload
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = safe_filename(&name);
    let stem = name
        .strip_suffix(".gz")
        .unwrap_or(&name)
        .trim_end_matches(".bed");
    let trimmed = work_dir.join(format!("{stem}.chrtrim.bed"));

    let src = File::open(upload).map_err(Error::Io)?;
    let dst = File::create(&trimmed).map(BufWriter::new).map_err(Error::Io)?;
    let kept = normalize(src, dst, config.chromosome())?;
    info!("overlap: kept {kept} query intervals");

    let query = bgzip(&config.bgzip_bin(), &trimmed)?;
    let command = SearchCommand::new(
        config.giggle_bin(),
        config.giggle_index_dir(),
        query,
        genome_len,
    );
    let output = command.run()?;

    let meta = Meta {
        index_dir: config.giggle_index_dir(),
        giggle_bin: config.giggle_bin(),
        genome_len,
    };

    Ok(match Table::parse(&output) {
        Some(table) if !table.rows().is_empty() => Outcome {
            meta,
            table: Some(table.shorten_filenames()),
            raw_output: None,
        },
        _ => Outcome {
            meta,
            table: None,
            raw_output: Some(output),
        },
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use flate2::write::GzEncoder;
    use flate2::Compression;

    use super::*;

    #[test]
    fn test_genome_size() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let data = b"chr1 100\nchr2\t200\nchrX\tnotanumber\nchrY\n";

        assert_eq!(genome_size(&data[..], None)?, 100);
        assert_eq!(genome_size(&data[..], Some("chr2"))?, 200);

        let err = genome_size(&data[..], Some("chrX")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "chromosome `chrX` not found in chromosome sizes"
        );
        assert!(genome_size(&data[..], Some("chrY")).is_err());
        assert!(matches!(
            genome_size(&b"\n\n"[..], None),
            Err(Error::ChromosomeNotFound(None))
        ));

        Ok(())
    }

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("my query.bed"), "my query.bed");
        assert_eq!(safe_filename("../../etc/passwd"), "....etcpasswd");
        assert_eq!(safe_filename("  "), DEFAULT_QUERY_NAME);
        assert_eq!(safe_filename("$$$"), DEFAULT_QUERY_NAME);
    }

    #[test]
    fn test_normalize_without_chromosome() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let data = b"# comment\nchr1\t1\t2\r\nchr2\t3\t4";
        let mut out = Vec::new();

        assert_eq!(normalize(&data[..], &mut out, None)?, 2);
        assert_eq!(out, b"chr1\t1\t2\nchr2\t3\t4\n");

        Ok(())
    }

    #[test]
    fn test_normalize_gzipped() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"chr1\t1\t2\nchr10\t3\t4\nchr1\t5\t6\n")?;
        let compressed = encoder.finish()?;

        let mut out = Vec::new();
        assert_eq!(normalize(&compressed[..], &mut out, Some("chr1"))?, 2);
        assert_eq!(out, b"chr1\t1\t2\nchr1\t5\t6\n");

        Ok(())
    }

    #[test]
    fn test_search_command_args() {
        let command = SearchCommand::new("/opt/giggle", "/idx", "/tmp/q.chrtrim.bed.gz", 42);
        let args = command.args();

        assert_eq!(args.len(), 8);
        assert_eq!(args[0], "search");
        assert_eq!(args[2], "/idx");
        assert_eq!(args[4], "/tmp/q.chrtrim.bed.gz");
        assert_eq!(args[7], "42");
    }

    #[test]
    fn test_shorten_filename_token() {
        assert_eq!(shorten_filename_token("/a/b/ENCFF001ABC.bed.gz"), "ENCFF001ABC");
        assert_eq!(shorten_filename_token("C:\\data\\ENCFF001ABC.BED"), "ENCFF001ABC");
        assert_eq!(shorten_filename_token("ENCFF001ABC.bed"), "ENCFF001ABC");
        assert_eq!(shorten_filename_token("dir/name.txt"), "name");
        assert_eq!(shorten_filename_token("dir/archive.tar.bgz"), "archive");
        assert_eq!(shorten_filename_token("ENCFF001ABC.txt"), "ENCFF001ABC.txt");
        assert_eq!(shorten_filename_token("0.05"), "0.05");
    }

    #[test]
    fn test_table_with_header() {
        let table = Table::parse("#file\tsize\toverlaps\n/x/a.bed.gz\t10\t2\n\n/x/b.bed.gz\t5\t0\n")
            .unwrap()
            .shorten_filenames();

        assert_eq!(table.headers(), ["file", "size", "overlaps"]);
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.rows()[0], ["a", "10", "2"]);
        assert_eq!(table.rows()[1], ["b", "5", "0"]);
    }

    #[test]
    fn test_table_with_uniform_tabs() {
        let table = Table::parse("a\t1\nb\t2\n").unwrap();

        assert_eq!(table.headers(), ["col1", "col2"]);
        assert_eq!(table.rows(), [vec!["a", "1"], vec!["b", "2"]]);
    }

    #[test]
    fn test_table_rejects_irregular_output() {
        assert!(Table::parse("").is_none());
        assert!(Table::parse("no tabs here\n").is_none());
        assert!(Table::parse("a\t1\nb\t2\t3\n").is_none());
    }

    #[test]
    fn test_search_requires_chromosome_sizes() -> std::result::Result<(), Box<dyn std::error::Error>>
    {
        let dir = tempfile::tempdir()?;
        let upload = dir.path().join("query.bed");
        std::fs::write(&upload, "chr1\t1\t2\n")?;

        let err = search(&Config::default(), &upload, dir.path()).unwrap_err();
        assert!(matches!(err, Error::MissingChromosomeSizes));

        Ok(())
    }

    #[test]
    fn test_search_with_missing_program() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;

        let sizes = dir.path().join("chrom.sizes");
        std::fs::write(&sizes, "chr1\t1000\n")?;

        let upload = dir.path().join("upload.bed");
        std::fs::write(&upload, "chr1\t1\t2\nchr2\t1\t2\n")?;

        let yaml = format!(
            "chromosome_sizes: {}\nchromosome: chr1\nbgzip_bin: /nonexistent/bgzip\n",
            sizes.display()
        );
        let config = Config::from_reader(yaml.as_bytes())?;

        let err = search(&config, &upload, dir.path()).unwrap_err();
        assert!(matches!(err, Error::Command { .. }));

        let trimmed = std::fs::read_to_string(dir.path().join("upload.chrtrim.bed"))?;
        assert_eq!(trimmed, "chr1\t1\t2\n");

        Ok(())
    }

    #[test]
    fn test_bgzip_relative_path() -> std::result::Result<(), Box<dyn std::error::Error>> {
        // Any `-f`-compatible gzip works here.
        let program = Path::new("gzip");
        if Command::new(program).arg("--version").output().is_err() {
            return Ok(());
        }

        let dir = tempfile::Builder::new().prefix("work").tempdir_in(".")?;
        let work_dir = dir.path().strip_prefix(std::env::current_dir()?).unwrap_or(dir.path());
        assert!(work_dir.is_relative());

        let path = work_dir.join("q.chrtrim.bed");
        std::fs::write(&path, "chr1\t1\t2\n")?;

        let compressed = bgzip(program, &path)?;
        assert_eq!(compressed, work_dir.join("q.chrtrim.bed.gz"));
        assert!(compressed.is_file());
        assert!(!path.exists());

        Ok(())
    }
}
