//! Configuration.
//!
//! Configuration is read from a YAML file (by convention, `config.yaml`).
//! Every key is optional and unrecognized keys are ignored.
//!
//! ```yaml
//! archive_url: https://www.encodeproject.org
//! timeout_secs: 60
//! file_format: bigWig
//! output_types: fold change over control,signal p-value
//! giggle_bin: ~/bin/giggle
//! bgzip_bin: bgzip
//! giggle_index_dir: ~/giggle/index
//! chromosome_sizes: ~/ref/hg38.chrom.sizes
//! chromosome: chr1
//! ```

use std::fs::File;
use std::io;
use std::io::Read;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// The default archive to query.
pub const DEFAULT_ARCHIVE_URL: &str = "https://www.encodeproject.org";

/// The default user agent.
pub const DEFAULT_USER_AGENT: &str = concat!("encodelite/", env!("CARGO_PKG_VERSION"));

/// The default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// An error related to reading configuration.
#[derive(Debug)]
pub enum Error {
    /// An I/O error.
    Io(io::Error),

    /// The configuration could not be parsed.
    Parse(serde_yaml::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "i/o error: {err}"),
            Error::Parse(err) => write!(f, "parse error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

/// A [`Result`](std::result::Result) with an [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct Config {
    /// The base URL of the archive.
    archive_url: String,

    /// The user agent sent with every request.
    user_agent: String,

    /// The request timeout in seconds.
    timeout_secs: u64,

    /// The file format used to filter searches.
    file_format: Option<String>,

    /// A comma-delimited list of output types used to filter searches.
    output_types: Option<String>,

    /// The interval search executable.
    giggle_bin: String,

    /// The `bgzip` executable.
    bgzip_bin: String,

    /// The directory containing the interval index.
    giggle_index_dir: String,

    /// A file of chromosome sizes.
    chromosome_sizes: Option<String>,

    /// The chromosome that uploaded queries are trimmed to.
    chromosome: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            archive_url: String::from(DEFAULT_ARCHIVE_URL),
            user_agent: String::from(DEFAULT_USER_AGENT),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            file_format: None,
            output_types: None,
            giggle_bin: String::from("giggle"),
            bgzip_bin: String::from("bgzip"),
            giggle_index_dir: String::from("index"),
            chromosome_sizes: None,
            chromosome: None,
        }
    }
}

/// Expands a leading `~` within a path.
fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).as_ref())
}

impl Config {
    /// Reads configuration from a YAML file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(Error::Io)?;
        Self::from_reader(file)
    }

    /// Reads configuration from a YAML stream.
    ///
    /// An empty document yields the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use encodelite::config::Config;
    ///
    /// let config = Config::from_reader(&b"timeout_secs: 5\nchromosome: chr1\n"[..])?;
    /// assert_eq!(config.timeout().as_secs(), 5);
    /// assert_eq!(config.chromosome(), Some("chr1"));
    /// assert_eq!(config.giggle_bin().to_str(), Some("giggle"));
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_reader<R>(mut reader: R) -> Result<Self>
    where
        R: Read,
    {
        let mut contents = String::new();
        reader.read_to_string(&mut contents).map_err(Error::Io)?;

        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&contents).map_err(Error::Parse)
    }

    /// Gets the base URL of the archive (without a trailing slash).
    pub fn archive_url(&self) -> &str {
        self.archive_url.trim_end_matches('/')
    }

    /// Gets the user agent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Gets the request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Gets the file format used to filter searches.
    pub fn file_format(&self) -> Option<&str> {
        self.file_format.as_deref()
    }

    /// Gets the output types used to filter searches.
    pub fn output_types(&self) -> Vec<&str> {
        self.output_types
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Gets the interval search executable.
    pub fn giggle_bin(&self) -> PathBuf {
        expand(&self.giggle_bin)
    }

    /// Gets the `bgzip` executable.
    pub fn bgzip_bin(&self) -> PathBuf {
        expand(&self.bgzip_bin)
    }

    /// Gets the interval index directory.
    pub fn giggle_index_dir(&self) -> PathBuf {
        expand(&self.giggle_index_dir)
    }

    /// Gets the chromosome sizes file.
    pub fn chromosome_sizes(&self) -> Option<PathBuf> {
        self.chromosome_sizes
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(expand)
    }

    /// Gets the chromosome that queries are trimmed to.
    ///
    /// An empty chromosome is treated as no chromosome.
    pub fn chromosome(&self) -> Option<&str> {
        self.chromosome.as_deref().filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn test_defaults() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let config = Config::from_reader(&b""[..])?;

        assert_eq!(config, Config::default());
        assert_eq!(config.archive_url(), DEFAULT_ARCHIVE_URL);
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.giggle_index_dir(), PathBuf::from("index"));
        assert_eq!(config.chromosome_sizes(), None);
        assert_eq!(config.chromosome(), None);
        assert!(config.output_types().is_empty());

        Ok(())
    }

    #[test]
    fn test_values() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "archive_url: https://example.org/")?;
        writeln!(file, "file_format: bigWig")?;
        writeln!(file, "output_types: fold change over control, ,signal p-value")?;
        writeln!(file, "chromosome: \"\"")?;
        writeln!(file, "chromosome_sizes: /ref/hg38.chrom.sizes")?;

        let config = Config::from_path(file.path())?;

        assert_eq!(config.archive_url(), "https://example.org");
        assert_eq!(config.file_format(), Some("bigWig"));
        assert_eq!(
            config.output_types(),
            vec!["fold change over control", "signal p-value"]
        );
        assert_eq!(config.chromosome(), None);
        assert_eq!(
            config.chromosome_sizes(),
            Some(PathBuf::from("/ref/hg38.chrom.sizes"))
        );

        Ok(())
    }

    #[test]
    fn test_unrecognized_keys() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let config = Config::from_reader(
            &b"metadata_tsv: metadata.tsv\nmetadata_db: metadata.db\ntimeout_secs: 5\n"[..],
        )?;

        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.giggle_bin(), PathBuf::from("giggle"));

        Ok(())
    }

    #[test]
    fn test_tilde_expansion() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let config = Config::from_reader(&b"giggle_bin: ~/bin/giggle\n"[..])?;
        let path = config.giggle_bin();

        assert!(path.ends_with("bin/giggle"));
        if std::env::var_os("HOME").is_some() {
            assert!(!path.starts_with("~"));
        }

        Ok(())
    }

    #[test]
    fn test_invalid() {
        let err = Config::from_reader(&b"timeout_secs: [1, 2]\n"[..]).unwrap_err();
        assert!(err.to_string().starts_with("parse error: "));

        let err = Config::from_path("/this/path/does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
