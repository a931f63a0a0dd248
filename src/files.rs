//! File-valued attributes and their materialization.
//!
//! A row may carry attachments: attribute values backed by bytes living on a
//! local disk or behind a remote URL. Those bytes have to travel with the
//! seed artifacts, so the pipeline copies them into the seed directory's
//! `files/` area and serializes the relative path in place of the raw value.
//!
//! Detection is duck-typed at the value level: anything exposing a current
//! storage location (a string `url` or `path` entry on an object) is treated
//! as an attachment, anything else is a plain value.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::config::FILES_SUBDIR;
use crate::error::{HarvestError, HarvestResult};

/// The storage location currently backing an attachment.
#[derive(Debug, Clone, PartialEq)]
pub enum FileLocation {
	/// A path on the local filesystem.
	Local(PathBuf),

	/// An HTTP(S) URL.
	Remote(String),
}

/// A detected file-valued attribute.
///
/// # Examples
///
/// ```rust
/// use harvest::files::FileAttribute;
/// use serde_json::json;
///
/// let value = json!({"path": "/uploads/avatar.png"});
/// let file = FileAttribute::detect(&value).unwrap();
/// assert_eq!(file.filename(), Some("avatar.png".to_string()));
///
/// assert!(FileAttribute::detect(&json!("just a string")).is_none());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttribute {
	location: FileLocation,
}

impl FileAttribute {
	/// Inspects a value and returns a `FileAttribute` if it exposes the
	/// attachment capability set.
	///
	/// A non-empty `url` entry pointing at an HTTP(S) location wins over a
	/// `path` entry; a non-empty `path` entry marks a locally stored file.
	pub fn detect(value: &Value) -> Option<Self> {
		let object = value.as_object()?;

		if let Some(url) = object.get("url").and_then(Value::as_str)
			&& (url.starts_with("http://") || url.starts_with("https://"))
		{
			return Some(Self {
				location: FileLocation::Remote(url.to_string()),
			});
		}

		if let Some(path) = object.get("path").and_then(Value::as_str)
			&& !path.is_empty()
		{
			return Some(Self {
				location: FileLocation::Local(PathBuf::from(path)),
			});
		}

		None
	}

	/// Returns the location currently backing the attachment.
	pub fn location(&self) -> &FileLocation {
		&self.location
	}

	/// Derives the attachment's base name from its current location.
	///
	/// For local files this is the path's final component; for remote files
	/// the URL's final path segment, with any query string stripped.
	pub fn filename(&self) -> Option<String> {
		match &self.location {
			FileLocation::Local(path) => path
				.file_name()
				.map(|name| name.to_string_lossy().into_owned()),
			FileLocation::Remote(url) => {
				let parsed = Url::parse(url).ok()?;
				let segment = parsed.path_segments()?.next_back()?;
				if segment.is_empty() {
					None
				} else {
					Some(segment.to_string())
				}
			}
		}
	}
}

/// Returns true if the value exposes the attachment capability set.
pub fn is_file_valued(value: &Value) -> bool {
	FileAttribute::detect(value).is_some()
}

/// One materialized attachment.
///
/// The relative path is what projected records carry; it resolves against the
/// seed directory wherever the artifact is replayed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileHandle {
	filename: String,
	relative_path: PathBuf,
	absolute_path: PathBuf,
}

impl FileHandle {
	/// Returns the final (possibly suffixed) filename.
	pub fn filename(&self) -> &str {
		&self.filename
	}

	/// Returns the path relative to the seed directory, e.g. `files/logo.png`.
	pub fn relative_path(&self) -> &Path {
		&self.relative_path
	}

	/// Returns the absolute path the bytes were written to.
	pub fn absolute_path(&self) -> &Path {
		&self.absolute_path
	}
}

/// Copies attachments into a seed directory's `files/` area.
#[derive(Debug, Clone)]
pub struct FileMaterializer {
	files_dir: PathBuf,
	timeout: Option<Duration>,
}

impl FileMaterializer {
	/// Creates a materializer targeting `<seed_dir>/files`.
	pub fn new(seed_dir: impl AsRef<Path>) -> Self {
		Self {
			files_dir: seed_dir.as_ref().join(FILES_SUBDIR),
			timeout: None,
		}
	}

	/// Bounds how long a remote fetch may take. Unbounded by default.
	pub fn with_timeout(mut self, timeout: Duration) -> Self {
		self.timeout = Some(timeout);
		self
	}

	/// Returns the directory attachments are written to.
	pub fn files_dir(&self) -> &Path {
		&self.files_dir
	}

	/// Materializes one attachment: reads or fetches its bytes and writes
	/// them under the files directory, returning the resulting handle.
	///
	/// When a file with the attachment's name already exists there, an
	/// incrementing token is appended before the extension (`logo.png`,
	/// `logo_1.png`, `logo_2.png`, ...) so unrelated attachments that happen
	/// to share a name never overwrite each other.
	///
	/// # Errors
	///
	/// Network failures surface as [`HarvestError::Fetch`], disk failures as
	/// [`HarvestError::Io`]. Both are per-attribute errors; callers degrade
	/// the single attribute rather than abort the run.
	pub fn materialize(&self, file: &FileAttribute) -> HarvestResult<FileHandle> {
		fs::create_dir_all(&self.files_dir)?;

		let bytes = self.read_bytes(file.location())?;
		let name = file.filename().ok_or_else(|| {
			HarvestError::Fetch(format!(
				"could not derive a filename from {:?}",
				file.location()
			))
		})?;

		let (final_name, absolute_path) = self.unique_target(&name);
		fs::write(&absolute_path, &bytes)?;

		tracing::debug!(
			filename = %final_name,
			bytes = bytes.len(),
			"materialized attachment"
		);

		Ok(FileHandle {
			relative_path: PathBuf::from(FILES_SUBDIR).join(&final_name),
			absolute_path,
			filename: final_name,
		})
	}

	fn read_bytes(&self, location: &FileLocation) -> HarvestResult<Vec<u8>> {
		match location {
			FileLocation::Local(path) => Ok(fs::read(path)?),
			FileLocation::Remote(url) => {
				let mut builder = reqwest::blocking::Client::builder();
				if let Some(timeout) = self.timeout {
					builder = builder.timeout(timeout);
				}
				let client = builder
					.build()
					.map_err(|e| HarvestError::Fetch(e.to_string()))?;
				let response = client
					.get(url)
					.send()
					.and_then(|response| response.error_for_status())
					.map_err(|e| HarvestError::Fetch(e.to_string()))?;
				let bytes = response
					.bytes()
					.map_err(|e| HarvestError::Fetch(e.to_string()))?;
				Ok(bytes.to_vec())
			}
		}
	}

	fn unique_target(&self, name: &str) -> (String, PathBuf) {
		let mut candidate = name.to_string();
		let mut counter = 1;
		while self.files_dir.join(&candidate).exists() {
			candidate = suffixed(name, counter);
			counter += 1;
		}
		let path = self.files_dir.join(&candidate);
		(candidate, path)
	}
}

/// Inserts a numeric token before the extension: `logo.png` -> `logo_2.png`.
fn suffixed(name: &str, counter: u32) -> String {
	match name.rsplit_once('.') {
		Some((stem, ext)) if !stem.is_empty() => format!("{stem}_{counter}.{ext}"),
		_ => format!("{name}_{counter}"),
	}
}
