use super::CacheRequest;
use std::{
	fmt::{self, Debug},
	path::{Path, PathBuf},
	sync::Arc,
};

/// How a [`CacheRequest`] is mapped to a file on disk.
#[derive(Clone)]
pub enum CachePath {
	/// Caller-supplied mapping.
	Custom(Arc<dyn Fn(&CacheRequest) -> PathBuf + Send + Sync>),
	/// A path template. `{type}`, `{layer}`, `{fontstack}`, `{range}`, `{filename}`, `{z}`, `{x}`
	/// and `{y}` are replaced; placeholders that do not apply to a request are left untouched.
	Template(String),
	/// Fixed layout below a directory:
	/// - tiles: `dir/{z}/{x}/{y}[@2x].{ext}`
	/// - glyphs: `dir/glyphs/{fontstack}/{range}.pbf`
	/// - sprites: `dir/sprites/sprite{filename}`
	Directory(PathBuf),
}

impl CachePath {
	pub fn directory(dir: impl Into<PathBuf>) -> CachePath {
		CachePath::Directory(dir.into())
	}

	pub fn template(template: &str) -> CachePath {
		CachePath::Template(template.to_owned())
	}

	pub fn custom<F>(f: F) -> CachePath
	where
		F: Fn(&CacheRequest) -> PathBuf + Send + Sync + 'static,
	{
		CachePath::Custom(Arc::new(f))
	}

	/// Resolves the file path of a request.
	pub fn resolve(&self, request: &CacheRequest) -> PathBuf {
		match self {
			CachePath::Custom(f) => f(request),
			CachePath::Template(template) => PathBuf::from(fill_template(template, request)),
			CachePath::Directory(dir) => directory_path(dir, request),
		}
	}

	/// The directory holding every file of this cache, if there is a single one.
	pub fn root(&self) -> Option<&Path> {
		match self {
			CachePath::Directory(dir) => Some(dir),
			_ => None,
		}
	}
}

fn directory_path(dir: &Path, request: &CacheRequest) -> PathBuf {
	match request {
		CacheRequest::Tile { address, .. } => dir
			.join(address.coord.level.to_string())
			.join(address.coord.x.to_string())
			.join(address.filename()),
		CacheRequest::Glyphs { fontstack, range, .. } => {
			dir.join("glyphs").join(fontstack).join(format!("{range}.pbf"))
		}
		CacheRequest::Sprite { filename, .. } => dir.join("sprites").join(format!("sprite{filename}")),
	}
}

fn fill_template(template: &str, request: &CacheRequest) -> String {
	let mut path = template
		.replace("{type}", request.kind())
		.replace("{layer}", request.layer())
		.replace("{filename}", &request.filename());
	if let CacheRequest::Glyphs { fontstack, range, .. } = request {
		path = path.replace("{fontstack}", fontstack).replace("{range}", range);
	}
	if let Some(coord) = request.coord() {
		path = coord.fill_template(&path);
	}
	path
}

impl Debug for CachePath {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			CachePath::Custom(_) => write!(f, "CachePath::Custom"),
			CachePath::Template(t) => write!(f, "CachePath::Template({t:?})"),
			CachePath::Directory(d) => write!(f, "CachePath::Directory({d:?})"),
		}
	}
}
