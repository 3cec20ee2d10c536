//! Read-only access to MBTiles archives.
//!
//! MBTiles stores rows in TMS order (y grows northwards); callers pass XYZ coordinates.

use anyhow::{Context, Result, ensure};
use r2d2::Pool;
use r2d2_sqlite::{
	SqliteConnectionManager,
	rusqlite::{OpenFlags, OptionalExtension},
};
use std::path::Path;
use tilehub_core::{Blob, TileCoord};

pub struct MBTilesReader {
	name: String,
	pool: Pool<SqliteConnectionManager>,
	extension: String,
	mime: String,
}

impl MBTilesReader {
	/// Opens an existing archive.
	pub fn open_path(path: &Path) -> Result<MBTilesReader> {
		log::trace!("open {path:?}");
		ensure!(path.is_file(), "mbtiles file {path:?} does not exist");

		let manager = SqliteConnectionManager::file(path).with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY);
		let pool = Pool::builder()
			.max_size(10)
			.build(manager)
			.with_context(|| format!("opening mbtiles file {path:?}"))?;

		let mut reader = MBTilesReader {
			name: path.to_string_lossy().to_string(),
			pool,
			extension: String::from("png"),
			mime: String::from("image/png"),
		};
		reader.load_meta_data()?;
		Ok(reader)
	}

	fn load_meta_data(&mut self) -> Result<()> {
		let conn = self.pool.get()?;
		let format: Option<String> = conn
			.query_row("SELECT value FROM metadata WHERE name = 'format'", [], |row| row.get(0))
			.optional()
			.with_context(|| format!("reading metadata of {}", self.name))?;

		if let Some(format) = format {
			let (extension, mime) = match format.as_str() {
				"png" => ("png", "image/png"),
				"jpg" | "jpeg" => ("jpg", "image/jpeg"),
				"webp" => ("webp", "image/webp"),
				"pbf" => ("pbf", "application/x-protobuf"),
				other => {
					log::warn!("mbtiles file {} has unknown format '{other}', assuming png", self.name);
					("png", "image/png")
				}
			};
			self.extension = extension.to_owned();
			self.mime = mime.to_owned();
		}
		Ok(())
	}

	/// Content type of the stored tiles, derived from the `format` metadata entry.
	pub fn mime(&self) -> &str {
		&self.mime
	}

	/// File extension matching the stored tile format.
	pub fn extension(&self) -> &str {
		&self.extension
	}

	/// Reads one tile. Returns `None` if the archive has no such tile.
	pub async fn get_tile(&self, coord: &TileCoord) -> Result<Option<Blob>> {
		log::trace!("read tile {coord:?} from {}", self.name);

		let pool = self.pool.clone();
		let (x, y, z) = (coord.x, coord.tms_y(), u32::from(coord.level));
		let data = tokio::task::spawn_blocking(move || -> Result<Option<Vec<u8>>> {
			let conn = pool.get()?;
			let mut stmt =
				conn.prepare("SELECT tile_data FROM tiles WHERE tile_column = ? AND tile_row = ? AND zoom_level = ?")?;
			Ok(stmt.query_row([x, y, z], |row| row.get::<_, Vec<u8>>(0)).optional()?)
		})
		.await?
		.with_context(|| format!("reading tile {coord} from {}", self.name))?;

		Ok(data.map(Blob::from))
	}
}

impl std::fmt::Debug for MBTilesReader {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("MBTilesReader")
			.field("name", &self.name)
			.field("mime", &self.mime)
			.finish()
	}
}
