//! Rewrites upstream vector styles so that every tile, glyph and sprite URL points at this server.

use crate::layer::LayerSpec;
use anyhow::{Result, bail, ensure};
use serde_json::{Map, Value};

/// The URL under which this server publishes a layer.
///
/// - vector layers: their style, `{base}/maps/{layer}/style.json`
/// - retina layers: `{base}/maps/{layer}/{z}/{x}/{y}@2x.png`
/// - everything else: `{base}/maps/{layer}/{z}/{x}/{y}.png`
pub fn public_source(layer: &LayerSpec, base: &str) -> String {
	if layer.vector {
		format!("{base}/maps/{}/style.json", layer.name)
	} else if layer.retina {
		format!("{base}/maps/{}/{{z}}/{{x}}/{{y}}@2x.png", layer.name)
	} else {
		format!("{base}/maps/{}/{{z}}/{{x}}/{{y}}.png", layer.name)
	}
}

/// Rewrites an upstream style for `layer`.
///
/// `glyphs` and `sprite` are replaced by this server's asset routes and every source gets a
/// single local `tiles` URL. Other source fields are copied as they are, other top-level fields
/// pass through unchanged.
pub fn rewrite_style(layer: &str, base: &str, upstream: &Value) -> Result<Value> {
	let Value::Object(original) = upstream else {
		bail!("style of layer '{layer}' is not a JSON object");
	};

	let mut style = original.clone();
	style.insert(
		"glyphs".into(),
		Value::from(format!("{base}/glyphs/{layer}/{{fontstack}}/{{range}}.pbf")),
	);
	style.insert("sprite".into(), Value::from(format!("{base}/sprites/{layer}")));

	let mut sources = Map::new();
	if let Some(original_sources) = original.get("sources") {
		let original_sources = original_sources.as_object();
		ensure!(
			original_sources.is_some(),
			"'sources' of the style of layer '{layer}' is not an object"
		);
		for (id, source) in original_sources.into_iter().flatten() {
			let mut source = source.as_object().cloned().unwrap_or_default();
			source.insert(
				"tiles".into(),
				Value::Array(vec![Value::from(format!("{base}/maps/{layer}-{id}/{{z}}/{{x}}/{{y}}.pbf"))]),
			);
			sources.insert(id.clone(), Value::Object(source));
		}
	}
	style.insert("sources".into(), Value::Object(sources));

	Ok(Value::Object(style))
}

/// The first upstream tile URL template of a style source, if it has one.
pub fn first_tile_url(source: &Value) -> Option<&str> {
	source.get("tiles")?.as_array()?.first()?.as_str()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::layer::LayerKind;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	#[test]
	fn rewrites_sources_glyphs_and_sprite() -> Result<()> {
		let upstream = json!({
			"version": 8,
			"name": "Streets",
			"sources": {"a": {"type": "vector", "tiles": ["http://x/{z}/{x}/{y}.pbf"], "maxzoom": 14}},
			"glyphs": "http://x/fonts/{fontstack}/{range}.pbf",
			"sprite": "http://x/sprite",
			"layers": [{"id": "bg", "type": "background"}]
		});

		let style = rewrite_style("demo", "http://local", &upstream)?;
		assert_eq!(
			style,
			json!({
				"version": 8,
				"name": "Streets",
				"sources": {"a": {
					"type": "vector",
					"tiles": ["http://local/maps/demo-a/{z}/{x}/{y}.pbf"],
					"maxzoom": 14
				}},
				"glyphs": "http://local/glyphs/demo/{fontstack}/{range}.pbf",
				"sprite": "http://local/sprites/demo",
				"layers": [{"id": "bg", "type": "background"}]
			})
		);
		Ok(())
	}

	#[test]
	fn only_one_local_tile_url_per_source() -> Result<()> {
		let upstream = json!({"sources": {
			"a": {"tiles": ["http://a/{z}/{x}/{y}.pbf", "http://b/{z}/{x}/{y}.pbf"]},
			"b": {"url": "http://x/tiles.json"}
		}});
		let style = rewrite_style("demo", "https://maps.example.org/v1", &upstream)?;
		assert_eq!(
			style["sources"]["a"]["tiles"],
			json!(["https://maps.example.org/v1/maps/demo-a/{z}/{x}/{y}.pbf"])
		);
		assert_eq!(style["sources"]["b"]["url"], json!("http://x/tiles.json"));
		assert_eq!(
			style["sources"]["b"]["tiles"],
			json!(["https://maps.example.org/v1/maps/demo-b/{z}/{x}/{y}.pbf"])
		);
		Ok(())
	}

	#[test]
	fn rejects_non_object_styles() {
		assert!(rewrite_style("demo", "http://local", &json!([1, 2])).is_err());
		assert!(rewrite_style("demo", "http://local", &json!({"sources": []})).is_err());
	}

	#[test]
	fn public_sources() {
		let mut spec = LayerSpec::new("osm", LayerKind::Proxy, Some("http://t/{z}/{x}/{y}.png"));
		assert_eq!(public_source(&spec, "http://local"), "http://local/maps/osm/{z}/{x}/{y}.png");
		spec.retina = true;
		assert_eq!(public_source(&spec, "http://local"), "http://local/maps/osm/{z}/{x}/{y}@2x.png");
		spec.retina = false;
		spec.vector = true;
		assert_eq!(public_source(&spec, "http://local"), "http://local/maps/osm/style.json");
	}

	#[test]
	fn first_tile_url_of_source() {
		assert_eq!(first_tile_url(&json!({"tiles": ["a", "b"]})), Some("a"));
		assert_eq!(first_tile_url(&json!({"tiles": []})), None);
		assert_eq!(first_tile_url(&json!({"url": "x"})), None);
	}
}
