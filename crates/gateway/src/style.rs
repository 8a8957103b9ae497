//! Map style document served at `/style.json`.

use serde_json::{Value, json};
use std::sync::LazyLock;

const TILE_URL: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

static STYLE_BYTES: LazyLock<Vec<u8>> =
    LazyLock::new(|| serde_json::to_vec(&style_document()).unwrap_or_default());

/// The style document, a MapLibre/Mapbox style spec v8 object.
pub fn style_document() -> Value {
    json!({
        "version": 8,
        "name": "My Custom Style",
        "sources": {
            "osm": {
                "type": "vector",
                "tiles": [TILE_URL],
                "minzoom": 0,
                "maxzoom": 14
            }
        },
        "layers": [
            {
                "id": "background",
                "type": "background",
                "paint": {
                    "background-color": "#e0e0e0"
                }
            },
            {
                "id": "buildings",
                "type": "fill-extrusion",
                "source": "osm",
                "source-layer": "building",
                "minzoom": 15,
                "paint": {
                    "fill-extrusion-color": "#aaa",
                    "fill-extrusion-height": ["get", "height"],
                    "fill-extrusion-base": 0,
                    "fill-extrusion-opacity": 0.6
                }
            }
        ]
    })
}

/// Serialized once on first use; every request gets the same bytes.
pub fn style_json() -> &'static [u8] {
    &STYLE_BYTES
}
