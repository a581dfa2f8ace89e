// Alias canonicalization over the raw spec tree. Returns a new tree.

use serde_json::{Map, Value as Json};

const AES_ALIASES: &[(&str, &str)] = &[("colour", "color"), ("col", "color")];
const GEOM_ALIASES: &[(&str, &str)] = &[("col", "bar")];

fn canonical_aes(key: &str) -> &str {
    AES_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, name)| *name)
        .unwrap_or(key)
}

fn canonical_geom(name: &str) -> &str {
    GEOM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map(|(_, geom)| *geom)
        .unwrap_or(name)
}

/// Rename aesthetic keys in a mapping-like object
fn rename_keys(map: &Map<String, Json>) -> Map<String, Json> {
    map.iter()
        .map(|(k, v)| (canonical_aes(k).to_string(), v.clone()))
        .collect()
}

fn rename_aes_value(value: &Json) -> Json {
    match value {
        Json::String(s) => Json::String(canonical_aes(s).to_string()),
        Json::Array(items) => Json::Array(items.iter().map(rename_aes_value).collect()),
        other => other.clone(),
    }
}

/// Canonicalize `data_meta.mapping_annotations[].aes`
fn canonicalize_data_meta(meta: &Json) -> Json {
    let mut meta = meta.clone();
    if let Some(items) = meta
        .get_mut("mapping_annotations")
        .and_then(Json::as_array_mut)
    {
        for item in items.iter_mut() {
            if let Some(aes) = item.get_mut("aes") {
                *aes = rename_aes_value(aes);
            }
        }
    }
    meta
}

fn canonicalize_layer(layer: &Map<String, Json>) -> Map<String, Json> {
    let mut out = Map::new();
    for (key, value) in layer {
        let value = match key.as_str() {
            "mapping" => match value {
                Json::Object(m) => Json::Object(rename_keys(m)),
                other => other.clone(),
            },
            "data_meta" => canonicalize_data_meta(value),
            "geom" => match value {
                Json::String(g) => Json::String(canonical_geom(g).to_string()),
                other => other.clone(),
            },
            _ => value.clone(),
        };
        // layer-level constants use aesthetic names as keys
        out.insert(canonical_aes(key).to_string(), value);
    }
    if out.get("geom").and_then(Json::as_str) == Some("jitter") && !out.contains_key("position") {
        out.insert("position".to_string(), Json::String("jitter".to_string()));
    }
    out
}

fn canonicalize_scale(scale: &Json) -> Json {
    let mut scale = scale.clone();
    if let Some(aes) = scale.get_mut("aesthetic") {
        *aes = rename_aes_value(aes);
    }
    scale
}

/// Apply alias rewriting to a plot or subplots spec
pub fn canonicalize(spec: &Json) -> Json {
    let Json::Object(map) = spec else {
        return spec.clone();
    };
    let mut out = Map::new();
    for (key, value) in map {
        let value = match (key.as_str(), value) {
            ("mapping", Json::Object(m)) => Json::Object(rename_keys(m)),
            ("data_meta", meta) => canonicalize_data_meta(meta),
            ("layers", Json::Array(layers)) => Json::Array(
                layers
                    .iter()
                    .map(|l| match l {
                        Json::Object(layer) => Json::Object(canonicalize_layer(layer)),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            ("scales", Json::Array(scales)) => Json::Array(scales.iter().map(canonicalize_scale).collect()),
            ("figures", Json::Array(figures)) => Json::Array(figures.iter().map(canonicalize).collect()),
            (_, other) => other.clone(),
        };
        out.insert(key.clone(), value);
    }
    Json::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_aes_aliases() {
        let spec = json!({
            "mapping": {"colour": "a"},
            "layers": [{"geom": "point", "mapping": {"col": "b"}, "colour": "red"}],
            "scales": [{"aesthetic": ["colour", "fill"]}]
        });
        let out = canonicalize(&spec);
        assert_eq!(out["mapping"], json!({"color": "a"}));
        assert_eq!(out["layers"][0]["mapping"], json!({"color": "b"}));
        assert_eq!(out["layers"][0]["color"], json!("red"));
        assert_eq!(out["scales"][0]["aesthetic"], json!(["color", "fill"]));
    }

    #[test]
    fn test_geom_aliases() {
        let spec = json!({"layers": [{"geom": "col"}, {"geom": "jitter"}, {"geom": "jitter", "position": "dodge"}]});
        let out = canonicalize(&spec);
        assert_eq!(out["layers"][0]["geom"], json!("bar"));
        assert_eq!(out["layers"][1]["position"], json!("jitter"));
        assert_eq!(out["layers"][2]["position"], json!("dodge"));
    }

    #[test]
    fn test_subplots_recurse() {
        let spec = json!({"kind": "subplots", "figures": [{"mapping": {"colour": "a"}}, null]});
        let out = canonicalize(&spec);
        assert_eq!(out["figures"][0]["mapping"], json!({"color": "a"}));
        assert_eq!(out["figures"][1], Json::Null);
    }

    #[test]
    fn test_input_untouched() {
        let spec = json!({"mapping": {"colour": "a"}});
        let _ = canonicalize(&spec);
        assert_eq!(spec["mapping"], json!({"colour": "a"}));
    }
}
