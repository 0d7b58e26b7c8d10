use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap as Map;

use crate::{
    error::{Error, Result},
    models::BuildConfig,
};

/// The configuration block as the host decodes it, before validation.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBuildConfig {
    #[serde(default, alias = "target")]
    image: Option<String>,

    #[serde(default, alias = "environment")]
    env: MapList,

    #[serde(default)]
    push: bool,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum MapList {
    Map(Map<String, String>),
    List(Vec<String>),
}

impl Default for MapList {
    fn default() -> Self {
        MapList::List(Vec::new())
    }
}

impl MapList {
    fn into_map(self) -> Map<String, String> {
        match self {
            MapList::Map(map) => map,
            MapList::List(list) => list.into_iter().map(MapList::split_value).collect(),
        }
    }

    fn split_value(value: String) -> (String, String) {
        match value.find('=') {
            Some(split_index) => {
                let (key, value) = value.split_at(split_index);
                (key.to_owned(), value[1..].to_owned())
            }
            None => (value, String::new()),
        }
    }
}

/// Accepts a decoded configuration value and validates it.
pub fn decode(value: Value) -> Result<BuildConfig> {
    let raw: RawBuildConfig =
        serde_json::from_value(value).map_err(|err| Error::validation("config", err.to_string()))?;
    debug!("decoded build configuration {:?}", raw);

    let image = raw.image.unwrap_or_default();
    BuildConfig::new(image, raw.env.into_map(), raw.push)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn validation_field(err: Error) -> String {
        match err {
            Error::Validation { field, .. } => field,
            other => panic!("expected a validation error, got {:?}", other),
        }
    }

    #[test]
    fn defaults_to_build_with_no_overrides() {
        let config = decode(json!({ "image": "myapp" })).unwrap();

        assert_eq!(config.target(), "myapp");
        assert!(!config.push());
        assert!(config.environment().is_empty());
    }

    #[test]
    fn accepts_environment_as_map() {
        let config = decode(json!({
            "image": "myapp",
            "env": { "FOO": "bar", "EMPTY": "" },
            "push": true,
        }))
        .unwrap();

        assert!(config.push());
        assert_eq!(config.environment().get("FOO").map(String::as_str), Some("bar"));
        assert_eq!(config.environment().get("EMPTY").map(String::as_str), Some(""));
    }

    #[test]
    fn accepts_environment_as_list() {
        let config = decode(json!({
            "target": "myapp",
            "environment": ["FOO=bar=baz", "BARE"],
        }))
        .unwrap();

        assert_eq!(
            config.environment().get("FOO").map(String::as_str),
            Some("bar=baz")
        );
        assert_eq!(config.environment().get("BARE").map(String::as_str), Some(""));
    }

    #[test]
    fn missing_or_empty_image_names_target() {
        assert_eq!(validation_field(decode(json!({})).unwrap_err()), "target");
        assert_eq!(
            validation_field(decode(json!({ "image": "", "push": false })).unwrap_err()),
            "target"
        );
    }

    #[test]
    fn malformed_values_are_validation_errors() {
        assert_eq!(
            validation_field(decode(json!({ "image": "myapp", "push": "yes" })).unwrap_err()),
            "config"
        );
        assert_eq!(
            validation_field(decode(json!({ "image": "myapp", "registry": "x" })).unwrap_err()),
            "config"
        );
        assert_eq!(validation_field(decode(json!("myapp")).unwrap_err()), "config");
    }
}
