//! `---`-delimited YAML frontmatter splitting and rendering.

use regex::Regex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_yaml::{Mapping, Value as YamlValue};
use std::path::Path;
use std::sync::LazyLock;

use crate::error::SyncError;

static FRONTMATTER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A---[ \t]*\r?\n(?:(?P<yaml>.*?)\r?\n)?---[ \t]*(?:\r?\n|\z)").unwrap()
});

/// Split a document into its raw YAML block and the remaining body.
///
/// Returns `None` when the document does not open with a frontmatter block.
pub fn split(content: &str) -> Option<(&str, &str)> {
    let caps = FRONTMATTER_RE.captures(content)?;
    let yaml = caps.name("yaml").map(|m| m.as_str()).unwrap_or("");
    let end = caps.get(0).map(|m| m.end()).unwrap_or(0);
    Some((yaml, &content[end..]))
}

fn yaml_or_empty(yaml: &str) -> &str {
    if yaml.trim().is_empty() { "{}" } else { yaml }
}

/// Parse a document whose frontmatter is mandatory and typed.
pub fn parse<F: DeserializeOwned>(path: &Path, content: &str) -> Result<(F, String), SyncError> {
    let (yaml, body) = split(content).ok_or_else(|| SyncError::MissingFrontmatter {
        path: path.to_path_buf(),
    })?;

    let frontmatter =
        serde_yaml::from_str(yaml_or_empty(yaml)).map_err(|e| SyncError::InvalidFrontmatter {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok((frontmatter, body.trim().to_string()))
}

/// Parse a document whose frontmatter may be absent; absent means all defaults.
pub fn parse_optional<F: DeserializeOwned + Default>(
    path: &Path,
    content: &str,
) -> Result<(F, String), SyncError> {
    if split(content).is_some() {
        parse(path, content)
    } else {
        Ok((F::default(), content.trim().to_string()))
    }
}

/// Leniently parse a tool-native document into an untyped mapping and body.
///
/// Tool files are written by hand as often as by us, so a malformed block is
/// reported rather than guessed at.
pub fn parse_mapping(path: &Path, content: &str) -> Result<(Mapping, String), SyncError> {
    match split(content) {
        None => Ok((Mapping::new(), content.trim().to_string())),
        Some((yaml, body)) => {
            let value: YamlValue = serde_yaml::from_str(yaml_or_empty(yaml)).map_err(|e| {
                SyncError::InvalidFrontmatter {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
            })?;
            let mapping = match value {
                YamlValue::Mapping(m) => m,
                YamlValue::Null => Mapping::new(),
                other => {
                    return Err(SyncError::InvalidFrontmatter {
                        path: path.to_path_buf(),
                        message: format!("expected a mapping, found {:?}", other),
                    });
                }
            };
            Ok((mapping, body.trim().to_string()))
        }
    }
}

/// Render typed frontmatter plus body. Output is deterministic for equal input.
pub fn serialize<F: Serialize>(frontmatter: &F, body: &str) -> anyhow::Result<String> {
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(join(&yaml, body))
}

/// Render an untyped mapping plus body; an empty mapping renders the body alone.
pub fn render(frontmatter: &Mapping, body: &str) -> anyhow::Result<String> {
    if frontmatter.is_empty() {
        let body = body.trim();
        return Ok(if body.is_empty() {
            String::new()
        } else {
            format!("{}\n", body)
        });
    }
    let yaml = serde_yaml::to_string(frontmatter)?;
    Ok(join(&yaml, body))
}

fn join(yaml: &str, body: &str) -> String {
    let yaml = if yaml.trim() == "{}" { "" } else { yaml };
    let body = body.trim();
    if body.is_empty() {
        format!("---\n{}---\n", yaml)
    } else {
        format!("---\n{}---\n\n{}\n", yaml, body)
    }
}

/// Read a string field from an untyped mapping.
pub fn get_str<'a>(mapping: &'a Mapping, key: &str) -> Option<&'a str> {
    mapping.get(key).and_then(|v| v.as_str())
}

/// Read a boolean field from an untyped mapping.
pub fn get_bool(mapping: &Mapping, key: &str) -> Option<bool> {
    mapping.get(key).and_then(|v| v.as_bool())
}

/// Read a list of strings that may be written as a YAML list or a
/// comma-separated string.
pub fn get_str_list(mapping: &Mapping, key: &str) -> Vec<String> {
    match mapping.get(key) {
        Some(YamlValue::Sequence(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        Some(YamlValue::String(s)) => s
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::path::PathBuf;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        description: String,
        #[serde(default)]
        globs: Vec<String>,
    }

    #[test]
    fn test_split_basic() {
        let (yaml, body) = split("---\ndescription: x\n---\n# Body\n").unwrap();
        assert_eq!(yaml, "description: x");
        assert_eq!(body, "# Body\n");
    }

    #[test]
    fn test_split_empty_block() {
        let (yaml, body) = split("---\n---\nbody").unwrap();
        assert_eq!(yaml, "");
        assert_eq!(body, "body");
    }

    #[test]
    fn test_split_requires_leading_delimiter() {
        assert!(split("# Title\n---\nx: 1\n---\n").is_none());
    }

    #[test]
    fn test_split_ignores_dashes_inside_values() {
        let (yaml, body) = split("---\ndescription: a---b\n---\nrest").unwrap();
        assert_eq!(yaml, "description: a---b");
        assert_eq!(body, "rest");
    }

    #[test]
    fn test_parse_reports_path_and_field() {
        let path = PathBuf::from(".rulesync/rules/bad.md");
        let err = parse::<Sample>(&path, "---\nglobs: []\n---\nbody").unwrap_err();
        let message = err.to_string();
        assert!(message.contains(".rulesync/rules/bad.md"));
        assert!(message.contains("description"));
    }

    #[test]
    fn test_parse_missing_block() {
        let path = PathBuf::from("a.md");
        let err = parse::<Sample>(&path, "no frontmatter").unwrap_err();
        assert!(matches!(err, SyncError::MissingFrontmatter { .. }));
    }

    #[test]
    fn test_parse_optional_defaults() {
        let (fm, body) = parse_optional::<Sample>(Path::new("x"), "  just body \n").unwrap();
        assert_eq!(fm, Sample::default());
        assert_eq!(body, "just body");
    }

    #[test]
    fn test_serialize_round_trip() {
        let fm = Sample {
            description: "Naming: rules".to_string(),
            globs: vec!["**/*.ts".to_string()],
        };
        let out = serialize(&fm, "Use camelCase").unwrap();
        assert_eq!(out, serialize(&fm, "Use camelCase").unwrap());

        let (parsed, body): (Sample, String) = parse(Path::new("x"), &out).unwrap();
        assert_eq!(parsed, fm);
        assert_eq!(body, "Use camelCase");
    }

    #[test]
    fn test_render_empty_mapping_is_plain_body() {
        assert_eq!(render(&Mapping::new(), "Use TS").unwrap(), "Use TS\n");
    }

    #[test]
    fn test_get_str_list_accepts_both_forms() {
        let (mapping, _) =
            parse_mapping(Path::new("x"), "---\na: \"x, y\"\nb: [z]\n---\n").unwrap();
        assert_eq!(get_str_list(&mapping, "a"), vec!["x", "y"]);
        assert_eq!(get_str_list(&mapping, "b"), vec!["z"]);
        assert!(get_str_list(&mapping, "c").is_empty());
    }
}
