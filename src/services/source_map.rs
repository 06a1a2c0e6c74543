// src/services/source_map.rs

//! Source map output for minified stylesheets.

use anyhow::Result;
use serde::Serialize;

/// Root under which embedded sources are shown in browser dev tools.
pub const SOURCE_ROOT: &str = "/source/";

/// Version 3 source map with embedded sources and no segment mappings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapV3<'a> {
    version: u8,
    file: &'a str,
    source_root: &'a str,
    sources: Vec<&'a str>,
    sources_content: Vec<&'a str>,
    names: Vec<&'a str>,
    mappings: &'a str,
}

/// Render the map for `file` (the generated file name, e.g. `style.min.css`).
///
/// `sources` are `(path, content)` pairs; paths are written as given.
pub fn render(file: &str, sources: &[(String, String)]) -> Result<String> {
    let map = SourceMapV3 {
        version: 3,
        file,
        source_root: SOURCE_ROOT,
        sources: sources.iter().map(|(p, _)| p.as_str()).collect(),
        sources_content: sources.iter().map(|(_, c)| c.as_str()).collect(),
        names: Vec::new(),
        mappings: "",
    };
    Ok(serde_json::to_string(&map)?)
}

/// Append the `sourceMappingURL` comment pointing at `map_file`.
pub fn with_mapping_url(css: &str, map_file: &str) -> String {
    let mut out = css.trim_end().to_string();
    out.push_str(&format!("\n/*# sourceMappingURL={map_file} */\n"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_v3_map_with_embedded_sources() {
        let json = render(
            "style.min.css",
            &[("style.default.scss".to_string(), "a { b: c }".to_string())],
        )
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["version"], 3);
        assert_eq!(value["file"], "style.min.css");
        assert_eq!(value["sourceRoot"], "/source/");
        assert_eq!(value["sources"][0], "style.default.scss");
        assert_eq!(value["sourcesContent"][0], "a { b: c }");
    }

    #[test]
    fn appends_mapping_comment() {
        assert_eq!(
            with_mapping_url("a{b:c}\n", "style.min.css.map"),
            "a{b:c}\n/*# sourceMappingURL=style.min.css.map */\n"
        );
    }
}
