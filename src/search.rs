//! Matching of emitted assets and chunk modules against extension filters.

use regex::Regex;

use crate::host::{AssetMap, Module, Source};

/// Stylesheet asset selected for purification.
pub struct MatchedAsset<'a> {
    /// Output file name of the asset.
    pub name: &'a str,
    /// Current asset content.
    pub asset: &'a dyn Source,
}

/// Assets whose name ends with one of `extensions`, in asset map order.
///
/// Query strings appended to output names (`main.css?3f2a`) are ignored when matching.
pub fn assets<'a>(assets: &'a AssetMap, extensions: &[String]) -> Vec<MatchedAsset<'a>> {
    assets
        .iter()
        .filter(|(name, _)| has_extension(strip_query(name), extensions))
        .map(|(name, asset)| MatchedAsset {
            name: name.as_str(),
            asset: asset.as_ref(),
        })
        .collect()
}

/// Resources of `modules` ending with one of `extensions`.
///
/// Module-derived content is opt-in: no extensions means no files. Loader queries
/// (`view.vue?type=template`) are dropped, leaving the path on disk.
pub fn files<M, F>(modules: &[M], extensions: &[String], resource: F) -> Vec<String>
where
    F: Fn(&M) -> Option<&str>,
{
    if extensions.is_empty() {
        return Vec::new();
    }

    modules
        .iter()
        .filter_map(|module| resource(module))
        .map(strip_query)
        .filter(|path| has_extension(path, extensions))
        .map(str::to_string)
        .collect()
}

/// Resources of `modules` matched by `pattern`.
pub fn resources_matching(modules: &[Module], pattern: &Regex) -> Vec<String> {
    modules
        .iter()
        .filter_map(|module| module.resource.as_deref())
        .filter(|resource| pattern.is_match(resource))
        .map(str::to_string)
        .collect()
}

fn has_extension(name: &str, extensions: &[String]) -> bool {
    extensions.iter().any(|extension| name.ends_with(extension.as_str()))
}

pub(crate) fn strip_query(name: &str) -> &str {
    name.split_once('?').map_or(name, |(path, _)| path)
}
