use std::collections::BTreeSet;

use crate::domain::Resource;

const SHORT_FORMATS: &[(&str, &str)] = &[
    ("CSV", "csv"),
    ("GeoJSON", "geojson"),
    ("GeoTIFF", "tif"),
    ("Shapefile", "shp"),
    ("Text", "txt"),
    ("YML", "yml"),
];

const DISPLAYABLE: &[&str] = &["csv", "geojson", "tif", "shp", "txt", "yml"];

pub fn short_format(format: &str) -> &str {
    SHORT_FORMATS
        .iter()
        .find(|(long, _)| *long == format)
        .map(|(_, short)| *short)
        .unwrap_or(format)
}

pub fn is_displayable(short: &str) -> bool {
    DISPLAYABLE.contains(&short)
}

pub fn sources_res_formats(resources: &[Resource], sources: &[String]) -> Vec<String> {
    let from_resources = resources.iter().map(Resource::short_format);
    let from_sources = sources
        .iter()
        .map(|source| source.rsplit('.').next().unwrap_or(source));

    from_resources
        .chain(from_sources)
        .filter(|short| is_displayable(short))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
