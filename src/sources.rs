use serde::{Deserialize, Serialize};

use crate::domain::Resource;
use crate::error::SyncError;
use crate::extras::{Extras, SOURCES_KEY};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SourceTreeNode {
    Directory {
        name: String,
        children: Vec<SourceTreeNode>,
    },
    File {
        name: String,
        extension: String,
    },
}

impl SourceTreeNode {
    pub fn name(&self) -> &str {
        match self {
            SourceTreeNode::Directory { name, .. } | SourceTreeNode::File { name, .. } => name,
        }
    }

    fn file(name: &str) -> Self {
        let extension = name.rsplit('.').next().unwrap_or(name);
        SourceTreeNode::File {
            name: name.to_string(),
            extension: extension.to_string(),
        }
    }
}

pub fn path_components(path: &str) -> Vec<&str> {
    if path.contains('\\') {
        path.split('\\').collect()
    } else {
        path.split('/').collect()
    }
}

pub fn build_source_tree<S: AsRef<str>>(paths: &[S]) -> Vec<SourceTreeNode> {
    let mut sorted = paths.iter().map(AsRef::as_ref).collect::<Vec<&str>>();
    sorted.sort_unstable();

    let mut tree = Vec::new();
    for path in sorted {
        insert(&mut tree, &path_components(path));
    }
    tree
}

fn insert(level: &mut Vec<SourceTreeNode>, components: &[&str]) {
    match components {
        [] => {}
        [leaf] => level.push(SourceTreeNode::file(leaf)),
        [dir, rest @ ..] => {
            let existing = level.iter_mut().find_map(|node| match node {
                SourceTreeNode::Directory { name, children } if name == dir => Some(children),
                _ => None,
            });
            match existing {
                Some(children) => insert(children, rest),
                None => {
                    let mut children = Vec::new();
                    insert(&mut children, rest);
                    level.push(SourceTreeNode::Directory {
                        name: dir.to_string(),
                        children,
                    });
                }
            }
        }
    }
}

pub fn parse_sources_extra(extras: &Extras) -> Result<Option<Vec<SourceTreeNode>>, SyncError> {
    let Some(raw) = extras.get(SOURCES_KEY) else {
        return Ok(None);
    };
    let sources: Vec<String> = serde_json::from_str(raw)
        .map_err(|err| SyncError::MalformedResponse(format!("sources extra: {err}")))?;
    if sources.is_empty() {
        return Ok(None);
    }
    Ok(Some(build_source_tree(&sources)))
}

pub fn sources_for_resource<'a>(
    tree: &'a [SourceTreeNode],
    resource: &Resource,
) -> Option<&'a [SourceTreeNode]> {
    if !resource.name.ends_with(".zip") {
        return None;
    }
    let archive_name = resource.name.split('.').next().unwrap_or_default();
    tree.iter().find_map(|node| match node {
        SourceTreeNode::Directory { name, children } if name == archive_name => {
            Some(children.as_slice())
        }
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, extension: &str) -> SourceTreeNode {
        SourceTreeNode::File {
            name: name.to_string(),
            extension: extension.to_string(),
        }
    }

    #[test]
    fn builds_nested_tree() {
        let tree = build_source_tree(&["d.txt", "a/c.tif", "a/b.shp"]);
        assert_eq!(
            tree,
            vec![
                SourceTreeNode::Directory {
                    name: "a".to_string(),
                    children: vec![file("b.shp", "shp"), file("c.tif", "tif")],
                },
                file("d.txt", "txt"),
            ]
        );
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        assert!(build_source_tree::<&str>(&[]).is_empty());
    }

    #[test]
    fn backslash_paths_split_on_backslash() {
        let tree = build_source_tree(&["data\\layer.shp", "data\\raster.tif"]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name(), "data");
    }

    #[test]
    fn reordering_input_does_not_change_tree() {
        let a = build_source_tree(&["x/y/z.csv", "x/a.yml", "b.txt"]);
        let b = build_source_tree(&["b.txt", "x/a.yml", "x/y/z.csv"]);
        assert_eq!(a, b);
    }

    #[test]
    fn same_name_at_different_depths() {
        let tree = build_source_tree(&["data/data/data.csv"]);
        let SourceTreeNode::Directory { children, .. } = &tree[0] else {
            panic!("expected directory");
        };
        let SourceTreeNode::Directory { children, .. } = &children[0] else {
            panic!("expected nested directory");
        };
        assert_eq!(children[0], file("data.csv", "csv"));
    }

    #[test]
    fn serializes_like_directory_listing() {
        let value = serde_json::to_value(build_source_tree(&["a/b.shp"])).unwrap();
        assert_eq!(value[0]["type"], "directory");
        assert_eq!(value[0]["children"][0]["type"], "file");
        assert_eq!(value[0]["children"][0]["extension"], "shp");
    }

    #[test]
    fn subtree_for_zip_resource() {
        let tree = build_source_tree(&["carbon/a.tif", "other/b.tif"]);
        let zip = Resource {
            name: "carbon.zip".to_string(),
            ..Resource::default()
        };
        let children = sources_for_resource(&tree, &zip).unwrap();
        assert_eq!(children, [file("a.tif", "tif")].as_slice());

        let tif = Resource {
            name: "carbon.tif".to_string(),
            ..Resource::default()
        };
        assert!(sources_for_resource(&tree, &tif).is_none());
    }

    #[test]
    fn reads_sources_extra() {
        let extras = Extras::new().upsert(SOURCES_KEY, r#"["a/b.shp"]"#);
        let tree = parse_sources_extra(&extras).unwrap().unwrap();
        assert_eq!(tree[0].name(), "a");
        assert!(parse_sources_extra(&Extras::new()).unwrap().is_none());
    }
}
