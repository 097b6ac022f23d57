//! Module tree built from dotted extension names

use crate::extensions::BuildDescriptor;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One segment of a dotted module name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleIndexNode {
    /// Last segment (`c` for `pkg.sub.c`); empty for the root
    pub name: String,
    /// Every segment from the root down to this node
    pub segments: Vec<String>,
    pub children: BTreeMap<String, Self>,
    /// Directory holding the module's sources (leaves only)
    pub location: Option<PathBuf>,
    /// Annotated HTML of the module's generated source
    pub annotation: Option<PathBuf>,
}

impl ModuleIndexNode {
    /// Dotted name (`pkg.sub.c`)
    #[must_use]
    pub fn dotted_name(&self) -> String {
        self.segments.join(".")
    }

    /// Whether a module was added at exactly this path
    #[must_use]
    pub const fn is_module(&self) -> bool {
        self.location.is_some()
    }

    fn child_mut(&mut self, segment: &str) -> &mut Self {
        let segments = &self.segments;
        self.children
            .entry(segment.to_string())
            .or_insert_with(|| {
                let mut path = segments.clone();
                path.push(segment.to_string());
                Self {
                    name: segment.to_string(),
                    segments: path,
                    ..Self::default()
                }
            })
    }

    fn collect<'a>(&'a self, out: &mut Vec<&'a Self>) {
        for child in self.children.values() {
            out.push(child);
            child.collect(out);
        }
    }
}

/// Tree of all modules produced by one build, rooted at `root_dir`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIndex {
    root_dir: PathBuf,
    root: ModuleIndexNode,
}

impl ModuleIndex {
    #[must_use]
    pub fn new(root_dir: &Path) -> Self {
        Self {
            root_dir: root_dir.to_path_buf(),
            root: ModuleIndexNode::default(),
        }
    }

    /// Index every descriptor. Relative source paths are taken relative to
    /// `project_root`.
    #[must_use]
    pub fn from_descriptors(
        root_dir: &Path,
        project_root: &Path,
        descriptors: &[BuildDescriptor],
    ) -> Self {
        let mut index = Self::new(root_dir);
        for descriptor in descriptors {
            let sources: Vec<PathBuf> = descriptor
                .sources
                .iter()
                .map(|source| project_root.join(source))
                .collect();
            let location = sources.first().and_then(|s| s.parent());
            let annotation = sources
                .iter()
                .map(|source| source.with_extension("html"))
                .find(|html| html.is_file());
            index.add_module(&descriptor.module_name, location, annotation);
        }
        index
    }

    /// Add `pkg.sub.mod`, creating intermediate nodes as needed.
    ///
    /// Adding a name that is already a module changes nothing. An
    /// intermediate node that is later added as a module gains its location.
    pub fn add_module(
        &mut self,
        dotted_name: &str,
        location: Option<&Path>,
        annotation: Option<PathBuf>,
    ) {
        let mut node = &mut self.root;
        for segment in dotted_name.split('.').filter(|s| !s.is_empty()) {
            node = node.child_mut(segment);
        }
        if node.segments.is_empty() || node.is_module() {
            return;
        }
        node.location = Some(location.map_or_else(PathBuf::new, Path::to_path_buf));
        node.annotation = annotation;
    }

    /// Every node except the unnamed root, depth-first pre-order, siblings
    /// sorted by name
    #[must_use]
    pub fn walk(&self) -> Vec<&ModuleIndexNode> {
        let mut nodes = Vec::new();
        self.root.collect(&mut nodes);
        nodes
    }

    /// Output file for `node` (`<root_dir>/<segments...>/<filename>`)
    #[must_use]
    pub fn to_path(&self, node: &ModuleIndexNode, filename: &str) -> PathBuf {
        let mut path = self.root_dir.clone();
        path.extend(&node.segments);
        path.join(filename)
    }

    #[must_use]
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    #[must_use]
    pub const fn root(&self) -> &ModuleIndexNode {
        &self.root
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }
}
