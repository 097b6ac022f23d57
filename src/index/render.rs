//! HTML rendering of the module index

use super::IndexError;
use super::tree::{ModuleIndex, ModuleIndexNode};
use crate::extensions::types::is_identifier;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of a render: pages written and pages that failed
#[derive(Debug, Default)]
pub struct RenderReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<IndexError>,
}

impl RenderReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Writes one page per index node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRenderer {
    filename: String,
}

impl IndexRenderer {
    #[must_use]
    pub fn new(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
        }
    }

    /// Render every node of `index`.
    ///
    /// A page that cannot be written is recorded in the report and the
    /// remaining pages are still rendered. Nodes with a segment that is not
    /// an identifier are never written, so every page stays under the index
    /// root.
    #[must_use]
    pub fn render(&self, index: &ModuleIndex) -> RenderReport {
        let mut report = RenderReport::default();

        for node in index.walk() {
            if let Some(segment) = node.segments.iter().find(|s| !is_identifier(s)) {
                report.failures.push(IndexError::InvalidName {
                    name: node.dotted_name(),
                    segment: segment.clone(),
                });
                continue;
            }
            let path = index.to_path(node, &self.filename);
            let html = self.page(index.root_dir(), node);
            match write_page(&path, &html) {
                Ok(()) => {
                    crate::debug!("{} -> {}", node.dotted_name(), path.display());
                    report.written.push(path);
                }
                Err(source) => report.failures.push(IndexError::Write { path, source }),
            }
        }

        report
    }

    fn page(&self, root_dir: &Path, node: &ModuleIndexNode) -> String {
        let title = escape(&node.dotted_name());
        let depth = node.segments.len();
        let mut html = String::new();

        let _ = writeln!(html, "<!DOCTYPE html>");
        let _ = writeln!(html, "<html>");
        let _ = writeln!(html, "<head><meta charset=\"utf-8\"><title>{title}</title></head>");
        let _ = writeln!(html, "<body>");

        // Breadcrumb: every ancestor links to its own page
        let _ = write!(html, "<nav>");
        for (i, segment) in node.segments.iter().enumerate() {
            if i > 0 {
                html.push_str(" . ");
            }
            let up = depth - 1 - i;
            if up == 0 {
                let _ = write!(html, "<strong>{}</strong>", escape(segment));
            } else {
                let _ = write!(
                    html,
                    "<a href=\"{}{}\">{}</a>",
                    "../".repeat(up),
                    self.filename,
                    escape(segment)
                );
            }
        }
        let _ = writeln!(html, "</nav>");
        let _ = writeln!(html, "<h1>{title}</h1>");

        if node.is_module() {
            let _ = writeln!(html, "<ul class=\"module\">");
            if let Some(annotation) = &node.annotation {
                let _ = writeln!(
                    html,
                    "<li><a href=\"{}\">annotated source</a></li>",
                    escape(&href(root_dir, depth, annotation))
                );
            }
            if let Some(location) = node.location.as_ref().filter(|l| !l.as_os_str().is_empty()) {
                let _ = writeln!(
                    html,
                    "<li>source directory: <code>{}</code></li>",
                    escape(&location.display().to_string())
                );
            }
            let _ = writeln!(html, "</ul>");
        }

        if !node.children.is_empty() {
            let _ = writeln!(html, "<ul class=\"children\">");
            for child in node.children.values().filter(|c| is_identifier(&c.name)) {
                let _ = writeln!(
                    html,
                    "<li><a href=\"{}/{}\">{}</a></li>",
                    escape(&child.name),
                    self.filename,
                    escape(&child.name)
                );
            }
            let _ = writeln!(html, "</ul>");
        }

        let _ = writeln!(html, "</body>");
        let _ = writeln!(html, "</html>");
        html
    }
}

fn write_page(path: &Path, html: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html)
}

/// Link from a page `depth` levels below `root_dir` to `target`.
///
/// Targets inside `root_dir` get a relative link; anything else is linked by
/// absolute path.
fn href(root_dir: &Path, depth: usize, target: &Path) -> String {
    target.strip_prefix(root_dir).map_or_else(
        |_| target.display().to_string(),
        |relative| {
            let relative = relative.to_string_lossy().replace('\\', "/");
            format!("{}{relative}", "../".repeat(depth))
        },
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests can panic")]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample(root: &Path) -> ModuleIndex {
        let pkg = root.join("pkg");
        let mut index = ModuleIndex::new(root);
        index.add_module("pkg.a", Some(&pkg), Some(pkg.join("a.html")));
        index.add_module("pkg.b", Some(&pkg), None);
        index.add_module("pkg.sub.c", Some(&pkg.join("sub")), None);
        index
    }

    #[test]
    fn writes_one_page_per_node() {
        let temp = TempDir::new().unwrap();
        let report = IndexRenderer::new("index.html").render(&sample(temp.path()));

        assert!(report.is_success());
        assert_eq!(report.written.len(), 5);
        for dir in ["pkg", "pkg/a", "pkg/b", "pkg/sub", "pkg/sub/c"] {
            assert!(temp.path().join(dir).join("index.html").is_file(), "{dir}");
        }
    }

    #[test]
    fn pages_link_children_and_annotation() {
        let temp = TempDir::new().unwrap();
        let report = IndexRenderer::new("index.html").render(&sample(temp.path()));
        assert!(report.is_success());

        let pkg = fs::read_to_string(temp.path().join("pkg/index.html")).unwrap();
        assert!(pkg.contains("<a href=\"a/index.html\">a</a>"));
        assert!(pkg.contains("<a href=\"sub/index.html\">sub</a>"));

        let a = fs::read_to_string(temp.path().join("pkg/a/index.html")).unwrap();
        assert!(a.contains("href=\"../../pkg/a.html\""));
        assert!(a.contains("<a href=\"../index.html\">pkg</a>"));
    }

    #[test]
    fn failures_do_not_stop_rendering() {
        let temp = TempDir::new().unwrap();
        let mut index = ModuleIndex::new(temp.path());
        index.add_module("blocked.x", None, None);
        index.add_module("open.y", None, None);
        // A file where the `blocked` directory should go
        fs::write(temp.path().join("blocked"), "").unwrap();

        let report = IndexRenderer::new("index.html").render(&index);

        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.written.len(), 2);
        assert!(temp.path().join("open/y/index.html").is_file());
    }

    #[test]
    fn path_like_segments_stay_inside_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("out");
        let mut index = ModuleIndex::new(&root);
        index.add_module("pkg.sub/../../outside", None, None);
        index.add_module("pkg.ok", None, None);

        let report = IndexRenderer::new("index.html").render(&index);

        assert_eq!(
            report.written,
            vec![root.join("pkg/index.html"), root.join("pkg/ok/index.html")]
        );
        assert_eq!(report.failures.len(), 3);
        assert!(
            report
                .failures
                .iter()
                .all(|f| matches!(f, IndexError::InvalidName { .. }))
        );
        assert!(!temp.path().join("outside").exists());
        assert!(!Path::new("/outside").exists());
        let pkg = fs::read_to_string(root.join("pkg/index.html")).unwrap();
        assert!(pkg.contains("ok/index.html"));
        assert!(!pkg.contains("sub/"));
    }

    #[test]
    fn names_are_escaped() {
        assert_eq!(escape("a<b>&\"c\""), "a&lt;b&gt;&amp;&quot;c&quot;");
    }
}
