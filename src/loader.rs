//! Document model loader: walks the docs tree and parses every page into a
//! `DocumentSet`. Per-file failures are collected, never fatal.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::LoadError;
use crate::frontmatter;
use crate::links::{self, PageContext};
use crate::markdown;
use crate::model::{DocumentPage, DocumentSet, SidebarEntry};

/// Upper bound on parser threads.
const MAX_WORKERS: usize = 4;

/// Find every documentation file under `docs_dir` that passes the config's
/// extension and include/exclude filters. Returns `(relative, absolute)` pairs
/// in file-name order.
fn discover(config: &Config, errors: &mut Vec<LoadError>) -> Vec<(PathBuf, PathBuf)> {
    let mut files = Vec::new();

    for entry in WalkDir::new(&config.docs_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                let file = e.path().unwrap_or(config.docs_dir.as_path()).to_path_buf();
                errors.push(LoadError::Unreadable { file, source: e.into() });
                continue;
            },
        };
        if !entry.file_type().is_file() || !has_page_extension(entry.path(), &config.extensions) {
            continue;
        }

        let absolute = entry.path().to_path_buf();
        let relative = absolute.strip_prefix(&config.docs_dir).unwrap_or(absolute.as_path()).to_path_buf();
        if !config.should_scan(&posix(&relative)) {
            continue;
        }
        files.push((relative, absolute));
    }

    return files;
}

/// Whether a file's extension is one of the configured page extensions.
fn has_page_extension(path: &Path, extensions: &[String]) -> bool {
    let Some(ext) = path.extension().and_then(|e| return e.to_str()) else {
        return false;
    };
    return extensions.iter().any(|allowed| return allowed.eq_ignore_ascii_case(ext));
}

/// Load the documentation tree named by the config.
///
/// Unreadable files and parse failures end up in `DocumentSet::errors`; the
/// rest of the tree still loads.
pub fn load(config: &Config) -> DocumentSet {
    let mut errors = Vec::new();
    let files = discover(config, &mut errors);
    tracing::debug!(dir = %config.docs_dir.display(), files = files.len(), "discovered pages");

    let mut sources = Vec::with_capacity(files.len());
    for (relative, absolute) in files {
        match std::fs::read_to_string(&absolute) {
            Ok(text) => sources.push((relative, text)),
            Err(source) => errors.push(LoadError::Unreadable { file: relative, source }),
        }
    }

    let mut set = load_sources(sources, config.sidebar.clone(), &config.base_path);
    errors.append(&mut set.errors);
    set.errors = errors;

    tracing::info!(pages = set.pages.len(), errors = set.errors.len(), "document set loaded");
    return set;
}

/// Build a document set from in-memory sources: `(docs-relative path, raw text)`
/// pairs plus the navigation declaration. When two files map to the same slug
/// the first in input order keeps it and the second is a load error.
pub fn load_sources(
    sources: Vec<(PathBuf, String)>,
    sidebar: Vec<SidebarEntry>,
    base_path: &str,
) -> DocumentSet {
    let results = parse_parallel(sources, |(relative, text)| {
        return parse_page(&relative, &text, base_path);
    });

    let mut set = DocumentSet { sidebar, ..DocumentSet::default() };
    for result in results {
        let page = match result {
            Ok(page) => page,
            Err(e) => {
                tracing::debug!(file = %e.file().display(), error = %e, "page failed to load");
                set.errors.push(e);
                continue;
            },
        };
        if let Some(existing) = set.pages.get(&page.path) {
            set.errors.push(LoadError::DuplicateSlug {
                file: page.source,
                first: existing.source.clone(),
                slug: page.path,
            });
            continue;
        }
        set.pages.insert(page.path.clone(), page);
    }

    return set;
}

/// Parse one page: frontmatter, block structure, then links.
///
/// # Errors
///
/// Returns the frontmatter or markdown `LoadError` for this file.
pub fn parse_page(relative: &Path, text: &str, base_path: &str) -> Result<DocumentPage, LoadError> {
    let split = frontmatter::split(relative, text)?;
    let relative_str = posix(relative);

    let slug = split
        .text("slug")
        .map_or_else(|| return links::slug_from_path(&relative_str), |s| {
            return links::slug_from_path(&s);
        });
    let source_dir = relative_str.rsplit_once('/').map_or("", |(dir, _)| return dir);

    let blocks = markdown::parse_blocks(relative, split.body, split.body_offset)?;
    let context = PageContext { base_path, slug: &slug, source_dir };
    let page_links = links::extract(split.body, split.body_offset, &blocks, &context);

    tracing::debug!(
        file = %relative.display(),
        slug = %slug,
        headings = blocks.headings.len(),
        links = page_links.len(),
        code_blocks = blocks.code_blocks.len(),
        "parsed page"
    );

    let description = split.text("description");
    let draft = split.flag("draft");
    let title = split.text("title");
    return Ok(DocumentPage {
        code_blocks: blocks.code_blocks,
        description,
        draft,
        frontmatter: split.fields,
        headings: blocks.headings,
        links: page_links,
        path: slug,
        source: relative.to_path_buf(),
        title,
    });
}

/// Run `parse` over every item on a small worker pool fed by a channel.
/// Results come back in input order.
fn parse_parallel<T, F>(items: Vec<T>, parse: F) -> Vec<Result<DocumentPage, LoadError>>
where
    T: Send,
    F: Fn(T) -> Result<DocumentPage, LoadError> + Sync,
{
    let count = items.len();
    let workers = std::thread::available_parallelism()
        .map_or(1, NonZeroUsize::get)
        .min(MAX_WORKERS)
        .min(count.max(1));

    let (job_tx, job_rx) = crossbeam_channel::unbounded::<(usize, T)>();
    let (result_tx, result_rx) = crossbeam_channel::unbounded();
    for job in items.into_iter().enumerate() {
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            let parse = &parse;
            scope.spawn(move || {
                for (index, item) in job_rx {
                    let _ = result_tx.send((index, parse(item)));
                }
            });
        }
    });
    drop(result_tx);

    let mut results: Vec<(usize, Result<DocumentPage, LoadError>)> = result_rx.into_iter().collect();
    results.sort_by_key(|(index, _)| return *index);
    debug_assert_eq!(results.len(), count, "every job yields one result");
    return results.into_iter().map(|(_, result)| return result).collect();
}

/// A relative path with `/` separators, for prefix filters and slugs.
fn posix(path: &Path) -> String {
    return path
        .components()
        .map(|c| return c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LinkTarget;

    fn source(path: &str, text: &str) -> (PathBuf, String) {
        return (PathBuf::from(path), text.to_string());
    }

    #[test]
    fn slugs_from_file_paths() {
        let set = load_sources(
            vec![
                source("index.md", "---\ntitle: Home\n---\n"),
                source("api/overview.md", "---\ntitle: Overview\n---\n"),
                source("guides/index.mdx", "---\ntitle: Guides\n---\n"),
            ],
            Vec::new(),
            "/",
        );
        let slugs: Vec<&str> = set.pages.keys().map(String::as_str).collect();
        assert_eq!(slugs, vec!["api/overview", "guides", "index"]);
        assert!(set.errors.is_empty());
    }

    #[test]
    fn frontmatter_slug_overrides_path() {
        let set = load_sources(
            vec![source("misc/old-name.md", "---\ntitle: T\nslug: reference/errors\n---\n")],
            Vec::new(),
            "/",
        );
        assert!(set.pages.contains_key("reference/errors"));
    }

    #[test]
    fn duplicate_slug_keeps_first() {
        let set = load_sources(
            vec![
                source("api/models.md", "---\ntitle: A\n---\n"),
                source("api/models/index.md", "---\ntitle: B\n---\n"),
            ],
            Vec::new(),
            "/",
        );
        assert_eq!(set.pages.len(), 1);
        assert_eq!(set.pages["api/models"].title.as_deref(), Some("A"));
        assert_eq!(set.errors.len(), 1);
        assert!(matches!(&set.errors[0], LoadError::DuplicateSlug { slug, .. } if slug == "api/models"));
    }

    #[test]
    fn one_bad_file_does_not_stop_the_rest() {
        let set = load_sources(
            vec![
                source("a.md", "---\ntitle: A\n"),
                source("b.md", "---\ntitle: B\n---\n# B\n"),
            ],
            Vec::new(),
            "/",
        );
        assert_eq!(set.pages.len(), 1);
        assert_eq!(set.errors.len(), 1);
        assert_eq!(set.errors[0].file(), Path::new("a.md"));
    }

    #[test]
    fn page_fields_populated() {
        let text = "---\ntitle: Overview\ndescription: Start here\n---\n# Overview\n\nSee [models](./models.md#chat-models).\n";
        let page = parse_page(Path::new("api/overview.md"), text, "/").unwrap();
        assert_eq!(page.path, "api/overview");
        assert_eq!(page.description.as_deref(), Some("Start here"));
        assert_eq!(page.headings.len(), 1);
        assert_eq!(page.links.len(), 1);
        assert_eq!(page.links[0].line, 7);
        assert_eq!(
            page.links[0].target,
            LinkTarget::Internal { anchor: Some("chat-models".to_string()), slug: "api/models".to_string() }
        );
    }

    #[test]
    fn many_files_keep_input_order() {
        let sources: Vec<(PathBuf, String)> = (0..40)
            .map(|i| source(&format!("p{i:02}.md"), "---\ntitle: T\n---\n"))
            .collect();
        let set = load_sources(sources, Vec::new(), "/");
        assert_eq!(set.pages.len(), 40);
        assert!(set.pages.contains_key("p00") && set.pages.contains_key("p39"));
    }
}
