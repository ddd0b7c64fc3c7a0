//! Main-region extraction and HTML rebuilding.
//!
//! The page's main region is serialized back to a reduced HTML document before
//! it is handed to `htmd`: chrome is dropped, links are rewritten, images are
//! made absolute, and code blocks and data tables are swapped for placeholder
//! paragraphs that are filled in once the Markdown exists.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

use docmirror_shared::{RelatedPage, page_key, relative_link};

use crate::ConvertOptions;

/// Main-region candidates in priority order.
const REGIONS: &[&str] = &[
    "main",
    "article",
    r#"[role="main"]"#,
    "#content",
    ".content",
    "#main",
    "body",
];

/// Elements dropped together with their content.
const CHROME_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "iframe", "svg", "form",
    "head", "template",
];

/// Class names marking chrome.
const CHROME_CLASSES: &[&str] = &["sidebar", "breadcrumb"];

/// Attributes carried over into the rebuilt HTML.
const KEPT_ATTRS: &[&str] = &["href", "src", "alt", "title", "start"];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

const PLACEHOLDER_PREFIX: &str = "DOCMIRRORBLOCK";
const PLACEHOLDER_SUFFIX: &str = "END";

static REGION_SELS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    REGIONS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});

static CODE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("code").expect("valid selector"));

static ROW_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("valid selector"));

static LAYOUT_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table, pre").expect("valid selector"));

static BRUSH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"brush:\s*([A-Za-z0-9_+#-]+)").expect("valid regex"));

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"DOCMIRRORBLOCK(\d+)END").expect("valid regex"));

/// The reduced region, ready for `htmd`.
#[derive(Debug, Default)]
pub(crate) struct Rebuilt {
    pub html: String,
    /// Finished Markdown for each placeholder, by index.
    pub blocks: Vec<String>,
    pub related: Vec<RelatedPage>,
    /// Whether the region held any text, image, code, or table.
    pub has_content: bool,
}

/// Select the main region of `html` and rebuild it.
pub(crate) fn rebuild(html: &str, opts: &ConvertOptions<'_>) -> Rebuilt {
    let doc = Html::parse_document(html);
    let mut builder = Builder {
        opts,
        own_key: page_key(opts.source_url),
        seen_related: HashSet::new(),
        out: Rebuilt::default(),
    };

    if let Some(region) = REGION_SELS
        .iter()
        .find_map(|sel| doc.select(sel).next())
    {
        builder.children(region);
    }
    builder.out
}

/// Substitute placeholders with their blocks.
///
/// A placeholder nested in a list or quote keeps that prefix on every line of the block.
pub(crate) fn restore_blocks(markdown: &str, blocks: &[String]) -> String {
    let mut out = Vec::new();
    for line in markdown.lines() {
        let Some(caps) = PLACEHOLDER_RE.captures(line) else {
            out.push(line.to_string());
            continue;
        };
        let (Some(whole), Some(index)) = (caps.get(0), caps.get(1)) else {
            out.push(line.to_string());
            continue;
        };
        let Some(block) = index
            .as_str()
            .parse::<usize>()
            .ok()
            .and_then(|i| blocks.get(i))
        else {
            out.push(line.to_string());
            continue;
        };

        let prefix = &line[..whole.start()];
        let continuation: String = prefix
            .chars()
            .map(|c| if c == '>' { '>' } else { ' ' })
            .collect();

        for (i, block_line) in block.lines().enumerate() {
            let lead = if i == 0 { prefix } else { continuation.as_str() };
            if block_line.is_empty() {
                out.push(lead.trim_end().to_string());
            } else {
                out.push(format!("{lead}{block_line}"));
            }
        }
        let rest = line[whole.end()..].trim();
        if !rest.is_empty() {
            out.push(format!("{continuation}{rest}"));
        }
    }
    out.join("\n")
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

struct Builder<'o, 'a> {
    opts: &'o ConvertOptions<'a>,
    own_key: String,
    seen_related: HashSet<String>,
    out: Rebuilt,
}

impl Builder<'_, '_> {
    fn children(&mut self, el: ElementRef<'_>) {
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    if !text.trim().is_empty() {
                        self.out.has_content = true;
                    }
                    push_escaped_text(&mut self.out.html, text);
                }
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.element(child_el);
                    }
                }
                _ => {}
            }
        }
    }

    fn element(&mut self, el: ElementRef<'_>) {
        if is_chrome(&el) {
            return;
        }

        let name = el.value().name();
        match name {
            "pre" => return self.code_block(el),
            "table" if is_layout_table(&el) => return self.layout_table(el),
            "table" => return self.data_table(el),
            "img" => self.out.has_content = true,
            _ => {}
        }

        self.out.html.push('<');
        self.out.html.push_str(name);
        for (attr, value) in el.value().attrs() {
            if !KEPT_ATTRS.contains(&attr) {
                continue;
            }
            let value = match (name, attr) {
                ("a", "href") => self.rewrite_href(value),
                ("img", "src") => absolute(value, self.opts.source_url),
                _ => value.to_string(),
            };
            self.out.html.push(' ');
            self.out.html.push_str(attr);
            self.out.html.push_str("=\"");
            push_escaped_attr(&mut self.out.html, &value);
            self.out.html.push('"');
        }
        self.out.html.push('>');

        if VOID_TAGS.contains(&name) {
            return;
        }
        self.children(el);
        self.out.html.push_str("</");
        self.out.html.push_str(name);
        self.out.html.push('>');
    }

    fn placeholder(&mut self, block: String) {
        let index = self.out.blocks.len();
        self.out.blocks.push(block);
        self.out.has_content = true;
        self.out
            .html
            .push_str(&format!("<p>{PLACEHOLDER_PREFIX}{index}{PLACEHOLDER_SUFFIX}</p>"));
    }

    fn code_block(&mut self, pre: ElementRef<'_>) {
        let code = code_text(pre);
        let code = code.trim_matches('\n').trim_end();
        if code.trim().is_empty() {
            return;
        }
        let lang = code_language(&pre, self.opts.default_code_language).unwrap_or_default();
        let fence = fence_for(code);
        self.placeholder(format!("{fence}{lang}\n{code}\n{fence}"));
    }

    fn data_table(&mut self, table: ElementRef<'_>) {
        let mut rows = Vec::new();
        for row in table.select(&ROW_SEL) {
            let mut cells = Vec::new();
            for cell in row.children().filter_map(ElementRef::wrap) {
                if matches!(cell.value().name(), "td" | "th") {
                    cells.push(self.cell_markdown(cell));
                }
            }
            if !cells.is_empty() {
                rows.push(cells);
            }
        }

        if let Some(markdown) = pipe_table(rows) {
            self.placeholder(markdown);
        }
    }

    /// One table cell as single-line Markdown, built like the rest of the region.
    fn cell_markdown(&mut self, cell: ElementRef<'_>) -> String {
        let outer = std::mem::take(&mut self.out.html);
        self.children(cell);
        let inner = std::mem::replace(&mut self.out.html, outer);

        let markdown = htmd::convert(&inner).unwrap_or_else(|_| cell.text().collect());
        markdown
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace('|', "\\|")
    }

    /// Tables used for page layout are unpacked cell by cell.
    fn layout_table(&mut self, table: ElementRef<'_>) {
        for row in table.select(&ROW_SEL) {
            if !belongs_to(row, &table) {
                continue;
            }
            for cell in row.children().filter_map(ElementRef::wrap) {
                if matches!(cell.value().name(), "td" | "th") {
                    self.out.html.push_str("<div>");
                    self.children(cell);
                    self.out.html.push_str("</div>");
                }
            }
        }
    }

    fn rewrite_href(&mut self, href: &str) -> String {
        let trimmed = href.trim();
        if trimmed.starts_with('#')
            || trimmed.starts_with("mailto:")
            || trimmed.starts_with("javascript:")
        {
            return trimmed.to_string();
        }
        let Ok(target) = self.opts.source_url.join(trimmed) else {
            return trimmed.to_string();
        };

        let Some(page) = self.opts.links.get(&target) else {
            return target.to_string();
        };

        let key = page_key(&target);
        if key == self.own_key {
            return match target.fragment() {
                Some(fragment) => format!("#{fragment}"),
                None => relative_link(self.opts.local_path, &page.path),
            };
        }

        let link = relative_link(self.opts.local_path, &page.path);
        if self.seen_related.insert(key) {
            self.out.related.push(RelatedPage {
                title: page.title.clone(),
                path: link.clone(),
            });
        }
        match target.fragment() {
            Some(fragment) => format!("{link}#{fragment}"),
            None => link,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_chrome(el: &ElementRef<'_>) -> bool {
    let value = el.value();
    CHROME_TAGS.contains(&value.name())
        || value.classes().any(|c| CHROME_CLASSES.contains(&c))
}

fn absolute(src: &str, base: &Url) -> String {
    base.join(src.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| src.to_string())
}

fn push_escaped_text(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

fn push_escaped_attr(out: &mut String, value: &str) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
}

/// Text of a code block; `<br>` counts as a line break.
fn code_text(pre: ElementRef<'_>) -> String {
    let mut text = String::new();
    for node in pre.descendants() {
        match node.value() {
            Node::Text(t) => text.push_str(t),
            Node::Element(e) if e.name() == "br" => text.push('\n'),
            _ => {}
        }
    }
    text
}

/// Language of a `<pre>` from its own or its `<code>` child's hints.
pub(crate) fn code_language(pre: &ElementRef<'_>, default: Option<&str>) -> Option<String> {
    let candidates: Vec<ElementRef<'_>> = std::iter::once(*pre)
        .chain(pre.select(&CODE_SEL).next())
        .collect();

    for el in &candidates {
        if let Some(lang) = el.value().attr("data-lang").map(str::trim) {
            if !lang.is_empty() {
                return Some(lang.to_lowercase());
            }
        }
        let class = el.value().attr("class").unwrap_or("");
        if let Some(caps) = BRUSH_RE.captures(class) {
            return Some(caps[1].to_lowercase());
        }
        for token in class.split_whitespace() {
            let hinted = ["language-", "lang-", "highlight-"]
                .iter()
                .find_map(|prefix| token.strip_prefix(prefix))
                .filter(|l| !l.is_empty());
            if let Some(lang) = hinted {
                return Some(lang.to_lowercase());
            }
        }
    }

    for el in &candidates {
        for token in el.value().classes() {
            let token = token.to_lowercase();
            if token.contains("python") {
                return Some("python".into());
            }
            if token.contains("javascript") || token == "js" {
                return Some("javascript".into());
            }
            if token.contains("rsplus") {
                return Some("r".into());
            }
        }
    }

    default
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
}

/// A backtick fence longer than any backtick run inside `code`.
pub(crate) fn fence_for(code: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Whether `table` is the innermost table around `row`.
fn belongs_to(row: ElementRef<'_>, table: &ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|a| a.value().name() == "table")
        .is_some_and(|a| a.id() == table.id())
}

/// Tables holding nested tables or code are layout, not data.
fn is_layout_table(table: &ElementRef<'_>) -> bool {
    table.select(&LAYOUT_SEL).next().is_some()
}

fn pipe_table(mut rows: Vec<Vec<String>>) -> Option<String> {
    let width = rows.iter().map(Vec::len).max()?;
    if rows.iter().flatten().all(String::is_empty) {
        return None;
    }
    for row in &mut rows {
        row.resize(width, String::new());
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(format!("| {} |", row.join(" | ")));
        if i == 0 {
            lines.push(format!("| {} |", vec!["---"; width].join(" | ")));
        }
    }
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::LinkMap;

    fn first_pre(html: &str) -> Html {
        Html::parse_fragment(html)
    }

    fn lang_of(html: &str, default: Option<&str>) -> Option<String> {
        let doc = first_pre(html);
        let sel = Selector::parse("pre").unwrap();
        let pre = doc.select(&sel).next().unwrap();
        code_language(&pre, default)
    }

    #[test]
    fn language_from_hints() {
        let lang = |html: &str| lang_of(html, None);
        assert_eq!(
            lang(r#"<pre><code class="language-Rust">x</code></pre>"#).as_deref(),
            Some("rust")
        );
        assert_eq!(
            lang(r#"<pre class="brush: cpp; gutter: false">x</pre>"#).as_deref(),
            Some("cpp")
        );
        assert_eq!(lang(r#"<pre data-lang="toml">x</pre>"#).as_deref(), Some("toml"));
        assert_eq!(lang(r#"<pre class="highlight-sh">x</pre>"#).as_deref(), Some("sh"));
    }

    #[test]
    fn language_from_keywords_and_default() {
        assert_eq!(
            lang_of(r#"<pre class="sourceCode python">x</pre>"#, None).as_deref(),
            Some("python")
        );
        assert_eq!(lang_of(r#"<pre class="js">x</pre>"#, None).as_deref(), Some("javascript"));
        assert_eq!(lang_of(r#"<pre class="rsplus">x</pre>"#, None).as_deref(), Some("r"));
        assert_eq!(lang_of("<pre>x</pre>", Some("c")).as_deref(), Some("c"));
        assert_eq!(lang_of("<pre>x</pre>", None), None);
    }

    #[test]
    fn fence_outgrows_backtick_runs() {
        assert_eq!(fence_for("plain"), "```");
        assert_eq!(fence_for("a ``` b"), "````");
        assert_eq!(fence_for("`````"), "``````");
    }

    #[test]
    fn restore_keeps_list_indentation() {
        let md = "- item\n\n    DOCMIRRORBLOCK0END\n\nafter";
        let blocks = vec!["```c\nint x;\n\nx = 1;\n```".to_string()];
        assert_eq!(
            restore_blocks(md, &blocks),
            "- item\n\n    ```c\n    int x;\n\n    x = 1;\n    ```\n\nafter"
        );
    }

    #[test]
    fn pipe_table_pads_short_rows() {
        let rows = vec![
            vec!["Name".to_string(), "Value".to_string()],
            vec!["a\\|b".to_string(), "1".to_string()],
            vec!["c".to_string()],
        ];
        assert_eq!(
            pipe_table(rows).unwrap(),
            "| Name | Value |\n| --- | --- |\n| a\\|b | 1 |\n| c |  |"
        );
        assert_eq!(pipe_table(vec![vec![String::new()]]), None);
    }

    #[test]
    fn table_cells_keep_links_and_code() {
        let source = Url::parse("https://docs.example.com/manual/page1.htm").unwrap();
        let mut links = LinkMap::default();
        links.insert(
            &source.join("page2.htm").unwrap(),
            "Page 2".into(),
            PathBuf::from("CategoryA/SubcategoryA1/Page2.md"),
        );
        let opts = ConvertOptions {
            source_url: &source,
            local_path: Path::new("CategoryA/Page1.md"),
            links: &links,
            default_code_language: None,
        };

        let rebuilt = rebuild(
            r#"<main><table>
                <tr><th>Function</th><th>Description</th></tr>
                <tr><td><a href="page2.htm">enterLong</a></td>
                    <td>Opens a <code>long</code> position, see <a href="https://other.example.com/x">x</a> | y</td></tr>
            </table></main>"#,
            &opts,
        );

        assert_eq!(rebuilt.blocks.len(), 1);
        let table = &rebuilt.blocks[0];
        assert!(table.contains("| [enterLong](SubcategoryA1/Page2.md) |"), "{table}");
        assert!(table.contains("Opens a `long` position"), "{table}");
        assert!(table.contains("[x](https://other.example.com/x) \\| y"), "{table}");
        assert_eq!(rebuilt.related.len(), 1);
        assert_eq!(rebuilt.related[0].title, "Page 2");
        assert_eq!(rebuilt.related[0].path, "SubcategoryA1/Page2.md");
    }

    #[test]
    fn data_table_is_not_layout() {
        let doc = Html::parse_fragment("<table><tr><td>a</td></tr></table>");
        let sel = Selector::parse("table").unwrap();
        assert!(!is_layout_table(&doc.select(&sel).next().unwrap()));
    }
}
