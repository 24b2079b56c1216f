//! HTML-to-Markdown cleaning: walks the parsed DOM once, dropping
//! boilerplate (`nav`, `footer`, `aside`, ads, `script`, `style`) while
//! preserving headings, paragraphs, lists, tables, code blocks, and
//! links as their Markdown equivalents.

use scraper::{ElementRef, Html, Node};

const DROPPED_TAGS: &[&str] = &["nav", "footer", "aside", "script", "style", "noscript", "iframe", "form"];
const AD_CLASS_MARKERS: &[&str] = &["ad", "ads", "advert", "advertisement", "sponsor"];

/// Converts `html` to Markdown. Never fails: a body that isn't really
/// HTML just produces a thin (possibly empty) Markdown rendering, and the
/// caller is expected to fall back to the raw body on total failure.
pub fn clean_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut out = String::new();
    for child in document.root_element().children() {
        render_node(child, &mut out, 0);
    }
    collapse_blank_lines(out.trim().to_string())
}

fn is_boilerplate(element: &ElementRef) -> bool {
    let value = element.value();
    if DROPPED_TAGS.contains(&value.name()) {
        return true;
    }
    value.classes().any(|class| {
        let lower = class.to_ascii_lowercase();
        AD_CLASS_MARKERS.iter().any(|marker| lower.contains(marker))
    })
}

fn render_node(node: ego_tree::NodeRef<'_, Node>, out: &mut String, list_depth: usize) {
    match node.value() {
        Node::Text(text) => {
            out.push_str(&text.text);
        }
        Node::Element(_) => {
            let Some(element) = ElementRef::wrap(node) else { return };
            if is_boilerplate(&element) {
                return;
            }
            render_element(element, out, list_depth);
        }
        _ => {}
    }
}

fn render_children(element: ElementRef, out: &mut String, list_depth: usize) {
    for child in element.children() {
        render_node(child, out, list_depth);
    }
}

fn inline_text(element: ElementRef) -> String {
    let mut buf = String::new();
    render_children(element, &mut buf, 0);
    buf.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_element(element: ElementRef, out: &mut String, list_depth: usize) {
    let tag = element.value().name();
    match tag {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag.as_bytes()[1] - b'0';
            out.push_str(&"#".repeat(level as usize));
            out.push(' ');
            out.push_str(&inline_text(element));
            out.push_str("\n\n");
        }
        "p" => {
            let text = inline_text(element);
            if !text.is_empty() {
                out.push_str(&text);
                out.push_str("\n\n");
            }
        }
        "br" => out.push('\n'),
        "hr" => out.push_str("---\n\n"),
        "strong" | "b" => {
            out.push_str("**");
            out.push_str(&inline_text(element));
            out.push_str("**");
        }
        "em" | "i" => {
            out.push('_');
            out.push_str(&inline_text(element));
            out.push('_');
        }
        "code" => {
            out.push('`');
            out.push_str(&inline_text(element));
            out.push('`');
        }
        "pre" => {
            out.push_str("```\n");
            out.push_str(&element.text().collect::<String>());
            out.push_str("\n```\n\n");
        }
        "a" => {
            let href = element.value().attr("href").unwrap_or("");
            let text = inline_text(element);
            if href.is_empty() {
                out.push_str(&text);
            } else {
                out.push_str(&format!("[{}]({})", if text.is_empty() { href } else { &text }, href));
            }
        }
        "ul" | "ol" => {
            render_list(element, out, list_depth, tag == "ol");
            out.push('\n');
        }
        "blockquote" => {
            for line in inline_text(element).lines() {
                out.push_str("> ");
                out.push_str(line);
                out.push('\n');
            }
            out.push('\n');
        }
        "table" => {
            render_table(element, out);
        }
        "li" => {
            // Only reached for malformed markup where an `li` appears
            // outside a list; treat it like a paragraph.
            let text = inline_text(element);
            if !text.is_empty() {
                out.push_str(&text);
                out.push_str("\n\n");
            }
        }
        _ => render_children(element, out, list_depth),
    }
}

fn render_list(element: ElementRef, out: &mut String, list_depth: usize, ordered: bool) {
    let indent = "  ".repeat(list_depth);
    for (idx, item) in element.children().filter_map(ElementRef::wrap).filter(|e| e.value().name() == "li").enumerate() {
        out.push_str(&indent);
        if ordered {
            out.push_str(&format!("{}. ", idx + 1));
        } else {
            out.push_str("- ");
        }
        let mut item_text = String::new();
        for child in item.children() {
            render_node(child, &mut item_text, list_depth + 1);
        }
        out.push_str(item_text.trim());
        out.push('\n');
    }
}

fn render_table(element: ElementRef, out: &mut String) {
    let rows: Vec<ElementRef> = element
        .children()
        .filter_map(ElementRef::wrap)
        .flat_map(|section| {
            if section.value().name() == "tr" {
                vec![section]
            } else {
                section.children().filter_map(ElementRef::wrap).filter(|e| e.value().name() == "tr").collect()
            }
        })
        .collect();

    for (idx, row) in rows.iter().enumerate() {
        let cells: Vec<String> = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|e| matches!(e.value().name(), "td" | "th"))
            .map(inline_text)
            .collect();
        if cells.is_empty() {
            continue;
        }
        out.push_str("| ");
        out.push_str(&cells.join(" | "));
        out.push_str(" |\n");
        if idx == 0 {
            out.push_str("| ");
            out.push_str(&vec!["---"; cells.len()].join(" | "));
            out.push_str(" |\n");
        }
    }
    out.push('\n');
}

fn collapse_blank_lines(text: String) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        out.push_str(line);
        out.push('\n');
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_and_paragraph_survive() {
        let md = clean_html("<html><body><h1>Title</h1><p>Body text.</p></body></html>");
        assert!(md.contains("# Title"));
        assert!(md.contains("Body text."));
    }

    #[test]
    fn nav_and_footer_are_dropped() {
        let md = clean_html(
            "<html><body><nav>Home | About</nav><p>Main content.</p><footer>© 2026</footer></body></html>",
        );
        assert!(!md.contains("Home"));
        assert!(!md.contains("2026"));
        assert!(md.contains("Main content."));
    }

    #[test]
    fn script_and_style_are_dropped() {
        let md = clean_html(
            "<html><body><script>alert(1)</script><style>body{color:red}</style><p>Text.</p></body></html>",
        );
        assert!(!md.contains("alert"));
        assert!(!md.contains("color:red"));
        assert!(md.contains("Text."));
    }

    #[test]
    fn ad_class_elements_are_dropped() {
        let md = clean_html("<html><body><div class=\"ad-banner\">Buy now</div><p>Real content.</p></body></html>");
        assert!(!md.contains("Buy now"));
        assert!(md.contains("Real content."));
    }

    #[test]
    fn unordered_list_renders_as_markdown_bullets() {
        let md = clean_html("<html><body><ul><li>one</li><li>two</li></ul></body></html>");
        assert!(md.contains("- one"));
        assert!(md.contains("- two"));
    }

    #[test]
    fn link_renders_with_href() {
        let md = clean_html("<html><body><p><a href=\"https://x.io\">click</a></p></body></html>");
        assert!(md.contains("[click](https://x.io)"));
    }

    #[test]
    fn table_renders_with_header_separator() {
        let md = clean_html(
            "<html><body><table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>2</td></tr></table></body></html>",
        );
        assert!(md.contains("| A | B |"));
        assert!(md.contains("| --- | --- |"));
        assert!(md.contains("| 1 | 2 |"));
    }

    #[test]
    fn non_html_input_does_not_panic() {
        let md = clean_html("not html at all, just text");
        assert!(md.contains("not html at all"));
    }
}
