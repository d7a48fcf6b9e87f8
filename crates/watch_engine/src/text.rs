use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::ElementRef;

/// Visible text of `element`: block boundaries and `<br>` become newlines,
/// whitespace runs collapse to one space, every line is trimmed and blank
/// lines are dropped. Markup-only churn therefore yields the same string.
pub fn visible_text(element: ElementRef) -> String {
    let mut collector = TextCollector::default();
    for child in element.children() {
        collector.visit_node(child);
    }
    collector.finish()
}

#[derive(Default)]
struct TextCollector {
    builder: String,
    last_char: Option<char>,
}

impl TextCollector {
    fn visit_node(&mut self, node: NodeRef<'_, Node>) {
        match node.value() {
            Node::Text(text) => self.append_text(text),
            Node::Element(element) => match element.name() {
                "script" | "style" | "noscript" | "template" => {}
                "br" => self.ensure_newline(),
                name if is_block(name) => {
                    self.ensure_newline();
                    self.visit_children(node);
                    self.ensure_newline();
                }
                _ => self.visit_children(node),
            },
            Node::Document | Node::Fragment => self.visit_children(node),
            _ => {}
        }
    }

    fn visit_children(&mut self, node: NodeRef<'_, Node>) {
        for child in node.children() {
            self.visit_node(child);
        }
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if matches!(self.last_char, None | Some(' ') | Some('\n')) {
                    continue;
                }
                self.push_char(' ');
            } else {
                self.push_char(ch);
            }
        }
    }

    fn ensure_newline(&mut self) {
        if self.last_char == Some('\n') || self.builder.is_empty() {
            return;
        }
        self.push_char('\n');
    }

    fn push_char(&mut self, ch: char) {
        self.builder.push(ch);
        self.last_char = Some(ch);
    }

    fn finish(self) -> String {
        self.builder
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "main"
            | "header"
            | "footer"
            | "nav"
            | "aside"
            | "figure"
            | "figcaption"
            | "table"
            | "thead"
            | "tbody"
            | "tfoot"
            | "tr"
            | "td"
            | "th"
            | "caption"
            | "blockquote"
            | "address"
            | "pre"
            | "ul"
            | "ol"
            | "li"
            | "dl"
            | "dt"
            | "dd"
            | "h1"
            | "h2"
            | "h3"
            | "h4"
            | "h5"
            | "h6"
            | "hr"
            | "form"
            | "fieldset"
            | "details"
            | "summary"
    )
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};

    use super::visible_text;

    fn text_of(html: &str) -> String {
        let doc = Html::parse_document(html);
        let body = Selector::parse("body").unwrap();
        visible_text(doc.select(&body).next().unwrap())
    }

    #[test]
    fn blocks_become_lines_and_inline_stays_joined() {
        let text = text_of("<div><p>Deadline <b>31 March</b>.</p><p>Apply online</p></div>");
        assert_eq!(text, "Deadline 31 March.\nApply online");
    }

    #[test]
    fn whitespace_churn_is_normalized_away() {
        let tidy = text_of("<ul><li>One</li><li>Two</li></ul>");
        let messy = text_of("<ul>\n   <li>  One </li>\n\n\t<li>Two\n</li>  </ul>");
        assert_eq!(tidy, "One\nTwo");
        assert_eq!(messy, tidy);
    }

    #[test]
    fn line_breaks_and_nbsp_are_handled() {
        let text = text_of("<p>Line one<br>Line&nbsp;&nbsp;two</p>");
        assert_eq!(text, "Line one\nLine two");
    }
}
