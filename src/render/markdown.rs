use pulldown_cmark::{html, Options, Parser};

/// Markdown shown for a page that does not exist yet
pub const NEW_PAGE_MARKDOWN: &str = "# A new page\n\nFeel-free to write in Markdown!\n";

pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(markdown, options);
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
