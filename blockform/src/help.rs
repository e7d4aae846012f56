use pulldown_cmark::{Options, Parser as CmarkParser, html};

/// Render help text (Markdown) to an HTML fragment.
pub fn help_html(text: &str) -> String {
    let options = Options::ENABLE_STRIKETHROUGH;
    let parser = CmarkParser::new_ext(text, options);
    let mut out = String::new();
    html::push_html(&mut out, parser);
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_inline_markdown() {
        assert_eq!(
            help_html("Email is **required**"),
            "<p>Email is <strong>required</strong></p>"
        );
    }

    #[test]
    fn escapes_markup_in_plain_text() {
        assert_eq!(help_html("a < b"), "<p>a &lt; b</p>");
    }
}
