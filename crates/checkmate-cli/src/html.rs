//! HTML fragments and escaping for the report document.
//!
//! Every piece of text that originates outside this module (file names,
//! checker messages, stderr lines) passes through [`escape_html`] exactly
//! once, at the point where it is written into markup.

use std::path::Path;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Characters left unescaped in file URLs: alphanumerics plus `/ _ . - ~`.
const PATH_QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~');

/// Report name shown in the page heading.
pub const PRODUCT_NAME: &str = "PyCheckMate";

/// Closing markup for the report document.
pub const PAGE_FOOTER: &str = "</div>\n</div>\n</body>\n</html>\n";

const STYLESHEET: &str = r"body {
  background-color: #D8E2F1;
  margin: 0;
}

div#body {
  border-style: dotted;
  border-width: 1px 0;
  border-color: #666;
  margin: 10px 0;
  padding: 10px;
  background-color: #C9D9F0;
}

div#output{
  padding: 0;
  margin: 0;
  font-family: Monaco;
  font-size: 8pt;
}

strong.title { font-size: 11pt; }
span.stderr { color: red; }
p {margin: 0; padding: 2px 0; }
";

/// Checker projects advertised when only the built-in check is available.
const CHECKER_HOMEPAGES: &[(&str, &str)] = &[
    ("PyChecker", "http://pychecker.sourceforge.net/"),
    ("PyFlakes", "https://pypi.org/project/pyflakes/"),
    ("Pylint", "https://pypi.org/project/pylint/"),
    ("PEP 8", "https://pypi.org/project/pep8/"),
    ("flake8", "https://pypi.org/project/flake8/"),
    ("pycodestyle", "https://pypi.org/project/pycodestyle/"),
];

/// Escapes `&`, `<` and `>` so `text` renders literally inside an element.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Returns `count` non-breaking spaces.
#[must_use]
pub fn nbsp(count: usize) -> String {
    "&nbsp;".repeat(count)
}

/// Percent-encodes a file path for use inside a `file://` URL.
#[must_use]
pub fn quote_path(path: &Path) -> String {
    utf8_percent_encode(&path.to_string_lossy(), PATH_QUOTE).to_string()
}

/// Builds an editor link opening `path` at `line`, and `column` if given.
#[must_use]
pub fn txmt_url(path: &Path, line: u32, column: Option<u32>) -> String {
    let mut url = format!("txmt://open?url=file://{}&line={line}", quote_path(path));
    if let Some(col) = column {
        url.push_str(&format!("&col={col}"));
    }
    url
}

/// Renders the document header. `title` and `heading` must already be
/// escaped; they may contain entities.
#[must_use]
pub fn page_header(title: &str, heading: &str) -> String {
    format!(
        "<html>\n<head>\n\
         <meta http-equiv=\"Content-Type\" content=\"text/html; charset=utf-8\" />\n\
         <title>{PRODUCT_NAME} {title}</title>\n\
         <style type=\"text/css\">\n<!--\n\n{STYLESHEET}\n-->\n</style>\n\
         </head>\n<body>\n<div id=\"body\">\n\
         <p><strong class=\"title\">{heading}</strong></p><br>\n\
         <div id=\"output\">\n"
    )
}

/// Renders the paragraph suggesting external checkers.
#[must_use]
pub fn install_hint() -> String {
    let links: Vec<String> = CHECKER_HOMEPAGES
        .iter()
        .map(|(name, url)| {
            format!("<a href=\"javascript:TextMate.system('open {url}', null)\">{name}</a>")
        })
        .collect();
    let listed = match links.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {last}", rest.join(", ")),
        Some((last, _)) => last.clone(),
        None => String::new(),
    };
    format!("<p>Please install {listed} for more extensive code checking.</p><br>")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("plain text", "plain text")]
    #[case("a < b && c > d", "a &lt; b &amp;&amp; c &gt; d")]
    #[case("<script>", "&lt;script&gt;")]
    #[case("undefined name 'x'", "undefined name 'x'")]
    #[case("\"quoted\"", "\"quoted\"")]
    #[case("", "")]
    fn escapes_markup_characters(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_html(input), expected);
    }

    #[test]
    fn escaping_is_not_idempotent_so_must_happen_once() {
        let once = escape_html("a & b");
        assert_eq!(once, "a &amp; b");
        assert_eq!(escape_html(&once), "a &amp;amp; b");
    }

    #[rstest]
    #[case("/home/u/proj/foo.py", "/home/u/proj/foo.py")]
    #[case("/tmp/with space/a&b.py", "/tmp/with%20space/a%26b.py")]
    #[case("/tmp/ünï.py", "/tmp/%C3%BCn%C3%AF.py")]
    #[case("/tmp/x~y_z-w.py", "/tmp/x~y_z-w.py")]
    fn quotes_paths_for_urls(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(quote_path(Path::new(path)), expected);
    }

    #[test]
    fn builds_line_and_column_urls() {
        let path = Path::new("/src/foo.py");
        assert_eq!(
            txmt_url(path, 10, None),
            "txmt://open?url=file:///src/foo.py&line=10"
        );
        assert_eq!(
            txmt_url(path, 3, Some(5)),
            "txmt://open?url=file:///src/foo.py&line=3&col=5"
        );
    }

    #[test]
    fn header_embeds_title_and_heading() {
        let header = page_header("foo.py &mdash; proj", "PyCheckMate 1 &ndash; PyFlakes");
        assert!(header.starts_with("<html>\n<head>\n"));
        assert!(header.contains("<title>PyCheckMate foo.py &mdash; proj</title>"));
        assert!(header.contains("<strong class=\"title\">PyCheckMate 1 &ndash; PyFlakes</strong>"));
        assert!(header.contains("span.stderr { color: red; }"));
        assert!(header.ends_with("<div id=\"output\">\n"));
    }

    #[test]
    fn install_hint_lists_every_checker() {
        let hint = install_hint();
        for (name, _) in CHECKER_HOMEPAGES {
            assert!(hint.contains(&format!(">{name}</a>")), "missing {name}");
        }
        assert!(hint.contains("flake8</a> or <a"));
    }

    #[test]
    fn nbsp_repeats_entity() {
        assert_eq!(nbsp(0), "");
        assert_eq!(nbsp(3), "&nbsp;&nbsp;&nbsp;");
    }
}
