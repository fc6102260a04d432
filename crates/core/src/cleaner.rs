use regex::Regex;
use std::sync::OnceLock;

struct Patterns {
    blocks: Regex,
    comments: Regex,
    tags: Regex,
    entities: Regex,
    urls: Regex,
    symbols: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        blocks: Regex::new(r"(?is)<(script|style|noscript)\b[^>]*>.*?</(script|style|noscript)\s*>")
            .expect("block pattern is valid"),
        comments: Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"),
        tags: Regex::new(r"<[^>]*>").expect("tag pattern is valid"),
        entities: Regex::new(r"&(#[0-9]+|#x[0-9a-fA-F]+|[a-zA-Z]+);").expect("entity pattern is valid"),
        urls: Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("url pattern is valid"),
        symbols: Regex::new(r"[^\p{L}\p{N}\s]").expect("symbol pattern is valid"),
    })
}

pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('\u{a0}', " ")
}

/// Strips markup, scripts, URLs and punctuation from scraped page text.
pub fn clean_text(raw: &str) -> String {
    let patterns = patterns();
    let text = patterns.blocks.replace_all(raw, " ");
    let text = patterns.comments.replace_all(&text, " ");
    let text = patterns.tags.replace_all(&text, " ");
    let text = patterns.entities.replace_all(&text, " ");
    let text = patterns.urls.replace_all(&text, " ");
    let text = patterns.symbols.replace_all(&text, " ");
    normalize_whitespace(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_is_normalized() {
        let input = "A  \t  lot\nof   spacing";
        assert_eq!(normalize_whitespace(input), "A lot of spacing");
    }

    #[test]
    fn scripts_styles_and_tags_are_removed() {
        let html = r#"<html><head><style>.x { color: red; }</style>
            <script type="text/javascript">var jobs = [1, 2];</script></head>
            <body><!-- nav --><h1>Senior  Engineer</h1><p>Rust&nbsp;and Go</p></body></html>"#;

        assert_eq!(clean_text(html), "Senior Engineer Rust and Go");
    }

    #[test]
    fn urls_and_symbols_are_dropped() {
        let text = "Apply at https://careers.example.com/job?id=42 or www.example.com! 5+ years, C++.";
        assert_eq!(clean_text(text), "Apply at or 5 years C");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(clean_text("Data Engineer Remote"), "Data Engineer Remote");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn non_ascii_letters_survive() {
        assert_eq!(clean_text("Développeur <b>München</b>"), "Développeur München");
    }
}
