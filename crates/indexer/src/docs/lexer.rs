use regex::Regex;

/// A lexical token: byte offset into the snippet, category and literal text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexToken {
    pub offset: usize,
    pub category: String,
    pub text: String,
}

pub trait Lexer: Send + Sync {
    /// Tokens in source order; concatenating their text yields `text`.
    fn tokenize(&self, text: &str) -> Vec<LexToken>;
}

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

const BUILTINS: &[&str] = &[
    "abs", "all", "any", "bool", "bytes", "dict", "enumerate", "filter", "float", "int",
    "isinstance", "len", "list", "map", "max", "min", "object", "print", "range", "repr", "set",
    "sorted", "str", "sum", "tuple", "type", "zip",
];

/// Regex lexer for Python-like example snippets.
pub struct PythonLexer {
    pattern: Regex,
}

impl Default for PythonLexer {
    fn default() -> Self {
        Self::new()
    }
}

impl PythonLexer {
    pub fn new() -> Self {
        let pattern = [
            r#"(?P<ws>\s+)"#,
            r#"(?P<comment>#[^\n]*)"#,
            r#"(?P<string>[rRbBuUfF]{0,2}(?:"""(?s:.*?)"""|'''(?s:.*?)'''|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'))"#,
            r#"(?P<number>(?:\d[\d_]*(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?[jJ]?)"#,
            r#"(?P<name>[A-Za-z_][A-Za-z0-9_]*)"#,
            r#"(?P<operator>\*\*=?|//=?|->|:=|<<=?|>>=?|[-+*/%@&|^~<>=!]=?)"#,
            r#"(?P<punctuation>[()\[\]{},;:.])"#,
            r#"(?P<error>(?s:.))"#,
        ]
        .join("|");
        Self {
            pattern: Regex::new(&pattern).expect("valid lexer regex"),
        }
    }

    fn classify(&self, captures: &regex::Captures<'_>) -> &'static str {
        if captures.name("ws").is_some() {
            "Whitespace"
        } else if captures.name("comment").is_some() {
            "Comment"
        } else if captures.name("string").is_some() {
            "String"
        } else if captures.name("number").is_some() {
            "Number"
        } else if let Some(name) = captures.name("name") {
            if KEYWORDS.contains(&name.as_str()) {
                "Keyword"
            } else if BUILTINS.contains(&name.as_str()) {
                "Builtin"
            } else {
                "Name"
            }
        } else if captures.name("operator").is_some() {
            "Operator"
        } else if captures.name("punctuation").is_some() {
            "Punctuation"
        } else {
            "Error"
        }
    }
}

impl Lexer for PythonLexer {
    fn tokenize(&self, text: &str) -> Vec<LexToken> {
        self.pattern
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                Some(LexToken {
                    offset: whole.start(),
                    category: self.classify(&captures).to_string(),
                    text: whole.as_str().to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn categories(text: &str) -> Vec<(String, String)> {
        PythonLexer::new()
            .tokenize(text)
            .into_iter()
            .filter(|token| token.category != "Whitespace")
            .map(|token| (token.category, token.text))
            .collect()
    }

    #[test]
    fn test_tokens_cover_the_whole_input() {
        let text = "x = np.linspace(2.0, 3.0, num=5)  # five\nprint(f'{x}')\n";
        let tokens = PythonLexer::new().tokenize(text);
        let rebuilt: String = tokens.iter().map(|token| token.text.as_str()).collect();
        assert_eq!(rebuilt, text);

        let mut expected_offset = 0;
        for token in &tokens {
            assert_eq!(token.offset, expected_offset);
            expected_offset += token.text.len();
        }
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            categories("import numpy as np\nlen(np.pi) ** 2 # c"),
            vec![
                ("Keyword".to_string(), "import".to_string()),
                ("Name".to_string(), "numpy".to_string()),
                ("Keyword".to_string(), "as".to_string()),
                ("Name".to_string(), "np".to_string()),
                ("Builtin".to_string(), "len".to_string()),
                ("Punctuation".to_string(), "(".to_string()),
                ("Name".to_string(), "np".to_string()),
                ("Punctuation".to_string(), ".".to_string()),
                ("Name".to_string(), "pi".to_string()),
                ("Punctuation".to_string(), ")".to_string()),
                ("Operator".to_string(), "**".to_string()),
                ("Number".to_string(), "2".to_string()),
                ("Comment".to_string(), "# c".to_string()),
            ]
        );
    }

    #[test]
    fn test_strings_and_prefixes() {
        assert_eq!(
            categories(r#"r"a\"b" rb'x' '''multi
line''' .5"#),
            vec![
                ("String".to_string(), r#"r"a\"b""#.to_string()),
                ("String".to_string(), "rb'x'".to_string()),
                ("String".to_string(), "'''multi\nline'''".to_string()),
                ("Number".to_string(), ".5".to_string()),
            ]
        );
    }

    #[test]
    fn test_unknown_characters_become_error_tokens() {
        assert_eq!(
            categories("a $ b"),
            vec![
                ("Name".to_string(), "a".to_string()),
                ("Error".to_string(), "$".to_string()),
                ("Name".to_string(), "b".to_string()),
            ]
        );
    }
}
