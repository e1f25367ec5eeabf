//! Code block languages and their syntect grammars.

use std::sync::LazyLock;

use smol_str::SmolStr;
use syntect::easy::ScopeRangeIterator;
use syntect::parsing::{ParseState, ScopeStack, SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

/// A language a code block can be tagged with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    pub id: &'static str,
    pub label: &'static str,
    /// syntect lookup tokens, tried in order.
    tokens: &'static [&'static str],
}

const fn language(id: &'static str, label: &'static str, tokens: &'static [&'static str]) -> Language {
    Language { id, label, tokens }
}

/// The languages offered for code blocks. `none` is plain text.
pub const LANGUAGES: &[Language] = &[
    language("none", "Plain text", &[]),
    language("bash", "Bash", &["bash", "sh"]),
    language("css", "CSS", &["css"]),
    language("clike", "C", &["c", "h"]),
    language("csharp", "C#", &["cs"]),
    language("go", "Go", &["go"]),
    language("markup", "HTML", &["html", "xml"]),
    language("objectivec", "Objective-C", &["m"]),
    language("java", "Java", &["java"]),
    language("javascript", "JavaScript", &["js"]),
    language("json", "JSON", &["json"]),
    language("perl", "Perl", &["pl"]),
    language("php", "PHP", &["php"]),
    language("powershell", "PowerShell", &["ps1"]),
    language("python", "Python", &["py"]),
    language("ruby", "Ruby", &["rb"]),
    language("rust", "Rust", &["rs"]),
    language("sql", "SQL", &["sql"]),
    language("solidity", "Solidity", &["sol"]),
    language("typescript", "TypeScript", &["ts", "js"]),
    language("yaml", "YAML", &["yaml", "yml"]),
];

pub fn find_language(id: &str) -> Option<&'static Language> {
    LANGUAGES.iter().find(|lang| lang.id == id)
}

impl Language {
    /// The grammar for this language, when the bundled syntaxes have one.
    pub fn syntax(&self) -> Option<&'static SyntaxReference> {
        self.tokens
            .iter()
            .find_map(|token| SYNTAX_SET.find_syntax_by_token(token))
    }
}

/// A styled run of a code block, in characters from the start of its text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    pub from: usize,
    pub to: usize,
    pub class: SmolStr,
}

/// Tokenize `text` as `language`. Unknown languages, `none` and languages
/// without a bundled grammar give no spans.
pub fn tokenize(text: &str, language: &str) -> Vec<Span> {
    let Some(syntax) = find_language(language).and_then(Language::syntax) else {
        return Vec::new();
    };
    let mut state = ParseState::new(syntax);
    let mut stack = ScopeStack::new();
    let mut spans: Vec<Span> = Vec::new();
    let mut offset = 0;

    for line in LinesWithEndings::from(text) {
        let ops = match state.parse_line(line, &SYNTAX_SET) {
            Ok(ops) => ops,
            Err(error) => {
                tracing::warn!(target: "quire::highlight", %error, language, "tokenizer failed");
                return spans;
            }
        };
        for (range, op) in ScopeRangeIterator::new(&ops, line) {
            if let Err(error) = stack.apply(op) {
                tracing::warn!(target: "quire::highlight", ?error, language, "bad scope stack");
                return spans;
            }
            if range.is_empty() {
                continue;
            }
            let from = offset + line[..range.start].chars().count();
            let to = from + line[range].chars().count();
            // The outermost scope is the language itself.
            let scopes = stack.as_slice();
            if scopes.len() <= 1 {
                continue;
            }
            let Some(innermost) = scopes.last() else { continue };
            let class = SmolStr::new(innermost.build_string());
            match spans.last_mut() {
                Some(last) if last.to == from && last.class == class => last.to = to,
                _ => spans.push(Span { from, to, class }),
            }
        }
        offset += line.chars().count();
    }
    spans
}
