use std::fmt::Write as _;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use quire_editor::{Composition, Editor, EditorConfig, builtins};
use quire_model::Node;

#[derive(Parser)]
#[command(version, about = "Quire - structured markdown editing from the command line", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Editor config file (TOML, or JSON with a .json extension)
    #[arg(long, global = true, env = "QUIRE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite markdown in canonical form
    Fmt {
        /// Markdown file, or `-` for stdin
        input: PathBuf,

        /// Fail if the input is not already canonical
        #[arg(long, conflicts_with = "write")]
        check: bool,

        /// Overwrite the input file
        #[arg(long)]
        write: bool,
    },
    /// Print the document tree
    Tree {
        /// Markdown file, or `-` for stdin
        input: PathBuf,

        /// Print JSON instead of an outline
        #[arg(long)]
        json: bool,
    },
    /// Print the highlighted ranges of every code block
    Highlight {
        /// Markdown file, or `-` for stdin
        input: PathBuf,
    },
    /// List enabled extensions, their commands and key bindings
    Commands,
}

fn main() -> Result<()> {
    init_miette();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config);
    let composition = config.build_registry()?;

    match cli.command {
        Commands::Fmt { input, check, write } => {
            let source = read_input(&input)?;
            let formatted = format_markdown(&composition, &source)?;
            if check {
                if formatted != source.trim_end() {
                    return Err(miette::miette!(
                        "{} is not in canonical form",
                        input.display()
                    ));
                }
            } else if write {
                if is_stdin(&input) {
                    return Err(miette::miette!("--write needs a file, not stdin"));
                }
                std::fs::write(&input, format!("{formatted}\n")).into_diagnostic()?;
                tracing::info!(path = %input.display(), "formatted");
            } else {
                println!("{formatted}");
            }
        }
        Commands::Tree { input, json } => {
            let doc = composition.codec.parse(&read_input(&input)?)?;
            if json {
                let value = doc.to_json();
                println!("{}", serde_json::to_string_pretty(&value).into_diagnostic()?);
            } else {
                print!("{}", outline(&doc));
            }
        }
        Commands::Highlight { input } => {
            let source = read_input(&input)?;
            let mut editor =
                Editor::with_history_depth(composition.clone(), composition.codec.parse(&source)?, config.history_depth);
            editor.run_deferred();
            print!("{}", highlight_report(&editor));
        }
        Commands::Commands => print!("{}", commands_report(&composition)),
    }

    Ok(())
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}

/// `RUST_LOG` wins over the config's filter.
fn init_tracing(config: &EditorConfig) {
    let fallback = config.log_filter.as_deref().unwrap_or("warn");
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("quire").join("config.toml"))
}

/// An explicit path must exist; the default location is optional.
fn load_config(explicit: Option<&Path>) -> Result<EditorConfig> {
    if let Some(path) = explicit {
        return Ok(EditorConfig::load(path)?);
    }
    match default_config_path() {
        Some(path) if path.exists() => Ok(EditorConfig::load(&path)?),
        _ => Ok(EditorConfig::default()),
    }
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

fn read_input(path: &Path) -> Result<String> {
    if is_stdin(path) {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).into_diagnostic()?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))
}

fn format_markdown(composition: &Composition, source: &str) -> Result<String> {
    let doc = composition.codec.parse(source)?;
    Ok(composition.codec.serialize(&doc))
}

fn outline(doc: &Node) -> String {
    fn walk(node: &Node, depth: usize, out: &mut String) {
        let indent = "  ".repeat(depth);
        match node.text() {
            Some(text) => {
                let marks: Vec<&str> = node.marks().iter().map(|m| m.ty.name.as_str()).collect();
                if marks.is_empty() {
                    let _ = writeln!(out, "{indent}{text:?}");
                } else {
                    let _ = writeln!(out, "{indent}{text:?} [{}]", marks.join(", "));
                }
            }
            None => {
                let attrs: Vec<String> = node
                    .attrs()
                    .iter()
                    .map(|(name, value)| format!("{name}={}", serde_json::to_string(value).unwrap_or_default()))
                    .collect();
                if attrs.is_empty() {
                    let _ = writeln!(out, "{indent}{}", node.type_name());
                } else {
                    let _ = writeln!(out, "{indent}{} {}", node.type_name(), attrs.join(" "));
                }
                for child in node.content().iter() {
                    walk(child, depth + 1, out);
                }
            }
        }
    }
    let mut out = String::new();
    walk(doc, 0, &mut out);
    out
}

fn highlight_report(editor: &Editor) -> String {
    let doc = editor.doc();
    let mut out = String::new();
    for decoration in editor.decorations() {
        let text = doc.text_between(decoration.from, decoration.to, None, None);
        let _ = writeln!(
            out,
            "{}..{} {} {text:?}",
            decoration.from, decoration.to, decoration.class
        );
    }
    out
}

fn commands_report(composition: &Arc<Composition>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "extensions:");
    for (kind, name) in &composition.units {
        let _ = writeln!(out, "  {name} ({kind})");
    }
    let _ = writeln!(out, "commands:");
    for name in composition.commands.names() {
        let keys: Vec<String> = composition
            .keymap
            .bindings()
            .iter()
            .filter(|b| &b.command == name)
            .map(|b| b.spec.to_string())
            .collect();
        if keys.is_empty() {
            let _ = writeln!(out, "  {name}");
        } else {
            let _ = writeln!(out, "  {name}: {}", keys.join(", "));
        }
    }
    let disabled: Vec<&str> = builtins::NAMES
        .iter()
        .copied()
        .filter(|n| !composition.units.iter().any(|(_, name)| name == n))
        .collect();
    if !disabled.is_empty() {
        let _ = writeln!(out, "disabled: {}", disabled.join(", "));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use quire_editor::{ExtensionRegistry, HighlightOptions};

    fn composition() -> Arc<Composition> {
        EditorConfig::default().build_registry().unwrap()
    }

    #[test]
    fn test_format_is_canonical() {
        let composition = composition();
        let formatted = format_markdown(&composition, "* one\n* two\n\n\n\nText with *em*").unwrap();
        assert_eq!(formatted, "- one\n- two\n\nText with _em_");
        assert_eq!(format_markdown(&composition, &formatted).unwrap(), formatted);
    }

    #[test]
    fn test_outline() {
        let composition = composition();
        let doc = composition.codec.parse("## Hi **there**\n\n- [x] done").unwrap();
        assert_snapshot!(outline(&doc), @r#"
        doc
          heading level=2
            "Hi "
            "there" [strong]
          checkbox_list
            checkbox_item checked=true
              paragraph
                "done"
        "#);
    }

    #[test]
    fn test_highlight_report_lists_code_ranges() {
        let units = builtins::NAMES
            .iter()
            .filter_map(|name| {
                builtins::by_name(name, &HighlightOptions {
                    defer_first_paint: false,
                    ..HighlightOptions::default()
                })
            })
            .collect();
        let composition = ExtensionRegistry::compose(units).unwrap();
        let editor = Editor::from_markdown(composition, "```python\ndef f(): pass\n```").unwrap();
        let report = highlight_report(&editor);
        assert!(report.lines().next().unwrap().starts_with("1..4 "));
        assert!(report.lines().next().unwrap().ends_with("\"def\""));
    }

    #[test]
    fn test_commands_report_shows_bindings() {
        let config = EditorConfig {
            extensions: ["doc", "text", "paragraph", "strong"].map(Into::into).to_vec(),
            ..EditorConfig::default()
        };
        let composition = config.build_registry().unwrap();
        let report = commands_report(&composition);
        assert!(report.contains("  strong (mark)\n"));
        assert!(report.contains("  strong: Mod-b\n"));
        assert!(report.contains("disabled: heading"));
    }
}
