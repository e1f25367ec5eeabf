//! Built-in behavior units.

use chrono::Local;
use smol_str::SmolStr;

use crate::commands::{
    Stamp, clear_nodes, delete_selection, format_stamp, insert_stamp, join_backward, redo,
    select_all, split_block, undo,
};
use crate::extension::{Extension, command, key};
use crate::highlight::{HighlightOptions, HighlightPlugin};
use crate::input_rules::text_rule;

pub fn history() -> Extension {
    Extension::behavior("history")
        .with_keys(|_| {
            vec![
                key("Mod-z", "undo"),
                key("Shift-Mod-z", "redo"),
                key("Mod-y", "redo"),
            ]
        })
        .with_commands(|_| {
            vec![
                (SmolStr::new("undo"), command(|state, _| undo(state))),
                (SmolStr::new("redo"), command(|state, _| redo(state))),
            ]
        })
}

/// The base keymap. Registered after the node units so their more
/// specific bindings for the same keys are tried first.
pub fn keys() -> Extension {
    Extension::behavior("keys")
        .with_keys(|_| {
            vec![
                key("Enter", "split_block"),
                key("Backspace", "delete_selection"),
                key("Backspace", "join_backward"),
                key("Delete", "delete_selection"),
                key("Mod-a", "select_all"),
                key("Shift-Ctrl-Backspace", "clear_nodes"),
            ]
        })
        .with_commands(|_| {
            vec![
                (SmolStr::new("split_block"), command(|state, _| split_block(state))),
                (SmolStr::new("join_backward"), command(|state, _| join_backward(state))),
                (SmolStr::new("delete_selection"), command(|state, _| delete_selection(state))),
                (SmolStr::new("select_all"), command(|state, _| select_all(state))),
                (SmolStr::new("clear_nodes"), command(|state, _| clear_nodes(state))),
            ]
        })
}

/// `/date`, `/time` and `/datetime` followed by a space, and commands of
/// the same names.
pub fn date_time() -> Extension {
    Extension::behavior("date_time")
        .with_input_rules(|_| {
            [("date", Stamp::Date), ("time", Stamp::Time), ("datetime", Stamp::DateTime)]
                .into_iter()
                .map(|(name, kind)| {
                    text_rule(name, &format!(r"/{name}\s$"), move |_| {
                        format!("{} ", format_stamp(kind, Local::now()))
                    })
                })
                .collect()
        })
        .with_commands(|_| {
            vec![
                (SmolStr::new("date"), command(|state, _| insert_stamp(state, Stamp::Date))),
                (SmolStr::new("time"), command(|state, _| insert_stamp(state, Stamp::Time))),
                (
                    SmolStr::new("datetime"),
                    command(|state, _| insert_stamp(state, Stamp::DateTime)),
                ),
            ]
        })
}

/// Code block highlighting with the given options.
pub fn highlight(options: HighlightOptions) -> Extension {
    Extension::behavior("highlight").with_plugin(move |_| Box::new(HighlightPlugin::new(options.clone())))
}
