#![allow(clippy::cast_possible_truncation)]

pub use self::{
    code_dialog::CodeDialog,
    help_dialog::HelpDialog,
    list::{List, State as ListState},
    scrollbar::ScrollBar,
};

mod code_dialog;
mod help_dialog;
mod list;
mod scrollbar;
