//! Integration tests for focuser

mod helpers;
mod test_cli;
mod test_focus;
mod test_guard;
