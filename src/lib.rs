// Library root
// -----------
// The binary (`main.rs`) wires these modules into a CLI.
//
// Module responsibilities:
// - `form`: the upload form. Reads four field values and forwards them to
//   an injected `Uploader`, logging the outcome.
// - `hub`: the Hugging Face Hub client that serves as the real uploader.
// - `files`: file selections and directory discovery.
// - `settings`: stored defaults and the write key, with env overrides.
// - `verify`: setup checks.
// - `ui`: terminal prompts and the interactive menu.
pub mod files;
pub mod form;
pub mod hub;
pub mod settings;
pub mod ui;
pub mod verify;
