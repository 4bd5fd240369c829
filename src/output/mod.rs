//! Output formatters for sync reports and category views.
//!
//! - [`text`] for the terminal
//! - [`json`] for scripting
//!
//! # Example
//!
//! ```no_run
//! use snapsweep::output::{text, JsonOutput};
//! # use snapsweep::classify::CategoryView;
//! # use snapsweep::error::ExitCode;
//! # let views: Vec<CategoryView> = Vec::new();
//!
//! text::write_summary(&mut std::io::stdout(), &views).unwrap();
//!
//! let output = JsonOutput::for_summary(None, &views, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::JsonOutput;
