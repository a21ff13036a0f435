pub mod boundary;
pub mod branches;
pub mod config;
pub mod dependency;
pub mod describe;
pub mod domain;
pub mod error;
pub mod git;
pub mod output;
pub mod project;
pub mod registry;
pub mod release;
pub mod resolver;
pub mod scanner;
pub mod sources;
pub mod tag_index;
pub mod ui;

pub use error::{CiuxError, Result};
