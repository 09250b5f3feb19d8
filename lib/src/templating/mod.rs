pub mod minijinja;

use std::fmt::Debug;

use crate::error::Result;
use crate::value::Dict;

pub use self::minijinja::{ImageIndex, MiniJinjaEngine};

/// A template engine used to expand directives inside content fragments.
pub trait Engine: Send + Sync + Debug {
    /// Renders the template `template_str`, identified as `name` in errors,
    /// with `context` as its variables.
    fn render_str(&self, name: &str, template_str: &str, context: &Dict) -> Result<String>;
}

#[cfg(test)] static_assertions::assert_obj_safe!(Engine);
#[cfg(test)] static_assertions::assert_impl_all!(MiniJinjaEngine: Engine);
