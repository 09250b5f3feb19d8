mod plugin;
mod markdown;
mod templatize;

pub use plugin::*;
pub use markdown::*;
pub use templatize::*;

use crate::error::Result;
use crate::templating::Engine;
use crate::value::Dict;

/// Renders one content fragment: line endings are normalized, templates are
/// expanded with `context`, and the result is converted to HTML.
pub fn render_fragment(
    engine: &dyn Engine,
    name: &str,
    source: &str,
    context: &Dict,
) -> Result<String> {
    let templatize = Templatize::with(name, engine, context);
    Markdown::new()
        .plugin(&LineEndings)
        .plugin(&templatize)
        .render_named(name, source)
}
