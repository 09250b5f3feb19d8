use std::borrow::Cow;

use crate::markdown::Plugin;
use crate::templating::Engine;
use crate::value::Dict;
use crate::error::{Result, Chainable};

/// Runs the source through the template engine, with `context` as the
/// template's variables, when the source looks like a template.
pub struct Templatize<'m> {
    name: &'m str,
    engine: &'m dyn Engine,
    context: &'m Dict,
}

impl<'m> Templatize<'m> {
    pub fn with(name: &'m str, engine: &'m dyn Engine, context: &'m Dict) -> Self {
        Self { name, engine, context }
    }
}

impl Plugin for Templatize<'_> {
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        if !crate::util::is_template(input) {
            return Ok(Cow::Borrowed(input));
        }

        self.engine.render_str(self.name, input, self.context)
            .chain_with(|| error! {
                "markdown templatization failed",
                "template" => self.name,
            })
            .map(Cow::Owned)
    }
}
