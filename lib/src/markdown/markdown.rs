use std::borrow::Cow;

use pulldown_cmark::{html, Options, Parser};

use crate::markdown::Plugin;
use crate::error::{Chainable, Result};

/// A markdown to HTML renderer with an ordered list of preprocessing plugins.
pub struct Markdown<'p> {
    options: Options,
    plugins: Vec<&'p dyn Plugin>,
}

impl Default for Markdown<'_> {
    fn default() -> Self {
        Markdown::new()
    }
}

impl<'p> Markdown<'p> {
    /// A renderer with the "extra" feature set: tables, footnotes,
    /// strikethrough, task lists, and heading attributes.
    pub fn new() -> Self {
        let options = Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_HEADING_ATTRIBUTES;

        Markdown { options, plugins: vec![] }
    }

    pub fn plugin(mut self, plugin: &'p dyn Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    pub fn render(&self, input: &str) -> Result<String> {
        let mut source = Cow::Borrowed(input);
        for plugin in &self.plugins {
            source = match source {
                Cow::Borrowed(input) => plugin.preprocess(input)?,
                Cow::Owned(input) => {
                    let processed = match plugin.preprocess(&input)? {
                        Cow::Borrowed(s) if std::ptr::eq(s, input.as_str()) => None,
                        other => Some(other.into_owned()),
                    };

                    Cow::Owned(processed.unwrap_or(input))
                }
            };
        }

        let parser = Parser::new_ext(&source, self.options);
        let mut output = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut output, parser);
        Ok(output)
    }

    /// Renders `input`, adding `name` to the context of any error.
    pub fn render_named(&self, name: &str, input: &str) -> Result<String> {
        self.render(input).chain_with(|| error! {
            "failed to render markdown",
            "fragment" => name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::LineEndings;

    #[test]
    fn extra_features_are_enabled() {
        let md = Markdown::new();
        let html = md.render("| a | b |\n|---|---|\n| 1 | 2 |\n").unwrap();
        assert!(html.contains("<table>"));

        let html = md.render("~~gone~~").unwrap();
        assert!(html.contains("<del>gone</del>"));

        let html = md.render("- [x] done\n").unwrap();
        assert!(html.contains("checkbox"));

        let html = md.render("# Title {#intro}\n").unwrap();
        assert!(html.contains("id=\"intro\""));
    }

    #[test]
    fn plugins_preprocess_in_order() {
        let html = Markdown::new().plugin(&LineEndings).render("one\r\n\r\ntwo").unwrap();
        assert_eq!(html, "<p>one</p>\n<p>two</p>\n");
    }
}
