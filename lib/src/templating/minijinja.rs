use std::sync::Arc;

use minijinja::Environment;
use minijinja::value::Value;
use rustc_hash::FxHashMap;

use crate::error::Result;
use crate::store::AssetId;
use crate::templating::Engine;
use crate::value::Dict;

/// Images addressable from templates, keyed by file name.
pub type ImageIndex = FxHashMap<String, AssetId>;

#[derive(Debug)]
pub struct MiniJinjaEngine {
    env: Environment<'static>,
}

impl MiniJinjaEngine {
    /// An engine exposing `globals` as `G` along with the `image`, `link`, and
    /// `now` functions. `image` resolves names against `images`.
    pub fn new(globals: &Dict, images: ImageIndex) -> Self {
        let images = Arc::new(images);
        let mut env = Environment::new();
        env.add_global("G", Value::from_serialize(globals));
        env.add_function("image", move |name: String, format: Option<String>, alt: Option<String>| {
            ext::image(&images, &name, format.as_deref(), alt.as_deref())
        });

        env.add_function("link", ext::link);
        env.add_function("now", ext::now);
        MiniJinjaEngine { env }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        MiniJinjaEngine::new(&Dict::new(), ImageIndex::default())
    }
}

impl Engine for MiniJinjaEngine {
    fn render_str(&self, name: &str, template_str: &str, context: &Dict) -> Result<String> {
        Ok(self.env.render_named_str(name, template_str, context)?)
    }
}

mod ext {
    use minijinja::value::Value;
    use pulldown_cmark_escape::escape_html;

    use super::ImageIndex;

    fn escape(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        // Writing into a `String` cannot fail.
        let _ = escape_html(&mut escaped, value);
        escaped
    }

    /// A rich-text image embed, or a loud marker when the image is unknown.
    pub fn image(images: &ImageIndex, name: &str, format: Option<&str>, alt: Option<&str>) -> Value {
        let html = match images.get(name) {
            Some(id) => format!(
                "<embed alt=\"{}\" embedtype=\"image\" format=\"{}\" id=\"{}\"/>",
                escape(alt.unwrap_or_default()),
                escape(format.unwrap_or("fullwidth")),
                id.0,
            ),
            None => {
                tracing::error!(image = name, "template references a missing image");
                format!("<span style='background: red; color: white'>MISSING IMAGE {}</span>",
                    escape(name))
            }
        };

        Value::from_safe_string(html)
    }

    /// A link to the page at `path`, resolved when the rich text is served.
    pub fn link(path: String, text: Option<String>) -> Value {
        let path = crate::util::normalize_path(&path);
        let text = text.unwrap_or_else(|| path.clone());
        Value::from_safe_string(format!(
            "<a data-linktype=\"proto-page\" href=\"{}\">{}</a>",
            escape(&path), escape(&text)
        ))
    }

    pub fn now(fmt: Option<String>) -> String {
        let fmt = fmt.as_deref().unwrap_or("%Y-%m-%d %H:%M:%S");
        chrono::Local::now().format(fmt).to_string()
    }
}

impl_error_detail_with_std_error!(minijinja::Error);

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MiniJinjaEngine {
        let globals = crate::dict!["company" => "Acme"];
        let mut images = ImageIndex::default();
        images.insert("urn.jpg".into(), AssetId(7));
        MiniJinjaEngine::new(&globals, images)
    }

    #[test]
    fn context_and_globals() {
        let context = crate::dict!["title" => "About"];
        let out = engine().render_str("t", "{{ title }} at {{ G.company }}", &context).unwrap();
        assert_eq!(out, "About at Acme");
    }

    #[test]
    fn image_embeds_and_missing_marker() {
        let out = engine().render_str("t", "{{ image('urn.jpg', 'right', 'urn') }}", &Dict::new()).unwrap();
        assert_eq!(out, "<embed alt=\"urn\" embedtype=\"image\" format=\"right\" id=\"7\"/>");

        let out = engine().render_str("t", "{{ image('nope.jpg', 'left', '') }}", &Dict::new()).unwrap();
        assert!(out.contains("MISSING IMAGE nope.jpg"));
    }

    #[test]
    fn embed_attributes_are_escaped() {
        let out = engine().render_str("t", r#"{{ image('urn.jpg', 'left', '"Urn" <&>') }}"#, &Dict::new()).unwrap();
        assert!(out.contains("alt=\"&quot;Urn&quot; &lt;&amp;&gt;\""));
    }

    #[test]
    fn links_use_normalized_paths() {
        let out = engine().render_str("t", "{{ link('about/team', 'Team') }}", &Dict::new()).unwrap();
        assert_eq!(out, "<a data-linktype=\"proto-page\" href=\"/about/team/\">Team</a>");
    }

    #[test]
    fn syntax_errors_are_reported() {
        assert!(engine().render_str("t", "{{ oops", &Dict::new()).is_err());
    }
}
