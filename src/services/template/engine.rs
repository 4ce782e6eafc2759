//! MiniJinja template engine wrapper

use minijinja::{context, Environment, Value};
use pulldown_cmark::{html, Parser};
use anyhow::Result;

pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();

        env.set_debug(cfg!(debug_assertions));

        env.add_template("index.html", include_str!("../../web/templates/index.html"))?;
        env.add_template("summary.html", include_str!("../../web/templates/summary.html"))?;

        env.add_filter("markdown", markdown_filter);

        Ok(Self { env })
    }

    /// Render a template with context
    pub fn render(&self, template_name: &str, ctx: Value) -> Result<String> {
        let template = self.env.get_template(template_name)?;
        Ok(template.render(ctx)?)
    }

    /// Render the page. `summary` is the last display text of the session,
    /// shown again when the page is reloaded.
    pub fn render_index(&self, session_id: &str, input_text: &str, summary: Option<&str>) -> Result<String> {
        self.render("index.html", context! {
            title => "Dialogue Text Summarization",
            version => env!("CARGO_PKG_VERSION"),
            session_id => session_id,
            input_text => input_text,
            summary => summary,
        })
    }

    /// Empty summary container a run streams into
    pub fn render_summary_container(&self, run_id: u64) -> Result<String> {
        self.render("summary.html", context! { run_id => run_id })
    }
}

/// Render untrusted markdown. Raw HTML in the input is escaped first.
pub fn render_markdown(markdown: &str) -> String {
    let escaped = html_escape::encode_text(markdown);
    let parser = Parser::new(&escaped);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

fn markdown_filter(value: &str) -> Value {
    Value::from_safe_string(render_markdown(value))
}
