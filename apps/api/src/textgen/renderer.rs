//! Evaluates a parsed template against a resolved context.

use chrono::{Local, NaiveDate};
use tracing::{debug, warn};

use crate::models::letter::LetterContext;
use crate::textgen::lexer::tokenize;
use crate::textgen::parser::{parse, Node};
use crate::textgen::placeholders::ResolvedContext;
use crate::textgen::TemplateError;

/// Stock cover-letter template offered when the user has none of their own.
pub const DEFAULT_TEMPLATE: &str = "\
{{your_name}}
{{your_address}}
{{your_email}}
{{your_phone}}

{{company}}
{{company_address}}

{{date}}

Betreff: {{subject}}

{% if contact_person %}Sehr geehrte/r {{contact_person}},{% else %}Liebes {{company}}-Recruiting-Team,{% endif %}

mit großem Interesse habe ich Ihre Stellenausschreibung als {{job_title}} gelesen und bewerbe mich hiermit auf diese Position.

[Ihr Bewerbungstext hier]

Mit freundlichen Grüßen

{{your_name}}
";

/// Renders letter templates. Stateless; one instance can serve every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextGenerator;

impl TextGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Renders `template` with today's date as the default for `date`.
    pub fn render(&self, template: &str, context: &LetterContext) -> String {
        self.render_on(template, context, Local::now().date_naive())
    }

    /// Renders `template`, using `today` when the context carries no date.
    ///
    /// Never fails: unknown placeholders and syntax faults come back as a
    /// readable German error line instead of the letter text.
    pub fn render_on(&self, template: &str, context: &LetterContext, today: NaiveDate) -> String {
        let resolved = ResolvedContext::resolve(context, today);
        match compile(template) {
            Ok(nodes) => {
                let mut out = String::with_capacity(template.len());
                evaluate(&nodes, &resolved, &mut out);
                debug!(chars = out.len(), "Template rendered");
                out
            }
            Err(err) => {
                warn!(error = %err, "Template rendering failed");
                match err {
                    TemplateError::UnknownPlaceholder(name) => {
                        format!("Fehler: Unbekannter Platzhalter - {name}")
                    }
                    TemplateError::Syntax { .. } => format!("Fehler beim Rendern: {err}"),
                }
            }
        }
    }
}

fn compile(template: &str) -> Result<Vec<Node>, TemplateError> {
    parse(tokenize(template)?)
}

fn evaluate(nodes: &[Node], context: &ResolvedContext, out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Variable(name) => out.push_str(context.get(name).unwrap_or_default()),
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let truthy = context
                    .get(&condition.name)
                    .map(|value| !value.is_empty())
                    .unwrap_or(false);
                if truthy != condition.negated {
                    evaluate(then_branch, context, out);
                } else {
                    evaluate(else_branch, context, out);
                }
            }
        }
    }
}
