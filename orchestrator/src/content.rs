use echopost_core::{CandidatePost, CoreError};
use llm_interface::OpenRouterClient;
use tracing::{debug, warn};

/// Comment text source: a canned template with placeholder substitution, or
/// a text-generation call. Both return either complete text or `None`.
pub enum CommentGenerator {
    Template(TemplateGenerator),
    Generative(GenerativeCommenter),
}

impl CommentGenerator {
    /// Produce comment text for a post, or `None` when no usable text could
    /// be generated. Generation failures are logged here so callers can
    /// skip-and-continue.
    pub async fn generate(&self, post: &CandidatePost) -> Option<String> {
        match self {
            CommentGenerator::Template(t) => t.generate(post),
            CommentGenerator::Generative(g) => match g.generate(post).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!("Comment generation failed for {}: {}", post.id, e);
                    None
                }
            },
        }
    }
}

pub struct TemplateGenerator {
    templates: Vec<String>,
}

impl TemplateGenerator {
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates }
    }

    pub fn generate(&self, post: &CandidatePost) -> Option<String> {
        if self.templates.is_empty() {
            return None;
        }
        let template = &self.templates[fastrand::usize(..self.templates.len())];
        Some(fill_template(template, post))
    }
}

/// Substitute `{post_title}` / `{subreddit}` placeholders. A template that
/// names a placeholder with no known substitution is returned unfilled
/// rather than failing the run.
pub fn fill_template(template: &str, post: &CandidatePost) -> String {
    let known = [
        ("{post_title}", post.title.as_str()),
        ("{subreddit}", post.subreddit.as_str()),
    ];

    if has_unknown_placeholder(template, &known) {
        debug!("Template names an unknown placeholder, leaving it unfilled");
        return template.to_string();
    }

    let mut filled = template.to_string();
    for (placeholder, value) in known {
        filled = filled.replace(placeholder, value);
    }
    filled
}

fn has_unknown_placeholder(template: &str, known: &[(&str, &str)]) -> bool {
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let tail = &rest[start + 1..];
        match tail.find(['{', '}']) {
            // A closed `{…}` token: unknown names trigger the fallback
            Some(pos) if tail.as_bytes()[pos] == b'}' => {
                let token = &rest[start..start + pos + 2];
                if !known.iter().any(|(placeholder, _)| *placeholder == token) {
                    return true;
                }
                rest = &rest[start + pos + 2..];
            }
            // A stray `{` with no closer before the next `{`: skip past it
            Some(pos) => {
                rest = &rest[start + 1 + pos..];
            }
            None => return false,
        }
    }
    false
}

pub struct GenerativeCommenter {
    client: OpenRouterClient,
    prompt: String,
    style_instructions: String,
}

impl GenerativeCommenter {
    pub fn new(client: OpenRouterClient, prompt: String, style_instructions: String) -> Self {
        Self {
            client,
            prompt,
            style_instructions,
        }
    }

    async fn generate(&self, post: &CandidatePost) -> Result<String, CoreError> {
        let body = post.body.as_deref().unwrap_or("(No post text)");
        let user_prompt = format!(
            "{}\n\nPost: Title: {}\n\nContent: {}",
            self.prompt, post.title, body
        );
        self.client
            .complete(&self.style_instructions, &user_prompt)
            .await
    }
}
