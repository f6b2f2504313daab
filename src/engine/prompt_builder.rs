use crate::engine::plan_validator::{PlanDefaults, ALLOWED_ENDPOINTS};

/// Builds the full prompt sent to the model.
/// Only formats text: no parsing, no networking.
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build(defaults: &PlanDefaults, user_message: &str) -> String {
        let mut prompt = String::new();

        push_system_prompt(&mut prompt);
        push_allowed_endpoints(&mut prompt);
        push_format_example(&mut prompt, defaults);
        push_rules(&mut prompt);
        push_user_request(&mut prompt, user_message);

        prompt
    }
}

fn push_system_prompt(prompt: &mut String) {
    prompt.push_str(
        "You are an agent that edits Jupyter notebooks through a fixed HTTP API.\n\n\
Return ONLY valid JSON.\n\
NO markdown, NO explanations, NO code fences.\n\n",
    );
}

fn push_allowed_endpoints(prompt: &mut String) {
    prompt.push_str("Allowed endpoints:\n");
    for endpoint in ALLOWED_ENDPOINTS {
        prompt.push_str("- ");
        prompt.push_str(endpoint);
        prompt.push('\n');
    }
    prompt.push('\n');
}

fn push_format_example(prompt: &mut String, defaults: &PlanDefaults) {
    let example = serde_json::json!({
        "actions": [
            {
                "endpoint": "/create_cell",
                "method": "POST",
                "payload": {
                    "notebook_name": defaults.notebook_name,
                    "cell_type": "markdown",
                    "content": "# Title"
                }
            }
        ]
    });

    prompt.push_str("JSON format:\n");
    prompt.push_str(&serde_json::to_string_pretty(&example).unwrap_or_default());
    prompt.push_str("\n\n");
}

fn push_rules(prompt: &mut String) {
    prompt.push_str(
        "Rules:\n\
- Always include notebook_name\n\
- cell_type is \"markdown\" or \"code\"\n\
- Use markdown for titles and prose, code for runnable snippets\n\
- Emit one action per cell, in the order the cells should appear\n\
- Do NOT invent endpoints\n\n",
    );
}

fn push_user_request(prompt: &mut String, user_message: &str) {
    prompt.push_str("User request:\n");
    prompt.push_str(user_message.trim());
    prompt.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_lists_endpoints_and_ends_with_request() {
        let prompt = PromptBuilder::build(&PlanDefaults::default(), "  add a title  ");

        assert!(prompt.contains("- /create_cell\n"));
        assert!(prompt.contains("\"notebook_name\": \"example.ipynb\""));
        assert!(prompt.ends_with("User request:\nadd a title\n"));
    }
}
