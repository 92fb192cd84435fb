//! Planning prompt composition

use kiln_bundle::{CHANGE_FENCE, FENCE};
use kiln_router::ChatMessage;

/// System prompt describing the proposal format
#[must_use]
pub fn system_prompt() -> String {
    format!(
        "You are a coding agent editing a project through change bundles.\n\
         Reply with one block per file change. Each block starts with a header:\n\n\
         {CHANGE_FENCE}\n\
         operation: CREATE | MODIFY | DELETE\n\
         file_path: <path>\n\
         {FENCE}\n\n\
         CREATE and MODIFY headers are followed by a fenced region holding the\n\
         complete new file content. DELETE takes no content. Content must not\n\
         contain a bare {FENCE} line."
    )
}

/// User prompt embedding the goal, the context bundle and any prior failure
#[must_use]
pub fn user_prompt(goal: &str, context: &str, last_error: Option<&str>) -> String {
    let mut prompt = format!("Goal: {goal}\n\nCurrent context:\n{context}");
    if let Some(error) = last_error {
        prompt.push_str(&format!(
            "\n\nThe previous proposal failed:\n{error}\nRevise the changes to fix this."
        ));
    }
    prompt
}

/// Full planning conversation
#[must_use]
pub fn compose(goal: &str, context: &str, last_error: Option<&str>) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(system_prompt()),
        ChatMessage::user(user_prompt(goal, context, last_error)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_router::Role;

    #[test]
    fn first_attempt_has_no_failure_section() {
        let messages = compose("Add dark mode", "ctx", None);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains(CHANGE_FENCE));
        assert!(messages[1].content.contains("Goal: Add dark mode"));
        assert!(messages[1].content.contains("ctx"));
        assert!(!messages[1].content.contains("previous proposal failed"));
    }

    #[test]
    fn retry_embeds_prior_failure() {
        let prompt = user_prompt("g", "ctx", Some("verification failed: lint"));
        assert!(prompt.contains("The previous proposal failed:\nverification failed: lint"));
    }
}
