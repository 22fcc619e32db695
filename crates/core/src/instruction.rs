//! System instruction rendering for live voice sessions.

/// Placeholder in the persona template that receives the glossary rules.
pub const GLOSSARY_PLACEHOLDER: &str = "{glossary_rules}";

/// Interpolates the correction rules into the persona template.
///
/// A template without the placeholder gets the rules appended, so a glossary
/// is never silently dropped.
pub fn render_system_instruction(template: &str, glossary_rules: &str) -> String {
    if template.contains(GLOSSARY_PLACEHOLDER) {
        template.replace(GLOSSARY_PLACEHOLDER, glossary_rules)
    } else if glossary_rules.is_empty() {
        template.to_string()
    } else {
        format!("{}\n\n{}", template.trim_end(), glossary_rules)
    }
}
