/// Put the reference dataset ahead of the operator's question
pub fn build_grounded_prompt(domain: &str, data: &str, question: &str) -> String {
    format!(
        "Based on the following {} data:\n\n{}\n\n{}",
        domain, data, question
    )
}
