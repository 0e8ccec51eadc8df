/// Build the research prompt for one company.
///
/// The model is asked to act as a business research analyst and structure
/// the report into fixed sections, so output stays comparable across
/// companies.
pub fn research_prompt(company_name: &str) -> String {
    format!(
        r#"Please act as a business research analyst.
Your task is to conduct a thorough web search and compile a detailed report on the following company: "{company_name}".

Please include the following information in your report:
1. **Company Overview:** What they do, their mission, and their primary products or services.
2. **History:** When they were founded and key historical milestones.
3. **Leadership:** Key executives (CEO, etc.).
4. **Financials:** Mention any publicly available information about their revenue, funding rounds, or stock performance if applicable.
5. **Recent News:** Summarize any significant news or events from the last 12 months.
6. **Market Position:** Briefly describe their main competitors and their position in the market.

Please ensure the information is accurate and based on reliable web sources. Structure the output in clear, well-organized sections.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_names_the_company() {
        let prompt = research_prompt("Acme Corp");
        assert!(prompt.contains("\"Acme Corp\""));
        assert!(prompt.contains("Market Position"));
    }
}
