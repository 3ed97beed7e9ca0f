//! Keyword search over reference food descriptions

/// Lowercased distinct terms of a query
///
/// Spaces, commas and periods separate terms.
pub fn search_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in query
        .split(|c: char| c == ' ' || c == ',' || c == '.')
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        let term = term.to_lowercase();
        if !terms.contains(&term) {
            terms.push(term);
        }
    }
    terms
}

/// Every term is part of the description or equals the id
pub fn matches_terms(fdc_id: u32, description: &str, terms: &[String]) -> bool {
    let description = description.to_lowercase();
    let id = fdc_id.to_string();
    terms
        .iter()
        .all(|term| description.contains(term.as_str()) || *term == id)
}
