use localrag_core::types::ScoredChunk;

/// "Stuff" prompt: every retrieved chunk goes into one context block ahead of
/// the question.
pub fn build_prompt(question: &str, hits: &[ScoredChunk]) -> String {
    let context = hits.iter().map(|h| h.chunk.text.trim()).collect::<Vec<_>>().join("\n\n");
    format!(
        "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know; don't try to make up an answer.\n\n\
{context}\n\nQuestion: {question}\nHelpful Answer:"
    )
}

/// Distinct chunk sources in first-seen order.
pub fn distinct_sources(hits: &[ScoredChunk]) -> Vec<String> {
    let mut sources: Vec<String> = Vec::new();
    for hit in hits {
        if !sources.iter().any(|s| s == &hit.chunk.source) {
            sources.push(hit.chunk.source.clone());
        }
    }
    sources
}
