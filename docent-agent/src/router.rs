//! Query routing: decide whether an input deserves retrieval at all.
//!
//! Casual greetings and meta questions about the index are answered
//! directly; everything else goes through the retrieval path. Matching is
//! exact on the trimmed, lowercased input, so "hello there" still reaches
//! retrieval rather than being swallowed by the greeting table.

/// Where a query should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Small talk with a canned reply.
    Casual(&'static str),
    /// Asking what documents the index knows about.
    ListSources,
    /// A real question, answered via retrieval and generation.
    Retrieval,
}

const CASUAL_REPLIES: &[(&str, &str)] = &[
    ("hi", "Hello! How can I assist you today?"),
    ("hello", "Hi there! How can I help you?"),
    ("hey", "Hello! I'm here to assist you with your queries."),
    ("how are you?", "I'm here and ready to assist with any queries you have!"),
    ("can you help me?", "Of course! Let me know what you need help with."),
];

const SOURCE_QUESTIONS: &[&str] = &[
    "list sources",
    "what are the sources you have?",
    "what sources do you have?",
];

/// Classify one user input.
pub fn route(query: &str) -> Route {
    let normalized = query.trim().to_lowercase();
    for (phrase, reply) in CASUAL_REPLIES {
        if normalized == *phrase {
            return Route::Casual(reply);
        }
    }
    if SOURCE_QUESTIONS.contains(&normalized.as_str()) {
        return Route::ListSources;
    }
    Route::Retrieval
}
