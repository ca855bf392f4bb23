use serde_json::Value;
use tracing::warn;

const INSTRUCTIONS: [&str; 12] = [
    "You are an intelligent assistant that helps users interact with document content.",
    "Classify the input as one of the following:",
    "- Greeting (e.g., 'hello', 'hi')",
    "- Gratitude (e.g., 'thank you')",
    "- Relevant question related to the document",
    "- Irrelevant question unrelated to the document",
    "- Other input",
    "Respond appropriately based on the classification:",
    "- For greeting: Acknowledge and invite the user to ask a question.",
    "- For gratitude: Thank them and offer further assistance.",
    "- For relevant questions: Provide a detailed, direct answer using the document context. Ensure the response is clear, complete, and contains key information needed to fully answer the question.",
    "- For irrelevant questions: Politely state that you're limited to document-related queries.",
];

/// Assembles the question prompt from document context.
pub fn build_prompt(summary: &str, tables: &[String], question: &str) -> String {
    let mut parts: Vec<String> = INSTRUCTIONS.iter().map(|line| line.to_string()).collect();

    if !summary.is_empty() {
        parts.push(format!("Document Summary:\n{}", summary));
    }
    if !tables.is_empty() {
        let numbered: Vec<String> = tables
            .iter()
            .enumerate()
            .map(|(i, table)| format!("Table {}:\n{}", i + 1, table))
            .collect();
        parts.push(format!("Tables:\n{}", numbered.join(" ")));
    }
    parts.push(format!("User Input: {}", question));

    parts.join("\n\n")
}

/// Splits row-oriented tables longer than `max_rows` into consecutive chunks.
///
/// Tables that are not JSON arrays are dropped with a warning.
pub fn split_large_tables(tables: &[String], max_rows: usize) -> Vec<String> {
    let max_rows = max_rows.max(1);
    let mut chunks = Vec::new();

    for table in tables {
        let rows = match serde_json::from_str::<Value>(table) {
            Ok(Value::Array(rows)) => rows,
            Ok(_) => {
                warn!("Stored table is not a list of rows, skipping it");
                continue;
            }
            Err(e) => {
                warn!(error = %e, "Error processing table");
                continue;
            }
        };

        if rows.len() <= max_rows {
            chunks.push(table.clone());
            continue;
        }
        for chunk in rows.chunks(max_rows) {
            match serde_json::to_string(chunk) {
                Ok(json) => chunks.push(json),
                Err(e) => warn!(error = %e, "Error processing table chunk"),
            }
        }
    }

    chunks
}
