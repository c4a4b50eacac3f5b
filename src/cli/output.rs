use std::fmt::Write as FmtWrite;

use console::style;

use crate::models::{OutputFormat, RouteResult};
use crate::utils::truncate_snippet;

/// Display cap for each retrieved snippet in text output.
const SNIPPET_PREVIEW_CHARS: usize = 300;

pub trait Formatter {
    fn format_route_result(&self, result: &RouteResult) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_ingest_stats(&self, stats: &IngestStats) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub index_path: String,
    pub index_exists: bool,
    pub chunks: u64,
    pub documents: Vec<String>,
    /// Embedder tag stored in the index file, which may differ from the
    /// configured one.
    pub index_model: Option<String>,
    pub index_dimension: Option<usize>,
    pub embedder_model: String,
    pub dimension: usize,
    pub embedding_url: String,
    pub embedding_reachable: bool,
}

#[derive(Debug, Clone, Default)]
pub struct IngestStats {
    pub files_discovered: u64,
    pub documents_loaded: u64,
    pub chunks_added: u64,
    pub chunks_skipped: u64,
    /// (source id, reason) for every document or file that failed.
    pub failures: Vec<(String, String)>,
    pub duration_ms: u64,
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_route_result(&self, result: &RouteResult) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "{} {}",
            style("Tool Used:").bold(),
            result.tool
        )
        .unwrap();

        if let Some(snippets) = result.snippets() {
            writeln!(output).unwrap();
            writeln!(output, "{}", style("Retrieved Context:").bold()).unwrap();
            for (i, snippet) in snippets.iter().enumerate() {
                writeln!(
                    output,
                    "  {}. {}",
                    i + 1,
                    truncate_snippet(snippet, SNIPPET_PREVIEW_CHARS)
                )
                .unwrap();
            }
        }

        writeln!(output).unwrap();
        writeln!(output, "{}", style("Answer:").bold()).unwrap();
        writeln!(output, "  {}", result.answer_text()).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        let embedding_status = if status.embedding_reachable {
            "[REACHABLE]"
        } else {
            "[UNREACHABLE]"
        };
        writeln!(output, "Embedding:  {}", embedding_status).unwrap();
        writeln!(output, "  URL:      {}", status.embedding_url).unwrap();
        writeln!(output, "  Model:    {}", status.embedder_model).unwrap();
        writeln!(output, "  Dim:      {}", status.dimension).unwrap();
        writeln!(output).unwrap();

        let index_status = if status.index_exists {
            "[PRESENT]"
        } else {
            "[EMPTY]"
        };
        writeln!(output, "Index:      {}", index_status).unwrap();
        writeln!(output, "  Path:     {}", status.index_path).unwrap();
        if let Some(ref model) = status.index_model {
            writeln!(output, "  Model:    {}", model).unwrap();
        }
        if let Some(dim) = status.index_dimension {
            writeln!(output, "  Dim:      {}", dim).unwrap();
        }
        writeln!(output, "  Chunks:   {}", status.chunks).unwrap();
        writeln!(output, "  Documents: {}", status.documents.len()).unwrap();
        for name in &status.documents {
            writeln!(output, "    {}", name).unwrap();
        }
        output
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        let mut output = String::new();
        writeln!(output, "Ingestion Complete").unwrap();
        writeln!(output, "------------------").unwrap();
        writeln!(output, "Files discovered: {}", stats.files_discovered).unwrap();
        writeln!(output, "Documents loaded: {}", stats.documents_loaded).unwrap();
        writeln!(output, "Chunks added:     {}", stats.chunks_added).unwrap();
        writeln!(output, "Chunks skipped:   {}", stats.chunks_skipped).unwrap();
        writeln!(output, "Duration:         {}ms", stats.duration_ms).unwrap();
        if !stats.failures.is_empty() {
            writeln!(output).unwrap();
            writeln!(output, "Failures ({}):", stats.failures.len()).unwrap();
            for (source_id, reason) in &stats.failures {
                writeln!(output, "  {}: {}", source_id, reason).unwrap();
            }
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}\n", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render(&self, value: &serde_json::Value) -> String {
        if self.pretty {
            serde_json::to_string_pretty(value).unwrap()
        } else {
            serde_json::to_string(value).unwrap()
        }
    }
}

impl Formatter for JsonFormatter {
    fn format_route_result(&self, result: &RouteResult) -> String {
        // RouteResult serializes to the wire shape directly.
        if self.pretty {
            serde_json::to_string_pretty(result)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string(result).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(&serde_json::json!({
            "embedding": {
                "url": status.embedding_url,
                "model": status.embedder_model,
                "dimension": status.dimension,
                "reachable": status.embedding_reachable,
            },
            "index": {
                "path": status.index_path,
                "exists": status.index_exists,
                "model": status.index_model,
                "dimension": status.index_dimension,
                "chunks": status.chunks,
                "documents": status.documents,
            }
        }))
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        let failures: Vec<serde_json::Value> = stats
            .failures
            .iter()
            .map(|(source_id, reason)| {
                serde_json::json!({"source_id": source_id, "reason": reason})
            })
            .collect();

        self.render(&serde_json::json!({
            "files_discovered": stats.files_discovered,
            "documents_loaded": stats.documents_loaded,
            "chunks_added": stats.chunks_added,
            "chunks_skipped": stats.chunks_skipped,
            "duration_ms": stats.duration_ms,
            "failures": failures,
        }))
    }

    fn format_message(&self, message: &str) -> String {
        serde_json::json!({"message": message}).to_string()
    }

    fn format_error(&self, error: &str) -> String {
        serde_json::json!({"error": error}).to_string()
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
    }
}
