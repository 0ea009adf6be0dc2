//! HTML rendering for the chat page.

use std::fmt::Write;

use super::session::{ChatLog, ChatOutcome};
use crate::services::IndexReport;
use crate::utils::format_file_size;

/// A file in the documents directory.
#[derive(Debug, Clone)]
pub struct DocumentEntry {
    pub name: String,
    pub size_bytes: u64,
}

/// Result of the last document action taken from the page.
#[derive(Debug, Clone)]
pub enum DocumentNotice {
    Reindexed(IndexReport),
    ReindexFailed(String),
    Deleted(String),
    Rejected(String),
}

/// Extensions offered by the upload picker.
const UPLOAD_ACCEPT: &str = ".pdf,.txt,.md,.docx,.xlsx,.xlsm,.xls";

/// Facts shown in the status panel.
#[derive(Debug, Clone)]
pub struct PageStatus {
    pub model: String,
    pub generation_url: String,
    pub documents_path: String,
    pub indexed_chunks: Option<u64>,
    pub documents: Vec<DocumentEntry>,
    pub notice: Option<DocumentNotice>,
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:52rem;margin:2rem auto;padding:0 1rem;color:#222}\
aside{background:#f4f4f6;border-radius:6px;padding:.5rem 1rem;margin-bottom:1.5rem}\
.ok{color:#1a7f37}.warn{color:#9a6700}\
.entry{border-bottom:1px solid #ddd;padding:.75rem 0}\
.question{font-weight:600}.answer{white-space:pre-wrap}.error{color:#b42318;white-space:pre-wrap}\
form.ask{display:flex;gap:.5rem;margin-top:1rem}form.ask input{flex:1;padding:.4rem}\
.size{color:#666;font-size:.85em}form.inline{display:inline}";

pub fn render_page(status: &PageStatus, log: &ChatLog) -> String {
    let mut html = String::new();
    // Writing into a String cannot fail.
    let _ = write_page(&mut html, status, log);
    html
}

fn write_page(html: &mut String, status: &PageStatus, log: &ChatLog) -> std::fmt::Result {
    writeln!(html, "<!DOCTYPE html>")?;
    writeln!(html, "<html lang=\"en\"><head><meta charset=\"utf-8\">")?;
    writeln!(html, "<title>RAG One - Document Q&amp;A</title>")?;
    writeln!(html, "<style>{STYLE}</style></head><body>")?;
    writeln!(html, "<h1>RAG One - Document Q&amp;A</h1>")?;

    writeln!(html, "<aside>")?;
    writeln!(html, "<p><b>Model:</b> {}</p>", escape_html(&status.model))?;
    writeln!(html, "<p><b>Service:</b> {}</p>", escape_html(&status.generation_url))?;
    writeln!(
        html,
        "<p><b>Documents:</b> {}</p>",
        escape_html(&status.documents_path)
    )?;
    match status.indexed_chunks {
        Some(chunks) if chunks > 0 => writeln!(
            html,
            "<p class=\"ok\">Index ready ({chunks} chunks)</p>"
        )?,
        _ => writeln!(
            html,
            "<p class=\"warn\">Index not found. Add documents and run <code>rag-one index</code>, then refresh this page.</p>"
        )?,
    }

    match &status.notice {
        Some(DocumentNotice::Reindexed(report)) => writeln!(
            html,
            "<p class=\"ok\">Reindexed {} documents into {} chunks in {}ms ({} skipped)</p>",
            report.documents,
            report.chunks,
            report.duration_ms,
            report.skipped.len()
        )?,
        Some(DocumentNotice::ReindexFailed(message)) => writeln!(
            html,
            "<p class=\"error\">Reindex failed: {}</p>",
            escape_html(message)
        )?,
        Some(DocumentNotice::Deleted(name)) => writeln!(
            html,
            "<p class=\"warn\">Deleted <code>{}</code>. Reprocess the documents to update the index.</p>",
            escape_html(name)
        )?,
        Some(DocumentNotice::Rejected(message)) => writeln!(
            html,
            "<p class=\"error\">{}</p>",
            escape_html(message)
        )?,
        None => {}
    }

    if status.documents.is_empty() {
        writeln!(html, "<p>No documents yet.</p>")?;
    } else {
        writeln!(
            html,
            "<details><summary>Current documents ({})</summary><ul>",
            status.documents.len()
        )?;
        for doc in &status.documents {
            let name = escape_html(&doc.name);
            writeln!(
                html,
                "<li><code>{name}</code> <span class=\"size\">{}</span> \
                 <form class=\"inline\" method=\"post\" action=\"/documents/delete\">\
                 <input type=\"hidden\" name=\"name\" value=\"{name}\">\
                 <button type=\"submit\">Delete</button></form></li>",
                format_file_size(doc.size_bytes)
            )?;
        }
        writeln!(html, "</ul></details>")?;
        writeln!(html, "<form method=\"post\" action=\"/reindex\">")?;
        writeln!(
            html,
            "<button type=\"submit\">Reprocess all documents</button></form>"
        )?;
    }
    writeln!(
        html,
        "<form method=\"post\" action=\"/upload\" enctype=\"multipart/form-data\">\
         <input type=\"file\" name=\"files\" accept=\"{UPLOAD_ACCEPT}\" multiple required> \
         <button type=\"submit\">Upload and process</button></form>"
    )?;
    writeln!(html, "</aside>")?;

    writeln!(html, "<main>")?;
    for entry in log.entries() {
        writeln!(html, "<div class=\"entry\">")?;
        writeln!(
            html,
            "<p class=\"question\" title=\"{}\">You: {}</p>",
            entry.asked_at.format("%Y-%m-%d %H:%M:%S UTC"),
            escape_html(&entry.question)
        )?;
        match &entry.outcome {
            ChatOutcome::Answer { answer, sources } => {
                writeln!(html, "<p class=\"answer\">{}</p>", escape_html(answer))?;
                if !sources.is_empty() {
                    writeln!(html, "<details><summary>Sources ({})</summary><ol>", sources.len())?;
                    for source in sources {
                        writeln!(html, "<li>{}</li>", escape_html(source))?;
                    }
                    writeln!(html, "</ol></details>")?;
                }
            }
            ChatOutcome::Error { message } => {
                writeln!(html, "<p class=\"error\">Error: {}</p>", escape_html(message))?;
            }
        }
        writeln!(html, "</div>")?;
    }
    writeln!(html, "</main>")?;

    writeln!(html, "<form class=\"ask\" method=\"post\" action=\"/ask\">")?;
    writeln!(
        html,
        "<input name=\"question\" placeholder=\"Ask a question about your documents...\" autofocus required>"
    )?;
    writeln!(html, "<button type=\"submit\">Ask</button></form>")?;
    writeln!(html, "<form method=\"post\" action=\"/clear\">")?;
    writeln!(html, "<button type=\"submit\">Clear chat history</button></form>")?;
    writeln!(html, "</body></html>")
}
