use prospector_common::BusinessResult;
use prospector_search::{SearchState, SearchStatus};
use serde::Serialize;
use std::fmt::Write;

#[derive(Serialize)]
struct SearchReport<'a> {
    status: SearchStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a BusinessResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

pub fn render_json(state: &SearchState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&SearchReport {
        status: state.status(),
        result: state.result(),
        error: state.error(),
    })
}

/// Plain-text rendering: narrative, then numbered sources; errors get a
/// headline.
pub fn render_text(state: &SearchState) -> String {
    let mut out = String::new();
    match state {
        SearchState::Success(result) => {
            out.push_str(result.text.trim_end());
            out.push('\n');
            if !result.links.is_empty() {
                out.push_str("\nSources\n");
                for (idx, link) in result.links.iter().enumerate() {
                    let _ = writeln!(out, "{}. {}\n   {}", idx + 1, link.title, link.uri);
                }
            }
        }
        SearchState::Error(message) => {
            let _ = writeln!(out, "Something went wrong\n{message}");
        }
        SearchState::Idle | SearchState::Loading => {}
    }
    out
}
