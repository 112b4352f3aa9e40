//! Client for a remote `askdocs serve` instance.

use std::fmt::Write as _;

use crate::{
    error::{Error, Result},
    server::{ErrorBody, QueryRequest, QueryResponse},
};

/// Build the `/query` URL from a server base URL.
///
/// Accepts either the base (`http://host:8000`) or the full endpoint.
pub fn query_url(base: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.ends_with("/query") {
        base.to_string()
    } else {
        format!("{base}/query")
    }
}

/// Post `question` to a remote server and return its response.
pub async fn ask_remote(
    client: &reqwest::Client,
    base_url: &str,
    question: &str,
) -> Result<QueryResponse> {
    let url = query_url(base_url);
    tracing::debug!(%url, "posting question");

    let response = client
        .post(&url)
        .json(&QueryRequest {
            question: question.to_string(),
        })
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status.to_string(),
        };
        return Err(Error::Retrieval(format!(
            "server returned {status}: {message}"
        )));
    }

    Ok(response.json().await?)
}

/// Render an answer followed by one section per source.
pub fn render(response: &QueryResponse) -> String {
    let mut out = response.answer.clone();
    if response.sources.is_empty() {
        return out;
    }

    out.push_str("\n\nSources:");
    for (i, source) in response.sources.iter().enumerate() {
        let _ = write!(
            out,
            "\n\n[{}] {}\n{}",
            i + 1,
            source.document_id,
            source.chunk
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::SourceItem;

    #[test]
    fn query_url_variants() {
        assert_eq!(
            query_url("http://localhost:8000"),
            "http://localhost:8000/query"
        );
        assert_eq!(
            query_url("http://localhost:8000/"),
            "http://localhost:8000/query"
        );
        assert_eq!(
            query_url("http://localhost:8000/query"),
            "http://localhost:8000/query"
        );
    }

    #[test]
    fn render_without_sources_is_just_the_answer() {
        let response = QueryResponse {
            answer: "No idea.".into(),
            sources: vec![],
        };
        assert_eq!(render(&response), "No idea.");
    }

    #[test]
    fn render_lists_sources_in_order() {
        let response = QueryResponse {
            answer: "Employees get 12 sick leaves per year.".into(),
            sources: vec![
                SourceItem {
                    document_id: "leave.pdf".into(),
                    chunk: "Employees get 12 sick leaves per year.".into(),
                },
                SourceItem {
                    document_id: "hours.pdf".into(),
                    chunk: "Working hours are 9 to 6.".into(),
                },
            ],
        };

        let rendered = render(&response);
        assert!(rendered.starts_with(
            "Employees get 12 sick leaves per year.\n\nSources:"
        ));
        let first = rendered.find("[1] leave.pdf").unwrap();
        let second = rendered.find("[2] hours.pdf").unwrap();
        assert!(first < second);
        assert!(rendered.ends_with("Working hours are 9 to 6."));
    }
}
