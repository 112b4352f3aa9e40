//! HTTP front-end: `POST /query` answers a question, `GET /healthz` reports
//! liveness.

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
};

use axum::{
    Json,
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::{
    embedding::Embedder,
    error::{self, Error},
    pipeline::{Answer, Pipeline},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
    pub sources: Vec<SourceItem>,
}

/// One retrieved chunk and the document it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceItem {
    pub document_id: String,
    pub chunk: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl From<Answer> for QueryResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.text,
            sources: answer
                .sources
                .into_iter()
                .map(|hit| SourceItem {
                    document_id: hit.metadata.source,
                    chunk: hit.document,
                })
                .collect(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
}

struct AppState<E> {
    pipeline: Arc<Mutex<Pipeline<E>>>,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

/// Build the router around a ready pipeline.
pub fn router<E>(pipeline: Pipeline<E>) -> Router
where
    E: Embedder + Send + 'static,
{
    let state = AppState {
        pipeline: Arc::new(Mutex::new(pipeline)),
    };

    Router::new()
        .route("/query", post(query::<E>))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn query<E>(
    State(state): State<AppState<E>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError>
where
    E: Embedder + Send + 'static,
{
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "question must not be empty",
        ));
    }

    // Model inference is blocking and needs exclusive access.
    let result = tokio::task::spawn_blocking(move || {
        let mut pipeline = state
            .pipeline
            .lock()
            .map_err(|_| Error::Config("pipeline lock poisoned".to_string()))?;
        pipeline.answer(&question)
    })
    .await
    .map_err(|e| {
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("query task failed: {e}"),
        )
    })?;

    match result {
        Ok(answer) => Ok(Json(answer.into())),
        Err(e) => {
            tracing::error!(error = %e, "query failed");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Serve the pipeline over HTTP until the process is stopped.
pub fn run_server<E>(
    pipeline: Pipeline<E>,
    bind: SocketAddr,
) -> error::Result<()>
where
    E: Embedder + Send + 'static,
{
    let app = router(pipeline);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Error::Config(format!("failed to start tokio runtime: {e}"))
        })?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(bind).await?;
        tracing::info!(addr = %listener.local_addr()?, "listening");
        axum::serve(listener, app).await?;
        Ok::<(), Error>(())
    })
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, header},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        answer::NOT_FOUND_MESSAGE,
        testing::{BagOfWordsEmbedder, FailingEmbedder, bag_of_words},
        vector_db::{ChunkMetadata, Collection, VectorDb},
    };

    const POLICY: &str =
        "Employees get 12 sick leaves per year. Working hours are 9 to 6.";

    fn collection(texts: &[&str]) -> (tempfile::TempDir, Collection) {
        let tmp = tempfile::tempdir().unwrap();
        let db = VectorDb::open(&tmp.path().join("index.redb")).unwrap();
        let collection = db.create_collection("kb").unwrap();
        for (i, text) in texts.iter().enumerate() {
            collection
                .add(
                    &[format!("chunk-{i}")],
                    &[text.to_string()],
                    &[bag_of_words(text)],
                    &[ChunkMetadata {
                        source: "handbook.pdf".into(),
                        page: 1,
                        chunk: i as u32,
                    }],
                )
                .unwrap();
        }
        (tmp, collection)
    }

    fn post_query(body: &str) -> Request<Body> {
        Request::post("/query")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(
        response: axum::response::Response,
    ) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let (_tmp, collection) = collection(&[]);
        let app =
            router(Pipeline::new(BagOfWordsEmbedder::default(), collection));

        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_returns_answer_and_sources() {
        let (_tmp, collection) = collection(&[POLICY]);
        let app =
            router(Pipeline::new(BagOfWordsEmbedder::default(), collection));

        let response = app
            .oneshot(post_query(
                r#"{"question": "How many sick leaves do employees get?"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: QueryResponse = json_body(response).await;
        assert!(body.answer.contains("Employees get 12 sick leaves per year."));
        assert_eq!(
            body.sources,
            vec![SourceItem {
                document_id: "handbook.pdf".into(),
                chunk: POLICY.into(),
            }]
        );
    }

    #[tokio::test]
    async fn unrelated_question_is_not_found() {
        let (_tmp, collection) = collection(&[POLICY]);
        let app =
            router(Pipeline::new(BagOfWordsEmbedder::default(), collection));

        let response = app
            .oneshot(post_query(r#"{"question": "parking garage"}"#))
            .await
            .unwrap();
        let body: QueryResponse = json_body(response).await;
        assert_eq!(body.answer, NOT_FOUND_MESSAGE);
    }

    #[tokio::test]
    async fn blank_question_is_rejected() {
        let (_tmp, collection) = collection(&[POLICY]);
        let app =
            router(Pipeline::new(BagOfWordsEmbedder::default(), collection));

        let response = app
            .oneshot(post_query(r#"{"question": "   "}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = json_body(response).await;
        assert!(body.error.contains("empty"));
    }

    #[tokio::test]
    async fn retrieval_failure_is_server_error() {
        let (_tmp, collection) = collection(&[POLICY]);
        let app = router(Pipeline::new(FailingEmbedder, collection));

        let response = app
            .oneshot(post_query(r#"{"question": "sick leaves"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorBody = json_body(response).await;
        assert!(body.error.starts_with("Error querying vector store:"));
    }
}
