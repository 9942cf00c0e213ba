//! HTTP client for the quiz server.
//!
//! Two endpoints are used:
//!
//! - `GET /api/question?user=<id>` returns a [`Problem`]
//! - `POST /api/answer?user=<id>&selected=<option id>` returns an [`AnswerResult`]

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// A multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub text: String,
    #[serde(default)]
    pub options: Vec<AnswerOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub id: String,
    pub text: String,
}

/// Outcome of an answer: the id of the correct option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub correct: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionRequest {
    pub user: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerRequest {
    pub user: String,
    pub selected: String,
}

#[derive(Debug, Clone)]
pub struct QuizClient {
    http: reqwest::Client,
    base: String,
}

impl QuizClient {
    pub fn new(base: &str) -> Result<Self, ClientError> {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Use a preconfigured `reqwest` client.
    pub fn with_client(http: reqwest::Client, base: &str) -> Result<Self, ClientError> {
        let url = reqwest::Url::parse(base).map_err(|e| ClientError::InvalidUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: base.to_string(),
                reason: format!("unsupported scheme `{}`", url.scheme()),
            });
        }
        Ok(Self {
            http,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    /// Fetch the next question for a user.
    pub async fn question(&self, request: &QuestionRequest) -> Result<Problem, ClientError> {
        debug!("requesting a question for user {}", request.user);
        let problem = self
            .http
            .get(self.endpoint("/api/question"))
            .query(request)
            .send()
            .await?
            .error_for_status()?
            .json::<Problem>()
            .await?;
        debug!("received question {:?}", problem.id);
        Ok(problem)
    }

    /// Submit an answer and get the correct option back.
    pub async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResult, ClientError> {
        debug!(
            "submitting answer {} for user {}",
            request.selected, request.user
        );
        let result = self
            .http
            .post(self.endpoint("/api/answer"))
            .query(request)
            .send()
            .await?
            .error_for_status()?
            .json::<AnswerResult>()
            .await?;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
        task::JoinHandle,
    };

    /// Serve a single HTTP response and hand back the request line.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request)
                .lines()
                .next()
                .unwrap_or_default()
                .to_string()
        });
        (format!("http://{addr}/"), handle)
    }

    fn client(base: &str) -> QuizClient {
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        QuizClient::with_client(http, base).unwrap()
    }

    #[tokio::test]
    async fn test_question() {
        let (base, server) = serve_once(
            "200 OK",
            r#"{"id":"p1","text":"Pick one","options":[{"id":"A","text":"Alpha"},{"id":"B","text":"Beta"}]}"#,
        )
        .await;

        let problem = client(&base)
            .question(&QuestionRequest {
                user: "12345".into(),
            })
            .await
            .unwrap();

        assert_eq!(problem.id.as_deref(), Some("p1"));
        assert_eq!(problem.text, "Pick one");
        assert_eq!(problem.options.len(), 2);
        assert_eq!(problem.options[1].id, "B");
        assert_eq!(
            server.await.unwrap(),
            "GET /api/question?user=12345 HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_answer() {
        let (base, server) = serve_once("200 OK", r#"{"correct":"C"}"#).await;

        let result = client(&base)
            .answer(&AnswerRequest {
                user: "12345".into(),
                selected: "A".into(),
            })
            .await
            .unwrap();

        assert_eq!(result.correct, "C");
        assert_eq!(
            server.await.unwrap(),
            "POST /api/answer?user=12345&selected=A HTTP/1.1"
        );
    }

    #[tokio::test]
    async fn test_server_error_status() {
        let (base, server) = serve_once("500 Internal Server Error", "{}").await;

        let err = client(&base)
            .question(&QuestionRequest { user: "1".into() })
            .await
            .unwrap_err();

        match err {
            ClientError::Http(e) => {
                assert_eq!(e.status(), Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR))
            }
            other => panic!("unexpected error: {other}"),
        }
        server.await.unwrap();
    }

    #[test]
    fn test_base_url_validation() {
        assert!(matches!(
            QuizClient::new("not a url"),
            Err(ClientError::InvalidUrl { .. })
        ));
        assert!(matches!(
            QuizClient::new("ftp://example.com"),
            Err(ClientError::InvalidUrl { .. })
        ));
        let client = QuizClient::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(client.base(), "http://127.0.0.1:5000");
    }

    #[test]
    fn test_problem_without_id() {
        let problem: Problem =
            serde_json::from_str(r#"{"text":"Q","options":[{"id":"A","text":"a"}]}"#).unwrap();
        assert_eq!(problem.id, None);
        assert_eq!(problem.options[0].text, "a");
    }
}
