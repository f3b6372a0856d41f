//! Client for the GAIA scoring service: question listing, attachment
//! download and answer submission.

use reqwest::Client;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;

pub const DEFAULT_BENCHMARK_URL: &str = "https://agents-course-unit4-scoring.hf.space";

/// One benchmark task as served by `/questions`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkQuestion {
    pub task_id: String,
    pub question: String,
    #[serde(
        default,
        alias = "Level",
        deserialize_with = "level_from_string_or_number"
    )]
    pub level: Option<u8>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub file_name: Option<String>,
}

impl BenchmarkQuestion {
    pub fn has_file(&self) -> bool {
        self.file_name.is_some()
    }
}

fn level_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|v| u8::try_from(v).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

/// Answer entry of a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerSubmission {
    pub task_id: String,
    pub submitted_answer: String,
}

#[derive(Debug, Serialize)]
struct SubmissionPayload<'a> {
    username: &'a str,
    agent_code: &'a str,
    answers: &'a [AnswerSubmission],
}

/// Result of a submission. Rejections are values, not errors, so a scoring
/// failure never hides the answers that were computed.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionOutcome {
    Accepted(Value),
    Rejected { status: u16, body: String },
}

impl SubmissionOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }
}

/// Attachment downloaded for a task
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// HTTP client for the scoring service
#[derive(Clone)]
pub struct BenchmarkClient {
    client: Client,
    base_url: String,
}

impl Default for BenchmarkClient {
    fn default() -> Self {
        Self::new(DEFAULT_BENCHMARK_URL)
    }
}

impl BenchmarkClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `/questions`
    pub async fn fetch_questions(&self) -> Result<Vec<BenchmarkQuestion>> {
        let response = self
            .client
            .get(format!("{}/questions", self.base_url))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Benchmark {
                status: status.as_u16(),
                message,
            });
        }

        let questions: Vec<BenchmarkQuestion> = response.json().await?;
        tracing::info!(count = questions.len(), "Fetched benchmark questions");
        Ok(questions)
    }

    /// GET `/files/{task_id}`
    pub async fn download_file(&self, task_id: &str) -> Result<DownloadedFile> {
        let response = self
            .client
            .get(format!(
                "{}/files/{}",
                self.base_url,
                urlencoding::encode(task_id)
            ))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(AiError::Benchmark {
                status: status.as_u16(),
                message,
            });
        }

        let headers = response.headers();
        let file_name = headers
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(file_name_from_disposition);
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?.to_vec();

        Ok(DownloadedFile {
            file_name,
            content_type,
            bytes,
        })
    }

    /// POST `/submit`
    pub async fn submit_answers(
        &self,
        answers: &[AnswerSubmission],
        username: &str,
        agent_code: &str,
    ) -> Result<SubmissionOutcome> {
        let payload = SubmissionPayload {
            username,
            agent_code,
            answers,
        };
        let response = self
            .client
            .post(format!("{}/submit", self.base_url))
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Benchmark submission rejected");
            return Ok(SubmissionOutcome::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let value = serde_json::from_str(&body).unwrap_or(Value::String(body));
        Ok(SubmissionOutcome::Accepted(value))
    }
}

fn file_name_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_question_deserializes_service_shape() {
        let q: BenchmarkQuestion = serde_json::from_value(json!({
            "task_id": "t1",
            "question": "What is 2+2?",
            "Level": "1",
            "file_name": ""
        }))
        .unwrap();
        assert_eq!(q.level, Some(1));
        assert_eq!(q.file_name, None);
        assert!(!q.has_file());

        let q: BenchmarkQuestion = serde_json::from_value(json!({
            "task_id": "t2",
            "question": "Sum the sheet",
            "level": 2,
            "file_name": "data.xlsx"
        }))
        .unwrap();
        assert_eq!(q.level, Some(2));
        assert_eq!(q.file_name.as_deref(), Some("data.xlsx"));
    }

    #[test]
    fn test_file_name_from_disposition() {
        assert_eq!(
            file_name_from_disposition(r#"attachment; filename="report.pdf""#).as_deref(),
            Some("report.pdf")
        );
        assert_eq!(file_name_from_disposition("inline"), None);
    }

    #[tokio::test]
    async fn test_fetch_questions() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"task_id": "a", "question": "Q1", "Level": "1", "file_name": ""},
                {"task_id": "b", "question": "Q2", "Level": "3", "file_name": "x.mp3"}
            ])))
            .mount(&server)
            .await;

        let client = BenchmarkClient::new(server.uri());
        let questions = client.fetch_questions().await.unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1].file_name.as_deref(), Some("x.mp3"));
    }

    #[tokio::test]
    async fn test_fetch_questions_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/questions"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let err = BenchmarkClient::new(server.uri())
            .fetch_questions()
            .await
            .unwrap_err();
        assert!(matches!(err, AiError::Benchmark { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_submit_answers_accepted_and_rejected() {
        let server = MockServer::start().await;
        let answers = vec![AnswerSubmission {
            task_id: "a".to_string(),
            submitted_answer: "4".to_string(),
        }];
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(body_json(json!({
                "username": "alice",
                "agent_code": "gaia-agent",
                "answers": [{"task_id": "a", "submitted_answer": "4"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"score": 100.0})))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad payload"))
            .mount(&server)
            .await;

        let client = BenchmarkClient::new(server.uri());
        let outcome = client
            .submit_answers(&answers, "alice", "gaia-agent")
            .await
            .unwrap();
        assert_eq!(outcome, SubmissionOutcome::Accepted(json!({"score": 100.0})));

        let outcome = client
            .submit_answers(&answers, "bob", "gaia-agent")
            .await
            .unwrap();
        assert_eq!(
            outcome,
            SubmissionOutcome::Rejected {
                status: 422,
                body: "bad payload".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_download_file_reads_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/t9"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-disposition", r#"attachment; filename="notes.txt""#)
                    .insert_header("content-type", "text/plain")
                    .set_body_string("hello"),
            )
            .mount(&server)
            .await;

        let file = BenchmarkClient::new(server.uri())
            .download_file("t9")
            .await
            .unwrap();
        assert_eq!(file.file_name.as_deref(), Some("notes.txt"));
        assert_eq!(file.content_type.as_deref(), Some("text/plain"));
        assert_eq!(file.bytes, b"hello");
    }
}
