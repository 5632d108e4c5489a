use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::{ClientError, TransportError};

const GET_BOOKS_PATH: &str = "/il/services/SolutionSearch.asmx/GetBooks";
const GET_SOLUTIONS_PATH: &str = "/il/services/SolutionSearch.asmx/GetSolutionsEx";
const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

#[derive(Clone, Debug)]
pub struct TiktekClient {
    base_url: String,
    client: reqwest::Client,
}

impl TiktekClient {
    /// Create a new client with the given base URL (e.g. "https://tiktek.com").
    pub fn new(base_url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().build()?;
        let base_url_str = base_url.into();
        tracing::debug!(base_url = %base_url_str, "creating TiktekClient");
        Ok(TiktekClient {
            base_url: base_url_str.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// POST GetBooks
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_books(&self, request: &GetBooksRequest) -> Result<Vec<Book>, ClientError> {
        self.post_envelope(GET_BOOKS_PATH, request).await
    }

    /// POST GetSolutionsEx
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn get_solutions_ex(
        &self,
        request: &GetSolutionsExRequest,
    ) -> Result<Vec<Solution>, ClientError> {
        self.post_envelope(GET_SOLUTIONS_PATH, request).await
    }

    /// Build the public URL of a solution image. Does not perform a request.
    pub fn solution_image_url(&self, solution: &Solution) -> String {
        self.url(&format!(
            "/il/tt-resources/solution-images/{}_{}/{}",
            solution.prefix, solution.book_id, solution.image
        ))
    }

    /// Build the public URL of a book cover. A book without an image yields the bare directory URL.
    pub fn cover_url(&self, book: &Book) -> String {
        self.url(&format!(
            "/il/tt-resources-unmanaged/books-covers/{}",
            book.image.as_deref().unwrap_or("")
        ))
    }

    async fn post_envelope<B, T>(&self, path: &str, body: &B) -> Result<Vec<T>, ClientError>
    where
        B: Serialize + std::fmt::Debug,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        tracing::debug!(%url, ?body, "POST");
        let resp = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .json(body)
            .send()
            .await
            .map_err(TransportError::from)?;
        let status = resp.status();
        let text = resp.text().await.map_err(TransportError::from)?;

        let envelope = match serde_json::from_str::<Envelope>(&text) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                let snippet_len = floor_char_boundary(&text, 2000);
                let snippet = &text[..snippet_len];
                tracing::error!(error = %e, body_snippet = %snippet, "failed to parse envelope");
                return Err(TransportError::Decode(e).into());
            }
            Err(_) => {
                tracing::warn!(%url, %status, "request rejected");
                return Err(TransportError::Status { status, body: text }.into());
            }
        };

        envelope.d.into_result().inspect_err(|e| {
            if let ClientError::Transport(TransportError::Decode(err)) = e {
                tracing::error!(%url, error = %err, "failed to decode ResultData");
            }
        })
    }
}

fn floor_char_boundary(s: &str, max: usize) -> usize {
    let mut end = s.len().min(max);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

// ============ Envelope ============

/// ASMX JSON wrapper: `{ "d": { Success, MessageCode, ResultData } }`
#[derive(Debug, Deserialize, PartialEq)]
pub struct Envelope {
    pub d: EnvelopeBody,
}

/// `ResultData` stays raw until `Success` is known; a failed call's payload is never decoded.
#[derive(Debug, Deserialize, PartialEq)]
pub struct EnvelopeBody {
    #[serde(rename = "Success")]
    pub success: bool,
    #[serde(
        rename = "MessageCode",
        deserialize_with = "crate::tiktek_client::de::opt_i64_from_str_or_num",
        default
    )]
    pub message_code: Option<i64>,
    #[serde(rename = "ResultData", default)]
    pub result_data: Option<serde_json::Value>,
}

impl EnvelopeBody {
    /// Payload of a successful call (empty when absent), or the failure code.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<Vec<T>, ClientError> {
        if !self.success {
            return Err(ClientError::RemoteOperationFailed {
                code: self.message_code,
            });
        }
        match self.result_data {
            Some(data) => Ok(serde_json::from_value(data).map_err(TransportError::Decode)?),
            None => Ok(Vec::new()),
        }
    }
}

// ============ Requests ============

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GetBooksRequest {
    #[serde(rename = "subjectID")]
    pub subject_id: String,
    #[serde(rename = "schoolID")]
    pub school_id: Option<String>,
    #[serde(rename = "locationID")]
    pub location_id: Option<String>,
}

impl GetBooksRequest {
    pub fn new(subject_id: impl Into<String>) -> Self {
        GetBooksRequest {
            subject_id: subject_id.into(),
            school_id: None,
            location_id: None,
        }
    }

    pub fn with_school(mut self, school_id: impl Into<String>) -> Self {
        self.school_id = Some(school_id.into());
        self
    }

    pub fn with_location(mut self, location_id: impl Into<String>) -> Self {
        self.location_id = Some(location_id.into());
        self
    }
}

/// Page and question travel as decimal strings, never JSON numbers.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GetSolutionsExRequest {
    #[serde(rename = "bookID")]
    pub book_id: String,
    pub page: String,
    pub question: String,
    pub sq: Option<String>,
    pub ssq: Option<String>,
    #[serde(rename = "userID")]
    pub user_id: Option<String>,
}

impl GetSolutionsExRequest {
    pub fn new(book_id: impl Into<String>, page: i32, question: i32) -> Self {
        GetSolutionsExRequest {
            book_id: book_id.into(),
            page: page.to_string(),
            question: question.to_string(),
            sq: None,
            ssq: None,
            user_id: None,
        }
    }

    pub fn with_sub_questions(
        mut self,
        sq: Option<impl Into<String>>,
        ssq: Option<impl Into<String>>,
    ) -> Self {
        self.sq = sq.map(Into::into);
        self.ssq = ssq.map(Into::into);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

// ============ Models ============

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Book {
    #[serde(rename = "ID", deserialize_with = "crate::tiktek_client::de::string_from_str_or_num")]
    pub id: String,
    #[serde(
        rename = "Title",
        deserialize_with = "crate::tiktek_client::de::default_on_null",
        default
    )]
    pub title: String,
    #[serde(rename = "Image")]
    pub image: Option<String>,
    #[serde(rename = "Subdir")]
    pub subdir: Option<String>,
    /// Breadcrumb labels, broadest first
    #[serde(rename = "BT1")]
    pub bt1: Option<String>,
    #[serde(rename = "BT2")]
    pub bt2: Option<String>,
    #[serde(rename = "BT3")]
    pub bt3: Option<String>,
    #[serde(
        rename = "HasSolutions",
        deserialize_with = "crate::tiktek_client::de::default_on_null",
        default
    )]
    pub has_solutions: bool,
    #[serde(rename = "Lang")]
    pub lang: Option<String>,
    #[serde(
        rename = "Status",
        deserialize_with = "crate::tiktek_client::de::opt_i64_from_str_or_num",
        default
    )]
    pub status: Option<i64>,
}

impl Book {
    /// Non-empty breadcrumb labels in order.
    pub fn breadcrumbs(&self) -> Vec<&str> {
        [&self.bt1, &self.bt2, &self.bt3]
            .into_iter()
            .filter_map(|bt| bt.as_deref())
            .filter(|bt| !bt.trim().is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Solution {
    #[serde(rename = "ID", deserialize_with = "crate::tiktek_client::de::string_from_str_or_num")]
    pub id: String,
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(
        rename = "BookID",
        deserialize_with = "crate::tiktek_client::de::string_from_str_or_num"
    )]
    pub book_id: String,
    #[serde(rename = "Prefix")]
    pub prefix: String,
    #[serde(
        rename = "Page",
        deserialize_with = "crate::tiktek_client::de::opt_i64_from_str_or_num",
        default
    )]
    pub page: Option<i64>,
    #[serde(
        rename = "Question",
        deserialize_with = "crate::tiktek_client::de::opt_i64_from_str_or_num",
        default
    )]
    pub question: Option<i64>,
}

/// Internal serde helpers
pub mod de {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrStr {
        Num(i64),
        Str(String),
    }

    /// Accept Option<i64> from either a number or a string like "12"; null/"" -> None.
    pub fn opt_i64_from_str_or_num<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let val: Option<NumOrStr> = Option::deserialize(deserializer)?;
        Ok(match val {
            None => None,
            Some(NumOrStr::Num(n)) => Some(n),
            Some(NumOrStr::Str(s)) => s.trim().parse::<i64>().ok(),
        })
    }

    /// Explicit `null` reads as the type's default, same as a missing field.
    pub fn default_on_null<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Default + Deserialize<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
    }

    /// Identifiers are strings on the wire, but some rows carry bare numbers.
    pub fn string_from_str_or_num<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match NumOrStr::deserialize(deserializer)? {
            NumOrStr::Num(n) => n.to_string(),
            NumOrStr::Str(s) => s,
        })
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use super::*;

    fn solution() -> Solution {
        Solution {
            id: "S1".into(),
            image: "p12q5.png".into(),
            book_id: "B77".into(),
            prefix: "il".into(),
            page: Some(12),
            question: Some(5),
        }
    }

    #[test]
    fn build_solution_image_url() {
        let c = TiktekClient::new("https://tiktek.com/").unwrap();
        assert_eq!(
            c.solution_image_url(&solution()),
            "https://tiktek.com/il/tt-resources/solution-images/il_B77/p12q5.png"
        );
    }

    #[test]
    fn build_cover_url_with_and_without_image() {
        let c = TiktekClient::new("https://tiktek.com").unwrap();
        let mut book: Book = serde_json::from_value(json!({ "ID": "B1", "Image": "b1.jpg" })).unwrap();
        assert_eq!(
            c.cover_url(&book),
            "https://tiktek.com/il/tt-resources-unmanaged/books-covers/b1.jpg"
        );
        book.image = None;
        assert_eq!(
            c.cover_url(&book),
            "https://tiktek.com/il/tt-resources-unmanaged/books-covers/"
        );
    }

    #[test]
    fn solutions_request_encodes_numbers_as_strings() {
        for n in [0, 1, 9, 10, 12, 99, 100, 1234] {
            let body = serde_json::to_value(GetSolutionsExRequest::new("B1", n, n + 1)).unwrap();
            assert_eq!(body["page"], json!(n.to_string()));
            assert_eq!(body["question"], json!((n + 1).to_string()));
        }
    }

    #[test]
    fn optional_request_fields_are_null() {
        let body = serde_json::to_value(GetBooksRequest::new("ST2016")).unwrap();
        assert_eq!(
            body,
            json!({ "subjectID": "ST2016", "schoolID": null, "locationID": null })
        );

        let body = serde_json::to_value(
            GetSolutionsExRequest::new("B1", 3, 4)
                .with_sub_questions(Some("a"), None::<String>)
                .with_user("u9"),
        )
        .unwrap();
        assert_eq!(
            body,
            json!({ "bookID": "B1", "page": "3", "question": "4", "sq": "a", "ssq": null, "userID": "u9" })
        );
    }

    #[test]
    fn book_deserialize_ignores_unknown_and_defaults_missing() {
        let json = r#"{ "ID": 4411, "Title": "Algebra I", "BT1": "Math", "BT2": " ", "Status": "2", "Publisher": "x" }"#;
        let book: Book = serde_json::from_str(json).unwrap();
        assert_eq!(book.id, "4411");
        assert_eq!(book.title, "Algebra I");
        assert_eq!(book.status, Some(2));
        assert!(!book.has_solutions);
        assert_eq!(book.image, None);
        assert_eq!(book.breadcrumbs(), vec!["Math"]);

        let untitled: Book = serde_json::from_str(r#"{ "ID": "B2" }"#).unwrap();
        assert_eq!(untitled.title, "");
    }

    #[test]
    fn solution_deserialize_lenient_numbers() {
        let json = r#"{ "ID": "S1", "Image": "a.png", "BookID": 77, "Prefix": "il", "Page": "12", "Question": null }"#;
        let sol: Solution = serde_json::from_str(json).unwrap();
        assert_eq!(sol.book_id, "77");
        assert_eq!(sol.page, Some(12));
        assert_eq!(sol.question, None);
    }

    #[test]
    fn envelope_failure_ignores_payload() {
        let env: Envelope = serde_json::from_str(
            r#"{ "d": { "Success": false, "MessageCode": 3, "ResultData": [{ "ID": "B1" }] } }"#,
        )
        .unwrap();
        match env.d.into_result::<Book>() {
            Err(ClientError::RemoteOperationFailed { code }) => assert_eq!(code, Some(3)),
            other => panic!("expected remote failure, got {other:?}"),
        }
    }

    #[test]
    fn envelope_failure_with_undecodable_payload_keeps_code() {
        // rows without an ID are not books, but a failed call never looks at them
        let env: Envelope = serde_json::from_str(
            r#"{ "d": { "Success": false, "MessageCode": 3, "ResultData": [{ "Title": "x" }] } }"#,
        )
        .unwrap();
        match env.d.into_result::<Book>() {
            Err(ClientError::RemoteOperationFailed { code }) => assert_eq!(code, Some(3)),
            other => panic!("expected remote failure, got {other:?}"),
        }
    }

    #[test]
    fn envelope_success_with_bad_rows_is_decode_failure() {
        let env: Envelope = serde_json::from_str(
            r#"{ "d": { "Success": true, "ResultData": [{ "Title": "x" }] } }"#,
        )
        .unwrap();
        assert!(matches!(
            env.d.into_result::<Book>(),
            Err(ClientError::Transport(TransportError::Decode(_)))
        ));
    }

    #[test]
    fn envelope_success_without_payload_is_empty() {
        let env: Envelope = serde_json::from_str(r#"{ "d": { "Success": true } }"#).unwrap();
        assert!(env.d.into_result::<Solution>().unwrap().is_empty());

        let env: Envelope =
            serde_json::from_str(r#"{ "d": { "Success": true, "ResultData": null } }"#).unwrap();
        assert!(env.d.into_result::<Solution>().unwrap().is_empty());
    }

    #[test]
    fn book_null_fields_read_as_defaults() {
        let book: Book =
            serde_json::from_str(r#"{ "ID": "B1", "Title": null, "HasSolutions": null }"#).unwrap();
        assert_eq!(book.title, "");
        assert!(!book.has_solutions);
    }

    #[tokio::test]
    async fn get_books_posts_request_and_unwraps_envelope() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", GET_BOOKS_PATH)
            .match_header("content-type", JSON_CONTENT_TYPE)
            .match_body(Matcher::Json(
                json!({ "subjectID": "ST2016", "schoolID": "S1", "locationID": null }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "d": { "__type": "x", "Success": true, "ResultData": [{ "ID": "B1", "Title": "Algebra I" }] } }"#)
            .create_async()
            .await;

        let client = TiktekClient::new(server.url()).unwrap();
        let books = client
            .get_books(&GetBooksRequest::new("ST2016").with_school("S1"))
            .await
            .unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, "B1");
        assert_eq!(books[0].title, "Algebra I");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_solutions_sends_string_page_and_question() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", GET_SOLUTIONS_PATH)
            .match_body(Matcher::PartialJson(
                json!({ "bookID": "B1", "page": "12", "question": "5" }),
            ))
            .with_status(200)
            .with_body(r#"{ "d": { "Success": true, "ResultData": [{ "ID": "S1", "Image": "a.png", "BookID": "B1", "Prefix": "il", "Page": 12, "Question": 5 }] } }"#)
            .create_async()
            .await;

        let client = TiktekClient::new(server.url()).unwrap();
        let sols = client
            .get_solutions_ex(&GetSolutionsExRequest::new("B1", 12, 5))
            .await
            .unwrap();
        assert_eq!(sols.len(), 1);
        assert_eq!(sols[0].page, Some(12));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn unparseable_error_status_is_transport_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GET_BOOKS_PATH)
            .with_status(500)
            .with_body("<html>oops</html>")
            .create_async()
            .await;

        let client = TiktekClient::new(server.url()).unwrap();
        let err = client
            .get_books(&GetBooksRequest::new("ST2016"))
            .await
            .unwrap_err();
        match err {
            ClientError::Transport(TransportError::Status { status, .. }) => {
                assert_eq!(status.as_u16(), 500)
            }
            other => panic!("expected status failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn garbage_success_body_is_decode_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GET_BOOKS_PATH)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let client = TiktekClient::new(server.url()).unwrap();
        let err = client
            .get_books(&GetBooksRequest::new("ST2016"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn remote_failure_with_junk_payload_is_not_transport() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GET_BOOKS_PATH)
            .with_status(200)
            .with_body(r#"{ "d": { "Success": false, "MessageCode": 3, "ResultData": [{ "Title": "x" }] } }"#)
            .create_async()
            .await;

        let client = TiktekClient::new(server.url()).unwrap();
        let err = client
            .get_books(&GetBooksRequest::new("ST9999"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::RemoteOperationFailed { code: Some(3) }
        ));
    }

    #[tokio::test]
    async fn remote_failure_carries_message_code() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", GET_BOOKS_PATH)
            .with_status(200)
            .with_body(r#"{ "d": { "Success": false, "MessageCode": 3 } }"#)
            .create_async()
            .await;

        let client = TiktekClient::new(server.url()).unwrap();
        let err = client
            .get_books(&GetBooksRequest::new("ST9999"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::RemoteOperationFailed { code: Some(3) }
        ));
    }
}
