use std::collections::BTreeSet;

use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::{
    domain::listing,
    error::CatalogError,
    storage::FavoritesStore,
    tiktek_client::{Book, GetBooksRequest, GetSolutionsExRequest, Solution, TiktekClient},
};

/// Single facade the screens talk to: remote catalog calls, derived image URLs and favorites.
pub struct CatalogRepository {
    client: TiktekClient,
    favorites: FavoritesStore,
}

impl CatalogRepository {
    pub fn new(client: TiktekClient, favorites: FavoritesStore) -> Self {
        Self { client, favorites }
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_books(&self, subject_id: &str) -> Result<Vec<Book>, CatalogError> {
        let books = self
            .client
            .get_books(&GetBooksRequest::new(subject_id))
            .await
            .map_err(|e| CatalogError::from_client("GetBooks", e))?;
        tracing::debug!(count = books.len(), "fetched books");
        Ok(books)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn fetch_solutions(
        &self,
        book_id: &str,
        page: i32,
        question: i32,
    ) -> Result<Vec<Solution>, CatalogError> {
        let request = GetSolutionsExRequest::new(book_id, page, question);
        let solutions = self
            .client
            .get_solutions_ex(&request)
            .await
            .map_err(|e| CatalogError::from_client("GetSolutionsEx", e))?;
        tracing::debug!(count = solutions.len(), "fetched solutions");
        Ok(solutions)
    }

    /// Full fetch for the subject, then a local case-insensitive title match.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn search_books(
        &self,
        subject_id: &str,
        query: &str,
    ) -> Result<Vec<Book>, CatalogError> {
        let all = self.fetch_books(subject_id).await?;
        Ok(listing::filter_by_title(&all, query))
    }

    pub fn image_url_for(&self, solution: &Solution) -> String {
        self.client.solution_image_url(solution)
    }

    pub fn cover_url_for(&self, book: &Book) -> String {
        self.client.cover_url(book)
    }

    // ===== Favorites =====

    pub fn observe_favorites(&self) -> WatchStream<BTreeSet<String>> {
        self.favorites.observe()
    }

    pub fn subscribe_favorites(&self) -> watch::Receiver<BTreeSet<String>> {
        self.favorites.subscribe()
    }

    pub async fn toggle_favorite(&self, book_id: &str) -> Result<bool, CatalogError> {
        Ok(self.favorites.toggle(book_id).await?)
    }

    pub async fn is_favorite(&self, book_id: &str) -> Result<bool, CatalogError> {
        Ok(self.favorites.is_favorite(book_id).await?)
    }
}


#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio_stream::StreamExt;

    use super::test_support::{books_body, repository};
    use super::*;

    const BOOKS_PATH: &str = "/il/services/SolutionSearch.asmx/GetBooks";
    const SOLUTIONS_PATH: &str = "/il/services/SolutionSearch.asmx/GetSolutionsEx";

    #[tokio::test]
    async fn fetch_books_returns_payload() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", BOOKS_PATH)
            .match_body(Matcher::PartialJson(json!({ "subjectID": "ST2016" })))
            .with_status(200)
            .with_body(books_body(&[("B1", "Algebra I")]))
            .create_async()
            .await;

        let (_dir, repo) = repository(&server.url()).await;
        let books = repo.fetch_books("ST2016").await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].id, "B1");
        assert_eq!(books[0].title, "Algebra I");
    }

    #[tokio::test]
    async fn fetch_books_remote_failure_keeps_code() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", BOOKS_PATH)
            .with_status(200)
            .with_body(r#"{ "d": { "Success": false, "MessageCode": 3 } }"#)
            .create_async()
            .await;

        let (_dir, repo) = repository(&server.url()).await;
        let err = repo.fetch_books("ST9999").await.unwrap_err();
        assert!(matches!(
            err,
            CatalogError::RemoteOperationFailed {
                operation: "GetBooks",
                code: Some(3)
            }
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_distinct() {
        // nothing listens on the discard port
        let (_dir, repo) = repository("http://127.0.0.1:9").await;
        let err = repo.fetch_books("ST2016").await.unwrap_err();
        assert!(matches!(err, CatalogError::TransportFailed { .. }));
    }

    #[tokio::test]
    async fn search_filters_locally_after_full_fetch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", BOOKS_PATH)
            .match_body(Matcher::Json(
                json!({ "subjectID": "ST2016", "schoolID": null, "locationID": null }),
            ))
            .with_status(200)
            .with_body(books_body(&[
                ("B1", "Algebra I"),
                ("B2", "Geometry"),
                ("B3", "ALGEBRA II"),
            ]))
            .expect(1)
            .create_async()
            .await;

        let (_dir, repo) = repository(&server.url()).await;
        let found = repo.search_books("ST2016", "algebra").await.unwrap();
        let ids: Vec<_> = found.iter().map(|b| b.id.as_str()).collect();
        assert_eq!(ids, vec!["B1", "B3"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn fetch_solutions_encodes_page_and_question_as_strings() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", SOLUTIONS_PATH)
            .match_body(Matcher::Json(json!({
                "bookID": "B1", "page": "12", "question": "0",
                "sq": null, "ssq": null, "userID": null
            })))
            .with_status(200)
            .with_body(r#"{ "d": { "Success": true, "ResultData": [{ "ID": "S1", "Image": "x.png", "BookID": "B1", "Prefix": "il" }] } }"#)
            .create_async()
            .await;

        let (_dir, repo) = repository(&server.url()).await;
        let sols = repo.fetch_solutions("B1", 12, 0).await.unwrap();
        assert_eq!(sols.len(), 1);
        assert_eq!(
            repo.image_url_for(&sols[0]),
            format!("{}/il/tt-resources/solution-images/il_B1/x.png", server.url())
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn favorites_delegate_to_store() {
        let (_dir, repo) = repository("http://127.0.0.1:9").await;
        let mut rx = repo.subscribe_favorites();
        let mut stream = repo.observe_favorites();
        assert_eq!(stream.next().await, Some(BTreeSet::new()));
        assert!(repo.toggle_favorite("B1").await.unwrap());
        assert_eq!(
            stream.next().await,
            Some(BTreeSet::from(["B1".to_string()]))
        );
        assert!(repo.is_favorite("B1").await.unwrap());
        assert!(rx.has_changed().unwrap());
        assert!(rx.borrow_and_update().contains("B1"));
        assert!(!repo.toggle_favorite("B1").await.unwrap());
        assert!(!repo.is_favorite("B1").await.unwrap());
    }
}
