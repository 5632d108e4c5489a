use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Listing, RequestGate, Status};
use crate::{repository::CatalogRepository, tiktek_client::Solution};

/// Page/question lookup for one book.
pub struct BookDetailScreen {
    repo: Arc<CatalogRepository>,
    book_id: String,
    title: String,
    state: Mutex<DetailState>,
}

#[derive(Default)]
struct DetailState {
    page: String,
    question: String,
    solutions: Listing<Solution>,
    gate: RequestGate,
}

/// Lenient integer entry: anything that does not parse becomes 0.
pub fn parse_or_zero(text: &str) -> i32 {
    text.parse().unwrap_or(0)
}

impl BookDetailScreen {
    pub fn new(
        repo: Arc<CatalogRepository>,
        book_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        BookDetailScreen {
            repo,
            book_id: book_id.into(),
            title: title.into(),
            state: Mutex::new(DetailState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, DetailState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn book_id(&self) -> &str {
        &self.book_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn page(&self) -> String {
        self.state().page.clone()
    }

    pub fn question(&self) -> String {
        self.state().question.clone()
    }

    pub fn set_page(&self, text: impl Into<String>) {
        self.state().page = text.into();
    }

    pub fn set_question(&self, text: impl Into<String>) {
        self.state().question = text.into();
    }

    pub fn status(&self) -> Status {
        self.state().solutions.status.clone()
    }

    pub fn solutions(&self) -> Vec<Solution> {
        self.state().solutions.items.clone()
    }

    pub fn image_urls(&self) -> Vec<String> {
        self.state()
            .solutions
            .items
            .iter()
            .map(|s| self.repo.image_url_for(s))
            .collect()
    }

    /// Look up solutions for the entered page and question.
    #[tracing::instrument(level = "debug", skip(self), fields(book_id = %self.book_id))]
    pub async fn submit(&self) {
        let (ticket, page, question) = {
            let mut state = self.state();
            state.solutions.start();
            (
                state.gate.begin(),
                parse_or_zero(&state.page),
                parse_or_zero(&state.question),
            )
        };

        let result = self
            .repo
            .fetch_solutions(&self.book_id, page, question)
            .await;

        let mut state = self.state();
        if !state.gate.is_current(ticket) {
            tracing::debug!(page, question, "discarding stale solutions");
            return;
        }
        if let Err(e) = &result {
            tracing::warn!(
                page,
                question,
                code = ?e.message_code(),
                error = %e,
                "failed to load solutions"
            );
        }
        state.solutions.finish(result);
    }
}
