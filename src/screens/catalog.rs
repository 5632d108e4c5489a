use std::{
    collections::{BTreeSet, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tokio::sync::watch;

use super::{Listing, RequestGate, Status, Ticket};
use crate::{
    domain::{Subject, listing},
    error::CatalogError,
    repository::CatalogRepository,
    tiktek_client::Book,
};

/// Subject browser: pick a subject, filter its books, star favorites.
pub struct CatalogScreen {
    repo: Arc<CatalogRepository>,
    favorites: watch::Receiver<BTreeSet<String>>,
    state: Mutex<CatalogState>,
}

#[derive(Default)]
struct CatalogState {
    subject: Subject,
    query: String,
    /// Lives as long as the screen; never evicted.
    cache: HashMap<&'static str, Vec<Book>>,
    books: Listing<Book>,
    gate: RequestGate,
}

impl CatalogScreen {
    pub fn new(repo: Arc<CatalogRepository>) -> Self {
        let favorites = repo.subscribe_favorites();
        CatalogScreen {
            repo,
            favorites,
            state: Mutex::new(CatalogState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subject(&self) -> Subject {
        self.state().subject
    }

    pub fn query(&self) -> String {
        self.state().query.clone()
    }

    pub fn status(&self) -> Status {
        self.state().books.status.clone()
    }

    pub fn is_cached(&self, subject: Subject) -> bool {
        self.state().cache.contains_key(subject.id)
    }

    /// Free-text filter applied to the visible list. Does not fetch.
    pub fn set_query(&self, query: impl Into<String>) {
        self.state().query = query.into();
    }

    /// Switch subject. A cached subject is shown immediately without a request.
    #[tracing::instrument(level = "debug", skip(self, subject), fields(subject = subject.id))]
    pub async fn select_subject(&self, subject: Subject) {
        let ticket = {
            let mut state = self.state();
            state.subject = subject;
            if let Some(cached) = state.cache.get(subject.id).cloned() {
                tracing::debug!(count = cached.len(), "subject served from cache");
                state.gate.supersede();
                state.books.finish::<CatalogError>(Ok(cached));
                return;
            }
            state.books.start();
            state.gate.begin()
        };

        let result = self.repo.fetch_books(subject.id).await;
        self.apply(ticket, subject, result);
    }

    /// Fetch the current subject again filtered by the current query; the result
    /// replaces that subject's cache entry.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn submit_search(&self) {
        let (ticket, subject, query) = {
            let mut state = self.state();
            state.books.start();
            (state.gate.begin(), state.subject, state.query.clone())
        };

        let result = self.repo.search_books(subject.id, &query).await;
        self.apply(ticket, subject, result);
    }

    fn apply(&self, ticket: Ticket, subject: Subject, result: Result<Vec<Book>, CatalogError>) {
        let mut state = self.state();
        if !state.gate.is_current(ticket) {
            tracing::debug!(subject = subject.id, "discarding stale book list");
            return;
        }
        if let Ok(books) = &result {
            state.cache.insert(subject.id, books.clone());
        }
        if let Err(e) = &result {
            tracing::warn!(
                subject = subject.id,
                code = ?e.message_code(),
                error = %e,
                "failed to load books"
            );
        }
        state.books.finish(result);
    }

    /// Fetched list filtered by the query, favorites first, then by title.
    pub fn visible_books(&self) -> Vec<Book> {
        let favorites = self.favorites.borrow().clone();
        let state = self.state();
        listing::visible_books(&state.books.items, &state.query, &favorites)
    }

    pub fn is_favorite(&self, book_id: &str) -> bool {
        self.favorites.borrow().contains(book_id)
    }

    pub async fn toggle_favorite(&self, book_id: &str) -> Result<bool, CatalogError> {
        self.repo.toggle_favorite(book_id).await
    }

    pub fn cover_url(&self, book: &Book) -> String {
        self.repo.cover_url_for(book)
    }
}
