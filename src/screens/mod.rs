//! Screen state machines. Each screen owns its display state behind a lock that is
//! never held across a fetch, so a front end may drive it from any task.

pub mod book_detail;
pub mod catalog;
pub mod solution_viewer;

pub use book_detail::BookDetailScreen;
pub use catalog::CatalogScreen;
pub use solution_viewer::{Gesture, Offset, Size, SolutionViewerScreen, ZoomState};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

impl Status {
    pub fn is_loading(&self) -> bool {
        matches!(self, Status::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Status::Failed(message) => Some(message),
            _ => None,
        }
    }
}

/// Items on display plus the state of the fetch that produced (or is replacing) them.
/// Items stay visible while a newer fetch is loading and after it fails.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub status: Status,
}

impl<T> Default for Listing<T> {
    fn default() -> Self {
        Listing {
            items: Vec::new(),
            status: Status::Idle,
        }
    }
}

impl<T> Listing<T> {
    pub fn start(&mut self) {
        self.status = Status::Loading;
    }

    pub fn finish<E: std::fmt::Display>(&mut self, result: Result<Vec<T>, E>) {
        match result {
            Ok(items) => {
                self.items = items;
                self.status = Status::Loaded;
            }
            Err(e) => self.status = Status::Failed(e.to_string()),
        }
    }
}

/// Request-generation counter. Only the response to the latest request may be applied.
#[derive(Debug, Default)]
pub struct RequestGate {
    current: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl RequestGate {
    pub fn begin(&mut self) -> Ticket {
        self.current += 1;
        Ticket(self.current)
    }

    /// Invalidate whatever is in flight without starting a request.
    pub fn supersede(&mut self) {
        self.current += 1;
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.current
    }
}
