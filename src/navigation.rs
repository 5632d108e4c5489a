//! Route table and back stack for the three screens.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Books,
    BookDetail { book_id: String, title: String },
    SolutionViewer { image_url: String },
}

impl Route {
    /// Path form, e.g. `bookDetail/B1/Algebra%20I`. Dynamic segments are percent-encoded.
    pub fn path(&self) -> String {
        match self {
            Route::Books => "books".to_string(),
            Route::BookDetail { book_id, title } => format!(
                "bookDetail/{}/{}",
                urlencoding::encode(book_id),
                urlencoding::encode(title)
            ),
            Route::SolutionViewer { image_url } => {
                format!("solutionViewer/{}", urlencoding::encode(image_url))
            }
        }
    }

    /// Inverse of [`Route::path`]. One leading `/` is accepted; empty segments are kept.
    pub fn parse(path: &str) -> Option<Route> {
        let path = path.strip_prefix('/').unwrap_or(path);
        let mut parts = path.split('/');
        let route = match parts.next()? {
            "books" => Route::Books,
            "bookDetail" => Route::BookDetail {
                book_id: decode(parts.next()?)?,
                title: decode(parts.next()?)?,
            },
            "solutionViewer" => Route::SolutionViewer {
                image_url: decode(parts.next()?)?,
            },
            _ => return None,
        };
        if parts.next().is_some() {
            return None;
        }
        Some(route)
    }
}

fn decode(segment: &str) -> Option<String> {
    urlencoding::decode(segment).ok().map(|s| s.into_owned())
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Back stack rooted at [`Route::Books`].
#[derive(Debug, Clone)]
pub struct Navigator {
    stack: Vec<Route>,
}

impl Default for Navigator {
    fn default() -> Self {
        Navigator {
            stack: vec![Route::Books],
        }
    }
}

impl Navigator {
    pub fn current(&self) -> &Route {
        // the root is never popped
        &self.stack[self.stack.len() - 1]
    }

    pub fn navigate(&mut self, route: Route) {
        tracing::debug!(route = %route, "navigate");
        self.stack.push(route);
    }

    /// Pop the current route. Returns false at the root.
    pub fn back(&mut self) -> bool {
        if self.stack.len() <= 1 {
            return false;
        }
        self.stack.pop();
        true
    }

    /// Drop everything above the root.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
    }
}
