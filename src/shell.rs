//! Line-oriented front end over the screens. Each command updates the screen on top of
//! the back stack and the shell answers with a text rendering of the result.

use std::{fmt::Write as _, sync::Arc};

use crate::{
    domain::{SUBJECTS, Subject},
    navigation::{Navigator, Route},
    repository::CatalogRepository,
    screens::{BookDetailScreen, CatalogScreen, Gesture, Size, SolutionViewerScreen, Status},
};

pub const DEFAULT_VIEWPORT: Size = Size {
    width: 1080.0,
    height: 1920.0,
};

pub const HELP: &str = "\
commands:
  subjects                 list subjects
  subject <id>             switch subject (e.g. ST2016)
  filter <text>            filter the visible books
  search [text]            fetch the subject again and keep matching titles
  fav <bookId>             toggle a favorite
  open <bookId>            open a book
  page <n> | question <n>  set the lookup fields
  submit                   look up solutions
  view <index>             open a solution image
  resize <w> <h>           set the viewer size
  zoom <factor> [dx dy]    pinch gesture
  pan <dx> <dy>            drag gesture
  back                     previous screen
  go <route>               jump to a route path (e.g. bookDetail/B1/Algebra)
  help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Subjects,
    Subject(String),
    Filter(String),
    Search(Option<String>),
    Favorite(String),
    Open(String),
    Page(String),
    Question(String),
    Submit,
    View(usize),
    Resize(Size),
    Gesture(Gesture),
    Back,
    Go(String),
    Quit,
}

impl Command {
    pub fn parse(line: &str) -> Result<Command, String> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let arg = |name: &str| {
            if rest.is_empty() {
                Err(format!("{name} needs an argument"))
            } else {
                Ok(rest.to_string())
            }
        };
        let command = match word {
            "help" | "?" => Command::Help,
            "subjects" => Command::Subjects,
            "subject" => Command::Subject(arg("subject")?),
            "filter" => Command::Filter(rest.to_string()),
            "search" => Command::Search((!rest.is_empty()).then(|| rest.to_string())),
            "fav" => Command::Favorite(arg("fav")?),
            "open" => Command::Open(arg("open")?),
            // entries are kept verbatim, the book screen coerces them on submit
            "page" => Command::Page(rest.to_string()),
            "question" => Command::Question(rest.to_string()),
            "submit" => Command::Submit,
            "view" => Command::View(
                rest.parse::<usize>()
                    .map_err(|_| format!("view needs an index, got {rest:?}"))?,
            ),
            "resize" => {
                let [w, h] = numbers::<2>(rest, "resize <w> <h>")?;
                Command::Resize(Size::new(w, h))
            }
            "zoom" => {
                let mut parts = rest.split_whitespace();
                let factor = parse_f32(parts.next(), "zoom <factor> [dx dy]")?;
                let mut gesture = Gesture::zoom(factor);
                if let Some(dx) = parts.next() {
                    gesture.pan.x = parse_f32(Some(dx), "zoom <factor> [dx dy]")?;
                    gesture.pan.y = parse_f32(parts.next(), "zoom <factor> [dx dy]")?;
                }
                Command::Gesture(gesture)
            }
            "pan" => {
                let [dx, dy] = numbers::<2>(rest, "pan <dx> <dy>")?;
                Command::Gesture(Gesture::pan(dx, dy))
            }
            "back" => Command::Back,
            "go" => Command::Go(arg("go")?),
            "quit" | "exit" => Command::Quit,
            "" => return Err("empty command".into()),
            other => return Err(format!("unknown command {other:?}")),
        };
        Ok(command)
    }
}

fn parse_f32(token: Option<&str>, usage: &str) -> Result<f32, String> {
    token
        .and_then(|t| t.parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("usage: {usage}"))
}

fn numbers<const N: usize>(rest: &str, usage: &str) -> Result<[f32; N], String> {
    let mut parts = rest.split_whitespace();
    let mut out = [0.0; N];
    for slot in out.iter_mut() {
        *slot = parse_f32(parts.next(), usage)?;
    }
    if parts.next().is_some() {
        return Err(format!("usage: {usage}"));
    }
    Ok(out)
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
    Continue(String),
    Quit,
}

pub struct Shell {
    repo: Arc<CatalogRepository>,
    nav: Navigator,
    catalog: CatalogScreen,
    detail: Option<BookDetailScreen>,
    viewer: Option<SolutionViewerScreen>,
    viewport: Size,
}

impl Shell {
    pub fn new(repo: Arc<CatalogRepository>) -> Self {
        Shell {
            catalog: CatalogScreen::new(Arc::clone(&repo)),
            repo,
            nav: Navigator::default(),
            detail: None,
            viewer: None,
            viewport: DEFAULT_VIEWPORT,
        }
    }

    pub fn route(&self) -> &Route {
        self.nav.current()
    }

    /// Load the initial subject and render the first screen.
    pub async fn start(&mut self) -> String {
        self.catalog.select_subject(Subject::default_subject()).await;
        self.render()
    }

    pub async fn handle_line(&mut self, line: &str) -> Outcome {
        match Command::parse(line) {
            Ok(command) => self.handle(command).await,
            Err(message) => Outcome::Continue(format!("{message}\n{HELP}")),
        }
    }

    pub async fn handle(&mut self, command: Command) -> Outcome {
        tracing::debug!(?command, route = %self.nav.current(), "command");
        let result = match command {
            Command::Quit => return Outcome::Quit,
            Command::Help => Ok(HELP.to_string()),
            Command::Subjects => Ok(render_subjects()),
            Command::Back => {
                if self.nav.back() {
                    self.drop_hidden_screens();
                    Ok(self.render())
                } else {
                    Err("already at the first screen".to_string())
                }
            }
            Command::Go(path) => self.go(&path),
            command => match self.nav.current().clone() {
                Route::Books => self.on_books(command).await,
                Route::BookDetail { .. } => self.on_book_detail(command).await,
                Route::SolutionViewer { .. } => self.on_viewer(command),
            },
        };
        Outcome::Continue(result.unwrap_or_else(|message| message))
    }

    async fn on_books(&mut self, command: Command) -> Result<String, String> {
        match command {
            Command::Subject(id) => {
                let subject =
                    Subject::find(&id).ok_or_else(|| format!("unknown subject {id:?}"))?;
                self.catalog.select_subject(subject).await;
            }
            Command::Filter(query) => self.catalog.set_query(query),
            Command::Search(query) => {
                if let Some(query) = query {
                    self.catalog.set_query(query);
                }
                self.catalog.submit_search().await;
            }
            Command::Favorite(book_id) => {
                self.catalog
                    .toggle_favorite(&book_id)
                    .await
                    .map_err(|e| e.to_string())?;
            }
            Command::Open(book_id) => {
                let book = self
                    .catalog
                    .visible_books()
                    .into_iter()
                    .find(|b| b.id == book_id)
                    .ok_or_else(|| format!("no book {book_id:?} in the list"))?;
                self.detail = Some(BookDetailScreen::new(
                    Arc::clone(&self.repo),
                    book.id.clone(),
                    book.title.clone(),
                ));
                self.nav.navigate(Route::BookDetail {
                    book_id: book.id,
                    title: book.title,
                });
            }
            other => return Err(not_here(&other)),
        }
        Ok(self.render())
    }

    async fn on_book_detail(&mut self, command: Command) -> Result<String, String> {
        let detail = self
            .detail
            .as_ref()
            .ok_or_else(|| "book screen is not open".to_string())?;
        match command {
            Command::Page(text) => detail.set_page(text),
            Command::Question(text) => detail.set_question(text),
            Command::Submit => detail.submit().await,
            Command::View(index) => {
                let image_url = detail
                    .image_urls()
                    .into_iter()
                    .nth(index)
                    .ok_or_else(|| format!("no solution #{index}"))?;
                self.viewer = Some(SolutionViewerScreen::new(image_url.clone(), self.viewport));
                self.nav.navigate(Route::SolutionViewer { image_url });
            }
            other => return Err(not_here(&other)),
        }
        Ok(self.render())
    }

    fn on_viewer(&mut self, command: Command) -> Result<String, String> {
        let viewer = self
            .viewer
            .as_mut()
            .ok_or_else(|| "viewer is not open".to_string())?;
        match command {
            Command::Gesture(gesture) => viewer.on_gesture(gesture),
            Command::Resize(size) => {
                self.viewport = size;
                viewer.on_resize(size);
            }
            other => return Err(not_here(&other)),
        }
        Ok(self.render())
    }

    /// Replace the back stack with the root plus the parsed route.
    fn go(&mut self, path: &str) -> Result<String, String> {
        let route = Route::parse(path).ok_or_else(|| format!("unknown route {path:?}"))?;
        self.nav.reset();
        self.drop_hidden_screens();
        match &route {
            Route::Books => return Ok(self.render()),
            Route::BookDetail { book_id, title } => {
                self.detail = Some(BookDetailScreen::new(
                    Arc::clone(&self.repo),
                    book_id.clone(),
                    title.clone(),
                ));
            }
            Route::SolutionViewer { image_url } => {
                self.viewer = Some(SolutionViewerScreen::new(image_url.clone(), self.viewport));
            }
        }
        self.nav.navigate(route);
        Ok(self.render())
    }

    fn drop_hidden_screens(&mut self) {
        match self.nav.current() {
            Route::Books => {
                self.detail = None;
                self.viewer = None;
            }
            Route::BookDetail { .. } => self.viewer = None,
            Route::SolutionViewer { .. } => {}
        }
    }

    pub fn render(&self) -> String {
        match self.nav.current() {
            Route::Books => self.render_books(),
            Route::BookDetail { .. } => self
                .detail
                .as_ref()
                .map(render_detail)
                .unwrap_or_default(),
            Route::SolutionViewer { .. } => self
                .viewer
                .as_ref()
                .map(render_viewer)
                .unwrap_or_default(),
        }
    }

    fn render_books(&self) -> String {
        let subject = self.catalog.subject();
        let mut out = String::new();
        let _ = writeln!(out, "== {} ({})", subject.name, subject.id);
        let query = self.catalog.query();
        if !query.trim().is_empty() {
            let _ = writeln!(out, "filter: {query}");
        }
        render_status(&mut out, &self.catalog.status());
        for book in self.catalog.visible_books() {
            let star = if self.catalog.is_favorite(&book.id) {
                '*'
            } else {
                ' '
            };
            let _ = write!(out, "{star} {:<8} {}", book.id, book.title);
            let crumbs = book.breadcrumbs();
            if !crumbs.is_empty() {
                let _ = write!(out, "  [{}]", crumbs.join(" > "));
            }
            out.push('\n');
        }
        out
    }
}

fn render_subjects() -> String {
    SUBJECTS
        .iter()
        .map(|s| format!("{}  {}", s.id, s.name))
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_status(out: &mut String, status: &Status) {
    match status {
        Status::Loading => out.push_str("loading...\n"),
        Status::Failed(message) => {
            let _ = writeln!(out, "error: {message}");
        }
        Status::Idle | Status::Loaded => {}
    }
}

fn render_detail(detail: &BookDetailScreen) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ({})", detail.title(), detail.book_id());
    let _ = writeln!(
        out,
        "page: {}  question: {}",
        detail.page(),
        detail.question()
    );
    let status = detail.status();
    render_status(&mut out, &status);
    let urls = detail.image_urls();
    if status == Status::Loaded && urls.is_empty() {
        out.push_str("no solutions\n");
    }
    for (i, url) in urls.iter().enumerate() {
        let _ = writeln!(out, "[{i}] {url}");
    }
    out
}

fn render_viewer(viewer: &SolutionViewerScreen) -> String {
    let zoom = viewer.zoom();
    format!(
        "== {}\nscale {:.2}  offset ({:.1}, {:.1})  viewport {}x{}\n",
        viewer.image_url(),
        zoom.scale(),
        zoom.offset().x,
        zoom.offset().y,
        zoom.container().width,
        zoom.container().height,
    )
}

fn not_here(command: &Command) -> String {
    format!("{command:?} is not available on this screen")
}
