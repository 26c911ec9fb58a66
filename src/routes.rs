use uuid::Uuid;

pub mod all_students;
pub mod import_export;
pub mod index;
pub mod payments;
pub mod sse;
pub mod student_in_detail;

/// The top-level pages, used for navigation and for pointing htmx at where to go next.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    AddForm,
    ListView,
    DetailView(Uuid),
}

impl Page {
    pub const NAV: [Self; 3] = [Self::Dashboard, Self::ListView, Self::AddForm];

    pub fn path(&self) -> String {
        match self {
            Self::Dashboard => "/".to_string(),
            Self::AddForm => "/students/new".to_string(),
            Self::ListView => "/students".to_string(),
            Self::DetailView(id) => format!("/student/{id}"),
        }
    }

    pub const fn title(&self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::AddForm => "Add Student",
            Self::ListView => "Students",
            Self::DetailView(_) => "Student Details",
        }
    }

    /// Header telling htmx to do a full navigation to this page.
    pub fn hx_redirect(&self) -> [(&'static str, String); 1] {
        [("HX-Redirect", self.path())]
    }
}
