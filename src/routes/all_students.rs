use crate::{
    data::{
        IdForm,
        collection::StatusFilter,
        student::{MAX_SEMESTER_MONTHS, StudentForm},
    },
    error::{FeebookError, FeebookResult},
    maud_conveniences::{
        Email, Money, errors_list, fee_status_badge, form_element, form_submit_button,
        progress_bar, simple_form_element, supertitle, title,
    },
    routes::{Page, sse::SseEvent},
    state::FeebookState,
};
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use serde::Deserialize;

pub async fn get_students(State(state): State<FeebookState>) -> Markup {
    state.render(Page::ListView, html! {
        div class="flex flex-col space-y-4" {
            (supertitle("Students"))

            form id="student_filters" hx-get="/internal/get_students" hx-target="#all_students" hx-trigger="load, input delay:300ms from:#search, change from:#status" class="flex flex-row space-x-4" {
                input type="search" id="search" name="search" placeholder="Search by name, email or phone" class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600";
                select id="status" name="status" class="shadow border rounded py-2 px-3 bg-gray-700 border-gray-600" {
                    option value=(StatusFilter::All.as_str()) {"All"}
                    option value=(StatusFilter::Paid.as_str()) {"Fees Paid"}
                    option value=(StatusFilter::Pending.as_str()) {"Fees Pending"}
                }
            }

            div id="all_students" {}
        }
    })
}

#[derive(Deserialize, Default)]
pub struct StudentsQuery {
    #[serde(default)]
    search: String,
    #[serde(default)]
    status: StatusFilter,
}

pub async fn internal_get_students(
    State(state): State<FeebookState>,
    Query(StudentsQuery { search, status }): Query<StudentsQuery>,
) -> FeebookResult<Markup> {
    let students = state.students().await?;
    let found = students.search(&search, status);
    let symbol = state.config().currency_symbol();

    Ok(html! {
        div hx-get="/internal/get_students" hx-include="#student_filters" hx-trigger="sse:crud_student, sse:crud_payment" hx-target="#all_students" class="grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-4" {
            @if found.is_empty() {
                p class="italic text-gray-400" {"No students found."}
            }
            @for student in found {
                div class="rounded-lg shadow-md p-4 bg-gray-800 flex flex-col space-y-2" {
                    div class="flex flex-row items-center justify-between" {
                        a href=(Page::DetailView(student.id).path()) class="text-lg font-semibold hover:underline" {(student.details.name)}
                        (fee_status_badge(student.is_fully_paid()))
                    }
                    p {(Email(&student.details.email))}
                    p class="text-gray-300 text-sm" {(student.details.phone)}
                    (progress_bar(student.progress_percentage()))
                    p class="text-sm text-gray-300" {
                        (Money { amount: student.paid_fees(), symbol })
                        " of "
                        (Money { amount: student.details.total_fees, symbol })
                    }
                    div class="flex flex-row space-x-2" {
                        a href=(Page::DetailView(student.id).path()) class="bg-slate-600 hover:bg-slate-800 font-bold py-1 px-3 rounded text-sm" {"View"}
                        button hx-delete="/students" hx-vals={"{\"id\": \"" (student.id) "\"}"} hx-confirm={"Delete " (student.details.name) " and all their payments?"} hx-target="#all_students" class="bg-red-600 hover:bg-red-800 font-bold py-1 px-3 rounded text-sm" {"Delete"}
                    }
                }
            }
        }
    })
}

/// The add/edit form body. `existing` pre-fills the inputs, either from a stored student or from
/// a rejected submission.
pub fn student_form_fields(existing: Option<&StudentForm>) -> Markup {
    let value = |pick: fn(&StudentForm) -> &str| existing.map(pick);
    let semester_max = MAX_SEMESTER_MONTHS.to_string();

    html! {
        div class="grid grid-cols-1 md:grid-cols-2 gap-x-4" {
            (simple_form_element("name", "Full Name", true, None, value(|f| &f.name)))
            (simple_form_element("email", "Email", true, Some("email"), value(|f| &f.email)))
            (simple_form_element("phone", "Phone", true, Some("tel"), value(|f| &f.phone)))
            (simple_form_element("age", "Age", false, Some("number"), value(|f| &f.age)))
            (simple_form_element("dob", "Date of Birth", false, Some("date"), value(|f| &f.dob)))
            (simple_form_element("joining", "Joining Date", true, Some("date"), value(|f| &f.joining)))
            (form_element("semester", "Semester Duration (Months)", html! {
                input type="number" id="semester" name="semester" required min="1" max=(semester_max) value=[value(|f| &f.semester)] class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600";
            }))
            (simple_form_element("fees", "Total Fees", true, Some("number"), value(|f| &f.fees)))
        }
        (form_element("address", "Address", html! {
            textarea id="address" name="address" rows="2" class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600" {
                @if let Some(address) = value(|f| &f.address) {(address)}
            }
        }))
    }
}

fn add_student_form(previous: Option<&StudentForm>, errors: Option<Markup>) -> Markup {
    html! {
        form id="add_student_form" hx-put="/students" hx-target="this" hx-swap="outerHTML" class="bg-gray-800 p-8 rounded shadow-md" {
            @if let Some(errors) = errors {
                (errors)
            }
            (student_form_fields(previous))
            (form_submit_button(Some("Add Student")))
        }
    }
}

pub async fn get_add_student_form(State(state): State<FeebookState>) -> Markup {
    state.render(Page::AddForm, html! {
        div class="max-w-3xl mx-auto" {
            (title("Add New Student"))
            (add_student_form(None, None))
        }
    })
}

pub async fn put_new_student(
    State(state): State<FeebookState>,
    Form(form): Form<StudentForm>,
) -> FeebookResult<Response> {
    let details = match form.clone().validate() {
        Ok(details) => details,
        Err(errors) => {
            return Ok(add_student_form(
                Some(&form),
                Some(errors_list(
                    Some("Please fix the following:"),
                    errors.as_nice_list(),
                )),
            )
            .into_response());
        }
    };

    let now = state.now().timestamp();
    let id = match state
        .mutate(|students| students.add_student(details, now))
        .await
    {
        Ok(id) => id,
        Err(e @ FeebookError::DuplicateEmail { .. }) => {
            warn!(?e, "Rejected new student");
            return Ok((
                StatusCode::CONFLICT,
                add_student_form(Some(&form), Some(errors_list(None, std::iter::once(e.to_string())))),
            )
                .into_response());
        }
        Err(e) => return Err(e),
    };
    state.send_sse_event(SseEvent::CrudStudent);

    Ok((Page::DetailView(id).hx_redirect(), html! {}).into_response())
}

pub async fn delete_student(
    State(state): State<FeebookState>,
    Query(IdForm { id }): Query<IdForm>,
) -> FeebookResult<Response> {
    let removed = state
        .mutate(|students| Ok(students.remove_student(id)))
        .await?;
    if removed.is_some() {
        state.send_sse_event(SseEvent::CrudStudent);
    }

    Ok((Page::ListView.hx_redirect(), html! {}).into_response())
}
