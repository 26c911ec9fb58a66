use crate::{
    data::{
        IdForm,
        student::{Student, StudentForm},
    },
    error::{FeebookResult, InvalidStudentDetailsSnafu, MissingStudentSnafu},
    ledger::{
        MONEY_EPSILON, NextDue, compute_monthly_schedule, next_due_date, parse_calendar_date,
        summarize_pending,
    },
    maud_conveniences::{
        Email, Money, fee_status_badge, form_submit_button, month_status_badge, progress_bar,
        render_table, subtitle, title,
    },
    routes::{Page, all_students::student_form_fields, payments::payment_form, sse::SseEvent},
    state::FeebookState,
};
use axum::{
    Form,
    extract::{Path, Query, State},
};
use maud::{Markup, html};
use serde::Deserialize;
use snafu::OptionExt;
use uuid::Uuid;

pub async fn get_student(
    State(state): State<FeebookState>,
    Path(id): Path<Uuid>,
) -> FeebookResult<Markup> {
    let detail = student_detail(&state, id).await?;
    Ok(state.render(Page::DetailView(id), detail))
}

pub async fn internal_get_student_in_detail(
    State(state): State<FeebookState>,
    Query(IdForm { id }): Query<IdForm>,
) -> FeebookResult<Markup> {
    student_detail(&state, id).await
}

fn info_row(label: &'static str, value: Markup) -> Markup {
    html! {
        p class="text-gray-200 font-semibold" {
            (label) ": "
            span class="font-medium" {(value)}
        }
    }
}

#[allow(clippy::too_many_lines)]
async fn student_detail(state: &FeebookState, id: Uuid) -> FeebookResult<Markup> {
    let students = state.students().await?;
    let student = students.get(id).context(MissingStudentSnafu { id })?;

    let now = state.now();
    let date_locale = state.config().date_locale_config();
    let symbol = state.config().currency_symbol();
    let money = |amount: f64| Money { amount, symbol };

    let show_date = |raw: &str| -> FeebookResult<String> {
        match parse_calendar_date(raw) {
            Some(date) => date_locale.short_ymd(date),
            None => Ok(raw.to_string()),
        }
    };

    let schedule = compute_monthly_schedule(student, &now);
    let next_due = match next_due_date(student, &now) {
        Ok(NextDue::AllPaid) => html! { span class="text-green-400" {"All fees paid"} },
        Ok(NextDue::Overdue) => html! { span class="text-red-400" {"Overdue"} },
        Ok(NextDue::Due(date)) => html! { (date_locale.long_ymd(date)?) },
        Err(e) => html! { span class="italic text-gray-400" {"Unavailable (" (e) ")"} },
    };

    let schedule_markup = match &schedule {
        Ok(months) => {
            let summary = summarize_pending(months);
            let rows = months
                .iter()
                .map(|month| {
                    [
                        html! { (month.label) },
                        html! { (money(month.required)) },
                        html! { (money(month.paid)) },
                        html! { (money(month.carry_forward)) },
                        month_status_badge(month.status, month.carry_forward > MONEY_EPSILON),
                    ]
                })
                .collect();

            html! {
                @if summary.has_pending() {
                    div class="bg-gray-700 rounded p-4 mb-4 grid grid-cols-2 md:grid-cols-4 gap-4" {
                        div {
                            p class="text-gray-400 text-sm" {"Pending Months"}
                            p class="text-xl font-bold" {(summary.pending_months)}
                        }
                        div {
                            p class="text-gray-400 text-sm" {"Overdue Months"}
                            p class="text-xl font-bold text-red-400" {(summary.overdue_months)}
                        }
                        div {
                            p class="text-gray-400 text-sm" {"Total Pending"}
                            p class="text-xl font-bold" {(money(summary.pending_amount))}
                        }
                        div {
                            p class="text-gray-400 text-sm" {"Overdue Amount"}
                            p class="text-xl font-bold text-red-400" {(money(summary.overdue_amount))}
                        }
                    }
                }
                (render_table("Monthly Fee Breakdown", ["Month", "Required", "Paid", "Carry Forward", "Status"], rows))
            }
        }
        Err(e) => html! {
            (subtitle("Monthly Fee Breakdown"))
            p class="italic text-gray-400" {"No schedule available: " (e)}
        },
    };

    let mut history: Vec<_> = student.fee_history().iter().collect();
    history.sort_by_key(|payment| std::cmp::Reverse(payment.date));
    let history_rows = history
        .into_iter()
        .map(|payment| -> FeebookResult<[Markup; 3]> {
            Ok([
                html! { (date_locale.short_ymdet(payment.date)?) },
                html! { (money(payment.amount)) },
                html! {
                    button hx-delete="/internal/payments" hx-vals={"{\"student_id\": \"" (id) "\", \"payment_id\": \"" (payment.id) "\"}"} hx-confirm="Delete this payment?" hx-target="#payment_feedback" class="bg-red-600 hover:bg-red-800 font-bold py-1 px-2 rounded text-xs" {"Delete"}
                },
            ])
        })
        .collect::<FeebookResult<Vec<_>>>()?;

    let details = &student.details;
    Ok(html! {
        div id="student_detail" hx-get="/internal/get_student" hx-vals={"{\"id\": \"" (id) "\"}"} hx-trigger="sse:crud_student, sse:crud_payment" hx-swap="outerHTML" class="flex flex-col space-y-6" {
            div class="flex flex-row items-center justify-between" {
                (title(&details.name))
                div class="flex flex-row items-center space-x-2" {
                    (fee_status_badge(student.is_fully_paid()))
                    button hx-get="/internal/students/edit_form" hx-vals={"{\"id\": \"" (id) "\"}"} hx-target="#student_detail" hx-swap="outerHTML" class="bg-blue-600 hover:bg-blue-800 font-bold py-2 px-4 rounded" {"Edit"}
                    button hx-delete="/students" hx-vals={"{\"id\": \"" (id) "\"}"} hx-confirm={"Delete " (details.name) " and all their payments?"} class="bg-red-600 hover:bg-red-800 font-bold py-2 px-4 rounded" {"Delete"}
                }
            }

            div class="grid grid-cols-1 md:grid-cols-2 gap-4" {
                div class="bg-gray-800 rounded shadow p-4" {
                    (subtitle("Personal Information"))
                    (info_row("Email", html! { (Email(&details.email)) }))
                    (info_row("Phone", html! { (details.phone) }))
                    @if let Some(age) = details.age {
                        (info_row("Age", html! { (age) }))
                    }
                    @if !details.dob.is_empty() {
                        (info_row("Date of Birth", html! { (show_date(&details.dob)?) }))
                    }
                    @if !details.address.is_empty() {
                        (info_row("Address", html! { (details.address) }))
                    }
                }
                div class="bg-gray-800 rounded shadow p-4" {
                    (subtitle("Academic Information"))
                    (info_row("Joining Date", html! { (show_date(&details.joining)?) }))
                    (info_row("Semester Duration", html! { (details.semester) " months" }))
                    (info_row("Added", html! { (date_locale.short_ymdet(student.created_at)?) }))
                }
            }

            div class="bg-gray-800 rounded shadow p-4" {
                (subtitle("Fee Status"))
                div class="grid grid-cols-3 gap-4 mb-2" {
                    (info_row("Total", html! { (money(details.total_fees)) }))
                    (info_row("Paid", html! { (money(student.paid_fees())) }))
                    (info_row("Remaining", html! { (money(student.remaining_fees())) }))
                }
                (progress_bar(student.progress_percentage()))
                p class="text-sm text-gray-400 mt-1" {(format!("{:.1}", student.progress_percentage())) "% paid"}
                div class="mt-2" {
                    (info_row("Next Due", next_due))
                }
            }

            div class="bg-gray-800 rounded shadow p-4" {
                (schedule_markup)
            }

            div class="bg-gray-800 rounded shadow p-4" {
                div id="payment_feedback" {}
                @if student.is_fully_paid() {
                    p class="italic text-green-400" {"All fees have been paid."}
                } @else {
                    (payment_form(student, symbol))
                }
            }

            div class="bg-gray-800 rounded shadow p-4" {
                @if history_rows.is_empty() {
                    (subtitle("Payment History"))
                    p class="italic text-gray-400" {"No payments recorded yet."}
                } @else {
                    (render_table("Payment History", ["Date", "Amount", ""], history_rows))
                }
            }
        }
    })
}

pub async fn internal_get_edit_student_form(
    State(state): State<FeebookState>,
    Query(IdForm { id }): Query<IdForm>,
) -> FeebookResult<Markup> {
    let students = state.students().await?;
    let student: &Student = students.get(id).context(MissingStudentSnafu { id })?;

    Ok(html! {
        div id="student_detail" class="bg-gray-800 p-8 rounded shadow-md" {
            (title(html! { "Edit " (student.details.name) }))
            form hx-post="/internal/students/edit" hx-target="#edit_feedback" {
                input type="hidden" name="id" value=(id);
                div id="edit_feedback" {}
                (student_form_fields(Some(&StudentForm::from(&student.details))))
                div class="flex flex-row space-x-4" {
                    (form_submit_button(Some("Save Changes")))
                    button hx-get="/internal/get_student" hx-vals={"{\"id\": \"" (id) "\"}"} hx-target="#student_detail" hx-swap="outerHTML" type="button" class="bg-gray-600 hover:bg-gray-700 font-bold py-2 px-4 rounded" {"Cancel"}
                }
            }
        }
    })
}

#[derive(Deserialize)]
pub struct EditStudentForm {
    id: Uuid,
    #[serde(flatten)]
    form: StudentForm,
}

pub async fn internal_post_edit_student(
    State(state): State<FeebookState>,
    Form(EditStudentForm { id, form }): Form<EditStudentForm>,
) -> FeebookResult<Markup> {
    let details = form
        .validate()
        .map_err(|errors| InvalidStudentDetailsSnafu { errors }.build())?;

    state
        .mutate(|students| students.update_student(id, details))
        .await?;
    state.send_sse_event(SseEvent::CrudStudent);

    Ok(html! {
        div hx-get="/internal/get_student" hx-vals={"{\"id\": \"" (id) "\"}"} hx-target="#student_detail" hx-swap="outerHTML" hx-trigger="load" {}
    })
}
