use crate::{
    data::student::Student,
    error::{FeebookResult, InvalidPaymentAmountSnafu, ParseDateSnafu, ZoneDateSnafu},
    ledger::parse_calendar_date,
    maud_conveniences::{Money, form_element, form_submit_button, subtitle, success_message},
    routes::sse::SseEvent,
    state::FeebookState,
};
use axum::{
    Form,
    extract::{Query, State},
};
use maud::{Markup, html};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt};
use uuid::Uuid;

pub fn payment_form(student: &Student, symbol: &str) -> Markup {
    let remaining = format!("{:.2}", student.remaining_fees());

    html! {
        (subtitle("Record Payment"))
        form hx-put="/internal/payments" hx-target="#payment_feedback" {
            input type="hidden" name="student_id" value=(student.id);
            div class="grid grid-cols-1 md:grid-cols-2 gap-x-4" {
                (form_element("amount", "Amount", html! {
                    input type="number" id="amount" name="amount" required min="0.01" step="0.01" max=(remaining) class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600";
                }))
                (form_element("date", "Payment Date (defaults to today)", html! {
                    input type="date" id="date" name="date" class="shadow appearance-none border rounded w-full py-2 px-3 leading-tight focus:outline-none focus:shadow-outline bg-gray-700 border-gray-600";
                }))
            }
            p class="text-sm text-gray-400 mb-4" {
                "Remaining: " (Money { amount: student.remaining_fees(), symbol })
            }
            (form_submit_button(Some("Record Payment")))
        }
    }
}

#[derive(Deserialize)]
pub struct NewPaymentForm {
    student_id: Uuid,
    amount: String,
    #[serde(default)]
    date: String,
}

pub async fn internal_put_payment(
    State(state): State<FeebookState>,
    Form(NewPaymentForm {
        student_id,
        amount,
        date,
    }): Form<NewPaymentForm>,
) -> FeebookResult<Markup> {
    let amount: f64 = amount
        .trim()
        .parse()
        .ok()
        .context(InvalidPaymentAmountSnafu { amount: &amount })?;

    let paid_at = if date.trim().is_empty() {
        state.now().timestamp()
    } else {
        let day = parse_calendar_date(&date).context(ParseDateSnafu { original: &date })?;
        day.to_zoned(state.config().date_locale_config().timezone.clone())
            .context(ZoneDateSnafu { date: day })?
            .timestamp()
    };

    state
        .mutate(|students| students.record_payment(student_id, amount, paid_at))
        .await?;
    state.send_sse_event(SseEvent::CrudPayment);

    Ok(success_message(html! {
        "Payment of " (Money { amount, symbol: state.config().currency_symbol() }) " recorded."
    }))
}

#[derive(Deserialize)]
pub struct DeletePaymentQuery {
    student_id: Uuid,
    payment_id: Uuid,
}

pub async fn internal_delete_payment(
    State(state): State<FeebookState>,
    Query(DeletePaymentQuery {
        student_id,
        payment_id,
    }): Query<DeletePaymentQuery>,
) -> FeebookResult<Markup> {
    let removed = state
        .mutate(|students| Ok(students.delete_payment(student_id, payment_id)))
        .await?;

    Ok(match removed {
        Some(payment) => {
            state.send_sse_event(SseEvent::CrudPayment);
            success_message(html! {
                "Deleted payment of " (Money { amount: payment.amount, symbol: state.config().currency_symbol() }) "."
            })
        }
        None => html! {
            p class="italic text-gray-400" {"That payment was already removed."}
        },
    })
}
