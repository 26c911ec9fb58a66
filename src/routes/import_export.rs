use crate::{
    error::{FeebookResult, MultipartSnafu},
    exchange::{ExportBundle, ImportBundle, create_backup, decode_draft, encode_draft, export_file_name},
    maud_conveniences::{
        Email, Money, errors_list, form_submit_button, render_table, success_message,
    },
    routes::sse::SseEvent,
    state::FeebookState,
};
use axum::{
    Form,
    extract::{Multipart, State},
    http::header,
    response::IntoResponse,
};
use maud::{Markup, html};
use serde::Deserialize;
use snafu::ResultExt;

pub const IMPORT_FIELD: &str = "import_file";

pub async fn get_export(State(state): State<FeebookState>) -> FeebookResult<impl IntoResponse> {
    let students = state.students().await?;
    let now = state.now();
    let zip = ExportBundle::from_collection(&students, &now)?.to_zip()?;
    info!(students = students.len(), bytes = zip.len(), "Exported students");

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", export_file_name(&now)),
            ),
        ],
        zip,
    ))
}

pub async fn put_import_students(
    State(state): State<FeebookState>,
    mut multipart: Multipart,
) -> FeebookResult<Markup> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.context(MultipartSnafu)? {
        if field.name() == Some(IMPORT_FIELD) {
            upload = Some(field.bytes().await.context(MultipartSnafu)?);
            break;
        }
    }

    let Some(upload) = upload.filter(|bytes| !bytes.is_empty()) else {
        return Ok(errors_list(None, std::iter::once("Please choose a file to import.")));
    };

    let ImportBundle { students, problems } = ImportBundle::parse(&upload, &state.now())?;

    if students.is_empty() {
        return Ok(html! {
            (errors_list(Some("No valid data found in file"), problems.iter()))
        });
    }

    let symbol = state.config().currency_symbol();
    let draft = encode_draft(&students)?;
    let rows = students
        .iter()
        .map(|student| {
            [
                html! { (student.details.name) },
                html! { (Email(&student.details.email)) },
                html! { (Money { amount: student.details.total_fees, symbol }) },
                html! { (Money { amount: student.paid_fees(), symbol }) },
                html! { (student.fee_history().len()) },
            ]
        })
        .collect();

    Ok(html! {
        @if !problems.is_empty() {
            (errors_list(Some("These rows were skipped:"), problems.iter()))
        }
        p class="italic p-4" {"Successfully read " (students.len()) " student(s)."}
        (render_table("Import Preview", ["Name", "Email", "Total Fees", "Paid", "Payments"], rows))

        form hx-put="/import_export/confirm_import" hx-target="#import_area" class="mt-4" {
            input type="hidden" name="b64students" value=(draft);
            (form_submit_button(Some("Confirm Import")))
        }
    })
}

#[derive(Deserialize)]
pub struct ConfirmImportForm {
    b64students: String,
}

pub async fn put_confirm_import(
    State(state): State<FeebookState>,
    Form(ConfirmImportForm { b64students }): Form<ConfirmImportForm>,
) -> FeebookResult<Markup> {
    let imported = decode_draft(&b64students)?;
    let outcome = state
        .mutate(|students| Ok(students.merge_imported(imported)))
        .await?;

    if outcome.added == 0 {
        return Ok(errors_list(
            None,
            std::iter::once("All students already exist"),
        ));
    }

    state.send_sse_event(SseEvent::CrudStudent);
    Ok(success_message(html! {
        (outcome.added) " student(s) imported"
        @if outcome.duplicates > 0 {
            ", " (outcome.duplicates) " skipped as duplicates"
        }
        "."
    }))
}

pub async fn post_backup(State(state): State<FeebookState>) -> FeebookResult<Markup> {
    let students = state.students().await?;
    let key = create_backup(state.repository(), &students, &state.now()).await?;
    info!(%key, "Created backup");

    Ok(success_message(html! {
        "Backup saved as " code {(key)}
    }))
}
