use crate::{
    error::FeebookResult,
    exchange::is_backup_stale,
    maud_conveniences::{Money, fee_status_badge, form_submit_button, subtitle, supertitle},
    routes::Page,
    state::FeebookState,
};
use axum::extract::State;
use maud::{Markup, html};

pub const RECENT_STUDENTS: usize = 5;

pub async fn get_index_route(State(state): State<FeebookState>) -> FeebookResult<Markup> {
    let students = state.students().await?;
    let stats = students.stats();
    let symbol = state.config().currency_symbol();
    let date_locale = state.config().date_locale_config();

    let now = state.now();
    let last_backup = state.repository().last_backup().await?;
    let backup_due = is_backup_stale(
        last_backup,
        now.timestamp(),
        state.config().backup_interval(),
    );
    let last_backup = last_backup
        .map(|at| date_locale.short_ymdet(at))
        .transpose()?;

    let recent = students
        .recent(RECENT_STUDENTS)
        .into_iter()
        .map(|student| {
            (
                student.id,
                student.details.name.clone(),
                student.details.email.clone(),
                student.is_fully_paid(),
            )
        })
        .collect::<Vec<_>>();

    Ok(state.render(Page::Dashboard, html! {
        div id="dashboard" hx-get="/" hx-select="#dashboard" hx-swap="outerHTML" hx-trigger="sse:crud_student, sse:crud_payment" class="flex flex-col space-y-6" {
            (supertitle("Dashboard"))

            @if backup_due && !students.is_empty() {
                div class="bg-yellow-100 border border-yellow-400 text-yellow-800 px-4 py-3 rounded" role="alert" {
                    @match &last_backup {
                        Some(at) => {"It has been a while since the last backup (" (at) "). Consider creating one now."},
                        None => {"No backup has been made yet. Consider creating one now."},
                    }
                }
            }

            div class="grid grid-cols-2 md:grid-cols-4 gap-4" {
                div class="bg-gray-800 rounded shadow p-4" {
                    p class="text-gray-400 text-sm" {"Total Students"}
                    p class="text-2xl font-bold" {(stats.total_students)}
                }
                div class="bg-gray-800 rounded shadow p-4" {
                    p class="text-gray-400 text-sm" {"Fees Paid"}
                    p class="text-2xl font-bold text-green-400" {(stats.paid_students)}
                }
                div class="bg-gray-800 rounded shadow p-4" {
                    p class="text-gray-400 text-sm" {"Fees Pending"}
                    p class="text-2xl font-bold text-yellow-400" {(stats.pending_students)}
                }
                div class="bg-gray-800 rounded shadow p-4" {
                    p class="text-gray-400 text-sm" {"Total Revenue"}
                    p class="text-2xl font-bold" {(Money { amount: stats.total_revenue, symbol })}
                    p class="text-gray-400 text-xs" {"Pending: " (Money { amount: stats.total_pending, symbol })}
                }
            }

            div class="bg-gray-800 rounded shadow p-4" {
                div class="flex flex-row items-center justify-between" {
                    (subtitle("Recent Students"))
                    a href=(Page::AddForm.path()) class="bg-blue-600 hover:bg-blue-800 font-bold py-2 px-4 rounded" {"Add Student"}
                }
                @if recent.is_empty() {
                    p class="italic text-gray-400" {"No students yet."}
                } @else {
                    ul class="divide-y divide-gray-700" {
                        @for (id, name, email, fully_paid) in recent {
                            li class="py-2 flex flex-row items-center justify-between" {
                                a href=(Page::DetailView(id).path()) class="hover:underline" {
                                    span class="font-semibold" {(name)}
                                    " "
                                    span class="text-gray-400 text-sm" {(email)}
                                }
                                (fee_status_badge(fully_paid))
                            }
                        }
                    }
                }
            }
        }

        div class="bg-gray-800 rounded shadow p-4 mt-6 flex flex-col space-y-4" {
            (subtitle("Data"))
            div class="flex flex-row space-x-4" {
                a href="/import_export/export" class="bg-slate-600 hover:bg-slate-800 font-bold py-2 px-4 rounded" {"Export"}
                button hx-post="/import_export/backup" hx-target="#backup_result" class="bg-slate-600 hover:bg-slate-800 font-bold py-2 px-4 rounded" {"Create Backup"}
            }
            div id="backup_result" {}

            div id="import_area" {
                form hx-put="/import_export/import_students" hx-target="#import_area" hx-encoding="multipart/form-data" {
                    label for="import_file" class="block text-sm font-medium text-gray-400 mb-2" {"Import students from an export ZIP or a Students CSV"}
                    input type="file" name="import_file" id="import_file" accept=".zip,.csv" class="block w-full text-sm text-gray-300 file:mr-4 file:py-2 file:px-4 file:rounded file:border-0 file:text-sm file:font-semibold file:bg-violet-50 file:text-violet-700 hover:file:bg-violet-100 mb-4";
                    (form_submit_button(Some("Preview Import")))
                }
            }
        }
    }))
}
